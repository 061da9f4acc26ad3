//! Word detail panel: transcription for the selected dialect plus a random
//! audio example with a chooser to switch between examples.

use crate::lookup::{LookupError, RequestToken};
use crate::model::{DialectKey, Example, WordRecord};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{debug, warn};

pub const NO_TRANSCRIPTION: &str = "[No IPA available for selected dialect]";
pub const NO_EXAMPLES: &str = "No audio examples available.";
pub const UNAVAILABLE: &str = "Word details could not be loaded.";

#[derive(Debug)]
pub enum DetailEvent {
    Load(String),
    Loaded {
        token: RequestToken,
        word: String,
        result: Result<WordRecord, LookupError>,
    },
    ExampleChosen(usize),
    DialectChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEffect {
    Fetch { token: RequestToken, word: String },
    RenderPanel(PanelView),
    /// Swap sentence and audio in place, leaving the rest of the panel alone.
    ShowExample(ExampleView),
    RefreshHeading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleView {
    pub index: usize,
    pub sentence: String,
    pub audio: String,
}

impl ExampleView {
    fn new(index: usize, example: &Example) -> Self {
        Self {
            index,
            sentence: example.sentence.clone(),
            audio: example.audio.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooserOption {
    pub index: usize,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelBody {
    NoExamples,
    Examples {
        options: Vec<ChooserOption>,
        current: ExampleView,
    },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub heading: String,
    pub ipa: String,
    pub body: PanelBody,
}

#[derive(Debug)]
enum Panel {
    Loaded {
        record: WordRecord,
        selected: Option<usize>,
    },
    Failed {
        word: String,
    },
}

pub struct WordDetailController<R = SmallRng> {
    rng: R,
    panel: Option<Panel>,
    issued: RequestToken,
    /// Outstanding fetch and the word it was issued for.
    pending: Option<(RequestToken, String)>,
}

impl WordDetailController<SmallRng> {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }
}

impl Default for WordDetailController<SmallRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> WordDetailController<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            panel: None,
            issued: RequestToken::default(),
            pending: None,
        }
    }

    /// Handles one event. `dialect` is the selector's current value; it is
    /// read whenever the panel is rendered and never changed here.
    pub fn handle(&mut self, event: DetailEvent, dialect: &DialectKey) -> Vec<DetailEffect> {
        match event {
            DetailEvent::Load(word) => self.load(word),
            DetailEvent::Loaded {
                token,
                word,
                result,
            } => self.on_loaded(token, word, result, dialect),
            DetailEvent::ExampleChosen(index) => self.on_example_chosen(index),
            DetailEvent::DialectChanged => self.on_dialect_changed(),
        }
    }

    /// Word shown in the panel heading, if a panel has been rendered.
    pub fn displayed_word(&self) -> Option<&str> {
        match self.panel.as_ref()? {
            Panel::Loaded { record, .. } => Some(record.word.as_str()),
            Panel::Failed { word } => Some(word.as_str()),
        }
    }

    pub fn selected_example(&self) -> Option<usize> {
        match self.panel.as_ref()? {
            Panel::Loaded { selected, .. } => *selected,
            Panel::Failed { .. } => None,
        }
    }

    fn pending(&self) -> Option<RequestToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }

    fn load(&mut self, word: String) -> Vec<DetailEffect> {
        if word.trim().is_empty() {
            return Vec::new();
        }
        self.issued = self.issued.next();
        self.pending = Some((self.issued, word.clone()));
        vec![DetailEffect::Fetch {
            token: self.issued,
            word,
        }]
    }

    fn on_loaded(
        &mut self,
        token: RequestToken,
        word: String,
        result: Result<WordRecord, LookupError>,
        dialect: &DialectKey,
    ) -> Vec<DetailEffect> {
        if self.pending() != Some(token) {
            debug!(token = token.get(), %word, "dropping stale word response");
            return Vec::new();
        }
        self.pending = None;
        let view = match result {
            Ok(record) => self.show_record(record, dialect),
            Err(err) => {
                warn!(error = %err, %word, "word lookup failed");
                let view = PanelView {
                    heading: word.clone(),
                    ipa: NO_TRANSCRIPTION.to_string(),
                    body: PanelBody::Unavailable,
                };
                self.panel = Some(Panel::Failed { word });
                view
            }
        };
        vec![DetailEffect::RenderPanel(view), DetailEffect::RefreshHeading]
    }

    fn show_record(&mut self, record: WordRecord, dialect: &DialectKey) -> PanelView {
        let ipa = record
            .transcription(dialect)
            .unwrap_or(NO_TRANSCRIPTION)
            .to_string();
        let selected = if record.examples.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(0..record.examples.len()))
        };
        let body = match selected {
            None => PanelBody::NoExamples,
            Some(pick) => PanelBody::Examples {
                options: record
                    .examples
                    .iter()
                    .enumerate()
                    .map(|(index, example)| ChooserOption {
                        index,
                        label: format!("Example {} ({})", index + 1, example.dialect),
                        selected: index == pick,
                    })
                    .collect(),
                current: ExampleView::new(pick, &record.examples[pick]),
            },
        };
        let view = PanelView {
            heading: record.word.clone(),
            ipa,
            body,
        };
        self.panel = Some(Panel::Loaded { record, selected });
        view
    }

    fn on_example_chosen(&mut self, index: usize) -> Vec<DetailEffect> {
        let Some(Panel::Loaded { record, selected }) = self.panel.as_mut() else {
            return Vec::new();
        };
        let Some(example) = record.examples.get(index) else {
            warn!(index, available = record.examples.len(), "example index out of range");
            return Vec::new();
        };
        *selected = Some(index);
        vec![DetailEffect::ShowExample(ExampleView::new(index, example))]
    }

    /// Reloads the word the panel is heading towards: the one still in
    /// flight if there is one, otherwise the one on screen.
    fn on_dialect_changed(&mut self) -> Vec<DetailEffect> {
        let word = match &self.pending {
            Some((_, word)) => Some(word.clone()),
            None => self.displayed_word().map(str::to_string),
        };
        match word {
            Some(word) => self.load(word),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> WordRecord {
        serde_json::from_value(value).unwrap()
    }

    fn katt() -> WordRecord {
        record(json!({
            "word": "katt",
            "ipa": { "e_written": "kɑtː" },
            "examples": [
                { "sentence": "katten sov", "audio": "a/1.mp3", "dialect": "Oslo" },
                { "sentence": "en katt", "audio": "a/2.mp3", "dialect": "Bergen" },
                { "sentence": "katta mi", "audio": "a/3.mp3", "dialect": "Tromsø" }
            ]
        }))
    }

    fn fetch_token(effects: &[DetailEffect]) -> RequestToken {
        match effects {
            [DetailEffect::Fetch { token, .. }] => *token,
            other => panic!("expected a single fetch, got {other:?}"),
        }
    }

    fn panel(effects: &[DetailEffect]) -> &PanelView {
        match effects {
            [DetailEffect::RenderPanel(view), DetailEffect::RefreshHeading] => view,
            other => panic!("expected a panel render, got {other:?}"),
        }
    }

    fn load<R: Rng>(
        controller: &mut WordDetailController<R>,
        word: &str,
        response: WordRecord,
        dialect: &DialectKey,
    ) -> Vec<DetailEffect> {
        let token = fetch_token(&controller.handle(DetailEvent::Load(word.to_string()), dialect));
        controller.handle(
            DetailEvent::Loaded {
                token,
                word: word.to_string(),
                result: Ok(response),
            },
            dialect,
        )
    }

    #[test]
    fn ipa_follows_selected_dialect() {
        let hus = record(json!({ "word": "hus", "ipa": { "n_written": "hʉːs" }, "examples": [] }));
        let mut controller = WordDetailController::new();

        let effects = load(&mut controller, "hus", hus.clone(), &"n_written".into());
        let view = panel(&effects);
        assert_eq!(view.heading, "hus");
        assert_eq!(view.ipa, "hʉːs");
        assert_eq!(view.body, PanelBody::NoExamples);
        assert_eq!(controller.selected_example(), None);

        let effects = load(&mut controller, "hus", hus, &"sw_spoken".into());
        assert_eq!(panel(&effects).ipa, NO_TRANSCRIPTION);
    }

    #[test]
    fn examples_build_chooser_with_random_pick() {
        let rng = SmallRng::seed_from_u64(11);
        let expected = rng.clone().gen_range(0..3);
        let mut controller = WordDetailController::with_rng(rng);

        let effects = load(&mut controller, "katt", katt(), &DialectKey::default());
        let view = panel(&effects);
        assert_eq!(view.ipa, "kɑtː");
        let PanelBody::Examples { options, current } = &view.body else {
            panic!("expected examples, got {:?}", view.body);
        };
        assert_eq!(options.len(), 3);
        assert_eq!(options.iter().filter(|opt| opt.selected).count(), 1);
        assert_eq!(options[1].label, "Example 2 (Bergen)");
        assert!(options[expected].selected);
        assert_eq!(current.index, expected);
        let example = &katt().examples[expected];
        assert_eq!(current.sentence, example.sentence);
        assert_eq!(current.audio, example.audio);
        assert_eq!(controller.selected_example(), Some(expected));
    }

    #[test]
    fn every_example_can_be_picked() {
        let mut controller = WordDetailController::with_rng(SmallRng::seed_from_u64(3));
        let mut seen = [false; 3];
        for _ in 0..200 {
            load(&mut controller, "katt", katt(), &DialectKey::default());
            let pick = controller.selected_example().unwrap();
            seen[pick] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn choosing_an_example_updates_in_place() {
        let mut controller = WordDetailController::new();
        load(&mut controller, "katt", katt(), &DialectKey::default());

        let effects = controller.handle(DetailEvent::ExampleChosen(2), &DialectKey::default());
        assert_eq!(
            effects,
            vec![DetailEffect::ShowExample(ExampleView {
                index: 2,
                sentence: "katta mi".to_string(),
                audio: "a/3.mp3".to_string(),
            })]
        );
        assert_eq!(controller.selected_example(), Some(2));
        assert!(controller.pending().is_none());
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let mut controller = WordDetailController::new();
        load(&mut controller, "katt", katt(), &DialectKey::default());
        let before = controller.selected_example();
        assert!(controller.handle(DetailEvent::ExampleChosen(3), &DialectKey::default()).is_empty());
        assert_eq!(controller.selected_example(), before);
    }

    #[test]
    fn dialect_change_refetches_and_rerandomizes() {
        let rng = SmallRng::seed_from_u64(42);
        let mut oracle = rng.clone();
        let mut controller = WordDetailController::with_rng(rng);
        let first = oracle.gen_range(0..3);
        let second = oracle.gen_range(0..3);

        load(&mut controller, "katt", katt(), &DialectKey::default());
        assert_eq!(controller.selected_example(), Some(first));
        controller.handle(DetailEvent::ExampleChosen(2), &DialectKey::default());

        let dialect = DialectKey::new("n_spoken");
        let effects = controller.handle(DetailEvent::DialectChanged, &dialect);
        assert!(matches!(
            effects.as_slice(),
            [DetailEffect::Fetch { word, .. }] if word == "katt"
        ));
        let token = fetch_token(&effects);
        let effects = controller.handle(
            DetailEvent::Loaded {
                token,
                word: "katt".to_string(),
                result: Ok(katt()),
            },
            &dialect,
        );
        assert_eq!(panel(&effects).ipa, NO_TRANSCRIPTION);
        assert_eq!(controller.selected_example(), Some(second));
    }

    #[test]
    fn dialect_change_reloads_word_still_in_flight() {
        let mut controller = WordDetailController::new();
        let dialect = DialectKey::default();
        load(&mut controller, "katt", katt(), &dialect);
        let committed =
            fetch_token(&controller.handle(DetailEvent::Load("hund".to_string()), &dialect));

        let dialect = DialectKey::new("n_spoken");
        let effects = controller.handle(DetailEvent::DialectChanged, &dialect);
        assert!(matches!(
            effects.as_slice(),
            [DetailEffect::Fetch { word, .. }] if word == "hund"
        ));
        let reload = fetch_token(&effects);
        assert_ne!(reload, committed);

        let hund = record(json!({ "word": "hund", "ipa": { "n_spoken": "hʉnː" }, "examples": [] }));
        let effects = controller.handle(
            DetailEvent::Loaded {
                token: reload,
                word: "hund".to_string(),
                result: Ok(hund),
            },
            &dialect,
        );
        assert_eq!(panel(&effects).ipa, "hʉnː");
        assert_eq!(controller.displayed_word(), Some("hund"));
    }

    #[test]
    fn dialect_change_without_word_is_noop() {
        let mut controller = WordDetailController::new();
        assert!(controller.handle(DetailEvent::DialectChanged, &DialectKey::default()).is_empty());
    }

    #[test]
    fn failed_load_replaces_previous_word() {
        let mut controller = WordDetailController::new();
        load(&mut controller, "katt", katt(), &DialectKey::default());

        let dialect = DialectKey::default();
        let token = fetch_token(&controller.handle(DetailEvent::Load("hund".to_string()), &dialect));
        let effects = controller.handle(
            DetailEvent::Loaded {
                token,
                word: "hund".to_string(),
                result: Err(LookupError::Status(500)),
            },
            &dialect,
        );
        let view = panel(&effects);
        assert_eq!(view.heading, "hund");
        assert_eq!(view.body, PanelBody::Unavailable);
        assert_eq!(controller.displayed_word(), Some("hund"));
        assert!(matches!(controller.panel, Some(Panel::Failed { .. })));
        assert!(controller.handle(DetailEvent::ExampleChosen(0), &dialect).is_empty());
    }

    #[test]
    fn superseded_load_is_dropped() {
        let mut controller = WordDetailController::new();
        let dialect = DialectKey::default();
        let old = fetch_token(&controller.handle(DetailEvent::Load("katt".to_string()), &dialect));
        let new = fetch_token(&controller.handle(DetailEvent::Load("hus".to_string()), &dialect));

        let late = controller.handle(
            DetailEvent::Loaded {
                token: old,
                word: "katt".to_string(),
                result: Ok(katt()),
            },
            &dialect,
        );
        assert!(late.is_empty());
        assert_eq!(controller.displayed_word(), None);
        assert_eq!(controller.pending(), Some(new));
    }
}
