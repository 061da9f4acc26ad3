//! Event loop glue between the page, the two controllers and the lookup
//! service.
//!
//! The widget is single-threaded: page events and fetch completions are
//! applied one at a time, in arrival order. Fetches run as detached tokio
//! tasks that report back over a channel, so every method that can issue a
//! fetch must be called from within a tokio runtime.

use crate::detail::{DetailEffect, DetailEvent, ExampleView, PanelView, WordDetailController};
use crate::heading::heading_visible;
use crate::lookup::{LookupError, LookupService, RequestToken};
use crate::model::{DialectKey, WordRecord};
use crate::suggest::{SuggestionController, SuggestionEffect, SuggestionEvent, SuggestionView};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Rendering surface supplied by the page.
pub trait View {
    fn render_suggestions(&mut self, view: &SuggestionView);
    fn set_input_text(&mut self, text: &str);
    /// Page-level layout flag mirroring whether any suggestion row is shown.
    fn set_suggestions_visible(&mut self, visible: bool);
    fn render_panel(&mut self, panel: &PanelView);
    fn show_example(&mut self, example: &ExampleView);
    fn set_heading_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Input(String),
    Key(Key),
    SuggestionClicked(String),
    ExampleChosen(usize),
    DialectChanged(DialectKey),
}

#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    pub dialect: DialectKey,
}

enum Completion {
    Suggestions {
        token: RequestToken,
        result: Result<Vec<String>, LookupError>,
    },
    Word {
        token: RequestToken,
        word: String,
        result: Result<WordRecord, LookupError>,
    },
}

pub struct Widget<S, V, R = SmallRng> {
    service: Arc<S>,
    view: V,
    dialect: DialectKey,
    suggestions: SuggestionController,
    detail: WordDetailController<R>,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<S: LookupService, V: View> Widget<S, V, SmallRng> {
    pub fn new(service: Arc<S>, view: V, config: WidgetConfig) -> Self {
        Self::with_rng(service, view, config, SmallRng::from_entropy())
    }
}

impl<S: LookupService, V: View, R: Rng> Widget<S, V, R> {
    pub fn with_rng(service: Arc<S>, view: V, config: WidgetConfig, rng: R) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            service,
            view,
            dialect: config.dialect,
            suggestions: SuggestionController::new(),
            detail: WordDetailController::with_rng(rng),
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn dialect(&self) -> &DialectKey {
        &self.dialect
    }

    pub fn suggestions(&self) -> &SuggestionController {
        &self.suggestions
    }

    pub fn detail(&self) -> &WordDetailController<R> {
        &self.detail
    }

    /// Number of fetches whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, event: PageEvent) {
        debug!(?event, "page event");
        match event {
            PageEvent::Input(text) => self.suggest(SuggestionEvent::InputChanged(text)),
            PageEvent::Key(Key::ArrowDown) => self.suggest(SuggestionEvent::ArrowDown),
            PageEvent::Key(Key::ArrowUp) => self.suggest(SuggestionEvent::ArrowUp),
            PageEvent::Key(Key::Enter) => self.suggest(SuggestionEvent::Enter),
            PageEvent::Key(Key::Escape) => self.suggest(SuggestionEvent::Escape),
            PageEvent::SuggestionClicked(text) => self.suggest(SuggestionEvent::Clicked(text)),
            PageEvent::ExampleChosen(index) => self.describe(DetailEvent::ExampleChosen(index)),
            PageEvent::DialectChanged(dialect) => {
                self.dialect = dialect;
                self.describe(DetailEvent::DialectChanged);
            }
        }
    }

    /// Waits for the next fetch to finish and applies it. Returns `false`
    /// when nothing is outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completions_rx.recv().await {
            Some(done) => {
                self.complete(done);
                true
            }
            None => false,
        }
    }

    /// Applies completions until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    /// Drives the widget from a stream of page events. Once the stream ends
    /// the remaining fetches are awaited and the view is handed back.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> V {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(done) = self.completions_rx.recv() => self.complete(done),
            }
        }
        self.settle().await;
        self.view
    }

    fn complete(&mut self, done: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match done {
            Completion::Suggestions { token, result } => {
                self.suggest(SuggestionEvent::Loaded { token, result })
            }
            Completion::Word {
                token,
                word,
                result,
            } => self.describe(DetailEvent::Loaded {
                token,
                word,
                result,
            }),
        }
    }

    fn suggest(&mut self, event: SuggestionEvent) {
        for effect in self.suggestions.handle(event) {
            match effect {
                SuggestionEffect::Fetch { token, query } => self.fetch_suggestions(token, query),
                SuggestionEffect::Render(view) => {
                    self.view.render_suggestions(&view);
                    self.view.set_suggestions_visible(view.is_visible());
                }
                SuggestionEffect::SetInputText(text) => self.view.set_input_text(&text),
                SuggestionEffect::Commit(word) => {
                    info!(%word, "word committed");
                    self.describe(DetailEvent::Load(word));
                }
                SuggestionEffect::RefreshHeading => self.refresh_heading(),
            }
        }
    }

    fn describe(&mut self, event: DetailEvent) {
        for effect in self.detail.handle(event, &self.dialect) {
            match effect {
                DetailEffect::Fetch { token, word } => self.fetch_word(token, word),
                DetailEffect::RenderPanel(panel) => self.view.render_panel(&panel),
                DetailEffect::ShowExample(example) => self.view.show_example(&example),
                DetailEffect::RefreshHeading => self.refresh_heading(),
            }
        }
    }

    fn refresh_heading(&mut self) {
        if let Some(word) = self.detail.displayed_word() {
            let visible = heading_visible(self.suggestions.input(), word);
            self.view.set_heading_visible(visible);
        }
    }

    fn fetch_suggestions(&mut self, token: RequestToken, query: String) {
        let service = Arc::clone(&self.service);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = service.suggest(&query).await;
            let _ = tx.send(Completion::Suggestions { token, result });
        });
    }

    fn fetch_word(&mut self, token: RequestToken, word: String) {
        let service = Arc::clone(&self.service);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = service.word(&word).await;
            let _ = tx.send(Completion::Word {
                token,
                word,
                result,
            });
        });
    }
}
