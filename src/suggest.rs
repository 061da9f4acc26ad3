//! Suggestion list state: typed query, fetched candidates and keyboard
//! highlight. The controller never performs IO; every handler returns the
//! effects the surrounding widget has to carry out.

use crate::lookup::{LookupError, RequestToken};
use tracing::{debug, warn};

/// Page events the suggestion box reacts to.
#[derive(Debug)]
pub enum SuggestionEvent {
    InputChanged(String),
    Loaded {
        token: RequestToken,
        result: Result<Vec<String>, LookupError>,
    },
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Clicked(String),
}

/// Work requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionEffect {
    Fetch { token: RequestToken, query: String },
    Render(SuggestionView),
    SetInputText(String),
    Commit(String),
    RefreshHeading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRow {
    pub text: String,
    pub highlighted: bool,
}

/// Snapshot of the rendered list. An empty view means no suggestions are
/// visible, which the page mirrors in its `suggestions_visible` flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionView {
    pub rows: Vec<SuggestionRow>,
}

impl SuggestionView {
    pub fn is_visible(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.highlighted)
            .map(|row| row.text.as_str())
    }
}

#[derive(Debug, Default)]
pub struct SuggestionController {
    input: String,
    suggestions: Vec<String>,
    highlight: Option<usize>,
    issued: RequestToken,
    pending: Option<RequestToken>,
}

impl SuggestionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: SuggestionEvent) -> Vec<SuggestionEffect> {
        match event {
            SuggestionEvent::InputChanged(text) => self.on_input_changed(text),
            SuggestionEvent::Loaded { token, result } => self.on_loaded(token, result),
            SuggestionEvent::ArrowDown => self.on_arrow_down(),
            SuggestionEvent::ArrowUp => self.on_arrow_up(),
            SuggestionEvent::Enter => self.on_enter(),
            SuggestionEvent::Escape => self.on_escape(),
            SuggestionEvent::Clicked(text) => self.on_clicked(text),
        }
    }

    /// Current contents of the search box, untrimmed.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn view(&self) -> SuggestionView {
        SuggestionView {
            rows: self
                .suggestions
                .iter()
                .enumerate()
                .map(|(idx, text)| SuggestionRow {
                    text: text.clone(),
                    highlighted: self.highlight == Some(idx),
                })
                .collect(),
        }
    }

    fn on_input_changed(&mut self, text: String) -> Vec<SuggestionEffect> {
        let query = text.trim().to_string();
        self.input = text;
        if query.is_empty() {
            self.pending = None;
            self.suggestions.clear();
            self.highlight = None;
            return vec![
                SuggestionEffect::Render(SuggestionView::default()),
                SuggestionEffect::RefreshHeading,
            ];
        }
        self.issued = self.issued.next();
        self.pending = Some(self.issued);
        vec![
            SuggestionEffect::Fetch {
                token: self.issued,
                query,
            },
            SuggestionEffect::RefreshHeading,
        ]
    }

    fn on_loaded(
        &mut self,
        token: RequestToken,
        result: Result<Vec<String>, LookupError>,
    ) -> Vec<SuggestionEffect> {
        if self.pending != Some(token) {
            debug!(token = token.get(), "dropping stale suggestion response");
            return Vec::new();
        }
        self.pending = None;
        self.suggestions = match result {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "suggestion lookup failed");
                Vec::new()
            }
        };
        self.highlight = None;
        self.render()
    }

    fn on_arrow_down(&mut self) -> Vec<SuggestionEffect> {
        let len = self.suggestions.len();
        if len == 0 {
            return Vec::new();
        }
        self.highlight = Some(match self.highlight {
            Some(idx) => (idx + 1) % len,
            None => 0,
        });
        self.render()
    }

    fn on_arrow_up(&mut self) -> Vec<SuggestionEffect> {
        let len = self.suggestions.len();
        if len == 0 {
            return Vec::new();
        }
        let from = self.highlight.unwrap_or(0);
        self.highlight = Some((from + len - 1) % len);
        self.render()
    }

    fn on_enter(&mut self) -> Vec<SuggestionEffect> {
        let word = self
            .highlight
            .and_then(|idx| self.suggestions.get(idx).cloned())
            .unwrap_or_else(|| self.input.trim().to_string());
        if word.is_empty() {
            return Vec::new();
        }
        let mut effects = self.dismiss();
        effects.push(SuggestionEffect::Commit(word));
        effects
    }

    fn on_clicked(&mut self, text: String) -> Vec<SuggestionEffect> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.input = text.clone();
        let mut effects = vec![SuggestionEffect::SetInputText(text.clone())];
        effects.extend(self.dismiss());
        effects.push(SuggestionEffect::Commit(text));
        effects
    }

    fn on_escape(&mut self) -> Vec<SuggestionEffect> {
        self.dismiss()
    }

    /// Ends the navigation session: list, highlight and any awaited fetch.
    fn dismiss(&mut self) -> Vec<SuggestionEffect> {
        self.pending = None;
        self.suggestions.clear();
        self.highlight = None;
        vec![SuggestionEffect::Render(SuggestionView::default())]
    }

    fn render(&mut self) -> Vec<SuggestionEffect> {
        let view = self.view();
        let synced = view.highlighted().map(str::to_string);
        let mut effects = vec![SuggestionEffect::Render(view)];
        if let Some(text) = synced {
            self.input = text.clone();
            effects.push(SuggestionEffect::SetInputText(text));
        }
        effects
    }
}
