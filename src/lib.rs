//! Client-side state for a pronunciation lookup widget.
//!
//! A [`SuggestionController`] turns keystrokes into a navigable list of
//! suggestions and a committed word; a [`WordDetailController`] fetches the
//! committed word and renders its transcription for the selected dialect
//! together with a randomly chosen audio example. [`Widget`] wires both to a
//! [`LookupService`] and a [`View`].

pub mod detail;
pub mod heading;
pub mod lookup;
pub mod model;
pub mod suggest;
pub mod widget;

pub use detail::{
    ChooserOption, DetailEffect, DetailEvent, ExampleView, NO_EXAMPLES, NO_TRANSCRIPTION,
    PanelBody, PanelView, UNAVAILABLE, WordDetailController,
};
pub use heading::heading_visible;
pub use lookup::{HttpLookup, LookupConfig, LookupError, LookupService, RequestToken};
pub use model::{DialectKey, Example, KNOWN_DIALECTS, WordRecord};
pub use suggest::{
    SuggestionController, SuggestionEffect, SuggestionEvent, SuggestionRow, SuggestionView,
};
pub use widget::{Key, PageEvent, View, Widget, WidgetConfig};
