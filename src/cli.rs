use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uttale_rs::{
    DialectKey, ExampleView, HttpLookup, Key, LookupConfig, LookupService, NO_EXAMPLES,
    PageEvent, PanelBody, PanelView, SuggestionView, UNAVAILABLE, View, Widget, WidgetConfig,
};

#[derive(Parser, Debug)]
#[command(name = "uttale-rs", about = "Look up Norwegian pronunciations", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the pronunciation service.
    #[arg(long, global = true, default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Abort a request after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Dialect key used to pick the transcription.
    #[arg(long, global = true, default_value = "e_written")]
    dialect: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List suggestions for a partial word.
    Suggest {
        /// Text typed so far.
        query: String,
    },
    /// Show the transcription and a random audio example for a word.
    Show {
        /// Word to look up.
        word: String,
    },
    /// Line-driven session: plain lines are typed text, `:help` lists commands.
    Repl,
    /// List the dialect keys the service is known to use.
    Dialects,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    let lookup = LookupConfig {
        base_url: cli.base_url.clone(),
        timeout: cli.timeout_secs.map(Duration::from_secs),
        ..LookupConfig::default()
    };
    let widget = WidgetConfig {
        dialect: DialectKey::new(cli.dialect.clone()),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match cli.command {
            Command::Suggest { query } => handle_suggest(&lookup, query, cli.json).await,
            Command::Show { word } => handle_show(&lookup, widget, word, cli.json).await,
            Command::Repl => handle_repl(&lookup, widget, cli.json).await,
            Command::Dialects => handle_dialects(cli.json),
        }
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn handle_suggest(
    config: &LookupConfig,
    query: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return Err("Query cannot be empty".into());
    }
    let lookup = HttpLookup::new(config)?;
    let rows = lookup.suggest(&query).await?;
    if as_json {
        let payload = json!({ "query": query, "results": rows });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_suggestion_table(&query, &rows);
    }
    Ok(())
}

async fn handle_show(
    config: &LookupConfig,
    widget_config: WidgetConfig,
    word: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let lookup = Arc::new(HttpLookup::new(config)?);
    let view = TerminalView::new(as_json, lookup.base_url());
    let mut widget = Widget::new(lookup, view, widget_config);
    widget.dispatch(PageEvent::SuggestionClicked(word));
    widget.settle().await;
    // A one-shot lookup has no search box, so the heading is always shown.
    let mut view = widget.into_view();
    view.input_changed = false;
    view.suggestions = None;
    view.heading_visible = true;
    view.flush();
    Ok(())
}

async fn handle_repl(
    config: &LookupConfig,
    widget_config: WidgetConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let lookup = Arc::new(HttpLookup::new(config)?);
    let view = TerminalView::new(as_json, lookup.base_url());
    let mut widget = Widget::new(lookup, view, widget_config);
    println!("Type to search, `:help` for commands, `:quit` to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, widget.suggestions().suggestions()) {
            ReplCommand::Event(event) => {
                widget.dispatch(event);
                widget.settle().await;
                widget.view_mut().flush();
            }
            ReplCommand::Dialects => handle_dialects(as_json)?,
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => eprintln!("{message}"),
        }
    }
    Ok(())
}

fn handle_dialects(as_json: bool) -> Result<(), Box<dyn Error>> {
    let rows: Vec<(String, &'static str)> = DialectKey::known()
        .map(|key| {
            let label = key.label().unwrap_or("");
            (key.to_string(), label)
        })
        .collect();
    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(key, label)| json!({ "key": key, "label": label }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    let width = rows
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(3)
        .max("KEY".len());
    println!("{:<width$}  {}", "KEY", "DIALECT", width = width);
    println!("{:-<width$}  {}", "", "-------", width = width);
    for (key, label) in rows {
        println!("{:<width$}  {}", key, label, width = width);
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Event(PageEvent),
    Dialects,
    Help,
    Quit,
    Invalid(String),
}

fn parse_line(line: &str, suggestions: &[String]) -> ReplCommand {
    let Some(command) = line.trim().strip_prefix(':') else {
        return ReplCommand::Event(PageEvent::Input(line.to_string()));
    };
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();
    match (name, arg) {
        ("down" | "j", None) => ReplCommand::Event(PageEvent::Key(Key::ArrowDown)),
        ("up" | "k", None) => ReplCommand::Event(PageEvent::Key(Key::ArrowUp)),
        ("enter", None) => ReplCommand::Event(PageEvent::Key(Key::Enter)),
        ("esc", None) => ReplCommand::Event(PageEvent::Key(Key::Escape)),
        ("pick", Some(raw)) => match parse_position(raw, suggestions.len()) {
            Ok(idx) => ReplCommand::Event(PageEvent::SuggestionClicked(suggestions[idx].clone())),
            Err(message) => ReplCommand::Invalid(message),
        },
        ("example", Some(raw)) => match raw.parse::<usize>() {
            Ok(position) if position > 0 => {
                ReplCommand::Event(PageEvent::ExampleChosen(position - 1))
            }
            _ => ReplCommand::Invalid(format!("Not an example number: {raw:?}")),
        },
        ("dialect", Some(key)) => ReplCommand::Event(PageEvent::DialectChanged(key.into())),
        ("dialects", None) => ReplCommand::Dialects,
        ("help", None) => ReplCommand::Help,
        ("quit" | "q", None) => ReplCommand::Quit,
        _ => ReplCommand::Invalid(format!("Unknown command {line:?}; try :help")),
    }
}

fn parse_position(raw: &str, len: usize) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(position) if (1..=len).contains(&position) => Ok(position - 1),
        _ if len == 0 => Err("No suggestions to pick from".to_string()),
        _ => Err(format!("Pick a row between 1 and {len}")),
    }
}

fn print_help() {
    println!("Plain text replaces the search box contents.");
    println!("  :down, :up      move the highlight");
    println!("  :enter          commit the highlighted row or the typed text");
    println!("  :esc            dismiss suggestions");
    println!("  :pick N         click suggestion row N");
    println!("  :example N      switch to example N");
    println!("  :dialect KEY    change the dialect selector");
    println!("  :dialects       list known dialect keys");
    println!("  :quit           leave");
}

fn print_suggestion_table(query: &str, rows: &[String]) {
    if rows.is_empty() {
        println!("No suggestions for \"{query}\".");
        return;
    }
    println!("Suggestions for \"{query}\":");
    for (idx, word) in rows.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, word);
    }
}

/// Terminal stand-in for the page. Updates are buffered and printed on
/// `flush`, after heading visibility has been settled.
struct TerminalView {
    as_json: bool,
    /// Origin that relative audio paths are resolved against.
    audio_base: String,
    input: String,
    input_changed: bool,
    suggestions: Option<SuggestionView>,
    suggestions_visible: bool,
    panel: Option<PanelView>,
    panel_changed: bool,
    example: Option<ExampleView>,
    heading_visible: bool,
}

impl TerminalView {
    fn new(as_json: bool, audio_base: &str) -> Self {
        Self {
            as_json,
            audio_base: audio_base.to_string(),
            input: String::new(),
            input_changed: false,
            suggestions: None,
            suggestions_visible: false,
            panel: None,
            panel_changed: false,
            example: None,
            heading_visible: true,
        }
    }

    fn flush(&mut self) {
        if std::mem::take(&mut self.input_changed) && !self.as_json {
            println!("search: {}", self.input);
        }
        if let Some(view) = self.suggestions.take() {
            self.print_suggestions(&view);
        }
        if std::mem::take(&mut self.panel_changed) {
            if let Some(panel) = &self.panel {
                self.print_panel(panel);
            }
        } else if let Some(example) = self.example.take() {
            self.print_example(&example);
        }
    }

    fn print_suggestions(&self, view: &SuggestionView) {
        if self.as_json {
            let payload = json!({
                "visible": self.suggestions_visible,
                "rows": view.rows.iter().map(|row| {
                    json!({ "text": row.text, "highlighted": row.highlighted })
                }).collect::<Vec<_>>(),
            });
            println!("{payload}");
            return;
        }
        if !self.suggestions_visible {
            println!("(no suggestions)");
            return;
        }
        for (idx, row) in view.rows.iter().enumerate() {
            let marker = if row.highlighted { '>' } else { ' ' };
            println!("{marker} {:>2}. {}", idx + 1, row.text);
        }
    }

    fn print_panel(&self, panel: &PanelView) {
        if self.as_json {
            println!(
                "{}",
                panel_to_json(panel, self.heading_visible, &self.audio_base)
            );
            return;
        }
        render_markdown_block(&panel_markdown(
            panel,
            self.heading_visible,
            &self.audio_base,
        ));
    }

    fn print_example(&self, example: &ExampleView) {
        if self.as_json {
            println!("{}", example_to_json(example, &self.audio_base));
            return;
        }
        render_markdown_block(&example_markdown(example, &self.audio_base));
    }
}

impl View for TerminalView {
    fn render_suggestions(&mut self, view: &SuggestionView) {
        self.suggestions = Some(view.clone());
    }

    fn set_input_text(&mut self, text: &str) {
        self.input = text.to_string();
        self.input_changed = true;
    }

    fn set_suggestions_visible(&mut self, visible: bool) {
        self.suggestions_visible = visible;
    }

    fn render_panel(&mut self, panel: &PanelView) {
        self.panel = Some(panel.clone());
        self.panel_changed = true;
        self.example = None;
    }

    fn show_example(&mut self, example: &ExampleView) {
        if let Some(PanelView {
            body: PanelBody::Examples { options, current },
            ..
        }) = self.panel.as_mut()
        {
            for option in options.iter_mut() {
                option.selected = option.index == example.index;
            }
            *current = example.clone();
        }
        self.example = Some(example.clone());
    }

    fn set_heading_visible(&mut self, visible: bool) {
        if self.heading_visible != visible && self.panel.is_some() {
            self.panel_changed = true;
        }
        self.heading_visible = visible;
    }
}

fn panel_markdown(panel: &PanelView, heading_visible: bool, audio_base: &str) -> String {
    let mut text = String::new();
    if heading_visible {
        text.push_str(&format!("## {}\n\n", panel.heading));
    }
    text.push_str(&format!("**IPA:** {}\n\n", panel.ipa));
    match &panel.body {
        PanelBody::NoExamples => text.push_str(NO_EXAMPLES),
        PanelBody::Unavailable => text.push_str(UNAVAILABLE),
        PanelBody::Examples { options, current } => {
            text.push_str("**Choose example:**\n\n");
            for option in options {
                let marker = if option.selected { " *(selected)*" } else { "" };
                text.push_str(&format!("* {}{marker}\n", option.label));
            }
            text.push('\n');
            text.push_str(&example_markdown(current, audio_base));
        }
    }
    text
}

fn example_markdown(example: &ExampleView, audio_base: &str) -> String {
    format!(
        "> {}\n\nAudio: `{}` (example {})",
        example.sentence,
        audio_url(audio_base, &example.audio),
        example.index + 1
    )
}

/// Resolves an audio path from the service against its base URL, the way a
/// page resolves it against its own origin. Absolute URLs pass through.
fn audio_url(base: &str, audio: &str) -> String {
    if audio.contains("://") {
        return audio.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), audio.trim_start_matches('/'))
}

fn panel_to_json(panel: &PanelView, heading_visible: bool, audio_base: &str) -> serde_json::Value {
    let body = match &panel.body {
        PanelBody::NoExamples => json!({ "kind": "no_examples", "message": NO_EXAMPLES }),
        PanelBody::Unavailable => json!({ "kind": "unavailable", "message": UNAVAILABLE }),
        PanelBody::Examples { options, current } => json!({
            "kind": "examples",
            "options": options.iter().map(|option| {
                json!({ "index": option.index, "label": option.label, "selected": option.selected })
            }).collect::<Vec<_>>(),
            "current": example_to_json(current, audio_base),
        }),
    };
    json!({
        "heading": panel.heading,
        "heading_visible": heading_visible,
        "ipa": panel.ipa,
        "body": body,
    })
}

fn example_to_json(example: &ExampleView, audio_base: &str) -> serde_json::Value {
    json!({
        "index": example.index,
        "sentence": example.sentence,
        "audio": audio_url(audio_base, &example.audio),
    })
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}\n");
    }
}
