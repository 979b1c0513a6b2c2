//! Application State
//!
//! Contains the main application state and logic for the TUI. All session
//! semantics live in [`SessionController`]; this layer only translates user
//! actions into controller calls and runs their network tasks.

use crate::client::RemoteService;
use crate::config::Config;
use crate::models::DatasetSchema;
use crate::session::{OperationTask, Completion, SessionController};
use crate::tui::event::AppAction;
use crate::types::{AppError, AppResult};
use ratatui::layout::Rect;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tui_textarea::TextArea;

const INPUT_PLACEHOLDER: &str = "Ask a question about your documents... (/help for commands)";

pub const EXAMPLE_QUESTIONS: [&str; 5] = [
    "Compute the total revenue per country across all files",
    "Which product has the highest average margin?",
    "Compare sales between Q1 and Q2",
    "List the top 5 customers by total spend",
    "Highlight any missing values or inconsistencies",
];

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Chat,
    Help,
    Schema,
}

/// Results of background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// A session operation finished
    Completed(Completion),
    /// Schema request finished
    SchemaLoaded(AppResult<DatasetSchema>),
}

/// One-line feedback shown in the status bar, never in the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Main application state
pub struct App {
    pub config: Config,

    // UI State
    pub view: View,
    pub should_quit: bool,
    /// Set by a first Ctrl+Q while a request is in flight
    quit_armed: bool,
    pub notice: Option<Notice>,
    pub tick: u64,

    // Session
    pub session: SessionController,
    service: Arc<dyn RemoteService>,

    // Chat State
    pub input: TextArea<'static>,
    pub scroll_offset: u16,
    pub max_scroll: u16,
    follow_tail: bool,
    example_index: usize,

    // Schema modal
    pub schema: Option<DatasetSchema>,
    pub schema_loading: bool,

    // Async communication
    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config, service: Arc<dyn RemoteService>) -> Self {
        let (tx, rx) = mpsc::channel(100);

        Self {
            config,
            view: View::Chat,
            should_quit: false,
            quit_armed: false,
            notice: None,
            tick: 0,
            session: SessionController::new(Arc::clone(&service)),
            service,
            input: Self::empty_input(),
            scroll_offset: 0,
            max_scroll: 0,
            follow_tail: true,
            example_index: 0,
            schema: None,
            schema_loading: false,
            event_rx: rx,
            event_tx: tx,
        }
    }

    fn empty_input() -> TextArea<'static> {
        let mut input = TextArea::default();
        input.set_cursor_line_style(ratatui::style::Style::default());
        input.set_placeholder_text(INPUT_PLACEHOLDER);
        input
    }

    /// Quit straight away when idle. With a request in flight the first
    /// Ctrl+Q only warns; a second one quits and cancels the request.
    pub fn confirm_quit(&mut self) -> bool {
        let pending = self.session.state().pending();
        if pending.is_idle() || self.quit_armed {
            return true;
        }
        self.quit_armed = true;
        self.notice = Some(Notice::error(format!(
            "{} in progress. Press Ctrl+Q again to quit and cancel it.",
            capitalize(pending.label())
        )));
        false
    }

    /// Poll for async events
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Handle an async event
    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Completed(completion) => {
                if self.session.finish(completion) {
                    self.scroll_to_bottom();
                }
            }
            AppEvent::SchemaLoaded(result) => {
                self.schema_loading = false;
                match result {
                    Ok(schema) => self.schema = Some(schema),
                    Err(e) => {
                        warn!("Schema request failed: {}", e);
                        self.notice = Some(Notice::error(format!("Could not load schema: {}", e)));
                        if self.view == View::Schema {
                            self.view = View::Chat;
                        }
                    }
                }
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        if !matches!(action, AppAction::Quit | AppAction::Tick) {
            self.quit_armed = false;
        }

        match action {
            AppAction::Quit => {
                if self.confirm_quit() {
                    self.should_quit = true;
                }
            }
            AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Submit => {
                if self.view != View::Chat {
                    self.view = View::Chat;
                } else {
                    self.submit_input().await;
                }
            }
            AppAction::Upload => self.start_upload(),
            AppAction::ResetMemory => self.start_reset(),
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Chat
                } else {
                    View::Help
                };
            }
            AppAction::Escape => {
                if self.view != View::Chat {
                    self.view = View::Chat;
                } else if self.session.cancel() {
                    self.notice = Some(Notice::info("Cancelling..."));
                }
            }
            AppAction::ScrollUp => {
                self.follow_tail = false;
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            AppAction::ScrollDown => {
                if self.scroll_offset < self.max_scroll {
                    self.scroll_offset += 1;
                }
                self.follow_tail = self.scroll_offset >= self.max_scroll;
            }
            AppAction::ScrollPageUp => {
                self.follow_tail = false;
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            AppAction::ScrollPageDown => {
                self.scroll_offset = (self.scroll_offset + 10).min(self.max_scroll);
                self.follow_tail = self.scroll_offset >= self.max_scroll;
            }
            AppAction::NextExample => {
                if self.view == View::Chat && self.session.state().messages().is_empty() {
                    let example = EXAMPLE_QUESTIONS[self.example_index % EXAMPLE_QUESTIONS.len()];
                    self.example_index += 1;
                    self.input = Self::empty_input();
                    self.input.insert_str(example);
                }
            }
            AppAction::Paste(text) => {
                if self.view == View::Chat {
                    self.handle_paste(text).await;
                }
            }
            AppAction::Input(key_event) => {
                if self.view == View::Chat {
                    self.input.input(key_event);
                } else {
                    // Any key closes a modal
                    self.view = View::Chat;
                }
            }
            AppAction::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
        }
    }

    /// Submit the current input: a slash command or a question
    async fn submit_input(&mut self) {
        let content = self.input.lines().join("\n");
        let content = content.trim().to_string();

        if content.is_empty() {
            return;
        }

        if content.starts_with('/') {
            self.input = Self::empty_input();
            self.run_command(&content).await;
            return;
        }

        match self.session.begin_ask(&content) {
            Ok(task) => {
                self.input = Self::empty_input();
                self.notice = None;
                self.spawn_operation(task);
            }
            // Warning already appended to the transcript
            Err(AppError::Precondition(_)) => {
                self.input = Self::empty_input();
            }
            Err(AppError::Validation(_)) => {}
            Err(e) => {
                // Keep the text so it can be sent once the session is idle
                self.notice = Some(Notice::error(e.to_string()));
            }
        }
        self.scroll_to_bottom();
    }

    async fn run_command(&mut self, line: &str) {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        debug!("Command {} {}", command, rest);

        match command {
            "/attach" | "/a" => {
                match split_paths(rest) {
                    Ok(paths) if !paths.is_empty() => self.attach(&paths).await,
                    Ok(_) => {
                        self.notice =
                            Some(Notice::error("Usage: /attach <file.xlsx> [more files...]"));
                    }
                    Err(e) => self.notice = Some(Notice::error(e.to_string())),
                }
            }
            "/remove" | "/rm" => self.remove_from_selection(rest),
            "/upload" | "/u" => self.start_upload(),
            "/reset" => self.start_reset(),
            "/schema" => self.open_schema(),
            "/new" => self.new_session(),
            "/help" | "/?" => self.view = View::Help,
            "/quit" | "/q" => self.should_quit = true,
            other => {
                self.notice = Some(Notice::error(format!(
                    "Unknown command {} (try /help)",
                    other
                )));
            }
        }
    }

    /// Replace the pending selection with the files at `paths`
    pub async fn attach<P: AsRef<Path>>(&mut self, paths: &[P]) {
        match self.session.select_files(paths).await {
            Ok(count) => {
                let limit = self.config.upload.max_file_size_bytes();
                let advisories = self.session.selection().advisories(limit);
                self.notice = Some(if advisories.is_empty() {
                    Notice::info(format!(
                        "{} file(s) selected. Press Ctrl+U or /upload to send.",
                        count
                    ))
                } else {
                    Notice::error(format!(
                        "{} file(s) selected, {} with warnings; the service may reject them.",
                        count,
                        advisories.len()
                    ))
                });
            }
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
    }

    fn remove_from_selection(&mut self, arg: &str) {
        let result = if arg.eq_ignore_ascii_case("all") {
            self.session
                .clear_selection()
                .map(|_| "Selection cleared".to_string())
        } else {
            match arg.parse::<usize>() {
                Ok(n) if n >= 1 => self
                    .session
                    .remove_file(n - 1)
                    .map(|name| format!("Removed {}", name)),
                _ => Err(AppError::Validation(
                    "Usage: /remove <number|all>".to_string(),
                )),
            }
        };

        self.notice = Some(match result {
            Ok(text) => Notice::info(text),
            Err(e) => Notice::error(e.to_string()),
        });
    }

    /// Dropped files are pasted as paths. Anything else is plain text input.
    async fn handle_paste(&mut self, text: String) {
        let paths = split_paths(&text).unwrap_or_default();
        let all_files = !paths.is_empty() && paths.iter().all(|p| p.is_file());

        if all_files {
            info!("Treating paste as dropped files ({} path(s))", paths.len());
            self.attach(&paths).await;
        } else {
            self.input.insert_str(text);
        }
    }

    fn start_upload(&mut self) {
        match self.session.begin_upload() {
            Ok(task) => {
                self.notice = None;
                self.spawn_operation(task);
                self.scroll_to_bottom();
            }
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
    }

    fn start_reset(&mut self) {
        match self.session.begin_reset() {
            Ok(task) => {
                self.notice = None;
                self.spawn_operation(task);
            }
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
    }

    fn open_schema(&mut self) {
        self.view = View::Schema;
        if self.schema_loading {
            return;
        }
        self.schema_loading = true;

        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = service.schema().await;
            tx.send(AppEvent::SchemaLoaded(result)).await.ok();
        });
    }

    /// Discard the whole session, transcript included
    fn new_session(&mut self) {
        info!("Starting a new session");
        self.session = SessionController::new(Arc::clone(&self.service));
        self.schema = None;
        self.scroll_offset = 0;
        self.max_scroll = 0;
        self.follow_tail = true;
        self.notice = Some(Notice::info("New session started"));
    }

    /// Run the network half of an operation in the background. If the
    /// session is gone by the time it completes, the completion is ignored.
    fn spawn_operation(&self, task: OperationTask) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let completion = task.await;
            tx.send(AppEvent::Completed(completion)).await.ok();
        });
    }

    /// Scroll to bottom of messages
    fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.scroll_offset = self.max_scroll;
    }

    /// Recompute scroll limits for the current terminal size
    pub fn calculate_scroll_bounds(&mut self, area: Rect) {
        let viewport = crate::tui::ui::transcript_viewport(area, self);
        let content_height = crate::tui::ui::build_transcript(self, viewport.width).len();
        let content_height = u16::try_from(content_height).unwrap_or(u16::MAX);
        self.update_scroll_bounds(content_height, viewport.height);
    }

    /// Update max scroll based on content
    pub fn update_scroll_bounds(&mut self, content_height: u16, viewport_height: u16) {
        self.max_scroll = content_height.saturating_sub(viewport_height);
        if self.follow_tail || self.scroll_offset > self.max_scroll {
            self.scroll_offset = self.max_scroll;
        }
    }
}

/// Split pasted or typed text into paths, the way terminals quote dropped
/// files. Unix uses shell quoting; on Windows backslashes are separators,
/// so only double quotes group.
pub fn split_paths(text: &str) -> AppResult<Vec<PathBuf>> {
    let words = if cfg!(windows) {
        split_windows_words(text)?
    } else {
        shell_words::split(text)
            .map_err(|e| AppError::Validation(format!("Could not parse paths: {}", e)))?
    };

    Ok(words
        .into_iter()
        .map(|word| match word.strip_prefix("file://") {
            Some(stripped) => PathBuf::from(stripped),
            None => PathBuf::from(word),
        })
        .collect())
}

fn split_windows_words(text: &str) -> AppResult<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.trim().chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(AppError::Validation(
            "Could not parse paths: missing closing quote".to_string(),
        ));
    }
    if !current.is_empty() {
        words.push(current);
    }

    Ok(words)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
