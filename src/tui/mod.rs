//! Terminal User Interface Module
//!
//! Interactive front end for a spreadsheet Q&A session.
//! Built with Ratatui for high-performance terminal rendering.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  📁 AskMyDoc Spreadsheet Q&A      ✓ 2 tables loaded (300 rows)  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─ Activity ──────────────────────────────────────────────┐   │
//! │  │ ⠋ Thinking...  (Esc to cancel)                          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─ Selected files (1, 12.0 KB) ───────────────────────────┐   │
//! │  │  1. q3.xlsx  12.0 KB                                    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─ Conversation ──────────────────────────────────────────┐   │
//! │  │  [Scrollable transcript with SQL provenance]             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─ Question ──────────────────────────────────────────────┐   │
//! │  │ Ask a question about your documents...                   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  [Enter] Send | [Ctrl+U] Upload | [Ctrl+R] Reset | [F1] Help   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, AppEvent, View};
pub use event::{AppAction, EventHandler};

use crate::client::RemoteService;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    // Dropped files arrive as a bracketed paste of their paths
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application. `files` are selected up front, as if attached.
pub async fn run(
    config: crate::config::Config,
    service: Arc<dyn RemoteService>,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    info!("Starting TUI mode against {}", config.service.base_url);

    // Create application state
    let mut app = App::new(config, service);
    if !files.is_empty() {
        app.attach(&files).await;
    }

    // Initialize terminal
    let mut terminal = init_terminal()?;

    // Create event handler
    let mut events = EventHandler::new(std::time::Duration::from_millis(100));

    // Main loop
    let result = run_app(&mut terminal, &mut app, &mut events).await;

    // Restore terminal
    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    loop {
        // Update scroll bounds before drawing
        let size = terminal.size()?;
        app.calculate_scroll_bounds(Rect::new(0, 0, size.width, size.height));

        // Draw UI
        terminal.draw(|frame| ui::render(frame, app))?;

        // Apply finished operations
        app.poll_events();

        // Handle user input; ticks keep this from blocking for long
        let Some(action) = events.next().await else {
            break;
        };
        match action {
            AppAction::ForceQuit => break,
            _ => app.handle_action(action).await,
        }

        // Drain whatever queued up while we were busy
        while let Some(action) = events.try_next() {
            match action {
                AppAction::ForceQuit => return Ok(()),
                AppAction::Tick => {}
                _ => app.handle_action(action).await,
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited normally");
    Ok(())
}
