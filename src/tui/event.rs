//! Event Handling
//!
//! Handles keyboard, paste and timer events for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// Actions that can be performed in the application
#[derive(Debug, Clone)]
pub enum AppAction {
    /// Quit the application (with confirmation if needed)
    Quit,
    /// Force quit without confirmation
    ForceQuit,
    /// Submit current input (Enter key)
    Submit,
    /// Upload the selected files
    Upload,
    /// Reset the server-side conversation memory
    ResetMemory,
    /// Toggle help view
    ToggleHelp,
    /// Escape - close modals, cancel the running request
    Escape,
    /// Scroll up one line
    ScrollUp,
    /// Scroll down one line
    ScrollDown,
    /// Scroll up one page
    ScrollPageUp,
    /// Scroll down one page
    ScrollPageDown,
    /// Tab: cycle example questions
    NextExample,
    /// Bracketed paste; dropped files arrive this way
    Paste(String),
    /// Regular input character
    Input(KeyEvent),
    /// Timer tick for animations
    Tick,
}

/// Event handler for the TUI
pub struct EventHandler {
    rx: mpsc::Receiver<AppAction>,
    _tx: mpsc::Sender<AppAction>,
}

impl EventHandler {
    /// Create a new event handler with specified tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let tx_clone = tx.clone();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let tick = tick_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = tick => {
                        if tx_clone.send(AppAction::Tick).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(evt)) = crossterm_event => {
                        if let Some(action) = Self::map_event(evt) {
                            if tx_clone.send(action).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Try to get the next action without blocking
    pub fn try_next(&mut self) -> Option<AppAction> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next action
    pub async fn next(&mut self) -> Option<AppAction> {
        self.rx.recv().await
    }

    /// Map a crossterm event to an app action
    pub fn map_event(event: Event) -> Option<AppAction> {
        match event {
            // Windows reports both press and release
            Event::Key(key) if key.kind == KeyEventKind::Press => Self::map_key_event(key),
            Event::Paste(text) => Some(AppAction::Paste(text)),
            _ => None,
        }
    }

    /// Map a key event to an app action
    fn map_key_event(key: KeyEvent) -> Option<AppAction> {
        match (key.modifiers, key.code) {
            // Quit shortcuts
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(AppAction::ForceQuit),
            (KeyModifiers::CONTROL, KeyCode::Char('q')) => Some(AppAction::Quit),

            // Session shortcuts
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => Some(AppAction::Upload),
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(AppAction::ResetMemory),
            (KeyModifiers::CONTROL, KeyCode::Char('h')) => Some(AppAction::ToggleHelp),

            (KeyModifiers::NONE, code) | (KeyModifiers::SHIFT, code) => match code {
                KeyCode::Esc => Some(AppAction::Escape),
                KeyCode::Enter => Some(AppAction::Submit),
                KeyCode::F(1) => Some(AppAction::ToggleHelp),

                // Scrolling
                KeyCode::Up => Some(AppAction::ScrollUp),
                KeyCode::Down => Some(AppAction::ScrollDown),
                KeyCode::PageUp | KeyCode::Home => Some(AppAction::ScrollPageUp),
                KeyCode::PageDown | KeyCode::End => Some(AppAction::ScrollPageDown),

                KeyCode::Tab => Some(AppAction::NextExample),

                _ => Some(AppAction::Input(key)),
            },

            // Pass through other key combinations as input
            _ => Some(AppAction::Input(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(modifiers: KeyModifiers, code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_shortcuts() {
        assert!(matches!(
            EventHandler::map_event(key(KeyModifiers::CONTROL, KeyCode::Char('u'))),
            Some(AppAction::Upload)
        ));
        assert!(matches!(
            EventHandler::map_event(key(KeyModifiers::CONTROL, KeyCode::Char('r'))),
            Some(AppAction::ResetMemory)
        ));
        assert!(matches!(
            EventHandler::map_event(key(KeyModifiers::NONE, KeyCode::Enter)),
            Some(AppAction::Submit)
        ));
        assert!(matches!(
            EventHandler::map_event(key(KeyModifiers::SHIFT, KeyCode::Char('A'))),
            Some(AppAction::Input(_))
        ));
    }

    #[test]
    fn test_paste_is_forwarded() {
        match EventHandler::map_event(Event::Paste("/tmp/sales.xlsx".into())) {
            Some(AppAction::Paste(text)) => assert_eq!(text, "/tmp/sales.xlsx"),
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
