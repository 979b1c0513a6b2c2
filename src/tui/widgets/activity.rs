//! Activity Widget
//!
//! Shows what the session is doing right now and whether a dataset is loaded.

use crate::models::UploadSummary;
use crate::session::Pending;
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the activity indicator
pub fn render_activity(
    frame: &mut Frame,
    area: Rect,
    pending: Pending,
    dataset: Option<&UploadSummary>,
    tick: u64,
) {
    let block = Block::default()
        .title(" Activity ")
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = Line::from(activity_spans(pending, dataset, tick));
    frame.render_widget(Paragraph::new(line), inner);
}

fn activity_spans(
    pending: Pending,
    dataset: Option<&UploadSummary>,
    tick: u64,
) -> Vec<Span<'static>> {
    let busy_text = match pending {
        Pending::None => None,
        Pending::Uploading => Some("Uploading and processing files..."),
        Pending::Asking => Some("Thinking..."),
        Pending::Resetting => Some("Resetting conversation memory..."),
    };

    match busy_text {
        Some(text) => vec![
            Span::styled(format!("{} ", Icons::spinner(tick)), Theme::active()),
            Span::styled(text, Theme::active()),
            Span::styled("  (Esc to cancel)", Theme::text_dim()),
        ],
        None => match dataset {
            Some(_) => vec![
                Span::styled(format!("{} ", Icons::COMPLETE), Theme::complete()),
                Span::styled("Ready for questions", Theme::text_secondary()),
            ],
            None => vec![
                Span::styled(format!("{} ", Icons::PENDING), Theme::text_dim()),
                Span::styled(
                    "No data loaded. Attach Excel files with /attach or drop them here.",
                    Theme::text_secondary(),
                ),
            ],
        },
    }
}
