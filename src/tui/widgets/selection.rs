//! Selection Widget
//!
//! Lists files waiting to be uploaded, numbered for `/remove`, with any
//! advisories next to them.

use crate::session::{Advisory, PendingSelection};
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Files listed one per row before the rest collapse into a summary line
const MAX_FILE_ROWS: usize = 6;

/// Rows the panel needs, borders included
pub fn selection_height(selection: &PendingSelection) -> u16 {
    if selection.is_empty() {
        return 0;
    }
    let rows = selection.len().min(MAX_FILE_ROWS + 1);
    u16::try_from(rows).unwrap_or(u16::MAX).saturating_add(2)
}

/// Render the pending selection
pub fn render_selection(frame: &mut Frame, area: Rect, selection: &PendingSelection, max_size: u64) {
    let title = format!(
        " Selected files ({}, {}) ",
        selection.len(),
        format_size(selection.total_size())
    );
    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(vec![
            Span::styled(" [Ctrl+U]", Theme::shortcut_key()),
            Span::styled(" Upload ", Theme::shortcut_desc()),
        ]))
        .borders(Borders::ALL)
        .border_style(Theme::border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = selection_lines(selection, max_size);
    frame.render_widget(Paragraph::new(lines), inner);
}

fn selection_lines(selection: &PendingSelection, max_size: u64) -> Vec<Line<'static>> {
    let advisories = selection.advisories(max_size);
    let files = selection.files();
    // A summary line takes the same row as one more file would
    let listed = if files.len() <= MAX_FILE_ROWS + 1 {
        files.len()
    } else {
        MAX_FILE_ROWS
    };

    let mut lines: Vec<Line<'static>> = files[..listed]
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let mut spans = vec![
                Span::styled(format!("{:>2}. ", i + 1), Theme::text_dim()),
                Span::styled(file.name.clone(), Theme::text()),
                Span::styled(format!("  {}", format_size(file.size())), Theme::text_dim()),
            ];
            if let Some((_, notes)) = advisories.iter().find(|(idx, _)| *idx == i) {
                spans.push(Span::styled(
                    format!("  {} {}", Icons::WARNING, join_advisories(notes)),
                    Theme::warning(),
                ));
            }
            Line::from(spans)
        })
        .collect();

    if listed < files.len() {
        let rest = files[listed..]
            .iter()
            .enumerate()
            .map(|(i, file)| {
                let flag = if advisories.iter().any(|(idx, _)| *idx == listed + i) {
                    format!(" {}", Icons::WARNING)
                } else {
                    String::new()
                };
                format!("{}. {}{}", listed + i + 1, file.name, flag)
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(Line::from(vec![
            Span::styled(format!(" +{} more: ", files.len() - listed), Theme::text_secondary()),
            Span::styled(rest, Theme::text_dim()),
        ]));
    }

    lines
}

fn join_advisories(notes: &[Advisory]) -> String {
    notes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= MB {
        format!("{:.1} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{} B", bytes)
    }
}
