//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::session::{Message, MessageKind, Pending};
use crate::tui::app::{App, View, EXAMPLE_QUESTIONS};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::rc::Rc;

const INDENT: &str = "  ";
const SQL_INDENT: &str = "    ";

fn main_layout(area: Rect, app: &App) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                                // Header
            Constraint::Length(3),                                                // Activity
            Constraint::Length(widgets::selection_height(app.session.selection())), // Selection
            Constraint::Min(6),                                                   // Transcript
            Constraint::Length(4),                                                // Input
            Constraint::Length(1),                                                // Status bar
        ])
        .split(area)
}

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = main_layout(frame.area(), app);
    let state = app.session.state();

    render_header(frame, chunks[0], app);
    widgets::render_activity(
        frame,
        chunks[1],
        state.pending(),
        state.last_upload_summary(),
        app.tick,
    );
    if !app.session.selection().is_empty() {
        widgets::render_selection(
            frame,
            chunks[2],
            app.session.selection(),
            app.config.upload.max_file_size_bytes(),
        );
    }
    render_transcript(frame, chunks[3], app);
    render_input(frame, chunks[4], app);
    render_status_bar(frame, chunks[5], app);

    // Render modal overlays
    match app.view {
        View::Help => render_help(frame),
        View::Schema => widgets::render_schema(frame, app.schema.as_ref(), app.schema_loading),
        View::Chat => {}
    }
}

/// Area inside the transcript borders for a terminal of size `area`
pub fn transcript_viewport(area: Rect, app: &App) -> Rect {
    let chunks = main_layout(area, app);
    Block::default().borders(Borders::ALL).inner(chunks[3])
}

/// Render the header with the dataset indicator
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let dataset = match app.session.state().last_upload_summary() {
        Some(summary) => Span::styled(
            format!(
                "{} {} tables loaded ({} rows)",
                Icons::COMPLETE,
                summary.table_count(),
                summary.row_count
            ),
            Theme::success(),
        ),
        None => Span::styled(format!("{} No data loaded", Icons::PENDING), Theme::text_dim()),
    };

    let title_text = vec![Line::from(vec![
        Span::raw(format!("{} ", Icons::FOLDER)),
        Span::styled("AskMyDoc", Theme::title()),
        Span::styled(" Spreadsheet Q&A", Theme::text_secondary()),
        Span::raw("  "),
        dataset,
        Span::styled(format!("  {}", app.config.service.base_url), Theme::text_dim()),
    ])];

    let title = Paragraph::new(title_text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .style(Style::default()),
        );

    frame.render_widget(title, area);
}

/// Render the conversation transcript
fn render_transcript(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Conversation ")
        .borders(Borders::ALL)
        .border_style(if app.view == View::Chat {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let lines = build_transcript(app, inner_area.width);
    let paragraph = Paragraph::new(lines).scroll((app.scroll_offset, 0));

    frame.render_widget(paragraph, inner_area);
}

/// All transcript lines, already wrapped to `width`
pub fn build_transcript(app: &App, width: u16) -> Vec<Line<'static>> {
    let state = app.session.state();
    let available_width = width.saturating_sub(2) as usize;

    if state.messages().is_empty() && state.pending().is_idle() {
        return welcome_lines(state.has_dataset());
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in state.messages() {
        message_lines(msg, available_width, &mut lines);
        lines.push(Line::from("")); // Spacing
    }

    if state.pending() == Pending::Asking {
        lines.push(Line::from(vec![
            Span::styled("AI: ", Theme::assistant_message()),
            Span::styled(Icons::spinner(app.tick), Theme::active()),
            Span::styled(" Thinking...", Theme::text_dim()),
        ]));
    }

    lines
}

fn message_lines(msg: &Message, available_width: usize, lines: &mut Vec<Line<'static>>) {
    let (prefix, label_style, body_style) = match msg.kind {
        MessageKind::User => ("You", Theme::user_message(), Theme::text()),
        MessageKind::Ai => ("AI", Theme::assistant_message(), Theme::text()),
        MessageKind::System => ("System", Theme::system_message(), Theme::text_secondary()),
        MessageKind::Error => ("Error", Theme::error_message(), Theme::error()),
    };

    let mut header = vec![
        Span::styled(format!("{}: ", prefix), label_style),
        Span::styled(
            msg.timestamp.with_timezone(&chrono::Local).format("%H:%M").to_string(),
            Theme::text_dim(),
        ),
    ];
    if let Some(model) = &msg.model_name {
        header.push(Span::raw(" "));
        header.push(Span::styled(format!(" Model: {} ", model), Theme::badge_primary()));
    }
    lines.push(Line::from(header));

    push_wrapped(&msg.content, INDENT, available_width, body_style, lines);

    if msg.has_provenance() {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("SQL Queries Used:", Theme::heading()),
        ]));
        for (i, sql) in msg.sql_queries.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(format!("{}.", i + 1), Theme::text_dim()),
            ]));
            push_wrapped(sql, SQL_INDENT, available_width, Theme::code(), lines);
        }
    }
}

fn welcome_lines(has_dataset: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled("Welcome to AskMyDoc", Theme::heading())),
        Line::from(""),
    ];

    if has_dataset {
        lines.push(Line::from(Span::styled(
            "Your data is loaded. Ask anything about it below.",
            Theme::text_secondary(),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "1. Attach Excel files: /attach sales.xlsx costs.xls (or drop them on the terminal)",
            Theme::text_secondary(),
        )));
        lines.push(Line::from(Span::styled(
            "2. Upload them with Ctrl+U or /upload",
            Theme::text_secondary(),
        )));
        lines.push(Line::from(Span::styled(
            "3. Ask questions in plain language",
            Theme::text_secondary(),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Example questions ", Theme::heading()),
        Span::styled("(Tab to use one)", Theme::text_dim()),
    ]));
    for example in EXAMPLE_QUESTIONS {
        lines.push(Line::from(vec![
            Span::styled(format!("{}{} ", INDENT, Icons::DOT), Theme::text_dim()),
            Span::styled(example, Theme::text()),
        ]));
    }

    lines
}

/// Wrap `text` to the viewport, preferring breaks at whitespace or punctuation
fn push_wrapped(
    text: &str,
    indent: &'static str,
    available_width: usize,
    style: Style,
    lines: &mut Vec<Line<'static>>,
) {
    let max_line_width = available_width.saturating_sub(indent.len()).max(1);

    for line in text.lines() {
        if line.is_empty() {
            lines.push(Line::from(indent));
            continue;
        }
        for chunk in wrap_line(line, max_line_width) {
            lines.push(Line::from(vec![Span::raw(indent), Span::styled(chunk, style)]));
        }
    }
}

fn wrap_line(line: &str, max_width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = line;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_width {
            chunks.push(remaining.to_string());
            break;
        }

        // Find a good breaking point (space, comma, etc.)
        let mut break_byte = None;
        let mut hard_break = remaining.len();
        for (seen, (idx, ch)) in remaining.char_indices().enumerate() {
            if seen >= max_width {
                hard_break = idx;
                break;
            }
            if idx > 0 && ch.is_whitespace() {
                break_byte = Some(idx);
            } else if ch == ',' || ch == '.' || ch == ';' {
                // Punctuation stays at the end of the line it closes
                break_byte = Some(idx + ch.len_utf8());
            }
        }

        let (chunk, rest) = remaining.split_at(break_byte.unwrap_or(hard_break));
        chunks.push(chunk.to_string());
        remaining = rest.trim_start();
    }

    chunks
}

/// Render the input area
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.view == View::Chat;
    let title = if app.session.state().pending().is_idle() {
        " Question "
    } else {
        " Question (waiting for the current request) "
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Theme::border_focused()
        } else {
            Theme::border()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    frame.render_widget(&app.input, inner);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let status = match (&app.notice, app.session.state().pending()) {
        (Some(notice), _) if notice.is_error => Span::styled(notice.text.clone(), Theme::error()),
        (Some(notice), _) => Span::styled(notice.text.clone(), Theme::text_secondary()),
        (None, Pending::None) => Span::styled("Ready", Theme::text_secondary()),
        (None, busy) => Span::styled(format!("{} in progress", busy.label()), Theme::active()),
    };

    let shortcuts = vec![
        Span::styled(" [Enter]", Theme::shortcut_key()),
        Span::styled(" Send ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+U]", Theme::shortcut_key()),
        Span::styled(" Upload ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+R]", Theme::shortcut_key()),
        Span::styled(" Reset ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+Q]", Theme::shortcut_key()),
        Span::styled(" Quit ", Theme::shortcut_desc()),
        Span::styled("[F1]", Theme::shortcut_key()),
        Span::styled(" Help", Theme::shortcut_desc()),
    ];

    let line = Line::from(
        std::iter::once(status)
            .chain(std::iter::once(Span::raw(" │ ")))
            .chain(shortcuts)
            .collect::<Vec<_>>(),
    );

    frame.render_widget(Paragraph::new(line), area);
}

fn help_entry(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<18}", key), Theme::shortcut_key()),
        Span::styled(desc, Theme::text()),
    ])
}

/// Render the help modal
fn render_help(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
        help_entry("Enter", "Send question / run command"),
        help_entry("Ctrl+U", "Upload selected files"),
        help_entry("Ctrl+R", "Reset conversation memory"),
        help_entry("Esc", "Close modal / Cancel request"),
        help_entry("Tab", "Use an example question"),
        help_entry("↑/↓", "Scroll conversation"),
        help_entry("PageUp/Down", "Scroll page"),
        help_entry("Ctrl+Q", "Quit application"),
        help_entry("Ctrl+C", "Force quit"),
        help_entry("F1 / Ctrl+H", "Show this help"),
        Line::from(""),
        Line::from(Span::styled("Commands", Theme::heading())),
        Line::from(""),
        help_entry("/attach <files>", "Select files to upload (replaces selection)"),
        help_entry("/remove <n|all>", "Drop a selected file"),
        help_entry("/upload", "Upload selected files"),
        help_entry("/reset", "Reset conversation memory"),
        help_entry("/schema", "Show loaded tables"),
        help_entry("/new", "Start a new session"),
        help_entry("/quit", "Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Dropping files on the terminal selects them too.",
            Theme::text_secondary(),
        )),
        Line::from(Span::styled("Press any key to close", Theme::text_dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;

    fn flatten(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_wrap_line_prefers_word_breaks() {
        assert_eq!(
            wrap_line("total revenue per country", 10),
            vec!["total", "revenue", "per", "country"]
        );
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_line("short", 80), vec!["short"]);
    }

    #[test]
    fn test_wrap_line_keeps_punctuation_on_its_line() {
        assert_eq!(
            wrap_line("revenue,country,margin", 10),
            vec!["revenue,", "country,", "margin"]
        );
        assert_eq!(wrap_line("per region; total", 12), vec!["per region;", "total"]);
    }

    #[test]
    fn test_sql_section_only_with_provenance() {
        let mut lines = Vec::new();
        message_lines(
            &Message::ai(Answer {
                text: "42".into(),
                sql_queries: vec![],
                model_name: "gpt-x".into(),
            }),
            80,
            &mut lines,
        );
        let text = flatten(&lines);
        assert!(text[0].contains("Model: gpt-x"));
        assert!(!text.iter().any(|l| l.contains("SQL Queries Used")));

        let mut lines = Vec::new();
        message_lines(
            &Message::ai(Answer {
                text: "42".into(),
                sql_queries: vec!["SELECT 1".into(), "SELECT 2".into()],
                model_name: String::new(),
            }),
            80,
            &mut lines,
        );
        let text = flatten(&lines);
        assert!(!text[0].contains("Model:"));
        let sql_at = text.iter().position(|l| l.contains("SQL Queries Used")).unwrap();
        let first = text.iter().position(|l| l.contains("SELECT 1")).unwrap();
        let second = text.iter().position(|l| l.contains("SELECT 2")).unwrap();
        assert!(sql_at < first && first < second);
    }

    #[test]
    fn test_error_messages_use_error_label() {
        let mut lines = Vec::new();
        message_lines(&Message::error("Error: boom"), 80, &mut lines);
        assert!(flatten(&lines)[0].starts_with("Error: "));
        assert_eq!(lines[0].spans[0].style, Theme::error_message());
    }

    #[test]
    fn test_welcome_lists_examples() {
        let text = flatten(&welcome_lines(false));
        for example in EXAMPLE_QUESTIONS {
            assert!(text.iter().any(|l| l.contains(example)));
        }
        assert!(text.iter().any(|l| l.contains("/attach")));
    }
}
