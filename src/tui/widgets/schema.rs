//! Schema Widget
//!
//! Modal listing the tables the service currently holds.

use crate::models::DatasetSchema;
use crate::tui::theme::{Icons, Theme};
use crate::tui::ui::centered_rect;
use ratatui::{
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render the schema modal
pub fn render_schema(frame: &mut Frame, schema: Option<&DatasetSchema>, loading: bool) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = match schema {
        Some(schema) => schema_lines(schema),
        None if loading => vec![Line::from(Span::styled(
            "Loading schema...",
            Theme::text_dim(),
        ))],
        None => vec![Line::from(Span::styled(
            "No schema available",
            Theme::text_dim(),
        ))],
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to close",
        Theme::text_dim(),
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Dataset Schema ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

fn schema_lines(schema: &DatasetSchema) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} table(s), {} row(s)",
            schema.total_tables, schema.total_rows
        ),
        Theme::heading(),
    ))];

    if schema.tables.is_empty() {
        lines.push(Line::from(Span::styled(
            "No tables loaded yet",
            Theme::text_secondary(),
        )));
        return lines;
    }

    for (name, table) in &schema.tables {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(name.clone(), Theme::title()),
            Span::styled(format!("  ({} rows)", table.row_count), Theme::text_dim()),
        ]));
        for (i, column) in table.columns.iter().enumerate() {
            let ty = table.types.get(i).map(String::as_str).unwrap_or("?");
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", Icons::DOT), Theme::text_dim()),
                Span::styled(column.clone(), Theme::text()),
                Span::styled(format!("  {}", ty), Theme::text_secondary()),
            ]));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSchema;
    use std::collections::BTreeMap;

    #[test]
    fn test_schema_lines_list_columns_with_types() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "sales_2024_sales".to_string(),
            TableSchema {
                columns: vec!["region".into(), "revenue".into()],
                types: vec!["VARCHAR".into()],
                row_count: 142,
            },
        );
        let schema = DatasetSchema {
            tables,
            total_tables: 1,
            total_rows: 142,
        };

        let text: Vec<String> = schema_lines(&schema)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert_eq!(text[0], "1 table(s), 142 row(s)");
        assert!(text.iter().any(|l| l.contains("region  VARCHAR")));
        // Missing type falls back to a placeholder
        assert!(text.iter().any(|l| l.contains("revenue  ?")));
    }
}
