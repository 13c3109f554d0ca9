//! Variables pane rendering: the global bindings captured with a snapshot

use crate::memory::Value;
use crate::ui::theme::DEFAULT_THEME;
use indexmap::IndexMap;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

fn value_style(value: &Value) -> Style {
    match value {
        Value::Number(_) => Style::default().fg(DEFAULT_THEME.number),
        Value::Str(_) => Style::default().fg(DEFAULT_THEME.string),
        Value::Array(_) | Value::Object(_) => Style::default().fg(DEFAULT_THEME.namespace),
    }
}

/// Render `name: type = value` for every variable
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    variables: &IndexMap<String, Value>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if variables.is_empty() {
        let paragraph = Paragraph::new("(no variables)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(variables.len().saturating_sub(visible_height));

    let items: Vec<ListItem> = variables
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(name, value)| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    name.clone(),
                    Style::default()
                        .fg(DEFAULT_THEME.fg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(": {} = ", value.type_name()),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(value.to_string(), value_style(value)),
            ]))
        })
        .collect();

    frame.render_widget(
        List::new(items).block(block.padding(Padding::new(1, 0, 0, 0))),
        area,
    );
}
