//! Source code pane rendering with syntax highlighting
//!
//! Displays the MPL program with basic highlighting and a gutter that marks
//! lines carrying diagnostics.
//!
//! # Features
//!
//! - Highlighting for MPL keywords, namespaces, strings, numbers and comments
//! - `E`/`W`/`i` gutter markers for error, warning and info diagnostics
//! - Error lines drawn on a red background
//! - Scrolling with the offset clamped to the file length

use crate::compile::{Diagnostic, Severity};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const NAMESPACES: [&str; 5] = ["grid", "math", "string", "array", "io"];

/// Simple syntax highlighting for MPL
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (byte, c) = chars[i];

        if c == '/' && chars.get(i + 1).is_some_and(|&(_, next)| next == '/') {
            flush_word(&mut spans, &mut current_word, false);
            spans.push(Span::styled(
                line[byte..].to_string(),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            break;
        }

        if c == '"' {
            flush_word(&mut spans, &mut current_word, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != '"' {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let end_byte = chars.get(end).map_or(line.len(), |&(b, _)| b);
            spans.push(Span::styled(
                line[byte..end_byte].to_string(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word, c == '(');
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    flush_word(&mut spans, &mut current_word, false);
    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'_>>, word: &mut String, is_call: bool) {
    if !word.is_empty() {
        let style = get_keyword_style(word, is_call);
        spans.push(Span::styled(std::mem::take(word), style));
    }
}

fn get_keyword_style(word: &str, is_call: bool) -> Style {
    match word {
        "var" | "rule" | "function" | "return" | "if" | "else" | "while" | "for" | "of"
        | "in" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "PI" | "E" | "TAU" | "GRID_WIDTH" | "GRID_HEIGHT" => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if NAMESPACES.contains(&word) => Style::default().fg(DEFAULT_THEME.namespace),
        _ if word.chars().all(|c| c.is_ascii_digit()) => Style::default().fg(DEFAULT_THEME.number),
        _ if is_call => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// The most severe diagnostic on `line`, if any
fn worst_severity(diagnostics: &[Diagnostic], line: usize) -> Option<Severity> {
    diagnostics
        .iter()
        .filter(|d| d.line == line)
        .map(|d| d.severity)
        .min_by_key(|severity| match severity {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        })
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    diagnostics: &[Diagnostic],
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
        .title(" Source Code ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source_code.lines().collect();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(lines.len().saturating_sub(visible_height));

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let severity = worst_severity(diagnostics, line_num);
            let (marker, marker_color) = match severity {
                Some(Severity::Error) => ("E", DEFAULT_THEME.error),
                Some(Severity::Warning) => ("W", DEFAULT_THEME.warning),
                Some(Severity::Info) => ("i", DEFAULT_THEME.primary),
                None => (" ", DEFAULT_THEME.comment),
            };

            let mut content_line = highlight_source_code(line);
            if severity == Some(Severity::Error) {
                let error_style = Style::default()
                    .bg(DEFAULT_THEME.error)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD);
                for span in &mut content_line.spans {
                    span.style = error_style;
                }
            }

            let mut final_spans = vec![
                Span::styled(
                    marker,
                    Style::default().fg(marker_color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:4} ", line_num),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
            ];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;

    fn texts(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_splits_words_and_comments() {
        let line = highlight_source_code("var x = grid.get(1, 2); // note");
        let parts = texts(&line);
        assert_eq!(parts.first().map(String::as_str), Some("var"));
        assert!(parts.contains(&"grid".to_string()));
        assert_eq!(parts.last().map(String::as_str), Some("// note"));
        assert_eq!(parts.concat(), "var x = grid.get(1, 2); // note");
    }

    #[test]
    fn test_highlight_keeps_unicode_strings_intact() {
        let line = highlight_source_code("print(\"héllo\");");
        assert!(texts(&line).contains(&"\"héllo\"".to_string()));
    }

    #[test]
    fn test_worst_severity_prefers_errors() {
        let diagnostics = vec![
            Diagnostic::info("i", SourceLocation::new(2, 1)),
            Diagnostic::syntax("e", SourceLocation::new(2, 4)),
            Diagnostic::warning("w", SourceLocation::new(3, 1)),
        ];
        assert_eq!(worst_severity(&diagnostics, 2), Some(Severity::Error));
        assert_eq!(worst_severity(&diagnostics, 3), Some(Severity::Warning));
        assert_eq!(worst_severity(&diagnostics, 1), None);
    }
}
