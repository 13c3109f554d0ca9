//! Grid pane rendering
//!
//! Each cell takes two terminal columns so the board looks roughly square.
//! Runs of equal cells on a row share one span.

use crate::grid::Grid;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const LIVE: &str = "██";
const DEAD: &str = "··";

/// Top-left cell of the visible window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridScroll {
    pub row: usize,
    pub column: usize,
}

/// One rendered row, columns `first..first + count`
fn row_line(grid: &Grid, y: usize, first: usize, count: usize) -> Line<'static> {
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_alive = None;

    for x in first..(first + count).min(grid.width()) {
        let alive = grid.get(x as i64, y as i64) != 0;
        if run_alive.is_some_and(|previous| previous != alive) {
            spans.push(cell_span(std::mem::take(&mut run), !alive));
        }
        run.push_str(if alive { LIVE } else { DEAD });
        run_alive = Some(alive);
    }
    if let Some(alive) = run_alive {
        spans.push(cell_span(run, alive));
    }
    Line::from(spans)
}

fn cell_span(text: String, alive: bool) -> Span<'static> {
    let color = if alive {
        DEFAULT_THEME.live_cell
    } else {
        DEFAULT_THEME.dead_cell
    };
    Span::styled(text, Style::default().fg(color))
}

/// Render the grid of the snapshot under the cursor
pub fn render_grid_pane(
    frame: &mut Frame,
    area: Rect,
    grid: &Grid,
    step: u64,
    is_focused: bool,
    scroll: &mut GridScroll,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(format!(
            " Grid {}x{} │ step {} │ population {} ",
            grid.width(),
            grid.height(),
            step,
            grid.population()
        ))
        .borders(Borders::ALL)
        .border_style(border_style);

    let visible_rows = area.height.saturating_sub(2).max(1) as usize;
    let visible_columns = (area.width.saturating_sub(2) / 2).max(1) as usize;
    scroll.row = scroll.row.min(grid.height().saturating_sub(visible_rows));
    scroll.column = scroll.column.min(grid.width().saturating_sub(visible_columns));

    let lines: Vec<Line> = (scroll.row..grid.height())
        .take(visible_rows)
        .map(|y| row_line(grid, y, scroll.column, visible_columns))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_line_merges_runs() {
        let mut grid = Grid::new(5, 1);
        grid.set(1, 0, 1);
        grid.set(2, 0, 1);
        let line = row_line(&grid, 0, 0, 5);
        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["··", "████", "····"]);
    }

    #[test]
    fn test_row_line_respects_window() {
        let mut grid = Grid::new(4, 1);
        grid.set(3, 0, 1);
        let line = row_line(&grid, 0, 2, 10);
        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["··", "██"]);
    }
}
