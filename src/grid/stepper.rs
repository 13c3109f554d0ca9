//! Reference CPU stepper
//!
//! Computes one generation into a fresh buffer; the input is never mutated.
//! The per-row kernel [`step_row`] is shared with the parallel stepper so
//! both paths are bit-identical by construction.

use super::rules::{EdgePolicy, RuleConfig, RuleMasks};
use super::Grid;

/// Compute the next generation of `grid` under `config`.
pub fn step(grid: &Grid, config: &RuleConfig) -> Grid {
    let cells = step_cells(grid.cells(), grid.width(), grid.height(), config);
    Grid::from_cells(grid.width(), grid.height(), cells)
        .unwrap_or_else(|| Grid::new(grid.width(), grid.height()))
}

/// Compute the next generation of a raw row-major buffer.
pub fn step_cells(cells: &[u8], width: usize, height: usize, config: &RuleConfig) -> Vec<u8> {
    let mut next = vec![0u8; width * height];
    if width == 0 {
        return next;
    }
    for (y, row) in next.chunks_mut(width).enumerate() {
        step_row(cells, width, height, y, config, row);
    }
    next
}

/// Fill `out` (one row, `width` cells) with generation `n + 1` of row `y`.
pub(crate) fn step_row(
    cells: &[u8],
    width: usize,
    height: usize,
    y: usize,
    config: &RuleConfig,
    out: &mut [u8],
) {
    for (x, slot) in out.iter_mut().enumerate() {
        let neighbors = live_neighbors(cells, width, height, x, y, config);
        *slot = next_state(cells[y * width + x], neighbors, &config.masks);
    }
}

/// B/S transition for one cell. Any non-zero value counts as alive.
pub fn next_state(current: u8, neighbors: u32, masks: &RuleMasks) -> u8 {
    let alive = current != 0;
    let lives = if alive {
        masks.survives_on(neighbors)
    } else {
        masks.births_on(neighbors)
    };
    u8::from(lives)
}

fn live_neighbors(
    cells: &[u8],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    config: &RuleConfig,
) -> u32 {
    let (w, h) = (width as i64, height as i64);
    config
        .neighborhood
        .offsets()
        .iter()
        .filter_map(|&(dx, dy)| {
            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
            match config.edges {
                EdgePolicy::Wrap => Some((nx.rem_euclid(w), ny.rem_euclid(h))),
                EdgePolicy::Clip => {
                    (nx >= 0 && nx < w && ny >= 0 && ny < h).then_some((nx, ny))
                }
            }
        })
        .map(|(nx, ny)| u32::from(cells[(ny * w + nx) as usize] != 0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::rules::{Neighborhood, RuleMasks};

    fn grid_with(width: usize, height: usize, live: &[(i64, i64)]) -> Grid {
        let mut grid = Grid::new(width, height);
        for &(x, y) in live {
            grid.set(x, y, 1);
        }
        grid
    }

    #[test]
    fn test_blinker_oscillates() {
        let config = RuleConfig::default();
        let horizontal = grid_with(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let vertical = step(&horizontal, &config);
        assert_eq!(vertical, grid_with(5, 5, &[(2, 1), (2, 2), (2, 3)]));
        assert_eq!(step(&vertical, &config), horizontal);
    }

    #[test]
    fn test_block_is_still_life() {
        let config = RuleConfig::default();
        let block = grid_with(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(step(&block, &config), block);
    }

    #[test]
    fn test_clip_versus_wrap_at_border() {
        // A vertical blinker on the left edge
        let grid = grid_with(5, 5, &[(0, 1), (0, 2), (0, 3)]);

        let clip = step(&grid, &RuleConfig::default());
        assert_eq!(clip.live_cells().collect::<Vec<_>>(), vec![(0, 2), (1, 2)]);

        let wrap = RuleConfig {
            edges: EdgePolicy::Wrap,
            ..RuleConfig::default()
        };
        let wrapped = step(&grid, &wrap);
        assert_eq!(
            wrapped.live_cells().collect::<Vec<_>>(),
            vec![(0, 2), (1, 2), (4, 2)]
        );
    }

    #[test]
    fn test_von_neumann_counts_four_neighbours() {
        let config = RuleConfig {
            masks: RuleMasks::parse("B4/S").expect("valid"),
            neighborhood: Neighborhood::VonNeumann,
            edges: EdgePolicy::Clip,
        };
        let plus = grid_with(3, 3, &[(1, 0), (0, 1), (2, 1), (1, 2)]);
        let next = step(&plus, &config);
        assert_eq!(next.live_cells().collect::<Vec<_>>(), vec![(1, 1)]);
    }

    #[test]
    fn test_empty_grid_steps_to_empty() {
        let grid = Grid::new(0, 0);
        assert_eq!(step(&grid, &RuleConfig::default()), grid);
    }

    #[test]
    fn test_any_non_zero_cell_is_alive() {
        // A 2 in the centre of a vertical blinker
        let grid = Grid::from_cells(3, 3, vec![0, 1, 0, 0, 2, 0, 0, 1, 0]).expect("3x3");
        let next = step(&grid, &RuleConfig::default());
        assert_eq!(next.cells(), &[0, 0, 0, 1, 1, 1, 0, 0, 0]);
        assert_eq!(next_state(2, 2, &RuleMasks::conway()), 1);
        assert_eq!(next_state(4, 1, &RuleMasks::conway()), 0);
    }
}
