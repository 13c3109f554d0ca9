//! Cellular-automaton grid
//!
//! - [`Grid`]: row-major cell buffer with bounds-safe access
//! - [`rules`]: birth/survive masks, neighbourhoods, edge policies, presets
//! - [`stepper`]: the reference CPU generation step
//! - [`parallel`]: data-parallel stepper with CPU fallback
//!
//! Reads outside the grid return 0 and writes outside it are ignored, so
//! scripts can address neighbours freely without bounds checks.

pub mod parallel;
pub mod rules;
pub mod stepper;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use parallel::{ComputeBackend, ParallelStepper, RayonBackend};
pub use rules::{EdgePolicy, Neighborhood, RuleConfig, RuleMasks};

/// A `width × height` grid of cells, row-major, 0 = dead and non-zero = alive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Wrap an existing buffer; `None` when its length is not `width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Option<Self> {
        (cells.len() == width * height).then_some(Grid {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<u8> {
        self.cells
    }

    /// Buffer index of `(x, y)`, or `None` outside the grid.
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Cell value, 0 outside the grid.
    pub fn get(&self, x: i64, y: i64) -> u8 {
        self.index(x, y).map_or(0, |i| self.cells[i])
    }

    /// Write a cell; returns false (and does nothing) outside the grid.
    pub fn set(&mut self, x: i64, y: i64, value: u8) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// Flip a cell between 0 and 1; returns false outside the grid.
    pub fn toggle(&mut self, x: i64, y: i64) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = if self.cells[i] == 0 { 1 } else { 0 };
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Number of live cells
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Coordinates of every live cell, row by row.
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(move |(i, _)| (i % width, i / width))
    }

    /// Read-only export view of the grid at `step`.
    pub fn view(&self, step: u64) -> GridView<'_> {
        GridView { grid: self, step }
    }
}

/// Extent of an exported grid; `z` is always 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Position of a cell in an exported grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Per-cell inspection record returned by [`GridView::state_at`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub value: u8,
    pub position: CellPosition,
    pub step: u64,
    pub timestamp: i64,
}

/// Read-only snapshot view consumed by visualisers
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    grid: &'a Grid,
    step: u64,
}

impl GridView<'_> {
    pub fn size(&self) -> GridSize {
        GridSize {
            x: self.grid.width,
            y: self.grid.height,
            z: 1,
        }
    }

    /// One byte per cell: 255 alive, 0 dead.
    pub fn channel(&self) -> Vec<u8> {
        self.grid
            .cells
            .iter()
            .map(|&c| if c != 0 { 255 } else { 0 })
            .collect()
    }

    /// Inspect a single cell; `None` outside the grid or for `z != 0`.
    pub fn state_at(&self, x: usize, y: usize, z: usize) -> Option<CellState> {
        if z != 0 || x >= self.grid.width || y >= self.grid.height {
            return None;
        }
        Some(CellState {
            value: self.grid.cells[y * self.grid.width + x],
            position: CellPosition { x, y, z },
            step: self.step,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_access_is_safe() {
        let mut grid = Grid::new(3, 2);
        assert_eq!(grid.get(-1, 0), 0);
        assert_eq!(grid.get(3, 0), 0);
        assert!(!grid.set(0, 2, 1));
        assert!(!grid.toggle(-5, -5));
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn test_set_toggle_clear() {
        let mut grid = Grid::new(4, 4);
        assert!(grid.set(1, 2, 1));
        assert_eq!(grid.get(1, 2), 1);
        grid.toggle(1, 2);
        assert_eq!(grid.get(1, 2), 0);
        grid.toggle(3, 3);
        assert_eq!(grid.live_cells().collect::<Vec<_>>(), vec![(3, 3)]);
        grid.clear();
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn test_view_channel_and_state_at() {
        let mut grid = Grid::new(2, 2);
        grid.set(1, 0, 1);
        let view = grid.view(7);
        assert_eq!(view.size(), GridSize { x: 2, y: 2, z: 1 });
        assert_eq!(view.channel(), vec![0, 255, 0, 0]);

        let state = view.state_at(1, 0, 0).expect("in bounds");
        assert_eq!(state.value, 1);
        assert_eq!(state.step, 7);
        assert!(view.state_at(2, 0, 0).is_none());
        assert!(view.state_at(0, 0, 1).is_none());
    }

    #[test]
    fn test_non_zero_values_are_alive_everywhere() {
        let grid = Grid::from_cells(3, 1, vec![2, 0, 1]).expect("3x1");
        assert_eq!(grid.population(), 2);
        assert_eq!(grid.live_cells().collect::<Vec<_>>(), vec![(0, 0), (2, 0)]);
        assert_eq!(grid.view(0).channel(), vec![255, 0, 255]);
    }
}
