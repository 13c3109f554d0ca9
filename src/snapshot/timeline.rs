//! Delta-compressed snapshot timeline
//!
//! The first snapshot added becomes the *base*. Every frame, including the
//! first, is stored as a [`SnapshotSlim`]: the cells and variables that differ
//! from the base, plus the frame's own performance figures. Reconstructing
//! frame `i` applies its delta to a copy of the base, so lookups cost one
//! delta regardless of timeline length.
//!
//! With [`Compression::Rle`] cell changes are merged into runs of
//! horizontally adjacent cells on one row that take the same new value.
//! Reconstruction is exact with and without compression.

use super::{PerformanceMetrics, Snapshot};
use crate::grid::Grid;
use crate::memory::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default cap on the estimated timeline size (64 MiB)
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("timeline memory limit exceeded: {current} + {incoming} > {limit} bytes")]
    MemoryLimit {
        current: usize,
        incoming: usize,
        limit: usize,
    },
    #[error("snapshot grid is {actual:?}, timeline base is {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("timeline JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write timeline: {0}")]
    Io(#[from] std::io::Error),
}

/// How grid deltas are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Rle,
}

/// One cell that differs from the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub x: usize,
    pub y: usize,
    pub old: u8,
    pub new: u8,
}

/// `len` cells starting at `(x, y)` and extending right, all set to `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRun {
    pub x: usize,
    pub y: usize,
    pub len: usize,
    pub value: u8,
}

/// Grid part of a frame delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "compression", content = "changes", rename_all = "lowercase")]
pub enum GridDelta {
    None(Vec<CellChange>),
    Rle(Vec<CellRun>),
}

impl GridDelta {
    /// Number of stored entries (cells or runs)
    pub fn len(&self) -> usize {
        match self {
            GridDelta::None(changes) => changes.len(),
            GridDelta::Rle(runs) => runs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn compression(&self) -> Compression {
        match self {
            GridDelta::None(_) => Compression::None,
            GridDelta::Rle(_) => Compression::Rle,
        }
    }

    /// Convert raw changes to runs; already-encoded deltas are returned as is.
    pub fn to_rle(&self) -> GridDelta {
        match self {
            GridDelta::Rle(_) => self.clone(),
            GridDelta::None(changes) => GridDelta::Rle(encode_runs(changes)),
        }
    }

    /// Write the delta's new values into `cells` (row-major, `width` wide).
    fn apply(&self, cells: &mut [u8], width: usize) {
        let mut put = |x: usize, y: usize, value: u8| {
            if x < width {
                if let Some(cell) = cells.get_mut(y * width + x) {
                    *cell = value;
                }
            }
        };
        match self {
            GridDelta::None(changes) => {
                for change in changes {
                    put(change.x, change.y, change.new);
                }
            }
            GridDelta::Rle(runs) => {
                for run in runs {
                    for dx in 0..run.len {
                        put(run.x + dx, run.y, run.value);
                    }
                }
            }
        }
    }
}

/// Merge row-major changes into horizontal runs of equal new value.
fn encode_runs(changes: &[CellChange]) -> Vec<CellRun> {
    let mut runs: Vec<CellRun> = Vec::new();
    for change in changes {
        match runs.last_mut() {
            Some(run)
                if run.y == change.y
                    && run.value == change.new
                    && run.x + run.len == change.x =>
            {
                run.len += 1;
            }
            _ => runs.push(CellRun {
                x: change.x,
                y: change.y,
                len: 1,
                value: change.new,
            }),
        }
    }
    runs
}

/// Variable value before and after
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old: Value,
    pub new: Value,
}

/// Variable part of a frame delta
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariablesDelta {
    pub added: IndexMap<String, Value>,
    pub modified: IndexMap<String, ValueChange>,
    pub deleted: Vec<String>,
}

impl VariablesDelta {
    fn between(current: &IndexMap<String, Value>, base: &IndexMap<String, Value>) -> Self {
        let mut delta = VariablesDelta::default();
        for (name, value) in current {
            match base.get(name) {
                None => {
                    delta.added.insert(name.clone(), value.clone());
                }
                Some(old) if old != value => {
                    delta.modified.insert(
                        name.clone(),
                        ValueChange {
                            old: old.clone(),
                            new: value.clone(),
                        },
                    );
                }
                Some(_) => {}
            }
        }
        delta.deleted = base
            .keys()
            .filter(|name| !current.contains_key(*name))
            .cloned()
            .collect();
        delta
    }

    fn apply(&self, variables: &mut IndexMap<String, Value>) {
        for (name, value) in &self.added {
            variables.insert(name.clone(), value.clone());
        }
        for (name, change) in &self.modified {
            variables.insert(name.clone(), change.new.clone());
        }
        for name in &self.deleted {
            variables.shift_remove(name);
        }
    }
}

/// A frame stored as a delta against the timeline base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSlim {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub step: u64,
    pub grid_delta: GridDelta,
    pub variables_delta: VariablesDelta,
    pub performance: PerformanceMetrics,
}

impl SnapshotSlim {
    /// Estimated size in bytes
    pub fn estimated_size(&self) -> usize {
        self.id.len() * 2
            + 8
            + 4
            + self.grid_delta.len() * 16
            + self.variables_delta.added.len() * 32
            + self.variables_delta.modified.len() * 64
            + self.variables_delta.deleted.len() * 16
            + 24
    }
}

/// Base snapshot plus per-frame deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDelta {
    base: Option<Snapshot>,
    frames: Vec<SnapshotSlim>,
    compression: Compression,
    memory_limit: usize,
}

impl Default for TimelineDelta {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl TimelineDelta {
    pub fn new(compression: Compression) -> Self {
        Self::with_memory_limit(compression, DEFAULT_MEMORY_LIMIT)
    }

    pub fn with_memory_limit(compression: Compression, memory_limit: usize) -> Self {
        TimelineDelta {
            base: None,
            frames: Vec::new(),
            compression,
            memory_limit,
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Append a frame. The first frame becomes the base and is stored as a
    /// full delta (every live cell as a change from 0, every variable as
    /// added); later frames store their difference from the base.
    pub fn add_snapshot(&mut self, snapshot: Snapshot) -> Result<(), TimelineError> {
        let slim = match &self.base {
            None => SnapshotSlim {
                id: snapshot.id.clone(),
                timestamp: snapshot.timestamp,
                step: snapshot.step,
                grid_delta: GridDelta::None(full_changes(&snapshot.grid)),
                variables_delta: VariablesDelta {
                    added: snapshot.variables.clone(),
                    ..VariablesDelta::default()
                },
                performance: snapshot.performance,
            },
            Some(base) => {
                if (base.grid.width(), base.grid.height())
                    != (snapshot.grid.width(), snapshot.grid.height())
                {
                    return Err(TimelineError::DimensionMismatch {
                        expected: (base.grid.width(), base.grid.height()),
                        actual: (snapshot.grid.width(), snapshot.grid.height()),
                    });
                }
                let changes = diff_changes(&base.grid, &snapshot.grid);
                let grid_delta = match self.compression {
                    Compression::None => GridDelta::None(changes),
                    Compression::Rle => GridDelta::Rle(encode_runs(&changes)),
                };
                SnapshotSlim {
                    id: snapshot.id.clone(),
                    timestamp: snapshot.timestamp,
                    step: snapshot.step,
                    grid_delta,
                    variables_delta: VariablesDelta::between(
                        &snapshot.variables,
                        &base.variables,
                    ),
                    performance: snapshot.performance,
                }
            }
        };

        let current = self.memory_usage();
        let incoming = slim.estimated_size();
        if current + incoming > self.memory_limit {
            return Err(TimelineError::MemoryLimit {
                current,
                incoming,
                limit: self.memory_limit,
            });
        }

        if self.base.is_none() {
            self.base = Some(snapshot);
        }
        self.frames.push(slim);
        Ok(())
    }

    /// Rebuild frame `index`; `None` when out of range.
    pub fn reconstruct_snapshot(&self, index: usize) -> Option<Snapshot> {
        let slim = self.frames.get(index)?;
        let base = self.base.as_ref()?;

        let width = base.grid.width();
        let mut cells = base.grid.cells().to_vec();
        slim.grid_delta.apply(&mut cells, width);
        let grid = Grid::from_cells(width, base.grid.height(), cells)?;

        let mut variables = base.variables.clone();
        slim.variables_delta.apply(&mut variables);

        Some(Snapshot {
            id: slim.id.clone(),
            timestamp: slim.timestamp,
            step: slim.step,
            grid,
            variables,
            performance: slim.performance,
        })
    }

    /// Re-encode every uncompressed frame with RLE. No-op when the timeline
    /// was created with [`Compression::None`].
    pub fn compress(&mut self) {
        if self.compression == Compression::None {
            return;
        }
        for frame in &mut self.frames {
            if frame.grid_delta.compression() == Compression::None {
                frame.grid_delta = frame.grid_delta.to_rle();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Timestamps of the first and last frame
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.frames.first()?.timestamp, self.frames.last()?.timestamp))
    }

    /// Step numbers of the first and last frame
    pub fn step_range(&self) -> Option<(u64, u64)> {
        Some((self.frames.first()?.step, self.frames.last()?.step))
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.base = None;
    }

    /// Estimated size of all stored deltas in bytes
    pub fn memory_usage(&self) -> usize {
        self.frames.iter().map(SnapshotSlim::estimated_size).sum()
    }

    pub fn slim_frames(&self) -> &[SnapshotSlim] {
        &self.frames
    }

    /// Every frame, reconstructed, in order.
    pub fn frames(&self) -> impl Iterator<Item = Snapshot> + '_ {
        (0..self.frames.len()).filter_map(move |i| self.reconstruct_snapshot(i))
    }

    /// Index of the last frame at or before `step`.
    pub fn index_of_step(&self, step: u64) -> Option<usize> {
        self.frames.iter().rposition(|f| f.step <= step)
    }

    pub fn to_json(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn export_json(&self, path: &Path) -> Result<(), TimelineError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn full_changes(grid: &Grid) -> Vec<CellChange> {
    grid.live_cells()
        .map(|(x, y)| CellChange {
            x,
            y,
            old: 0,
            new: grid.get(x as i64, y as i64),
        })
        .collect()
}

fn diff_changes(base: &Grid, current: &Grid) -> Vec<CellChange> {
    let width = base.width().max(1);
    base.cells()
        .iter()
        .zip(current.cells())
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .map(|(i, (&old, &new))| CellChange {
            x: i % width,
            y: i / width,
            old,
            new,
        })
        .collect()
}
