// Snapshots of simulation state for timeline replay

pub mod monitor;
pub mod timeline;

use crate::grid::Grid;
use crate::memory::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use monitor::{DensityTrend, FrameMetrics, OptimizationThresholds, PerformanceMonitor};
pub use timeline::{Compression, TimelineDelta, TimelineError};

/// Timing and size figures captured with each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub fps: f64,
    pub memory_usage: usize,
    pub execution_time_ms: f64,
}

/// Complete simulation state at one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub step: u64,
    pub grid: Grid,
    pub variables: IndexMap<String, Value>,
    pub performance: PerformanceMetrics,
}

impl Snapshot {
    pub fn new(
        step: u64,
        grid: Grid,
        variables: IndexMap<String, Value>,
        performance: PerformanceMetrics,
    ) -> Self {
        Snapshot {
            id: format!("step-{:06}", step),
            timestamp: Utc::now(),
            step,
            grid,
            variables,
            performance,
        }
    }

    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        let grid_size = self.grid.cells().len();
        let variables_size: usize = self
            .variables
            .iter()
            .map(|(name, value)| name.len() * 2 + value.estimated_size())
            .sum();
        self.id.len() * 2 + 8 + 8 + grid_size + variables_size + 24
    }
}
