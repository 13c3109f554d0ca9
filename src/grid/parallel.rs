//! Data-parallel stepper with CPU fallback
//!
//! A [`ComputeBackend`] computes a generation from a read-only input buffer.
//! [`RayonBackend`] splits the output into row bands and runs the shared
//! per-row kernel on a dedicated rayon pool, so its result is identical to
//! [`super::stepper::step_cells`] for every input.
//!
//! [`ParallelStepper`] owns an optional backend. When no backend could be
//! initialised, or a dispatch fails, the step is computed on the calling
//! thread instead and a warning is logged. Callers never see the difference.

use super::rules::RuleConfig;
use super::stepper::{step_cells, step_row};
use super::Grid;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

/// Default size, in cells, at or below which a grid is stepped serially.
pub const SERIAL_THRESHOLD: usize = 4096;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build compute thread pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
    #[error("cell buffer holds {actual} cells, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// A device that can compute one generation.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn step(
        &self,
        current: &[u8],
        width: usize,
        height: usize,
        config: &RuleConfig,
    ) -> Result<Vec<u8>, BackendError>;
}

/// Multi-threaded backend on a private rayon pool
pub struct RayonBackend {
    pool: rayon::ThreadPool,
    serial_threshold: usize,
}

impl RayonBackend {
    /// Build the pool; `None` (logged) when the platform refuses to spawn
    /// worker threads. `threads == None` lets rayon pick the count.
    pub fn try_init(threads: Option<usize>) -> Option<Self> {
        match Self::build(threads) {
            Ok(backend) => {
                debug!(
                    threads = backend.pool.current_num_threads(),
                    "parallel stepper ready"
                );
                Some(backend)
            }
            Err(err) => {
                warn!(%err, "parallel stepper unavailable, using CPU");
                None
            }
        }
    }

    fn build(threads: Option<usize>) -> Result<Self, BackendError> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("mpl-step-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        Ok(RayonBackend {
            pool: builder.build()?,
            serial_threshold: SERIAL_THRESHOLD,
        })
    }

    /// Step grids of at most `cells` cells serially; `0` bands every grid.
    pub fn with_serial_threshold(mut self, cells: usize) -> Self {
        self.serial_threshold = cells;
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ComputeBackend for RayonBackend {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn step(
        &self,
        current: &[u8],
        width: usize,
        height: usize,
        config: &RuleConfig,
    ) -> Result<Vec<u8>, BackendError> {
        let expected = width * height;
        if current.len() != expected {
            return Err(BackendError::SizeMismatch {
                expected,
                actual: current.len(),
            });
        }
        if expected <= self.serial_threshold {
            return Ok(step_cells(current, width, height, config));
        }

        let rows_per_band = optimal_rows_per_band(height, self.threads());
        let mut next = vec![0u8; expected];
        self.pool.install(|| {
            next.par_chunks_mut(rows_per_band * width)
                .enumerate()
                .for_each(|(band, chunk)| {
                    let first_row = band * rows_per_band;
                    for (offset, row) in chunk.chunks_mut(width).enumerate() {
                        step_row(current, width, height, first_row + offset, config, row);
                    }
                });
        });
        Ok(next)
    }
}

/// Rows per parallel band: about four bands per thread, at least one row.
pub fn optimal_rows_per_band(height: usize, threads: usize) -> usize {
    let bands = threads.max(1) * 4;
    (height / bands).max(1)
}

/// Input and output of one generation
#[derive(Debug)]
pub struct Generation<'a> {
    pub current: &'a [u8],
    pub next: Vec<u8>,
}

/// Stepper that prefers a [`ComputeBackend`] and falls back to the CPU
pub struct ParallelStepper {
    width: usize,
    height: usize,
    config: RuleConfig,
    backend: Option<Box<dyn ComputeBackend>>,
}

impl ParallelStepper {
    /// Stepper backed by a [`RayonBackend`] when one can be built.
    pub fn new(width: usize, height: usize, config: RuleConfig) -> Self {
        let backend = RayonBackend::try_init(None)
            .map(|b| Box::new(b) as Box<dyn ComputeBackend>);
        Self::with_backend(width, height, config, backend)
    }

    pub fn with_backend(
        width: usize,
        height: usize,
        config: RuleConfig,
        backend: Option<Box<dyn ComputeBackend>>,
    ) -> Self {
        ParallelStepper {
            width,
            height,
            config,
            backend,
        }
    }

    /// True when a backend is installed.
    pub fn is_accelerated(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map_or("cpu", |b| b.name())
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RuleConfig) {
        self.config = config;
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Compute one generation from `current`.
    pub fn step<'a>(&self, current: &'a [u8]) -> Generation<'a> {
        let next = match &self.backend {
            Some(backend) => {
                match backend.step(current, self.width, self.height, &self.config) {
                    Ok(next) => next,
                    Err(err) => {
                        warn!(backend = backend.name(), %err, "dispatch failed, stepping on CPU");
                        self.cpu_step(current)
                    }
                }
            }
            None => self.cpu_step(current),
        };
        Generation { current, next }
    }

    /// Step a whole [`Grid`], adopting its dimensions.
    pub fn step_grid(&mut self, grid: &Grid) -> Grid {
        self.resize(grid.width(), grid.height());
        let generation = self.step(grid.cells());
        Grid::from_cells(grid.width(), grid.height(), generation.next)
            .unwrap_or_else(|| Grid::new(grid.width(), grid.height()))
    }

    fn cpu_step(&self, current: &[u8]) -> Vec<u8> {
        if current.len() != self.width * self.height {
            // Nothing sensible to compute from a mis-sized buffer
            return vec![0; self.width * self.height];
        }
        step_cells(current, self.width, self.height, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::rules::{EdgePolicy, RuleMasks};
    use crate::grid::stepper;

    struct FailingBackend;

    impl ComputeBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn step(
            &self,
            current: &[u8],
            width: usize,
            height: usize,
            _config: &RuleConfig,
        ) -> Result<Vec<u8>, BackendError> {
            Err(BackendError::SizeMismatch {
                expected: width * height + 1,
                actual: current.len(),
            })
        }
    }

    fn soup(width: usize, height: usize) -> Grid {
        // Deterministic pseudo-random fill
        let mut state = 0x2545_f491_u32;
        let cells = (0..width * height)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % 3 == 0) as u8
            })
            .collect();
        Grid::from_cells(width, height, cells).expect("sized")
    }

    #[test]
    fn test_rayon_backend_matches_cpu_on_large_grid() {
        let backend = RayonBackend::try_init(Some(4)).expect("pool builds");
        let grid = soup(97, 83);
        for edges in [EdgePolicy::Clip, EdgePolicy::Wrap] {
            let config = RuleConfig {
                masks: RuleMasks::parse("B36/S23").expect("valid"),
                edges,
                ..RuleConfig::default()
            };
            let parallel = backend
                .step(grid.cells(), grid.width(), grid.height(), &config)
                .expect("dispatch");
            assert_eq!(parallel, stepper::step(&grid, &config).into_cells());
        }
    }

    #[test]
    fn test_small_grids_can_be_banded() {
        let backend = RayonBackend::try_init(Some(3))
            .expect("pool builds")
            .with_serial_threshold(0);
        for (width, height) in [(1, 1), (1, 9), (9, 1), (5, 13)] {
            let grid = soup(width, height);
            let config = RuleConfig {
                edges: EdgePolicy::Wrap,
                ..RuleConfig::default()
            };
            let parallel = backend
                .step(grid.cells(), width, height, &config)
                .expect("dispatch");
            assert_eq!(parallel, stepper::step(&grid, &config).into_cells());
        }
    }

    #[test]
    fn test_failed_dispatch_falls_back_to_cpu() {
        let grid = soup(10, 10);
        let config = RuleConfig::default();
        let stepper =
            ParallelStepper::with_backend(10, 10, config, Some(Box::new(FailingBackend)));
        assert!(stepper.is_accelerated());
        let generation = stepper.step(grid.cells());
        assert_eq!(generation.current, grid.cells());
        assert_eq!(generation.next, stepper::step(&grid, &config).into_cells());
    }

    #[test]
    fn test_missing_backend_uses_cpu() {
        let grid = soup(12, 7);
        let config = RuleConfig::default();
        let mut stepper = ParallelStepper::with_backend(1, 1, config, None);
        assert_eq!(stepper.backend_name(), "cpu");
        assert_eq!(stepper.step_grid(&grid), stepper::step(&grid, &config));
    }

    #[test]
    fn test_rows_per_band_never_zero() {
        assert_eq!(optimal_rows_per_band(3, 16), 1);
        assert_eq!(optimal_rows_per_band(400, 4), 25);
        assert_eq!(optimal_rows_per_band(10, 0), 2);
    }
}
