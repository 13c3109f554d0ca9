//! Rolling performance and rule-activity indexes
//!
//! [`PerformanceMonitor`] keeps a bounded window of per-frame figures fed
//! from recorded snapshots, and for each rule the steps at which it was
//! recently applied. Both buffers drop their oldest entry once full.

use super::Snapshot;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Frames kept by [`PerformanceMonitor::default`]
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Applications remembered per rule
pub const MAX_RECENT_RULE_APPLICATIONS: usize = 100;

/// Density change over a window smaller than this counts as stable
const DENSITY_TREND_THRESHOLD: f64 = 0.01;

/// Figures derived from one recorded frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub fps: f64,
    pub memory_usage: usize,
    pub execution_time_ms: f64,
    /// Live cells over total cells, 0 for an empty grid
    pub grid_density: f64,
    pub active_cells: usize,
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

impl FrameMetrics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let active_cells = snapshot.grid.population();
        let total = snapshot.grid.cells().len();
        FrameMetrics {
            fps: snapshot.performance.fps,
            memory_usage: snapshot.performance.memory_usage,
            execution_time_ms: snapshot.performance.execution_time_ms,
            grid_density: if total == 0 {
                0.0
            } else {
                active_cells as f64 / total as f64
            },
            active_cells,
            step: snapshot.step,
            timestamp: snapshot.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for DensityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DensityTrend::Increasing => "increasing",
            DensityTrend::Decreasing => "decreasing",
            DensityTrend::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// A rule and how many of its recent applications are remembered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleActivity {
    pub rule: String,
    pub activity: usize,
}

/// Limits past which [`PerformanceMonitor::suggestions`] speaks up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationThresholds {
    pub low_fps: f64,
    pub high_memory_usage: usize,
    pub high_grid_density: f64,
}

impl Default for OptimizationThresholds {
    fn default() -> Self {
        OptimizationThresholds {
            low_fps: 30.0,
            high_memory_usage: 100 * 1024 * 1024,
            high_grid_density: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    history: VecDeque<FrameMetrics>,
    max_history: usize,
    rules: IndexMap<String, VecDeque<u64>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl PerformanceMonitor {
    /// A monitor keeping at most `max_history` frames (at least one).
    pub fn new(max_history: usize) -> Self {
        PerformanceMonitor {
            history: VecDeque::new(),
            max_history: max_history.max(1),
            rules: IndexMap::new(),
        }
    }

    pub fn record_snapshot(&mut self, snapshot: &Snapshot) {
        if self.history.len() == self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(FrameMetrics::from_snapshot(snapshot));
    }

    /// Note that `rule` was applied during `step`.
    pub fn record_rule(&mut self, rule: &str, step: u64) {
        let recent = self.rules.entry(rule.to_string()).or_default();
        if recent.len() == MAX_RECENT_RULE_APPLICATIONS {
            recent.pop_front();
        }
        recent.push_back(step);
    }

    /// Recorded frames, oldest first
    pub fn metrics(&self) -> impl Iterator<Item = &FrameMetrics> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&FrameMetrics> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn window(&self, size: usize) -> impl Iterator<Item = &FrameMetrics> {
        self.history.iter().skip(self.history.len().saturating_sub(size))
    }

    fn window_mean(&self, size: usize, field: impl Fn(&FrameMetrics) -> f64) -> f64 {
        let (sum, count) = self
            .window(size)
            .fold((0.0, 0usize), |(sum, count), m| (sum + field(m), count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Mean fps over the last `window` frames, 0 when nothing is recorded.
    pub fn average_fps(&self, window: usize) -> f64 {
        self.window_mean(window, |m| m.fps)
    }

    /// Mean timeline memory estimate over the last `window` frames.
    pub fn average_memory_usage(&self, window: usize) -> f64 {
        self.window_mean(window, |m| m.memory_usage as f64)
    }

    /// Compare the density of the first and last of the last `window`
    /// frames.
    pub fn density_trend(&self, window: usize) -> DensityTrend {
        let mut recent = self.window(window);
        let (Some(first), Some(last)) = (recent.next(), recent.last()) else {
            return DensityTrend::Stable;
        };
        if last.grid_density > first.grid_density + DENSITY_TREND_THRESHOLD {
            DensityTrend::Increasing
        } else if last.grid_density < first.grid_density - DENSITY_TREND_THRESHOLD {
            DensityTrend::Decreasing
        } else {
            DensityTrend::Stable
        }
    }

    /// Remembered applications of `rule`, 0 for a rule never applied.
    pub fn rule_activity(&self, rule: &str) -> usize {
        self.rules.get(rule).map_or(0, VecDeque::len)
    }

    /// Steps at which `rule` was recently applied, oldest first.
    pub fn rule_steps(&self, rule: &str) -> impl Iterator<Item = u64> + '_ {
        self.rules.get(rule).into_iter().flatten().copied()
    }

    /// The `limit` busiest rules, busiest first; ties keep first-seen order.
    pub fn most_active_rules(&self, limit: usize) -> Vec<RuleActivity> {
        let mut activities: Vec<RuleActivity> = self
            .rules
            .iter()
            .map(|(rule, recent)| RuleActivity {
                rule: rule.clone(),
                activity: recent.len(),
            })
            .collect();
        activities.sort_by(|a, b| b.activity.cmp(&a.activity));
        activities.truncate(limit);
        activities
    }

    /// Hints for the latest frame against `thresholds`.
    pub fn suggestions(&self, thresholds: &OptimizationThresholds) -> Vec<&'static str> {
        let Some(latest) = self.latest() else {
            return Vec::new();
        };
        let mut hints = Vec::new();
        if latest.fps > 0.0 && latest.fps < thresholds.low_fps {
            hints.push("stepping is slow: reduce the grid size or enable --parallel");
        }
        if latest.memory_usage > thresholds.high_memory_usage {
            hints.push("timeline is large: enable RLE or record fewer frames");
        }
        if latest.grid_density > thresholds.high_grid_density {
            hints.push("grid is dense: most cells are alive");
        }
        hints
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.rules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::snapshot::PerformanceMetrics;

    fn snapshot(step: u64, live: usize, fps: f64, memory_usage: usize) -> Snapshot {
        let mut grid = Grid::new(10, 10);
        for i in 0..live {
            grid.set((i % 10) as i64, (i / 10) as i64, 1);
        }
        Snapshot::new(
            step,
            grid,
            IndexMap::new(),
            PerformanceMetrics {
                fps,
                memory_usage,
                execution_time_ms: 1.0,
            },
        )
    }

    #[test]
    fn test_history_is_bounded() {
        let mut monitor = PerformanceMonitor::new(3);
        for step in 0..5 {
            monitor.record_snapshot(&snapshot(step, 0, 60.0, 0));
        }
        assert_eq!(monitor.len(), 3);
        let steps: Vec<u64> = monitor.metrics().map(|m| m.step).collect();
        assert_eq!(steps, vec![2, 3, 4]);
    }

    #[test]
    fn test_windowed_averages() {
        let mut monitor = PerformanceMonitor::default();
        assert_eq!(monitor.average_fps(10), 0.0);
        monitor.record_snapshot(&snapshot(0, 0, 10.0, 100));
        monitor.record_snapshot(&snapshot(1, 0, 20.0, 200));
        monitor.record_snapshot(&snapshot(2, 0, 60.0, 600));
        assert_eq!(monitor.average_fps(2), 40.0);
        assert_eq!(monitor.average_fps(10), 30.0);
        assert_eq!(monitor.average_memory_usage(1), 600.0);
    }

    #[test]
    fn test_density_and_trend() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_snapshot(&snapshot(0, 5, 0.0, 0));
        assert_eq!(monitor.density_trend(10), DensityTrend::Stable);

        monitor.record_snapshot(&snapshot(1, 20, 0.0, 0));
        let latest = monitor.latest().expect("recorded");
        assert_eq!(latest.active_cells, 20);
        assert!((latest.grid_density - 0.2).abs() < 1e-9);
        assert_eq!(monitor.density_trend(10), DensityTrend::Increasing);

        monitor.record_snapshot(&snapshot(2, 20, 0.0, 0));
        assert_eq!(monitor.density_trend(2), DensityTrend::Stable);
        monitor.record_snapshot(&snapshot(3, 1, 0.0, 0));
        assert_eq!(monitor.density_trend(2), DensityTrend::Decreasing);
    }

    #[test]
    fn test_rule_activity_ranking() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_rule("seed", 0);
        for step in 0..3 {
            monitor.record_rule("grow", step);
        }
        monitor.record_rule("prune", 1);

        assert_eq!(monitor.rule_activity("grow"), 3);
        assert_eq!(monitor.rule_activity("missing"), 0);
        assert_eq!(monitor.rule_steps("grow").collect::<Vec<_>>(), vec![0, 1, 2]);

        let top = monitor.most_active_rules(2);
        assert_eq!(
            top,
            vec![
                RuleActivity { rule: "grow".into(), activity: 3 },
                RuleActivity { rule: "seed".into(), activity: 1 },
            ]
        );
    }

    #[test]
    fn test_rule_history_is_bounded() {
        let mut monitor = PerformanceMonitor::default();
        for step in 0..(MAX_RECENT_RULE_APPLICATIONS as u64 + 20) {
            monitor.record_rule("spin", step);
        }
        assert_eq!(monitor.rule_activity("spin"), MAX_RECENT_RULE_APPLICATIONS);
        assert_eq!(monitor.rule_steps("spin").next(), Some(20));
    }

    #[test]
    fn test_suggestions_follow_latest_frame() {
        let mut monitor = PerformanceMonitor::default();
        let thresholds = OptimizationThresholds::default();
        assert!(monitor.suggestions(&thresholds).is_empty());

        monitor.record_snapshot(&snapshot(0, 90, 12.0, 0));
        assert_eq!(monitor.suggestions(&thresholds).len(), 2);

        monitor.clear();
        assert!(monitor.is_empty());
        assert_eq!(monitor.most_active_rules(5), vec![]);
    }
}
