// Execution engine for the MPL interpreter

use crate::compile::Diagnostic;
use crate::events::{EngineEvent, EventBus};
use crate::grid::{stepper, Grid, GridView, ParallelStepper, RayonBackend, RuleConfig};
use crate::interpreter::constants::*;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::stdlib::SplitMix64;
use crate::memory::{CallStack, Value};
use crate::parser::ast::{AstNode, Program, SourceLocation};
use crate::snapshot::{
    Compression, PerformanceMetrics, PerformanceMonitor, Snapshot, TimelineDelta,
};
use crate::snapshot::timeline::DEFAULT_MEMORY_LIMIT;
use chrono::Utc;
use indexmap::IndexMap;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which stepper computes generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepBackend {
    /// Reference stepper on the calling thread
    #[default]
    Cpu,
    /// Row-parallel stepper, falling back to the CPU when unavailable
    Parallel,
}

/// Interpreter settings
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig {
    pub width: usize,
    pub height: usize,
    pub rule: RuleConfig,
    pub backend: StepBackend,
    /// Worker threads for [`StepBackend::Parallel`]; `None` lets rayon decide
    pub threads: Option<usize>,
    pub record_timeline: bool,
    pub compression: Compression,
    pub timeline_memory_limit: usize,
    pub max_call_depth: usize,
    pub max_loop_iterations: usize,
    /// Seed for `math.random`
    pub seed: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            rule: RuleConfig::default(),
            backend: StepBackend::Cpu,
            threads: None,
            record_timeline: true,
            compression: Compression::Rle,
            timeline_memory_limit: DEFAULT_MEMORY_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            seed: 0x5eed,
        }
    }
}

/// A user function as declared
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<AstNode>,
    pub location: SourceLocation,
}

/// A named rule as declared
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDef {
    pub name: String,
    pub body: Vec<AstNode>,
    pub location: SourceLocation,
}

/// Everything a program can observe or change
#[derive(Debug, Clone)]
pub struct VmState {
    pub grid: Grid,
    pub globals: IndexMap<String, Value>,
    pub rules: IndexMap<String, Rc<RuleDef>>,
    pub functions: IndexMap<String, Rc<FunctionDef>>,
    pub log: Vec<String>,
}

impl VmState {
    fn new(width: usize, height: usize) -> Self {
        let mut globals = IndexMap::new();
        for (name, value) in standard_constants(width, height) {
            globals.insert(name.to_string(), Value::Number(value));
        }
        VmState {
            grid: Grid::new(width, height),
            globals,
            rules: IndexMap::new(),
            functions: IndexMap::new(),
            log: Vec::new(),
        }
    }
}

/// Tree-walking interpreter for MPL programs
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,
    pub(crate) state: VmState,
    pub(crate) call_stack: CallStack,
    /// Rules currently executing; they share the caller's frame
    pub(crate) rule_depth: usize,
    pub(crate) step_counter: u64,
    pub(crate) events: EventBus,
    pub(crate) rng: SplitMix64,
    parallel: Option<ParallelStepper>,
    timeline: TimelineDelta,
    pub(crate) monitor: PerformanceMonitor,
    recording: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_event_bus(config, EventBus::new())
    }

    /// Create an interpreter announcing on an existing bus, so subscribers
    /// registered beforehand see the initial `simulationStart`.
    pub fn with_event_bus(config: InterpreterConfig, events: EventBus) -> Self {
        let parallel = match config.backend {
            StepBackend::Cpu => None,
            StepBackend::Parallel => {
                let backend = RayonBackend::try_init(config.threads)
                    .map(|b| Box::new(b) as Box<dyn crate::grid::ComputeBackend>);
                Some(ParallelStepper::with_backend(
                    config.width,
                    config.height,
                    config.rule,
                    backend,
                ))
            }
        };

        let interpreter = Interpreter {
            state: VmState::new(config.width, config.height),
            call_stack: CallStack::new(),
            rule_depth: 0,
            step_counter: 0,
            events,
            rng: SplitMix64::new(config.seed),
            parallel,
            timeline: TimelineDelta::with_memory_limit(
                config.compression,
                config.timeline_memory_limit,
            ),
            monitor: PerformanceMonitor::default(),
            recording: config.record_timeline,
            config,
        };
        debug!(
            width = interpreter.config.width,
            height = interpreter.config.height,
            rule = %interpreter.config.rule.masks,
            backend = interpreter.backend_name(),
            "interpreter ready"
        );
        interpreter.emit(EngineEvent::SimulationStart {
            at: Utc::now(),
            population: 0,
        });
        interpreter
    }

    /// Run every top-level statement. A statement that fails is reported as
    /// a diagnostic and an `error` event; execution resumes with the next.
    pub fn execute_program(&mut self, program: &Program) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for stmt in &program.statements {
            if let Err(err) = self.execute_statement(stmt) {
                let location = err.location().unwrap_or(*stmt.location());
                warn!(
                    line = location.line,
                    column = location.column,
                    kind = err.kind(),
                    "{err}"
                );
                self.emit(EngineEvent::Error {
                    message: err.to_string(),
                    origin: Some("executeProgram".to_string()),
                    line: Some(location.line),
                    column: Some(location.column),
                });
                diagnostics.push(Diagnostic::from(&err));
                // Frames are popped on unwind; anything left is stale
                self.call_stack.clear();
                self.rule_depth = 0;
            }
        }
        diagnostics
    }

    /// Advance the grid one generation.
    pub fn step(&mut self) {
        if self.recording && self.timeline.is_empty() {
            self.record_frame(0.0);
        }

        let started = Instant::now();
        let next = match self.parallel.as_mut() {
            Some(parallel) => parallel.step_grid(&self.state.grid),
            None => stepper::step(&self.state.grid, &self.config.rule),
        };
        self.state.grid = next;
        self.step_counter += 1;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.emit(EngineEvent::Tick {
            step: self.step_counter,
            population: self.state.grid.population(),
            elapsed_ms,
        });
        self.emit(EngineEvent::Performance {
            operation: "stepGrid".to_string(),
            duration_ms: elapsed_ms,
            step: self.step_counter,
        });

        if self.recording {
            self.record_frame(elapsed_ms);
        }
    }

    fn record_frame(&mut self, elapsed_ms: f64) {
        let performance = PerformanceMetrics {
            fps: if elapsed_ms > 0.0 { 1000.0 / elapsed_ms } else { 0.0 },
            memory_usage: self.timeline.memory_usage(),
            execution_time_ms: elapsed_ms,
        };
        let snapshot = Snapshot::new(
            self.step_counter,
            self.state.grid.clone(),
            self.state.globals.clone(),
            performance,
        );
        self.monitor.record_snapshot(&snapshot);
        if let Err(err) = self.timeline.add_snapshot(snapshot) {
            warn!(%err, "timeline recording stopped");
            self.recording = false;
        }
    }

    /// Record the current state unless the latest frame already holds this
    /// step. Programs that never call `step()` get a single frame this way.
    pub fn capture_frame(&mut self) {
        let covered = self
            .timeline
            .step_range()
            .is_some_and(|(_, last)| last == self.step_counter);
        if self.recording && !covered {
            self.record_frame(0.0);
        }
    }

    /// Clear all program state and restart the step counter.
    pub fn reset(&mut self) {
        self.emit(EngineEvent::SimulationStop {
            at: Utc::now(),
            population: self.state.grid.population(),
        });
        self.state = VmState::new(self.config.width, self.config.height);
        self.call_stack.clear();
        self.rule_depth = 0;
        self.step_counter = 0;
        self.rng = SplitMix64::new(self.config.seed);
        self.timeline.clear();
        self.monitor.clear();
        self.recording = self.config.record_timeline;
        info!("interpreter reset");
        self.emit(EngineEvent::SimulationStart {
            at: Utc::now(),
            population: 0,
        });
    }

    /// Switch the automaton rule for subsequent steps.
    pub fn set_rule(&mut self, rule: RuleConfig) {
        self.config.rule = rule;
        if let Some(parallel) = self.parallel.as_mut() {
            parallel.set_config(rule);
        }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    // Scope handling

    /// Look a name up in the innermost frame, then in globals.
    pub(crate) fn lookup(&self, name: &str, location: SourceLocation) -> Result<Value, RuntimeError> {
        self.call_stack
            .current()
            .and_then(|frame| frame.variables.get(name))
            .or_else(|| self.state.globals.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            })
    }

    /// Bind `name` in the current scope (the innermost frame, or globals at
    /// top level).
    pub(crate) fn declare(&mut self, name: &str, value: Value) {
        let previous = match self.call_stack.current_mut() {
            Some(frame) => frame.variables.insert(name.to_string(), value.clone()),
            None => self.state.globals.insert(name.to_string(), value.clone()),
        };
        self.announce_change(name, previous, value);
    }

    /// Overwrite an existing binding, innermost scope first.
    pub(crate) fn assign(
        &mut self,
        name: &str,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let slot = match self.call_stack.current_mut() {
            Some(frame) if frame.variables.contains_key(name) => frame.variables.get_mut(name),
            _ => self.state.globals.get_mut(name),
        };
        let Some(slot) = slot else {
            return Err(RuntimeError::UndeclaredAssignment {
                name: name.to_string(),
                location,
            });
        };
        let previous = std::mem::replace(slot, value.clone());
        self.announce_change(name, Some(previous), value);
        Ok(())
    }

    fn announce_change(&self, name: &str, previous: Option<Value>, value: Value) {
        if previous.as_ref() == Some(&value) {
            return;
        }
        self.emit(EngineEvent::VariableChange {
            name: name.to_string(),
            previous,
            value,
            step: self.step_counter,
        });
    }

    /// True once the innermost function frame has executed `return`.
    pub(crate) fn returning(&self) -> bool {
        self.call_stack.has_returned()
    }

    // Accessors

    pub fn grid(&self) -> &Grid {
        &self.state.grid
    }

    pub fn grid_view(&self) -> GridView<'_> {
        self.state.grid.view(self.step_counter)
    }

    pub fn state(&self) -> &VmState {
        &self.state
    }

    /// Global variable by name
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.state.globals.get(name)
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.state.globals
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.state.functions.keys().map(String::as_str)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.state.rules.keys().map(String::as_str)
    }

    pub fn log(&self) -> &[String] {
        &self.state.log
    }

    pub fn clear_log(&mut self) {
        self.state.log.clear();
    }

    pub fn current_step(&self) -> u64 {
        self.step_counter
    }

    /// Function frames plus rules currently executing
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth() + self.rule_depth
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Rolling frame figures and rule activity
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn timeline(&self) -> &TimelineDelta {
        &self.timeline
    }

    /// Hand the recorded timeline over, leaving an empty one behind.
    pub fn take_timeline(&mut self) -> TimelineDelta {
        let empty = TimelineDelta::with_memory_limit(
            self.config.compression,
            self.config.timeline_memory_limit,
        );
        std::mem::replace(&mut self.timeline, empty)
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.parallel.as_ref().map_or("cpu", ParallelStepper::backend_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::parser::parse;

    fn run(source: &str) -> (Interpreter, Vec<Diagnostic>) {
        let (program, syntax) = parse(source);
        assert!(syntax.is_empty(), "{syntax:?}");
        let mut interpreter = Interpreter::default();
        let diagnostics = interpreter.execute_program(&program);
        (interpreter, diagnostics)
    }

    #[test]
    fn test_standard_constants_are_seeded() {
        let interpreter = Interpreter::default();
        assert_eq!(interpreter.variable("GRID_WIDTH"), Some(&Value::Number(50.0)));
        assert_eq!(
            interpreter.variable("TAU"),
            Some(&Value::Number(std::f64::consts::TAU))
        );
    }

    #[test]
    fn test_failed_statement_does_not_stop_program() {
        let (interpreter, diagnostics) = run("var a = missing;\nvar b = 2;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(interpreter.variable("b"), Some(&Value::Number(2.0)));
        assert_eq!(interpreter.events().event_count(Some(EventKind::Error)), 1);
    }

    #[test]
    fn test_reset_clears_everything_but_constants() {
        let (mut interpreter, _) =
            run("var a = 1; function f() { return 1; } set(1, 1); print(a); step();");
        assert_eq!(interpreter.current_step(), 1);
        assert!(!interpreter.timeline().is_empty());

        interpreter.reset();
        assert_eq!(interpreter.current_step(), 0);
        assert!(interpreter.variable("a").is_none());
        assert!(interpreter.variable("PI").is_some());
        assert_eq!(interpreter.function_names().count(), 0);
        assert!(interpreter.log().is_empty());
        assert!(interpreter.timeline().is_empty());
        assert_eq!(interpreter.grid().population(), 0);
        assert_eq!(
            interpreter.events().event_count(Some(EventKind::SimulationStop)),
            1
        );
    }

    #[test]
    fn test_step_records_base_and_frame() {
        let (mut interpreter, _) = run("set(1, 0); set(1, 1); set(1, 2);");
        interpreter.step();
        let timeline = interpreter.timeline();
        assert_eq!(timeline.len(), 2);
        let base = timeline.reconstruct_snapshot(0).expect("base");
        assert_eq!(base.step, 0);
        assert_eq!(base.grid.population(), 3);
        let first = timeline.reconstruct_snapshot(1).expect("frame");
        assert_eq!(first.step, 1);
        assert_eq!(&first.grid, interpreter.grid());
    }

    #[test]
    fn test_capture_frame_skips_recorded_steps() {
        let (mut interpreter, _) = run("set(4, 4);");
        interpreter.capture_frame();
        interpreter.capture_frame();
        assert_eq!(interpreter.timeline().len(), 1);
        interpreter.step();
        interpreter.capture_frame();
        assert_eq!(interpreter.timeline().len(), 2);
        assert_eq!(interpreter.timeline().step_range(), Some((0, 1)));
    }

    #[test]
    fn test_monitor_tracks_frames_and_rules() {
        let (mut interpreter, diagnostics) =
            run("set(1, 1); set(2, 1); set(3, 1); rule grow { set(0, 0); } grow(); grow();");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        interpreter.step();
        interpreter.step();

        let monitor = interpreter.monitor();
        assert_eq!(monitor.len(), 3);
        assert_eq!(monitor.latest().map(|m| m.step), Some(2));
        assert_eq!(monitor.rule_activity("grow"), 2);
        assert_eq!(monitor.most_active_rules(1)[0].rule, "grow");

        interpreter.reset();
        assert!(interpreter.monitor().is_empty());
        assert_eq!(interpreter.monitor().rule_activity("grow"), 0);
    }

    #[test]
    fn test_parallel_backend_matches_cpu() {
        let source = "set(1, 0); set(2, 1); set(0, 2); set(1, 2); set(2, 2);";
        let (program, _) = parse(source);

        let mut cpu = Interpreter::default();
        cpu.execute_program(&program);
        let mut parallel = Interpreter::new(InterpreterConfig {
            backend: StepBackend::Parallel,
            threads: Some(2),
            ..InterpreterConfig::default()
        });
        parallel.execute_program(&program);

        for _ in 0..8 {
            cpu.step();
            parallel.step();
        }
        assert_eq!(cpu.grid(), parallel.grid());
    }

    #[test]
    fn test_simulation_start_reaches_early_subscribers() {
        let bus = EventBus::new();
        let seen = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&seen);
        bus.on(EventKind::SimulationStart, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        let _interpreter = Interpreter::with_event_bus(InterpreterConfig::default(), bus);
        assert_eq!(seen.get(), 1);
    }
}
