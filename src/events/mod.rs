//! Engine event bus
//!
//! A typed publish/subscribe channel the interpreter reports through:
//! ticks, grid edits, function calls, errors and timings. The bus is
//! single-threaded and synchronous: [`EventBus::emit`] calls every handler
//! before returning.
//!
//! # Delivery rules
//!
//! - Handlers registered for a kind receive events in registration order.
//! - `emit` works on a snapshot of the subscriber list, so handlers may
//!   subscribe, unsubscribe or emit without disturbing the current delivery.
//! - A handler returning `Err` does not stop delivery. The failure is logged
//!   and re-announced as an [`EngineEvent::Error`], except when the failing
//!   event was itself an error.
//! - Every emitted event is appended to a bounded history ring.
//!
//! Buses are plain values shared through cheap [`Clone`] handles; there is
//! no process-wide instance.

use crate::memory::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

/// Default capacity of the history ring
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Default number of records returned by [`EventBus::history`]
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Discriminant of [`EngineEvent`], used for subscriptions and queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Tick,
    StateChange,
    RuleApplied,
    SimulationStart,
    SimulationStop,
    Error,
    FunctionCall,
    VariableChange,
    GridUpdate,
    Performance,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Tick,
        EventKind::StateChange,
        EventKind::RuleApplied,
        EventKind::SimulationStart,
        EventKind::SimulationStop,
        EventKind::Error,
        EventKind::FunctionCall,
        EventKind::VariableChange,
        EventKind::GridUpdate,
        EventKind::Performance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Tick => "tick",
            EventKind::StateChange => "stateChange",
            EventKind::RuleApplied => "ruleApplied",
            EventKind::SimulationStart => "simulationStart",
            EventKind::SimulationStop => "simulationStop",
            EventKind::Error => "error",
            EventKind::FunctionCall => "functionCall",
            EventKind::VariableChange => "variableChange",
            EventKind::GridUpdate => "gridUpdate",
            EventKind::Performance => "performance",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the engine announces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Once per generation step
    Tick {
        step: u64,
        population: usize,
        elapsed_ms: f64,
    },
    /// Whole-grid transition such as `clear()`
    StateChange {
        from: String,
        to: String,
        step: u64,
    },
    RuleApplied {
        rule: String,
        step: u64,
    },
    SimulationStart {
        at: DateTime<Utc>,
        population: usize,
    },
    SimulationStop {
        at: DateTime<Utc>,
        population: usize,
    },
    Error {
        message: String,
        origin: Option<String>,
        line: Option<usize>,
        column: Option<usize>,
    },
    FunctionCall {
        name: String,
        args: Vec<Value>,
        step: u64,
    },
    VariableChange {
        name: String,
        previous: Option<Value>,
        value: Value,
        step: u64,
    },
    GridUpdate {
        x: usize,
        y: usize,
        previous: u8,
        value: u8,
        step: u64,
    },
    Performance {
        operation: String,
        duration_ms: f64,
        step: u64,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Tick { .. } => EventKind::Tick,
            EngineEvent::StateChange { .. } => EventKind::StateChange,
            EngineEvent::RuleApplied { .. } => EventKind::RuleApplied,
            EngineEvent::SimulationStart { .. } => EventKind::SimulationStart,
            EngineEvent::SimulationStop { .. } => EventKind::SimulationStop,
            EngineEvent::Error { .. } => EventKind::Error,
            EngineEvent::FunctionCall { .. } => EventKind::FunctionCall,
            EngineEvent::VariableChange { .. } => EventKind::VariableChange,
            EngineEvent::GridUpdate { .. } => EventKind::GridUpdate,
            EngineEvent::Performance { .. } => EventKind::Performance,
        }
    }

    /// Error event with no source position.
    pub fn error(message: impl Into<String>, origin: impl Into<String>) -> Self {
        EngineEvent::Error {
            message: message.into(),
            origin: Some(origin.into()),
            line: None,
            column: None,
        }
    }
}

/// What a handler returns; `Err` is reported, never propagated.
pub type HandlerResult = Result<(), Box<dyn std::error::Error>>;

type Handler = Rc<dyn Fn(&EngineEvent) -> HandlerResult>;

/// Identifies one registration for [`EventBus::off`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One entry of the history ring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event: EngineEvent,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counters over the current history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub events_by_kind: IndexMap<EventKind, usize>,
    pub avg_events_per_second: f64,
}

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
    once: bool,
}

struct BusState {
    handlers: FxHashMap<EventKind, Vec<Subscriber>>,
    history: VecDeque<EventRecord>,
    max_history: usize,
    next_id: u64,
}

impl BusState {
    fn push_history(&mut self, record: EventRecord) {
        self.history.push_back(record);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }
}

/// Shared handle to an event bus
#[derive(Clone)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &state.handlers.values().map(Vec::len).sum::<usize>())
            .field("history", &state.history.len())
            .field("max_history", &state.max_history)
            .finish()
    }
}

/// Handle returned by [`EventBus::on`] and [`EventBus::once`]
#[derive(Debug, Clone)]
pub struct Subscription {
    bus: Weak<RefCell<BusState>>,
    kind: EventKind,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler; returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(state) => remove_subscriber(&mut state.borrow_mut(), self.kind, self.id),
            None => false,
        }
    }
}

fn remove_subscriber(state: &mut BusState, kind: EventKind, id: SubscriptionId) -> bool {
    match state.handlers.get_mut(&kind) {
        Some(subscribers) => {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            subscribers.len() != before
        }
        None => false,
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        EventBus {
            state: Rc::new(RefCell::new(BusState {
                handlers: FxHashMap::default(),
                history: VecDeque::new(),
                max_history,
                next_id: 0,
            })),
        }
    }

    /// Register `handler` for every event of `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EngineEvent) -> HandlerResult + 'static,
    {
        self.subscribe(kind, Rc::new(handler), false)
    }

    /// Register `handler` for the next event of `kind` only.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EngineEvent) -> HandlerResult + 'static,
    {
        self.subscribe(kind, Rc::new(handler), true)
    }

    /// Remove a registration; returns false if it did not exist.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        remove_subscriber(&mut self.state.borrow_mut(), kind, id)
    }

    fn subscribe(&self, kind: EventKind, handler: Handler, once: bool) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.handlers.entry(kind).or_default().push(Subscriber { id, handler, once });
        Subscription {
            bus: Rc::downgrade(&self.state),
            kind,
            id,
        }
    }

    /// Record `event` and deliver it to every current subscriber of its kind.
    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        trace!(event = %kind, "emit");

        let snapshot: Vec<Handler> = {
            let mut state = self.state.borrow_mut();
            state.push_history(EventRecord {
                event: event.clone(),
                timestamp: Utc::now(),
            });
            match state.handlers.get_mut(&kind) {
                Some(subscribers) => {
                    let handlers = subscribers.iter().map(|s| Rc::clone(&s.handler)).collect();
                    subscribers.retain(|s| !s.once);
                    handlers
                }
                None => Vec::new(),
            }
        };

        for handler in snapshot {
            if let Err(err) = handler(&event) {
                warn!(event = %kind, error = %err, "event handler failed");
                if kind != EventKind::Error {
                    self.emit(EngineEvent::error(err.to_string(), kind.name()));
                }
            }
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.state.borrow().handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Up to `limit` most recent records, oldest first, optionally of one kind.
    pub fn history(&self, kind: Option<EventKind>, limit: usize) -> Vec<EventRecord> {
        let state = self.state.borrow();
        let matching: Vec<&EventRecord> = state
            .history
            .iter()
            .filter(|r| kind.map_or(true, |k| r.event.kind() == k))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub fn event_count(&self, kind: Option<EventKind>) -> usize {
        let state = self.state.borrow();
        match kind {
            Some(k) => state.history.iter().filter(|r| r.event.kind() == k).count(),
            None => state.history.len(),
        }
    }

    pub fn last_event(&self, kind: Option<EventKind>) -> Option<EventRecord> {
        let state = self.state.borrow();
        state
            .history
            .iter()
            .rev()
            .find(|r| kind.map_or(true, |k| r.event.kind() == k))
            .cloned()
    }

    pub fn clear_history(&self) {
        self.state.borrow_mut().history.clear();
    }

    pub fn max_history(&self) -> usize {
        self.state.borrow().max_history
    }

    /// Change the ring capacity, dropping the oldest records if needed.
    pub fn set_max_history(&self, size: usize) {
        let mut state = self.state.borrow_mut();
        state.max_history = size;
        while state.history.len() > size {
            state.history.pop_front();
        }
    }

    /// Drop every subscriber and the whole history.
    pub fn clear_all(&self) {
        let mut state = self.state.borrow_mut();
        state.handlers.clear();
        state.history.clear();
    }

    pub fn stats(&self) -> EventStats {
        let state = self.state.borrow();
        let mut events_by_kind = IndexMap::new();
        for record in &state.history {
            *events_by_kind.entry(record.event.kind()).or_insert(0) += 1;
        }

        let total_events = state.history.len();
        let span = state
            .history
            .front()
            .map(|first| (Utc::now() - first.timestamp).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        let avg_events_per_second = if span > 0.0 {
            total_events as f64 / span
        } else {
            0.0
        };

        EventStats {
            total_events,
            events_by_kind,
            avg_events_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn tick(step: u64) -> EngineEvent {
        EngineEvent::Tick {
            step,
            population: 0,
            elapsed_ms: 0.0,
        }
    }

    #[test]
    fn test_on_and_off() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let sub = bus.on(EventKind::Tick, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.emit(tick(1));
        assert!(bus.off(EventKind::Tick, sub.id()));
        bus.emit(tick(2));
        assert_eq!(hits.get(), 1);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        bus.once(EventKind::Tick, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.emit(tick(1));
        bus.emit(tick(2));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(EventKind::Tick), 0);
    }

    #[test]
    fn test_failing_handler_is_reported_and_delivery_continues() {
        let bus = EventBus::new();
        let later = Rc::new(Cell::new(false));
        let flag = Rc::clone(&later);
        bus.on(EventKind::Tick, |_| Err("boom".into()));
        bus.on(EventKind::Tick, move |_| {
            flag.set(true);
            Ok(())
        });

        bus.emit(tick(1));
        assert!(later.get());

        let errors = bus.history(Some(EventKind::Error), DEFAULT_HISTORY_LIMIT);
        assert_eq!(errors.len(), 1);
        match &errors[0].event {
            EngineEvent::Error { message, origin, .. } => {
                assert_eq!(message, "boom");
                assert_eq!(origin.as_deref(), Some("tick"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failing_error_handler_does_not_recurse() {
        let bus = EventBus::new();
        bus.on(EventKind::Error, |_| Err("again".into()));
        bus.emit(EngineEvent::error("first", "test"));
        assert_eq!(bus.event_count(Some(EventKind::Error)), 1);
    }

    #[test]
    fn test_unsubscribe_during_emit_uses_snapshot() {
        let bus = EventBus::new();
        let second_hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&second_hits);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let target = Rc::clone(&slot);

        bus.on(EventKind::Tick, move |_| {
            if let Some(sub) = target.borrow().as_ref() {
                sub.unsubscribe();
            }
            Ok(())
        });
        let second = bus.on(EventKind::Tick, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        *slot.borrow_mut() = Some(second);

        bus.emit(tick(1));
        bus.emit(tick(2));
        assert_eq!(second_hits.get(), 1);
    }

    #[test]
    fn test_history_is_bounded_and_filterable() {
        let bus = EventBus::with_max_history(3);
        for step in 0..5 {
            bus.emit(tick(step));
        }
        bus.emit(EngineEvent::RuleApplied {
            rule: "r".into(),
            step: 5,
        });

        assert_eq!(bus.event_count(None), 3);
        let ticks = bus.history(Some(EventKind::Tick), 10);
        assert_eq!(ticks.len(), 2);
        assert!(matches!(ticks[0].event, EngineEvent::Tick { step: 3, .. }));
        assert!(matches!(
            bus.last_event(None).map(|r| r.event.kind()),
            Some(EventKind::RuleApplied)
        ));
        assert_eq!(bus.history(None, 1).len(), 1);

        bus.set_max_history(1);
        assert_eq!(bus.event_count(None), 1);

        let stats = bus.stats();
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.events_by_kind.get(&EventKind::RuleApplied), Some(&1));

        bus.clear_all();
        assert_eq!(bus.event_count(None), 0);
        assert!(bus.last_event(None).is_none());
    }
}
