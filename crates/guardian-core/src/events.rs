//! Internal telemetry events for the Guardian control loop.
//!
//! Adapts the teacher's panic-isolating `EventListeners`/`ResilienceEvent`
//! pattern: one listener panicking on a tick-telemetry event must not stop
//! the scheduler from reporting the rest, any more than one failing
//! structure should stop a tick.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by the Guardian control loop (repairs, event
/// generation, request emission, tick overruns).
pub trait GuardianEvent: Send + Sync + fmt::Debug {
    /// e.g. "repair_performed", "event_generated", "tick_overrun".
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// The structure this event concerns, if any (tick-level events such as
    /// an overrun have none).
    fn structure(&self) -> Option<&str>;
}

/// Trait for listening to Guardian telemetry events.
pub trait EventListener<E: GuardianEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: GuardianEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: GuardianEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// A panicking listener is caught and the rest still run; with the
    /// `tracing` feature enabled the panic is logged, with `metrics`
    /// enabled a counter is incremented.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(feature = "metrics")]
                record_listener_panic_metric(event);

                #[cfg(not(feature = "tracing"))]
                let _ = index;

                #[cfg(not(any(feature = "tracing", feature = "metrics")))]
                let _ = _panic_payload;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: GuardianEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: GuardianEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: GuardianEvent>(index: usize, event: &E, panic_payload: &(dyn Any + Send)) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        structure = event.structure(),
        event_type = event.event_type(),
        panic_message = %panic_message,
        "guardian event listener panicked"
    );
}

#[cfg(feature = "metrics")]
fn record_listener_panic_metric<E: GuardianEvent>(event: &E) {
    let event_type_label = event.event_type().to_string();
    let structure_label = event.structure().unwrap_or("").to_string();

    metrics::counter!(
        "guardian_event_listener_panics_total",
        "event_type" => event_type_label,
        "structure" => structure_label
    )
    .increment(1);
}

/// Named telemetry points the scheduler and pipeline stages emit.
///
/// Covers the supplemented per-structure summary logging, the "no rules
/// applied" warning, and tick overrun reporting, in addition to the core
/// spec's repair/event/request milestones.
#[derive(Debug, Clone)]
pub enum TickEvent {
    RepairPerformed {
        structure: String,
        resource: &'static str,
        timestamp: Instant,
    },
    EventGenerated {
        structure: String,
        resource: &'static str,
        timestamp: Instant,
    },
    RequestEmitted {
        structure: String,
        resource: &'static str,
        amount: i64,
        timestamp: Instant,
    },
    NoRulesForResource {
        structure: String,
        resource: &'static str,
        timestamp: Instant,
    },
    StructureSkipped {
        structure: String,
        reason: String,
        timestamp: Instant,
    },
    TickOverrun {
        delay: std::time::Duration,
        timestamp: Instant,
    },
}

impl GuardianEvent for TickEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TickEvent::RepairPerformed { .. } => "repair_performed",
            TickEvent::EventGenerated { .. } => "event_generated",
            TickEvent::RequestEmitted { .. } => "request_emitted",
            TickEvent::NoRulesForResource { .. } => "no_rules_for_resource",
            TickEvent::StructureSkipped { .. } => "structure_skipped",
            TickEvent::TickOverrun { .. } => "tick_overrun",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TickEvent::RepairPerformed { timestamp, .. }
            | TickEvent::EventGenerated { timestamp, .. }
            | TickEvent::RequestEmitted { timestamp, .. }
            | TickEvent::NoRulesForResource { timestamp, .. }
            | TickEvent::StructureSkipped { timestamp, .. }
            | TickEvent::TickOverrun { timestamp, .. } => *timestamp,
        }
    }

    fn structure(&self) -> Option<&str> {
        match self {
            TickEvent::RepairPerformed { structure, .. }
            | TickEvent::EventGenerated { structure, .. }
            | TickEvent::RequestEmitted { structure, .. }
            | TickEvent::NoRulesForResource { structure, .. }
            | TickEvent::StructureSkipped { structure, .. } => Some(structure),
            TickEvent::TickOverrun { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestEvent {
        timestamp: Instant,
    }

    impl GuardianEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "test"
        }

        fn timestamp(&self) -> Instant {
            self.timestamp
        }

        fn structure(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn listeners_all_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(move |_event: &TestEvent| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let event = TestEvent {
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn a_panicking_listener_does_not_block_the_rest() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(|_: &TestEvent| panic!("boom")));
        listeners.add(FnListener::new(move |_: &TestEvent| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let event = TestEvent {
            timestamp: Instant::now(),
        };
        listeners.emit(&event);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tick_event_type_strings_match_variants() {
        let e = TickEvent::TickOverrun {
            delay: std::time::Duration::from_secs(2),
            timestamp: Instant::now(),
        };
        assert_eq!(e.event_type(), "tick_overrun");
        assert_eq!(e.structure(), None);
    }
}
