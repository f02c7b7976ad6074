#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use attrgate::{AttrResult, AttributeMap, AttributeObserver, ChangePhase, Condition, Predicate};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Wraps a predicate and counts how often it is applied.
#[derive(Debug)]
pub struct CountingCondition {
    inner: Predicate,
    applies: Rc<Cell<usize>>,
}

impl CountingCondition {
    pub fn new(inner: Predicate) -> (Box<Self>, Rc<Cell<usize>>) {
        let applies = Rc::new(Cell::new(0));
        let cond = Box::new(Self {
            inner,
            applies: Rc::clone(&applies),
        });
        (cond, applies)
    }
}

impl Condition for CountingCondition {
    fn apply(&self, attributes: &AttributeMap) -> AttrResult<bool> {
        self.applies.set(self.applies.get() + 1);
        self.inner.apply(attributes)
    }

    fn describe(&self) -> String {
        self.inner.to_string()
    }
}

/// Records every notification it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(String, ChangePhase)>>,
    calls: AtomicUsize,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<(String, ChangePhase)> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, key: &str, phase: ChangePhase) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push((key.to_string(), phase));
    }
}

impl AttributeObserver for RecordingObserver {
    fn before_change(&self, key: &str) {
        self.record(key, ChangePhase::Before);
    }

    fn after_change(&self, key: &str) {
        self.record(key, ChangePhase::After);
    }
}
