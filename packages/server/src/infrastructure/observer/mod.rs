//! `HubObserver` implementations.
//!
//! - `tracing`: structured log events for every signal
//! - `broadcast_log`: append-only audit line per HTTP broadcast

pub mod broadcast_log;
pub mod tracing;

use std::sync::Arc;

use crate::domain::{HubObserver, HubSignal};

pub use broadcast_log::BroadcastLogObserver;
pub use self::tracing::TracingObserver;

/// Forwards each signal to every wrapped observer, in order.
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn HubObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn HubObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl HubObserver for CompositeObserver {
    fn observe(&self, signal: &HubSignal) {
        for observer in &self.observers {
            observer.observe(signal);
        }
    }
}
