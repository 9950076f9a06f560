//! State shared by every application callback.

use crate::channel::Channel;
use crate::error::ScenarioError;
use crate::metrics::MetricsCollector;
use crate::trace::{SharedTraceSink, TraceEvent};
use std::cell::RefCell;
use std::rc::Rc;

/// The medium between nodes: channel model, trace sink, and metrics.
pub(crate) struct Network {
    pub channel: Box<dyn Channel>,
    pub trace: Option<SharedTraceSink>,
    pub metrics: MetricsCollector,
}

pub(crate) type SharedNetwork = Rc<RefCell<Network>>;

impl Network {
    pub fn new(channel: Box<dyn Channel>) -> Result<Self, ScenarioError> {
        Ok(Self {
            channel,
            trace: None,
            metrics: MetricsCollector::new()?,
        })
    }

    pub fn shared(self) -> SharedNetwork {
        Rc::new(RefCell::new(self))
    }

    pub fn trace(&self, event: &TraceEvent) {
        if let Some(sink) = &self.trace {
            sink.borrow_mut().record(event);
        }
    }
}
