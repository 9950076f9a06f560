//! Packet-level tracing.
//!
//! Applications report every transmission, reception, and drop to a
//! [`TraceSink`]. Sinks decide what to keep; [`MemoryTrace`] keeps everything.

use netsim_types::{EntityId, SimTime};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Why a packet never reached its server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Receiver was beyond the channel's range.
    OutOfRange,
    /// The channel lost the packet.
    ChannelLoss,
    /// The server was not running when the packet arrived.
    ServerInactive,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::OutOfRange => write!(f, "out of range"),
            DropReason::ChannelLoss => write!(f, "channel loss"),
            DropReason::ServerInactive => write!(f, "server inactive"),
        }
    }
}

/// What happened to a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    Tx,
    Rx,
    Drop(DropReason),
}

/// One traced packet event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceEvent {
    pub time: SimTime,
    pub kind: TraceKind,
    /// Node where the event happened: the sender for `Tx` and channel drops,
    /// the receiver otherwise.
    pub node: EntityId,
    /// Index of the flow in the scenario's flow list.
    pub flow: usize,
    pub sequence: u64,
    pub size_bytes: u32,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TraceKind::Tx => "t".to_string(),
            TraceKind::Rx => "r".to_string(),
            TraceKind::Drop(reason) => format!("d ({reason})"),
        };
        write!(
            f,
            "{} {} {} flow={} seq={} size={}",
            kind, self.time, self.node, self.flow, self.sequence, self.size_bytes
        )
    }
}

/// Receiver of packet events.
pub trait TraceSink {
    fn record(&mut self, event: &TraceEvent);
}

/// A sink shared between the scenario and whoever inspects it afterwards.
pub type SharedTraceSink = Rc<RefCell<dyn TraceSink>>;

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryTrace {
    events: Vec<TraceEvent>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new trace wrapped for sharing with a [`Scenario`](crate::Scenario).
    pub fn shared() -> Rc<RefCell<MemoryTrace>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Number of events of the given kind.
    pub fn count(&self, kind: TraceKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Events belonging to one flow.
    pub fn flow(&self, flow: usize) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.flow == flow)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl TraceSink for MemoryTrace {
    fn record(&mut self, event: &TraceEvent) {
        self.events.push(*event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TraceKind, flow: usize, sequence: u64) -> TraceEvent {
        TraceEvent {
            time: SimTime::from_millis(100 * sequence),
            kind,
            node: EntityId(1),
            flow,
            sequence,
            size_bytes: 1024,
        }
    }

    #[test]
    fn test_memory_trace_counts() {
        let mut trace = MemoryTrace::new();
        trace.record(&event(TraceKind::Tx, 0, 0));
        trace.record(&event(TraceKind::Rx, 0, 0));
        trace.record(&event(TraceKind::Tx, 1, 0));
        trace.record(&event(TraceKind::Drop(DropReason::OutOfRange), 1, 0));

        assert_eq!(trace.len(), 4);
        assert_eq!(trace.count(TraceKind::Tx), 2);
        assert_eq!(trace.count(TraceKind::Drop(DropReason::OutOfRange)), 1);
        assert_eq!(trace.count(TraceKind::Drop(DropReason::ChannelLoss)), 0);
        assert_eq!(trace.flow(1).count(), 2);
    }

    #[test]
    fn test_display() {
        let line = event(TraceKind::Drop(DropReason::ServerInactive), 2, 7).to_string();
        assert_eq!(line, "d (server inactive) +0.700000000s Entity(1) flow=2 seq=7 size=1024");
    }
}
