//! Ad-hoc wireless network scenarios on the netsim simulation core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Scenario                          │
//! │                                                          │
//! │  GridPositionAllocator ──► node entities                 │
//! │  RandomWalk2d ──────────► position / velocity attributes │
//! │  UdpFlow (client, server) ──► application entities       │
//! │                                                          │
//! │  ┌───────────┐   ┌───────────┐   ┌──────────────────┐    │
//! │  │  Channel  │   │ TraceSink │   │ MetricsCollector │    │
//! │  └───────────┘   └───────────┘   └──────────────────┘    │
//! │                                                          │
//! │              netsim_simulation::Scheduler                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Nodes are placed on a grid and, unless mobility is disabled, walk
//! randomly inside the grid's bounding rectangle. Each traffic pair gets a
//! constant-bit-rate client on the source node and a server on the
//! destination. Packets go straight from source to destination through the
//! [`Channel`]; there is no routing, so a destination out of range loses
//! the packet.
//!
//! # Example
//!
//! ```ignore
//! use netsim_scenario::{MemoryTrace, Scenario, ScenarioConfig, TrafficConfig};
//!
//! let config = ScenarioConfig::new(40)
//!     .with_seed(3)
//!     .with_traffic(TrafficConfig::default().with_packet_rate(50.0));
//!
//! let mut scenario = Scenario::new(config)?;
//! let trace = MemoryTrace::shared();
//! scenario.set_trace_sink(trace.clone());
//!
//! let report = scenario.run()?;
//! println!("Delivery ratio: {:.3}", report.delivery_ratio());
//! println!("P99 delay: {}", report.p99_delay());
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod mobility;
mod network;
pub mod runner;
pub mod trace;
pub mod traffic;

pub use channel::{Channel, Delivery, RangeChannel, Transmission};
pub use config::{ChannelConfig, GridLayout, RandomWalkConfig, ScenarioConfig, TrafficConfig};
pub use error::ScenarioError;
pub use metrics::{FlowMetrics, FlowReport, MetricsCollector, NodePosition, ScenarioReport};
pub use mobility::{position_at, GridPositionAllocator, RandomWalk2d, Rectangle};
pub use runner::Scenario;
pub use trace::{DropReason, MemoryTrace, SharedTraceSink, TraceEvent, TraceKind, TraceSink};
pub use traffic::{parse_traffic_pairs, TrafficPair, UdpFlow};
