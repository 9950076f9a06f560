//! Application traffic: flow lists and constant-bit-rate UDP applications.

mod pairs;
mod udp;

pub use pairs::{parse_traffic_pairs, TrafficPair};
pub use udp::{
    app_counter, UdpFlow, NEXT_SEQUENCE, NODE, PACKETS_LOST, PACKETS_RECEIVED, PACKETS_SENT,
    PORT, REMOTE, TRAFFIC_STREAM,
};
