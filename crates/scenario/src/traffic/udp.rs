//! Constant-bit-rate UDP client and server.
//!
//! Each flow is a pair of application entities. The client sends one
//! sequence-numbered packet per interval from `start` until `client_stop` or
//! until it has sent `max_packets`. The server accepts packets while it runs
//! and counts a sequence number it skipped over as lost; a late packet that
//! fills an earlier gap takes one back off the loss count.

use super::TrafficPair;
use crate::channel::{Delivery, Transmission};
use crate::config::TrafficConfig;
use crate::error::ScenarioError;
use crate::mobility::position_at;
use crate::network::SharedNetwork;
use crate::trace::{DropReason, TraceEvent, TraceKind};
use netsim_simulation::{EntityRegistry, Scheduler};
use netsim_types::{AttributeValue, Attributes, EntityId, EntityKind, SimDuration, SimTime};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Node an application runs on.
pub const NODE: &str = "node";
/// Server application a client sends to.
pub const REMOTE: &str = "remote";
pub const PORT: &str = "port";
/// Client: packets sent so far, which is also the next sequence number.
pub const PACKETS_SENT: &str = "packets_sent";
/// Server: packets accepted.
pub const PACKETS_RECEIVED: &str = "packets_received";
/// Server: sequence numbers skipped over.
pub const PACKETS_LOST: &str = "packets_lost";
/// Server: sequence number expected next.
pub const NEXT_SEQUENCE: &str = "next_sequence";

/// Random stream purpose for send jitter.
pub const TRAFFIC_STREAM: &str = "traffic";

/// Read a counter attribute of an application entity.
pub fn app_counter(
    entities: &EntityRegistry,
    app: EntityId,
    name: &'static str,
) -> Result<u64, ScenarioError> {
    entities
        .attribute(app, name)?
        .and_then(AttributeValue::as_u64)
        .ok_or(ScenarioError::MissingAttribute { entity: app, name })
}

fn stop_before(end: SimTime, margin_secs: f64) -> SimTime {
    end.checked_sub(SimDuration::from_secs_f64(margin_secs))
        .unwrap_or(SimTime::ZERO)
}

/// An installed client/server pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UdpFlow {
    /// Index in the scenario's flow list.
    pub index: usize,
    pub pair: TrafficPair,
    /// Sending node.
    pub source: EntityId,
    /// Receiving node.
    pub destination: EntityId,
    /// Client application entity.
    pub client: EntityId,
    /// Server application entity.
    pub server: EntityId,
    interval: SimDuration,
    jitter: f64,
    packet_size: u32,
    max_packets: u64,
    start: SimTime,
    client_stop: SimTime,
    server_stop: SimTime,
}

impl UdpFlow {
    /// Create both application entities and schedule the first send.
    ///
    /// Clients and servers stop their configured margins before `end`.
    pub(crate) fn install(
        scheduler: &mut Scheduler,
        network: &SharedNetwork,
        pair: TrafficPair,
        (source, destination): (EntityId, EntityId),
        traffic: &TrafficConfig,
        end: SimTime,
    ) -> Result<Self, ScenarioError> {
        let index = network.borrow_mut().metrics.add_flow()?;
        let port = u64::from(traffic.port);

        let server = scheduler.entities_mut().create(
            EntityKind::Application,
            Attributes::from_iter([
                (NODE.to_string(), destination.into()),
                (PORT.to_string(), port.into()),
                (PACKETS_RECEIVED.to_string(), 0u64.into()),
                (PACKETS_LOST.to_string(), 0u64.into()),
                (NEXT_SEQUENCE.to_string(), 0u64.into()),
            ]),
        );
        let client = scheduler.entities_mut().create(
            EntityKind::Application,
            Attributes::from_iter([
                (NODE.to_string(), source.into()),
                (REMOTE.to_string(), server.into()),
                (PORT.to_string(), port.into()),
                (PACKETS_SENT.to_string(), 0u64.into()),
            ]),
        );

        let flow = Self {
            index,
            pair,
            source,
            destination,
            client,
            server,
            interval: SimDuration::from_secs_f64(traffic.interval_secs()),
            jitter: traffic.jitter,
            packet_size: traffic.packet_size,
            max_packets: traffic.max_packets,
            start: SimTime::from_secs_f64(traffic.start_secs),
            client_stop: stop_before(end, traffic.client_stop_margin_secs),
            server_stop: stop_before(end, traffic.server_stop_margin_secs),
        };

        let network = Rc::clone(network);
        scheduler.schedule_at(flow.start, move |s| flow.send(s, network))?;

        info!(
            flow = index as u64,
            %pair,
            %client,
            %server,
            interval = %flow.interval,
            "Setting up traffic"
        );
        Ok(flow)
    }

    fn send(self, scheduler: &mut Scheduler, network: SharedNetwork) {
        if let Err(error) = self.try_send(scheduler, &network) {
            warn!(flow = self.index as u64, %error, "Client failed, flow stops sending");
        }
    }

    fn try_send(
        self,
        scheduler: &mut Scheduler,
        network: &SharedNetwork,
    ) -> Result<(), ScenarioError> {
        let now = scheduler.now();
        if now >= self.client_stop {
            return Ok(());
        }
        let sequence = app_counter(scheduler.entities(), self.client, PACKETS_SENT)?;
        if sequence >= self.max_packets {
            debug!(flow = self.index as u64, sequence, "Client reached max packets");
            return Ok(());
        }
        scheduler
            .entities_mut()
            .set_attribute(self.client, PACKETS_SENT, sequence + 1)?;

        let transmission = Transmission {
            source: self.source,
            destination: self.destination,
            source_position: position_at(scheduler.entities(), self.source, now)?,
            destination_position: position_at(scheduler.entities(), self.destination, now)?,
            size_bytes: self.packet_size,
        };

        let delivery = {
            let mut network = network.borrow_mut();
            network.trace(&self.event(now, TraceKind::Tx, self.source, sequence));
            network
                .channel
                .transmit(&transmission, scheduler.random_mut())?
        };

        match delivery {
            Delivery::After(delay) => {
                let network = Rc::clone(network);
                scheduler.schedule_after(delay, move |s| {
                    if let Err(error) = self.receive(s, &network, sequence, now) {
                        warn!(flow = self.index as u64, %error, "Server failed to record packet");
                    }
                })?;
            }
            Delivery::Dropped(reason) => {
                let mut network = network.borrow_mut();
                network.metrics.record_drop(self.index, reason);
                network.trace(&self.event(now, TraceKind::Drop(reason), self.source, sequence));
            }
        }

        let mut next = self.interval;
        if self.jitter > 0.0 {
            let random = scheduler.random_mut();
            let stream = random.stream_for(TRAFFIC_STREAM, self.client);
            let max_extra = self.jitter * self.interval.as_secs_f64();
            let extra = random.draw_uniform(stream, 0.0, max_extra)?;
            next = next.saturating_add(SimDuration::from_secs_f64(extra));
        }
        let network = Rc::clone(network);
        scheduler.schedule_after(next, move |s| self.send(s, network))?;
        Ok(())
    }

    fn receive(
        self,
        scheduler: &mut Scheduler,
        network: &SharedNetwork,
        sequence: u64,
        sent_at: SimTime,
    ) -> Result<(), ScenarioError> {
        let now = scheduler.now();
        if now < self.start || now >= self.server_stop {
            let reason = DropReason::ServerInactive;
            let mut network = network.borrow_mut();
            network.metrics.record_drop(self.index, reason);
            network.trace(&self.event(now, TraceKind::Drop(reason), self.destination, sequence));
            return Ok(());
        }

        let entities = scheduler.entities();
        let received = app_counter(entities, self.server, PACKETS_RECEIVED)? + 1;
        let expected = app_counter(entities, self.server, NEXT_SEQUENCE)?;
        let mut lost = app_counter(entities, self.server, PACKETS_LOST)?;
        if sequence >= expected {
            lost += sequence - expected;
        } else {
            lost = lost.saturating_sub(1);
        }

        let entities = scheduler.entities_mut();
        entities.set_attribute(self.server, PACKETS_RECEIVED, received)?;
        entities.set_attribute(self.server, PACKETS_LOST, lost)?;
        entities.set_attribute(self.server, NEXT_SEQUENCE, expected.max(sequence + 1))?;

        let mut network = network.borrow_mut();
        network
            .metrics
            .record_delay(self.index, now.duration_since(sent_at));
        network.trace(&self.event(now, TraceKind::Rx, self.destination, sequence));
        Ok(())
    }

    fn event(&self, time: SimTime, kind: TraceKind, node: EntityId, sequence: u64) -> TraceEvent {
        TraceEvent {
            time,
            kind,
            node,
            flow: self.index,
            sequence,
            size_bytes: self.packet_size,
        }
    }
}
