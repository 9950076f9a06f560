//! Packet delivery between two nodes.

use crate::config::ChannelConfig;
use crate::error::ScenarioError;
use crate::trace::DropReason;
use netsim_simulation::{RandomStreamManager, StreamHandle, StreamOwner};
use netsim_types::{Attributes, EntityId, SimDuration, Vector};

/// Speed of light in m/s.
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Random stream purpose for channel loss.
pub const CHANNEL_STREAM: &str = "channel";

/// One packet handed to the channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transmission {
    pub source: EntityId,
    pub destination: EntityId,
    pub source_position: Vector,
    pub destination_position: Vector,
    pub size_bytes: u32,
}

impl Transmission {
    pub fn distance(&self) -> f64 {
        self.source_position.distance(self.destination_position)
    }
}

/// Outcome of a transmission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delivery {
    /// Delivered after the given delay.
    After(SimDuration),
    Dropped(DropReason),
}

/// Decides whether and when a packet reaches its destination.
pub trait Channel {
    fn transmit(
        &mut self,
        transmission: &Transmission,
        random: &mut RandomStreamManager,
    ) -> Result<Delivery, ScenarioError>;

    /// Parameters to record on the scenario's channel entity.
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }
}

/// Unit-disk channel.
///
/// Packets within `range` arrive after the propagation delay at light speed
/// plus the time to serialize the packet at `data_rate_bps`. Everything
/// farther away is dropped.
#[derive(Debug)]
pub struct RangeChannel {
    config: ChannelConfig,
    loss_stream: Option<StreamHandle>,
}

impl RangeChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            loss_stream: None,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Delay for a packet of `size_bytes` over `distance` meters.
    pub fn delay(&self, distance: f64, size_bytes: u32) -> SimDuration {
        let propagation = distance / SPEED_OF_LIGHT;
        let serialization = f64::from(size_bytes) * 8.0 / self.config.data_rate_bps;
        SimDuration::from_secs_f64(propagation + serialization)
    }
}

impl Channel for RangeChannel {
    fn transmit(
        &mut self,
        transmission: &Transmission,
        random: &mut RandomStreamManager,
    ) -> Result<Delivery, ScenarioError> {
        let distance = transmission.distance();
        if distance > self.config.range {
            return Ok(Delivery::Dropped(DropReason::OutOfRange));
        }

        if self.config.loss_probability > 0.0 {
            let stream = *self
                .loss_stream
                .get_or_insert_with(|| random.stream_for(CHANNEL_STREAM, StreamOwner::Global));
            if random.draw_uniform(stream, 0.0, 1.0)? < self.config.loss_probability {
                return Ok(Delivery::Dropped(DropReason::ChannelLoss));
            }
        }

        Ok(Delivery::After(self.delay(distance, transmission.size_bytes)))
    }

    fn attributes(&self) -> Attributes {
        Attributes::from_iter([
            ("model".to_string(), "range".into()),
            ("range".to_string(), self.config.range.into()),
            ("data_rate_bps".to_string(), self.config.data_rate_bps.into()),
            ("loss_probability".to_string(), self.config.loss_probability.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_simulation::SimConfig;

    fn transmission(distance: f64) -> Transmission {
        Transmission {
            source: EntityId(0),
            destination: EntityId(1),
            source_position: Vector::planar(0.0, 0.0),
            destination_position: Vector::planar(distance, 0.0),
            size_bytes: 1000,
        }
    }

    #[test]
    fn test_in_range_delay() {
        let mut random = RandomStreamManager::new(SimConfig::default());
        let mut channel = RangeChannel::new(ChannelConfig::default().with_data_rate(8_000_000.0));

        // 8000 bits at 8 Mbit/s plus 1 us of propagation over ~300 m.
        let mut channel_far = RangeChannel::new(
            ChannelConfig::default()
                .with_range(1_000.0)
                .with_data_rate(8_000_000.0),
        );
        assert_eq!(
            channel_far
                .transmit(&transmission(SPEED_OF_LIGHT * 1e-6), &mut random)
                .unwrap(),
            Delivery::After(SimDuration::from_micros(1_001))
        );
        assert_eq!(
            channel.transmit(&transmission(0.0), &mut random).unwrap(),
            Delivery::After(SimDuration::from_millis(1))
        );
        assert!(random.is_empty(), "No loss, no stream");
    }

    #[test]
    fn test_out_of_range() {
        let mut random = RandomStreamManager::new(SimConfig::default());
        let mut channel = RangeChannel::new(ChannelConfig::default().with_range(100.0));
        assert_eq!(
            channel.transmit(&transmission(100.5), &mut random).unwrap(),
            Delivery::Dropped(DropReason::OutOfRange)
        );
        assert!(matches!(
            channel.transmit(&transmission(100.0), &mut random).unwrap(),
            Delivery::After(_)
        ));
    }

    #[test]
    fn test_loss_probability() {
        let mut random = RandomStreamManager::new(SimConfig::default());
        let mut channel =
            RangeChannel::new(ChannelConfig::default().with_loss_probability(0.5));

        let lost = (0..1_000)
            .filter(|_| {
                channel.transmit(&transmission(10.0), &mut random).unwrap()
                    == Delivery::Dropped(DropReason::ChannelLoss)
            })
            .count();
        assert!((400..600).contains(&lost), "lost {lost} of 1000");
        assert_eq!(random.len(), 1);

        let mut certain = RangeChannel::new(ChannelConfig::default().with_loss_probability(1.0));
        assert_eq!(
            certain.transmit(&transmission(10.0), &mut random).unwrap(),
            Delivery::Dropped(DropReason::ChannelLoss)
        );
    }
}
