//! Scenario configuration.

use crate::error::ScenarioError;
use crate::traffic::TrafficPair;
use netsim_simulation::SimConfig;
use netsim_types::{SimDuration, SimTime};
use serde::{Deserialize, Serialize};

/// Rectangular grid that nodes are initially placed on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Nodes per row.
    pub cols: u32,

    /// Number of rows. Only used to size the mobility bounds.
    pub rows: u32,

    /// Distance between neighbouring grid points, in meters.
    pub spacing: f64,
}

impl GridLayout {
    pub fn new(cols: u32, rows: u32, spacing: f64) -> Self {
        Self {
            cols,
            rows,
            spacing,
        }
    }

    /// Upper x bound of the area nodes may move in.
    pub fn width(&self) -> f64 {
        f64::from(self.cols) * self.spacing + 1.0
    }

    /// Upper y bound of the area nodes may move in.
    pub fn height(&self) -> f64 {
        f64::from(self.rows) * self.spacing + 1.0
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(10, 10, 3.0)
    }
}

/// Random-walk mobility parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkConfig {
    /// When false nodes stay at their grid position.
    pub enabled: bool,

    /// Minimum walk speed in m/s.
    pub speed_min: f64,

    /// Maximum walk speed in m/s.
    pub speed_max: f64,

    /// Distance travelled before a new speed and direction are drawn, in meters.
    pub distance: f64,
}

impl RandomWalkConfig {
    /// Nodes never move.
    pub fn stationary() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_speed(mut self, min: f64, max: f64) -> Self {
        self.speed_min = min;
        self.speed_max = max;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed_min: 5.0,
            speed_max: 10.0,
            distance: 30.0,
        }
    }
}

/// Constant-bit-rate traffic parameters, shared by every flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Packets per second sent by each client.
    pub packet_rate: f64,

    /// Payload size in bytes.
    pub packet_size: u32,

    /// Client stops after this many packets.
    pub max_packets: u64,

    /// Server port, recorded on the application entities.
    pub port: u16,

    /// Flows as (source, destination) node indices.
    pub pairs: Vec<TrafficPair>,

    /// When clients and servers start, in seconds.
    pub start_secs: f64,

    /// Servers stop this long before the end of the run, in seconds.
    pub server_stop_margin_secs: f64,

    /// Clients stop this long before the end of the run, in seconds.
    pub client_stop_margin_secs: f64,

    /// Each send interval is extended by up to `jitter * interval`.
    pub jitter: f64,
}

impl TrafficConfig {
    /// Time between two packets of one client.
    pub fn interval_secs(&self) -> f64 {
        1.0 / self.packet_rate
    }

    pub fn with_packet_rate(mut self, packet_rate: f64) -> Self {
        self.packet_rate = packet_rate;
        self
    }

    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size;
        self
    }

    pub fn with_pairs(mut self, pairs: Vec<TrafficPair>) -> Self {
        self.pairs = pairs;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_packets(mut self, max_packets: u64) -> Self {
        self.max_packets = max_packets;
        self
    }

    pub fn with_stop_margins(mut self, server_secs: f64, client_secs: f64) -> Self {
        self.server_stop_margin_secs = server_secs;
        self.client_stop_margin_secs = client_secs;
        self
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            packet_rate: 10.0,
            packet_size: 1024,
            max_packets: 100_000_000,
            port: 4000,
            pairs: vec![TrafficPair::new(1, 18)],
            start_secs: 0.0,
            server_stop_margin_secs: 1.0,
            client_stop_margin_secs: 1.0,
            jitter: 0.0,
        }
    }
}

/// Parameters of the default [`RangeChannel`](crate::RangeChannel).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Maximum distance at which a packet is received, in meters.
    pub range: f64,

    /// Link rate used for serialization delay, in bits per second.
    pub data_rate_bps: f64,

    /// Probability that an in-range packet is lost anyway.
    pub loss_probability: f64,
}

impl ChannelConfig {
    pub fn with_range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    pub fn with_data_rate(mut self, data_rate_bps: f64) -> Self {
        self.data_rate_bps = data_rate_bps;
        self
    }

    pub fn with_loss_probability(mut self, loss_probability: f64) -> Self {
        self.loss_probability = loss_probability;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            range: 250.0,
            data_rate_bps: 6_000_000.0,
            loss_probability: 0.0,
        }
    }
}

/// Complete description of one ad-hoc network run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of nodes.
    pub num_nodes: u32,

    /// Initial placement grid.
    pub grid: GridLayout,

    /// Simulated duration in seconds.
    pub duration_secs: f64,

    /// Global random seed.
    pub seed: u64,

    /// Run (replication) number.
    pub run: u32,

    /// Node mobility.
    pub mobility: RandomWalkConfig,

    /// Application traffic.
    pub traffic: TrafficConfig,

    /// Default channel parameters.
    pub channel: ChannelConfig,
}

impl ScenarioConfig {
    /// Create a configuration with `num_nodes` nodes and defaults elsewhere.
    pub fn new(num_nodes: u32) -> Self {
        Self {
            num_nodes,
            ..Self::default()
        }
    }

    /// The traffic-load sweep: 80 nodes, no flows until pairs are given,
    /// and clients that keep sending after their servers stop.
    pub fn traffic_load() -> Self {
        Self {
            num_nodes: 80,
            traffic: TrafficConfig {
                pairs: Vec::new(),
                client_stop_margin_secs: 0.0,
                ..TrafficConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ScenarioError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_grid(mut self, grid: GridLayout) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_duration_secs(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_run(mut self, run: u32) -> Self {
        self.run = run;
        self
    }

    pub fn with_mobility(mut self, mobility: RandomWalkConfig) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficConfig) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    /// Seed and run for the simulation core.
    pub fn sim_config(&self) -> SimConfig {
        SimConfig::new(self.seed, self.run)
    }

    /// End of the run.
    pub fn end_time(&self) -> SimTime {
        SimTime::from_secs_f64(self.duration_secs)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |message: String| Err(ScenarioError::InvalidConfig(message));

        if self.num_nodes == 0 {
            return invalid("num_nodes must be at least 1".into());
        }
        if self.grid.cols == 0 || self.grid.rows == 0 {
            return invalid(format!(
                "grid must have at least one row and column, got {}x{}",
                self.grid.cols, self.grid.rows
            ));
        }
        if !(self.grid.spacing.is_finite() && self.grid.spacing > 0.0) {
            return invalid(format!("grid spacing must be positive, got {}", self.grid.spacing));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return invalid(format!("duration must be positive, got {}", self.duration_secs));
        }

        let mobility = &self.mobility;
        if mobility.enabled {
            if !(mobility.speed_min.is_finite() && mobility.speed_min > 0.0) {
                return invalid(format!("speed_min must be positive, got {}", mobility.speed_min));
            }
            if !(mobility.speed_max.is_finite() && mobility.speed_max >= mobility.speed_min) {
                return invalid(format!(
                    "speed range [{}, {}] is empty",
                    mobility.speed_min, mobility.speed_max
                ));
            }
            if !(mobility.distance.is_finite() && mobility.distance > 0.0) {
                return invalid(format!(
                    "walk distance must be positive, got {}",
                    mobility.distance
                ));
            }
        }

        let traffic = &self.traffic;
        if !(traffic.packet_rate.is_finite() && traffic.packet_rate > 0.0) {
            return invalid(format!("packet_rate must be positive, got {}", traffic.packet_rate));
        }
        if SimDuration::from_secs_f64(traffic.interval_secs()) < SimDuration::from_nanos(1) {
            return invalid(format!(
                "packet_rate {} gives a send interval below 1ns",
                traffic.packet_rate
            ));
        }
        if !(traffic.start_secs.is_finite() && traffic.start_secs >= 0.0) {
            return invalid(format!("start time must not be negative, got {}", traffic.start_secs));
        }
        if !(traffic.server_stop_margin_secs.is_finite() && traffic.server_stop_margin_secs >= 0.0)
        {
            return invalid(format!(
                "server stop margin must not be negative, got {}",
                traffic.server_stop_margin_secs
            ));
        }
        if !(traffic.client_stop_margin_secs.is_finite() && traffic.client_stop_margin_secs >= 0.0)
        {
            return invalid(format!(
                "client stop margin must not be negative, got {}",
                traffic.client_stop_margin_secs
            ));
        }
        if !(traffic.jitter.is_finite() && traffic.jitter >= 0.0) {
            return invalid(format!("jitter must not be negative, got {}", traffic.jitter));
        }

        let channel = &self.channel;
        if !(channel.range.is_finite() && channel.range > 0.0) {
            return invalid(format!("channel range must be positive, got {}", channel.range));
        }
        if !(channel.data_rate_bps.is_finite() && channel.data_rate_bps > 0.0) {
            return invalid(format!("data rate must be positive, got {}", channel.data_rate_bps));
        }
        if !(0.0..=1.0).contains(&channel.loss_probability) {
            return invalid(format!(
                "loss probability must be within [0, 1], got {}",
                channel.loss_probability
            ));
        }

        Ok(())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            num_nodes: 20,
            grid: GridLayout::default(),
            duration_secs: 20.0,
            seed: 1,
            run: 5,
            mobility: RandomWalkConfig::default(),
            traffic: TrafficConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}
