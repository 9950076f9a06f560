//! Delay and drop collection, and the end-of-run report.

use crate::error::ScenarioError;
use crate::trace::DropReason;
use crate::traffic::TrafficPair;
use hdrhistogram::Histogram;
use netsim_simulation::SchedulerStats;
use netsim_types::{EntityId, SimDuration, SimTime, Vector};
use tracing::info;

/// Significant figures kept by delay histograms.
const HISTOGRAM_SIGFIG: u8 = 3;

fn new_histogram() -> Result<Histogram<u64>, ScenarioError> {
    Ok(Histogram::new(HISTOGRAM_SIGFIG)?)
}

fn nanos(delay: SimDuration) -> u64 {
    u64::try_from(delay.as_nanos()).unwrap_or(0)
}

/// Per-flow drops and delays.
#[derive(Debug, Clone)]
pub struct FlowMetrics {
    /// End-to-end delays in nanoseconds.
    delays: Histogram<u64>,
    pub dropped_out_of_range: u64,
    pub dropped_channel_loss: u64,
    pub dropped_server_inactive: u64,
}

impl FlowMetrics {
    fn new() -> Result<Self, ScenarioError> {
        Ok(Self {
            delays: new_histogram()?,
            dropped_out_of_range: 0,
            dropped_channel_loss: 0,
            dropped_server_inactive: 0,
        })
    }

    pub fn delays(&self) -> &Histogram<u64> {
        &self.delays
    }

    pub fn dropped(&self) -> u64 {
        self.dropped_out_of_range + self.dropped_channel_loss + self.dropped_server_inactive
    }
}

/// Collects packet outcomes while a scenario runs.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    flows: Vec<FlowMetrics>,
    /// Delays of every flow, in nanoseconds.
    delays: Histogram<u64>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, ScenarioError> {
        Ok(Self {
            flows: Vec::new(),
            delays: new_histogram()?,
        })
    }

    /// Register a flow and return its index.
    pub fn add_flow(&mut self) -> Result<usize, ScenarioError> {
        self.flows.push(FlowMetrics::new()?);
        Ok(self.flows.len() - 1)
    }

    pub fn record_delay(&mut self, flow: usize, delay: SimDuration) {
        let value = nanos(delay);
        self.delays.saturating_record(value);
        if let Some(metrics) = self.flows.get_mut(flow) {
            metrics.delays.saturating_record(value);
        }
    }

    pub fn record_drop(&mut self, flow: usize, reason: DropReason) {
        let Some(metrics) = self.flows.get_mut(flow) else {
            return;
        };
        match reason {
            DropReason::OutOfRange => metrics.dropped_out_of_range += 1,
            DropReason::ChannelLoss => metrics.dropped_channel_loss += 1,
            DropReason::ServerInactive => metrics.dropped_server_inactive += 1,
        }
    }

    pub fn flow(&self, flow: usize) -> Option<&FlowMetrics> {
        self.flows.get(flow)
    }

    pub fn delays(&self) -> &Histogram<u64> {
        &self.delays
    }
}

/// Outcome of one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport {
    pub flow: usize,
    pub pair: TrafficPair,
    pub client: EntityId,
    pub server: EntityId,
    /// Packets the client handed to the channel.
    pub sent: u64,
    /// Packets the server accepted.
    pub received: u64,
    /// Sequence numbers the server skipped over.
    pub lost: u64,
    pub dropped_out_of_range: u64,
    pub dropped_channel_loss: u64,
    pub dropped_server_inactive: u64,
    pub mean_delay: SimDuration,
    pub max_delay: SimDuration,
}

impl FlowReport {
    pub(crate) fn new(
        flow: usize,
        pair: TrafficPair,
        client: EntityId,
        server: EntityId,
        (sent, received, lost): (u64, u64, u64),
        metrics: &FlowMetrics,
    ) -> Self {
        let delays = metrics.delays();
        Self {
            flow,
            pair,
            client,
            server,
            sent,
            received,
            lost,
            dropped_out_of_range: metrics.dropped_out_of_range,
            dropped_channel_loss: metrics.dropped_channel_loss,
            dropped_server_inactive: metrics.dropped_server_inactive,
            mean_delay: SimDuration::from_nanos(delays.mean() as i64),
            max_delay: SimDuration::from_nanos(delays.max() as i64),
        }
    }

    /// Fraction of sent packets the server received.
    pub fn delivery_ratio(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.received as f64 / self.sent as f64
    }
}

/// Where a node ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub index: u32,
    pub node: EntityId,
    pub position: Vector,
}

/// Summary of a finished scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Virtual time at which the run ended.
    pub end_time: SimTime,
    pub stats: SchedulerStats,
    pub flows: Vec<FlowReport>,
    pub final_positions: Vec<NodePosition>,
    /// Delays of every flow, in nanoseconds.
    delays: Histogram<u64>,
}

impl ScenarioReport {
    pub(crate) fn new(
        end_time: SimTime,
        stats: SchedulerStats,
        flows: Vec<FlowReport>,
        final_positions: Vec<NodePosition>,
        delays: Histogram<u64>,
    ) -> Self {
        Self {
            end_time,
            stats,
            flows,
            final_positions,
            delays,
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.flows.iter().map(|f| f.sent).sum()
    }

    pub fn total_received(&self) -> u64 {
        self.flows.iter().map(|f| f.received).sum()
    }

    pub fn total_lost(&self) -> u64 {
        self.flows.iter().map(|f| f.lost).sum()
    }

    /// Fraction of all sent packets that were received.
    pub fn delivery_ratio(&self) -> f64 {
        let sent = self.total_sent();
        if sent == 0 {
            return 0.0;
        }
        self.total_received() as f64 / sent as f64
    }

    /// Get the P50 (median) delay.
    pub fn p50_delay(&self) -> SimDuration {
        self.delay_at_quantile(0.50)
    }

    /// Get the P90 delay.
    pub fn p90_delay(&self) -> SimDuration {
        self.delay_at_quantile(0.90)
    }

    /// Get the P99 delay.
    pub fn p99_delay(&self) -> SimDuration {
        self.delay_at_quantile(0.99)
    }

    pub fn max_delay(&self) -> SimDuration {
        SimDuration::from_nanos(self.delays.max() as i64)
    }

    pub fn mean_delay(&self) -> SimDuration {
        SimDuration::from_nanos(self.delays.mean() as i64)
    }

    /// Number of delay samples.
    pub fn delay_samples(&self) -> u64 {
        self.delays.len()
    }

    fn delay_at_quantile(&self, quantile: f64) -> SimDuration {
        SimDuration::from_nanos(self.delays.value_at_quantile(quantile) as i64)
    }

    /// Log the summary at info level.
    pub fn log_summary(&self) {
        info!(
            end_time = %self.end_time,
            events_executed = self.stats.events_executed,
            events_dropped = self.stats.events_dropped,
            sent = self.total_sent(),
            received = self.total_received(),
            lost = self.total_lost(),
            delivery_ratio = self.delivery_ratio(),
            p50_delay = %self.p50_delay(),
            p99_delay = %self.p99_delay(),
            "Scenario complete"
        );
        for flow in &self.flows {
            info!(
                flow = flow.flow as u64,
                pair = %flow.pair,
                sent = flow.sent,
                received = flow.received,
                lost = flow.lost,
                out_of_range = flow.dropped_out_of_range,
                mean_delay = %flow.mean_delay,
                "Flow summary"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_tracks_flows_separately() {
        let mut metrics = MetricsCollector::new().unwrap();
        let a = metrics.add_flow().unwrap();
        let b = metrics.add_flow().unwrap();

        metrics.record_delay(a, SimDuration::from_millis(1));
        metrics.record_delay(a, SimDuration::from_millis(3));
        metrics.record_delay(b, SimDuration::from_millis(10));
        metrics.record_drop(b, DropReason::OutOfRange);
        metrics.record_drop(b, DropReason::ServerInactive);
        metrics.record_drop(7, DropReason::ChannelLoss);

        assert_eq!(metrics.flow(a).unwrap().delays().len(), 2);
        assert_eq!(metrics.flow(a).unwrap().dropped(), 0);
        assert_eq!(metrics.flow(b).unwrap().dropped(), 2);
        assert_eq!(metrics.delays().len(), 3);
        assert!(metrics.flow(7).is_none());
    }

    #[test]
    fn test_report_totals_and_ratio() {
        let mut metrics = MetricsCollector::new().unwrap();
        let flow = metrics.add_flow().unwrap();
        for ms in 1..=100 {
            metrics.record_delay(flow, SimDuration::from_millis(ms));
        }

        let flow_report = FlowReport::new(
            flow,
            TrafficPair::new(1, 18),
            EntityId(20),
            EntityId(21),
            (200, 100, 5),
            metrics.flow(flow).unwrap(),
        );
        assert_eq!(flow_report.delivery_ratio(), 0.5);

        let report = ScenarioReport::new(
            SimTime::from_secs(20),
            SchedulerStats::default(),
            vec![flow_report],
            Vec::new(),
            metrics.delays().clone(),
        );
        assert_eq!(report.total_sent(), 200);
        assert_eq!(report.total_lost(), 5);
        assert_eq!(report.delay_samples(), 100);

        // Histogram precision is three significant figures.
        let p50 = report.p50_delay().as_secs_f64();
        assert!((p50 - 0.050).abs() < 0.001, "p50 {p50}");
        let max = report.max_delay().as_secs_f64();
        assert!((max - 0.100).abs() < 0.001, "max {max}");
    }

    #[test]
    fn test_empty_report() {
        let report = ScenarioReport::new(
            SimTime::ZERO,
            SchedulerStats::default(),
            Vec::new(),
            Vec::new(),
            new_histogram().unwrap(),
        );
        assert_eq!(report.delivery_ratio(), 0.0);
        assert_eq!(report.p99_delay(), SimDuration::ZERO);
    }
}
