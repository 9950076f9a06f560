//! Scenario assembly and execution.

use crate::channel::{Channel, RangeChannel};
use crate::config::ScenarioConfig;
use crate::error::ScenarioError;
use crate::metrics::{FlowReport, NodePosition, ScenarioReport};
use crate::mobility::{position_at, GridPositionAllocator, RandomWalk2d, Rectangle, POSITION};
use crate::network::{Network, SharedNetwork};
use crate::trace::SharedTraceSink;
use crate::traffic::{app_counter, UdpFlow, PACKETS_LOST, PACKETS_RECEIVED, PACKETS_SENT};
use netsim_simulation::Scheduler;
use netsim_types::{Attributes, EntityId, EntityKind};
use tracing::{info, warn};

/// Attribute holding a node's index in the node list.
pub const NODE_INDEX: &str = "index";

/// An ad-hoc wireless network run: nodes on a grid, optionally walking
/// randomly, with constant-bit-rate UDP flows between node pairs.
///
/// Everything is set up in [`Scenario::new`]; [`Scenario::run`] advances
/// virtual time to the configured duration and reports the outcome.
pub struct Scenario {
    config: ScenarioConfig,
    scheduler: Scheduler,
    nodes: Vec<EntityId>,
    flows: Vec<UdpFlow>,
    network: SharedNetwork,
    mobility: Option<RandomWalk2d>,
}

impl Scenario {
    /// Build a scenario using the [`RangeChannel`] described by the config.
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        let channel = RangeChannel::new(config.channel);
        Self::with_channel(config, Box::new(channel))
    }

    /// Build a scenario with a custom channel model.
    pub fn with_channel(
        config: ScenarioConfig,
        channel: Box<dyn Channel>,
    ) -> Result<Self, ScenarioError> {
        config.validate()?;

        info!(
            num_nodes = config.num_nodes,
            seed = config.seed,
            run = config.run,
            duration_secs = config.duration_secs,
            "Building scenario"
        );

        let mut scheduler = Scheduler::new(config.sim_config());
        scheduler
            .entities_mut()
            .create(EntityKind::Channel, channel.attributes());
        let network = Network::new(channel)?.shared();

        let allocator = GridPositionAllocator::for_layout(&config.grid);
        let nodes: Vec<EntityId> = (0..config.num_nodes)
            .map(|index| {
                let attributes = Attributes::from_iter([
                    (NODE_INDEX.to_string(), u64::from(index).into()),
                    (POSITION.to_string(), allocator.position(index).into()),
                ]);
                scheduler.entities_mut().create(EntityKind::Node, attributes)
            })
            .collect();

        let mobility = if config.mobility.enabled {
            let model = RandomWalk2d::new(Rectangle::for_layout(&config.grid), config.mobility);
            for &node in &nodes {
                model.install(&mut scheduler, node)?;
            }
            Some(model)
        } else {
            None
        };

        let end = config.end_time();
        let mut flows = Vec::new();
        for &pair in &config.traffic.pairs {
            if !pair.fits(config.num_nodes) {
                warn!(
                    %pair,
                    num_nodes = config.num_nodes,
                    "Invalid source or destination node index"
                );
                continue;
            }
            let endpoints = (
                nodes[pair.source as usize],
                nodes[pair.destination as usize],
            );
            flows.push(UdpFlow::install(
                &mut scheduler,
                &network,
                pair,
                endpoints,
                &config.traffic,
                end,
            )?);
        }

        Ok(Self {
            config,
            scheduler,
            nodes,
            flows,
            network,
            mobility,
        })
    }

    /// Send packet events to `sink` from now on.
    pub fn set_trace_sink(&mut self, sink: SharedTraceSink) {
        self.network.borrow_mut().trace = Some(sink);
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Access the scheduler, e.g. to add events before running.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Node entities, indexed by node number.
    pub fn nodes(&self) -> &[EntityId] {
        &self.nodes
    }

    /// Installed flows. Skipped pairs have no entry.
    pub fn flows(&self) -> &[UdpFlow] {
        &self.flows
    }

    pub fn mobility(&self) -> Option<&RandomWalk2d> {
        self.mobility.as_ref()
    }

    /// Run to the configured duration and report.
    ///
    /// Events scheduled past the end are discarded, so a second call does
    /// nothing beyond producing the same report.
    pub fn run(&mut self) -> Result<ScenarioReport, ScenarioError> {
        info!(flows = self.flows.len() as u64, "Running simulation");
        self.scheduler.run(Some(self.config.end_time()))?;

        let report = self.report()?;
        report.log_summary();
        Ok(report)
    }

    /// Report on the run so far.
    pub fn report(&self) -> Result<ScenarioReport, ScenarioError> {
        let entities = self.scheduler.entities();
        let network = self.network.borrow();

        let mut flows = Vec::with_capacity(self.flows.len());
        for flow in &self.flows {
            let counts = (
                app_counter(entities, flow.client, PACKETS_SENT)?,
                app_counter(entities, flow.server, PACKETS_RECEIVED)?,
                app_counter(entities, flow.server, PACKETS_LOST)?,
            );
            let Some(metrics) = network.metrics.flow(flow.index) else {
                continue;
            };
            flows.push(FlowReport::new(
                flow.index,
                flow.pair,
                flow.client,
                flow.server,
                counts,
                metrics,
            ));
        }

        let now = self.scheduler.now();
        let final_positions = self
            .nodes
            .iter()
            .zip(0u32..)
            .map(|(&node, index)| {
                Ok(NodePosition {
                    index,
                    node,
                    position: position_at(entities, node, now)?,
                })
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        Ok(ScenarioReport::new(
            now,
            self.scheduler.stats().clone(),
            flows,
            final_positions,
            network.metrics.delays().clone(),
        ))
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("config", &self.config)
            .field("now", &self.scheduler.now())
            .field("nodes", &self.nodes.len())
            .field("flows", &self.flows.len())
            .finish()
    }
}
