//! Fluent builder for constructing a [`Sim`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use pt_core::{AgentId, MissionConfig, SimRng, Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};
use pt_partition::{FaultTracker, PartitionGenerator, VoronoiGenerator};

use crate::{
    BroadcastTransport, IdlenessSelector, LossyBroadcast, MobilityEngine, PatrolAgent,
    RouteSelector, Sim, SimError, SimResult,
};

/// RNG stream offsets, so subsystems never perturb each other.
const GENERATOR_STREAM: u64 = 1;
const TRANSPORT_STREAM: u64 = 2;

/// Fluent builder for [`Sim<E>`].
///
/// # Required inputs
///
/// - [`MissionConfig`]: total ticks, seed, drop probability, protocol
/// - [`PatrolGraph`]: the graph to patrol
/// - `E: PathEstimator`: travel-time oracle (e.g. [`pt_graph::DistanceTable`])
/// - the number of agents; ids are `0..agent_count`
///
/// # Optional inputs (have defaults)
///
/// | Method                   | Default                                        |
/// |--------------------------|------------------------------------------------|
/// | `.generator(g)`          | `VoronoiGenerator::default()`                  |
/// | `.selector(s)`           | `IdlenessSelector`                             |
/// | `.transport(t)`          | `LossyBroadcast` with `config.drop_probability` |
/// | `.initial_positions(v)`  | Lowest vertex of each agent's hinted partition |
/// | `.failure(agent, tick)`  | No failures                                    |
///
/// # Example
///
/// ```rust,ignore
/// let table = DistanceTable::build(&graph);
/// let mut sim = SimBuilder::new(config, graph, table, 4)
///     .failure(AgentId(1), Tick(300))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<E: PathEstimator> {
    config:      MissionConfig,
    graph:       PatrolGraph,
    estimator:   E,
    agent_count: usize,
    generator:   Option<Box<dyn PartitionGenerator>>,
    selector:    Option<Box<dyn RouteSelector>>,
    transport:   Option<Box<dyn BroadcastTransport>>,
    positions:   Option<Vec<VertexId>>,
    failures:    Vec<(AgentId, Tick)>,
}

impl<E: PathEstimator> SimBuilder<E> {
    /// Create a builder with all required inputs.
    pub fn new(config: MissionConfig, graph: PatrolGraph, estimator: E, agent_count: usize) -> Self {
        Self {
            config,
            graph,
            estimator,
            agent_count,
            generator: None,
            selector:  None,
            transport: None,
            positions: None,
            failures:  Vec::new(),
        }
    }

    /// Partition generator run once by the coordinator (agent 0).
    pub fn generator(mut self, generator: impl PartitionGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn selector(mut self, selector: impl RouteSelector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Replace the default lossy transport.  `config.drop_probability` is
    /// ignored when this is set.
    pub fn transport(mut self, transport: impl BroadcastTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Supply the starting vertex of each agent (must be length `agent_count`).
    pub fn initial_positions(mut self, positions: Vec<VertexId>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Lose `agent` at the start of `tick`.
    pub fn failure(mut self, agent: AgentId, tick: Tick) -> Self {
        self.failures.push((agent, tick));
        self
    }

    /// Validate inputs, generate and distribute the partition plan, place
    /// the agents, and return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim<E>> {
        let n = self.agent_count;

        // ── Validate ──────────────────────────────────────────────────────
        if n == 0 {
            return Err(SimError::Config("at least one agent is required".into()));
        }
        self.config.validate()?;
        let mut failures: BTreeMap<Tick, Vec<AgentId>> = BTreeMap::new();
        for (agent, tick) in self.failures {
            if agent.index() >= n {
                return Err(SimError::UnknownAgent(agent));
            }
            failures.entry(tick).or_default().push(agent);
        }
        if let Some(positions) = &self.positions {
            if positions.len() != n {
                return Err(SimError::AgentCountMismatch {
                    expected: n,
                    got:      positions.len(),
                    what:     "initial positions",
                });
            }
            for v in positions {
                self.graph.check_vertex(*v)?;
            }
        }

        // ── Plan: generated once by the coordinator ───────────────────────
        let ids: Vec<AgentId> = (0..n as u32).map(AgentId).collect();
        let coordinator = ids[0];
        let mut rng = SimRng::new(self.config.seed);
        let mut generator_rng = rng.child(GENERATOR_STREAM);
        let generator = self.generator.unwrap_or_else(|| Box::new(VoronoiGenerator::default()));
        let plan = generator.generate(&self.graph, &self.estimator, &ids, &mut generator_rng)?;
        let (owners, schedules) = plan.initial_maps(coordinator);
        info!(
            coordinator = %coordinator,
            partitions = plan.topology.partitions.len(),
            meeting_points = plan.topology.meeting_points.len(),
            "partition plan distributed",
        );

        let positions = match self.positions {
            Some(p) => p,
            None => ids
                .iter()
                .map(|a| {
                    plan.hinted_partition(*a)
                        .and_then(|p| p.vertices.first().copied())
                        .unwrap_or(VertexId(0))
                })
                .collect(),
        };

        // ── Agents ────────────────────────────────────────────────────────
        let topology = Arc::new(plan.topology.clone());
        let vertex_count = self.graph.vertex_count();
        let mut mobility = MobilityEngine::new(n);
        let mut agents = Vec::with_capacity(n);
        for (&id, &start) in ids.iter().zip(&positions) {
            let mut agent = PatrolAgent::new(
                id,
                topology.clone(),
                self.config.protocol.clone(),
                self.config.seed,
                vertex_count,
            );
            agent.partition.seed(owners.clone(), schedules.clone());
            agent.route.visit(start, Tick::ZERO);
            mobility.place(id, start, Tick::ZERO);
            agents.push(agent);
        }

        let mut transport = self.transport.unwrap_or_else(|| {
            Box::new(LossyBroadcast::new(self.config.drop_probability, rng.child(TRANSPORT_STREAM)))
        });
        for &id in &ids {
            transport.register(id);
        }

        Ok(Sim {
            now:       Tick::ZERO,
            config:    self.config,
            graph:     self.graph,
            estimator: self.estimator,
            plan,
            agents,
            alive:     vec![true; n],
            mobility,
            selector:  self.selector.unwrap_or_else(|| Box::new(IdlenessSelector)),
            transport,
            failures,
            faults:    FaultTracker::default(),
        })
    }
}
