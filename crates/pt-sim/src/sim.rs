//! The `Sim` struct and its tick loop.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use pt_core::{AgentId, MissionConfig, PartitionId, Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};
use pt_meeting::MovementDecision;
use pt_partition::{Envelope, FaultTracker, PartitionPlan, ProtocolEvent, Telemetry};

use crate::mobility::next_hop;
use crate::{
    AgentSnapshot, AgentStep, BroadcastTransport, MobilityEngine, PatrolAgent, RouteSelector,
    SimObserver, SimResult,
};

// ── TickReport ────────────────────────────────────────────────────────────────

/// What happened during one [`Sim::process_tick`] call.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Live agents that stood on a vertex and stepped.
    pub active: usize,
    /// Agents removed by failure injection this tick.
    pub lost:   Vec<AgentId>,
    /// Protocol events in apply order.
    pub events: Vec<ProtocolEvent>,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The mission runner.
///
/// `Sim<E>` holds all mission state and drives the five-phase tick loop:
///
/// 1. **Arrivals**: agents reaching the end of a corridor land on its vertex
///    and record the visit.
/// 2. **Failures**: agents scheduled to fail at this tick are removed.
/// 3. **Delivery**: every live agent's broadcasts from earlier ticks are
///    drained from the transport.
/// 4. **Step phase** (optionally parallel with the `parallel` feature): each
///    live agent absorbs its inbox and, if it stands on a vertex, runs its
///    meeting state machine.
/// 5. **Apply phase** (sequential, ascending `AgentId` for determinism):
///    start hops, hand broadcasts to the transport, count events.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<E: PathEstimator> {
    pub config: MissionConfig,

    /// The next tick to process.
    pub now: Tick,

    pub graph: PatrolGraph,

    pub estimator: E,

    /// The plan the coordinator generated before the mission.
    pub plan: PartitionPlan,

    /// Every agent ever deployed, indexed by `AgentId`.
    pub agents: Vec<PatrolAgent>,

    /// `false` once an agent has been lost.  Lost agents never come back.
    pub alive: Vec<bool>,

    pub mobility: MobilityEngine,

    pub selector: Box<dyn RouteSelector>,

    pub transport: Box<dyn BroadcastTransport>,

    /// Scheduled failures, `tick → agents`.
    pub failures: BTreeMap<Tick, Vec<AgentId>>,

    /// Counters over every protocol event seen so far.
    pub faults: FaultTracker,
}

impl<E: PathEstimator> Sim<E> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Run the mission from the current tick to `config.end_tick()`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        while self.now < self.config.end_tick() {
            self.run_one(observer)?;
        }
        observer.on_sim_end(self.now, &self.faults);
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.run_one(observer)?;
        }
        Ok(())
    }

    fn run_one<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let now = self.now;
        observer.on_tick_start(now);
        let report = self.process_tick(now)?;
        for agent in &report.lost {
            observer.on_agent_lost(*agent, now);
        }
        for event in &report.events {
            observer.on_protocol_event(event);
        }
        observer.on_tick_end(now, report.active);
        let interval = self.config.snapshot_interval_ticks;
        if interval > 0 && now.0.is_multiple_of(interval) {
            observer.on_snapshot(now, &self.snapshots());
        }
        self.now = now + 1;
        Ok(())
    }

    /// Remove `agent` from the mission: it stops moving, sending and
    /// receiving.  Its replicas are frozen as they are.  Returns `false` if
    /// it was already gone.
    pub fn destroy(&mut self, agent: AgentId) -> bool {
        match self.alive.get_mut(agent.index()) {
            Some(alive) if *alive => *alive = false,
            _ => return false,
        }
        self.transport.unregister(agent);
        self.mobility.remove(agent, self.now);
        info!(agent = %agent, tick = %self.now, "agent lost");
        true
    }

    pub fn is_alive(&self, agent: AgentId) -> bool {
        self.alive.get(agent.index()).copied().unwrap_or(false)
    }

    pub fn live_agents(&self) -> impl Iterator<Item = &PatrolAgent> + '_ {
        self.agents.iter().filter(|a| self.is_alive(a.id))
    }

    /// Union of `vertices_to_patrol()` over live agents.
    pub fn coverage(&self) -> BTreeSet<VertexId> {
        self.live_agents()
            .flat_map(|a| a.partition.vertices_to_patrol().iter().copied())
            .collect()
    }

    /// For every partition, the distinct owners recorded across live
    /// agents' replicas.  One entry per partition means the fleet agrees.
    pub fn owner_views(&self) -> BTreeMap<PartitionId, BTreeSet<AgentId>> {
        let mut views: BTreeMap<PartitionId, BTreeSet<AgentId>> = BTreeMap::new();
        for agent in self.live_agents() {
            for &pid in self.plan.topology.partitions.keys() {
                let entry = views.entry(pid).or_default();
                if let Some(owner) = agent.partition.owner_of(pid) {
                    entry.insert(owner);
                }
            }
        }
        views
    }

    /// One snapshot per agent, in `AgentId` order.
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .map(|a| a.debug_snapshot(self.now, self.is_alive(a.id), self.mobility.position(a.id)))
            .collect()
    }

    // ── Core tick processing ──────────────────────────────────────────────

    pub fn process_tick(&mut self, now: Tick) -> SimResult<TickReport> {
        let mut report = TickReport::default();

        // ── Phase 1: arrivals ─────────────────────────────────────────────
        for (agent, vertex) in self.mobility.tick_arrivals(now) {
            self.agents[agent.index()].route.visit(vertex, now);
        }

        // ── Phase 2: failure injection ────────────────────────────────────
        while let Some(entry) = self.failures.first_entry() {
            if *entry.key() > now {
                break;
            }
            for agent in entry.remove() {
                if self.destroy(agent) {
                    report.lost.push(agent);
                }
            }
        }

        // ── Phase 3: delivery ─────────────────────────────────────────────
        //
        // Drained before any agent steps, so broadcasts queued in this
        // tick's apply phase are only seen at `now + 1`.
        let inboxes: Vec<Option<Vec<Envelope>>> = (0..self.agents.len())
            .map(|i| {
                let agent = AgentId(i as u32);
                self.alive[i].then(|| self.transport.receive_all(agent, now))
            })
            .collect();

        // ── Phase 4: step phase (produce) ─────────────────────────────────
        let steps = self.step_agents(now, inboxes);

        // ── Phase 5: apply phase (consume) ────────────────────────────────
        for step in steps.into_iter().flatten() {
            if step.decision != MovementDecision::Continue {
                report.active += 1;
            }
            self.apply_step(step, now, &mut report);
        }

        Ok(report)
    }

    /// Step every live agent.  With the `parallel` Cargo feature the agents
    /// run on Rayon's thread pool; each one only touches its own state.
    fn step_agents(&mut self, now: Tick, inboxes: Vec<Option<Vec<Envelope>>>) -> Vec<Option<AgentStep>> {
        // Explicit field borrows so the borrow checker sees disjoint access.
        let graph                         = &self.graph;
        let estimator: &dyn PathEstimator = &self.estimator;
        let selector                      = self.selector.as_ref();
        let mobility                      = &self.mobility;

        #[cfg(not(feature = "parallel"))]
        {
            self.agents
                .iter_mut()
                .zip(inboxes)
                .map(|(agent, inbox)| {
                    let inbox = inbox?;
                    let position = mobility.position(agent.id);
                    Some(agent.step(now, position, &inbox, graph, estimator, selector))
                })
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            self.agents
                .par_iter_mut()
                .zip(inboxes.into_par_iter())
                .map(|(agent, inbox)| {
                    let inbox = inbox?;
                    let position = mobility.position(agent.id);
                    Some(agent.step(now, position, &inbox, graph, estimator, selector))
                })
                .collect()
        }
    }

    /// Apply one agent's step during the sequential write phase.
    fn apply_step(&mut self, step: AgentStep, now: Tick, report: &mut TickReport) {
        let agent = step.agent;
        if let Some(target) = step.decision.target() {
            self.start_hop(agent, step.decision, target, now);
        }
        for envelope in step.outbox {
            self.transport.broadcast(envelope);
        }
        for event in step.events {
            self.faults.record(event.clone());
            report.events.push(event);
        }
    }

    /// Move one corridor towards `target`.  A `Follow` to a neighbour takes
    /// that corridor directly; anything else takes the first corridor of a
    /// shortest route.  Failures are non-fatal: the agent stays put.
    fn start_hop(&mut self, agent: AgentId, decision: MovementDecision, target: VertexId, now: Tick) {
        let Some(from) = self.mobility.position(agent) else {
            return;
        };
        let adjacent = self.graph.neighbors(from).any(|(n, _)| n == target);
        let hop = match decision {
            MovementDecision::Follow(_) if adjacent => Some(target),
            _ => next_hop(&self.graph, &self.estimator, from, target),
        };
        let Some(hop) = hop else {
            if from != target {
                warn!(agent = %agent, from = %from, to = %target, "no route, holding");
            }
            return;
        };
        if let Err(e) = self.mobility.begin_hop(agent, hop, now, &self.graph) {
            warn!(agent = %agent, error = %e, "hop rejected");
        }
    }
}
