//! One patrolling agent: its protocol components plus its private RNG and
//! visit memory.

use std::sync::Arc;

use pt_core::{AgentId, AgentRng, ProtocolConfig, Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};
use pt_meeting::{MeetingComponent, MeetingState, MovementDecision, StepContext};
use pt_partition::{Envelope, PartitionComponent, PartitionSnapshot, ProtocolEvent, Topology};

use crate::{PatrolRoute, RouteSelector};

// ── AgentSnapshot ─────────────────────────────────────────────────────────────

/// Read-only per-agent view handed to observers at snapshot ticks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSnapshot {
    pub tick:      Tick,
    pub alive:     bool,
    /// `None` while in transit or after the agent was lost.
    pub position:  Option<VertexId>,
    pub meeting:   MeetingState,
    pub partition: PartitionSnapshot,
}

// ── AgentStep ─────────────────────────────────────────────────────────────────

/// Everything one agent produced during the step phase.  Applied by the
/// mission runner in ascending `AgentId` order.
#[derive(Debug)]
pub struct AgentStep {
    pub agent:    AgentId,
    pub decision: MovementDecision,
    pub outbox:   Vec<Envelope>,
    pub events:   Vec<ProtocolEvent>,
}

// ── PatrolAgent ───────────────────────────────────────────────────────────────

pub struct PatrolAgent {
    pub id:        AgentId,
    pub partition: PartitionComponent,
    pub meeting:   MeetingComponent,
    pub route:     PatrolRoute,
    pub rng:       AgentRng,
}

impl PatrolAgent {
    pub fn new(
        id:           AgentId,
        topology:     Arc<Topology>,
        protocol:     ProtocolConfig,
        seed:         u64,
        vertex_count: usize,
    ) -> Self {
        Self {
            id,
            partition: PartitionComponent::new(id, topology, protocol),
            meeting:   MeetingComponent::new(id),
            route:     PatrolRoute::new(vertex_count),
            rng:       AgentRng::new(seed, id),
        }
    }

    /// Absorb this tick's inbox, then decide what to do.  `position` is
    /// `None` while the agent is between vertices; it keeps listening but
    /// makes no decision until it lands.
    pub fn step(
        &mut self,
        now:       Tick,
        position:  Option<VertexId>,
        inbox:     &[Envelope],
        graph:     &PatrolGraph,
        estimator: &dyn PathEstimator,
        selector:  &dyn RouteSelector,
    ) -> AgentStep {
        for envelope in inbox {
            self.partition.absorb(envelope);
        }

        let mut step = AgentStep {
            agent:    self.id,
            decision: MovementDecision::Continue,
            outbox:   Vec::new(),
            events:   Vec::new(),
        };
        let Some(position) = position else {
            return step;
        };

        let suggestion = selector.suggest_next_vertex(
            self.id,
            position,
            self.partition.vertices_to_patrol(),
            &self.route,
            graph,
            now,
            &mut self.rng,
        );
        let ctx = StepContext { now, position, suggestion, graph, estimator };
        step.decision = self.meeting.step(ctx, &mut self.partition, &mut step.outbox, &mut step.events);
        step
    }

    /// Abandon any meeting in progress and forget tentative takeovers.
    pub fn reset(&mut self) {
        self.meeting.reset(&mut self.partition);
        self.partition.reset_transient();
    }

    pub fn debug_snapshot(&self, tick: Tick, alive: bool, position: Option<VertexId>) -> AgentSnapshot {
        AgentSnapshot {
            tick,
            alive,
            position,
            meeting:   *self.meeting.state(),
            partition: self.partition.debug_snapshot(),
        }
    }
}
