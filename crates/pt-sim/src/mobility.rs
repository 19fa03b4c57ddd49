//! Edge-by-edge movement with teleport-at-arrival.

use tracing::trace;

use pt_core::{AgentId, Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};

use crate::{MobilityError, MobilityResult};

// ── MovementState ─────────────────────────────────────────────────────────────

/// The movement state of a single agent.
///
/// An agent is either **stationary** on a vertex or **in transit** along one
/// corridor.  It logically stays at `departure` until `arrival_tick`, then
/// instantly appears at `destination`.  Agents only ever travel one corridor
/// at a time, so the meeting layer gets to decide again on every vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementState {
    pub in_transit:     bool,
    pub departure:      VertexId,
    /// Equals `departure` when stationary.
    pub destination:    VertexId,
    pub departure_tick: Tick,
    pub arrival_tick:   Tick,
}

impl MovementState {
    #[inline]
    pub fn stationary(vertex: VertexId, tick: Tick) -> Self {
        Self {
            in_transit:     false,
            departure:      vertex,
            destination:    vertex,
            departure_tick: tick,
            arrival_tick:   tick,
        }
    }

    /// Fraction of the hop completed at `now`, in `[0.0, 1.0]`.
    pub fn progress(&self, now: Tick) -> f32 {
        if !self.in_transit || self.arrival_tick <= self.departure_tick {
            return 1.0;
        }
        let elapsed = now.saturating_since(self.departure_tick) as f32;
        let total   = (self.arrival_tick - self.departure_tick) as f32;
        (elapsed / total).min(1.0)
    }
}

// ── MobilityEngine ────────────────────────────────────────────────────────────

/// Movement state of every agent, indexed by `AgentId`.
pub struct MobilityEngine {
    pub states: Vec<MovementState>,
}

impl MobilityEngine {
    /// All agents unplaced (`VertexId::INVALID`).
    pub fn new(agent_count: usize) -> Self {
        Self { states: vec![MovementState::stationary(VertexId::INVALID, Tick::ZERO); agent_count] }
    }

    /// Teleport `agent` onto `vertex` (initial placement).
    pub fn place(&mut self, agent: AgentId, vertex: VertexId, tick: Tick) {
        self.states[agent.index()] = MovementState::stationary(vertex, tick);
    }

    /// Take `agent` off the graph.
    pub fn remove(&mut self, agent: AgentId, tick: Tick) {
        self.place(agent, VertexId::INVALID, tick);
    }

    pub fn state(&self, agent: AgentId) -> &MovementState {
        &self.states[agent.index()]
    }

    /// Vertex the agent stands on, `None` while in transit or unplaced.
    pub fn position(&self, agent: AgentId) -> Option<VertexId> {
        let s = &self.states[agent.index()];
        (!s.in_transit && s.departure != VertexId::INVALID).then_some(s.departure)
    }

    /// Start `agent` along the corridor to the neighbouring vertex `to`.
    /// Returns the arrival tick.
    pub fn begin_hop(
        &mut self,
        agent: AgentId,
        to:    VertexId,
        now:   Tick,
        graph: &PatrolGraph,
    ) -> MobilityResult<Tick> {
        let state = &self.states[agent.index()];
        if state.in_transit {
            return Err(MobilityError::AlreadyInTransit(agent));
        }
        let from = state.departure;
        if from == VertexId::INVALID {
            return Err(MobilityError::NotPlaced(agent));
        }
        let cost = graph
            .neighbors(from)
            .filter(|(n, _)| *n == to)
            .map(|(_, c)| c)
            .min()
            .ok_or(MobilityError::NotAdjacent { from, to })?;

        let arrival = now + u64::from(cost);
        trace!(agent = %agent, from = %from, to = %to, arrival = %arrival, "hop started");
        self.states[agent.index()] = MovementState {
            in_transit:     true,
            departure:      from,
            destination:    to,
            departure_tick: now,
            arrival_tick:   arrival,
        };
        Ok(arrival)
    }

    /// Land every agent whose `arrival_tick <= now`.  Returns who arrived
    /// where, in ascending `AgentId` order.
    pub fn tick_arrivals(&mut self, now: Tick) -> Vec<(AgentId, VertexId)> {
        self.states
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.in_transit && s.arrival_tick <= now)
            .map(|(i, s)| {
                let dest = s.destination;
                *s = MovementState::stationary(dest, now);
                (AgentId(i as u32), dest)
            })
            .collect()
    }
}

/// First corridor on a shortest route from `from` to `dest`: the neighbour
/// minimising `cost + eta(neighbour, dest)`, ties to the lower vertex id.
/// `None` if `from == dest` or `dest` is unreachable.
pub fn next_hop(
    graph:     &PatrolGraph,
    estimator: &dyn PathEstimator,
    from:      VertexId,
    dest:      VertexId,
) -> Option<VertexId> {
    if from == dest {
        return None;
    }
    graph
        .neighbors(from)
        .filter_map(|(n, c)| {
            estimator
                .estimate_ticks(graph, n, dest)
                .map(|rest| (u64::from(c).saturating_add(rest), n))
        })
        .min()
        .map(|(_, n)| n)
}
