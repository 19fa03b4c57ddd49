//! Route selection: where an agent goes next while it is just patrolling.
//!
//! The meeting layer treats the selector's answer as a suggestion and may
//! override it with a `GoTo`.

use std::collections::BTreeSet;

use pt_core::{AgentId, AgentRng, Tick, VertexId};
use pt_graph::PatrolGraph;

// ── PatrolRoute ───────────────────────────────────────────────────────────────

/// One agent's memory of when it last stood on each vertex.
#[derive(Clone, Debug)]
pub struct PatrolRoute {
    last_visit: Vec<Option<Tick>>,
}

impl PatrolRoute {
    pub fn new(vertex_count: usize) -> Self {
        Self { last_visit: vec![None; vertex_count] }
    }

    pub fn visit(&mut self, vertex: VertexId, now: Tick) {
        if let Some(slot) = self.last_visit.get_mut(vertex.index()) {
            *slot = Some(now);
        }
    }

    pub fn last_visit(&self, vertex: VertexId) -> Option<Tick> {
        self.last_visit.get(vertex.index()).copied().flatten()
    }

    /// Ticks since the last visit.  Never-visited vertices count as idle
    /// since before the mission started.
    pub fn idleness(&self, vertex: VertexId, now: Tick) -> u64 {
        match self.last_visit(vertex) {
            Some(t) => now.saturating_since(t),
            None    => now.0 + 1,
        }
    }
}

// ── RouteSelector ─────────────────────────────────────────────────────────────

pub trait RouteSelector: Send + Sync {
    /// Next vertex to head for, or `None` to stay put.  Need not be a
    /// neighbour of `position`; the mobility layer routes to it one corridor
    /// at a time.
    #[allow(clippy::too_many_arguments)]
    fn suggest_next_vertex(
        &self,
        agent:    AgentId,
        position: VertexId,
        patrol:   &BTreeSet<VertexId>,
        route:    &PatrolRoute,
        graph:    &PatrolGraph,
        now:      Tick,
        rng:      &mut AgentRng,
    ) -> Option<VertexId>;
}

/// Greedy idleness patrolling.
///
/// Picks the most idle neighbour inside the patrol set.  If no neighbour is
/// in the set (the agent has just been handed a distant partition) it picks
/// the most idle patrol vertex anywhere.  Ties are broken at random.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdlenessSelector;

impl RouteSelector for IdlenessSelector {
    fn suggest_next_vertex(
        &self,
        _agent:   AgentId,
        position: VertexId,
        patrol:   &BTreeSet<VertexId>,
        route:    &PatrolRoute,
        graph:    &PatrolGraph,
        now:      Tick,
        rng:      &mut AgentRng,
    ) -> Option<VertexId> {
        let local: BTreeSet<VertexId> = graph
            .neighbors(position)
            .map(|(n, _)| n)
            .filter(|n| *n != position && patrol.contains(n))
            .collect();
        let pool: Vec<VertexId> = if local.is_empty() {
            patrol.iter().copied().filter(|v| *v != position).collect()
        } else {
            local.into_iter().collect()
        };

        let best = pool.iter().map(|v| route.idleness(*v, now)).max()?;
        let ties: Vec<VertexId> = pool
            .into_iter()
            .filter(|v| route.idleness(*v, now) == best)
            .collect();
        rng.choose(&ties).copied()
    }
}
