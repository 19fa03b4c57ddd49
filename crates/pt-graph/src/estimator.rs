//! Travel-time estimation trait and its implementations.
//!
//! # Pluggability
//!
//! The protocol crates ask "how many ticks from here to there?" through the
//! [`PathEstimator`] trait, so applications can swap in an estimator backed
//! by their own path planner without touching the protocol core.

use pt_core::VertexId;

use crate::dijkstra::{self, UNREACHABLE};
use crate::PatrolGraph;

// ── PathEstimator trait ───────────────────────────────────────────────────────

/// Pluggable travel-cost oracle.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so they can be shared across Rayon
/// worker threads during the parallel agent step.
pub trait PathEstimator: Send + Sync {
    /// Ticks needed to travel from `from` to `to`, or `None` if `to` is
    /// unreachable.  `from == to` is `Some(0)`.
    fn estimate_ticks(&self, graph: &PatrolGraph, from: VertexId, to: VertexId) -> Option<u64>;
}

// ── DijkstraEstimator ─────────────────────────────────────────────────────────

/// Runs a point-to-point Dijkstra per query.  No precomputation; suitable for
/// large graphs with few agents.
pub struct DijkstraEstimator;

impl PathEstimator for DijkstraEstimator {
    fn estimate_ticks(&self, graph: &PatrolGraph, from: VertexId, to: VertexId) -> Option<u64> {
        if !graph.contains(from) || !graph.contains(to) {
            return None;
        }
        dijkstra::point_to_point(graph, from, to)
    }
}

// ── DistanceTable ─────────────────────────────────────────────────────────────

/// All-pairs shortest travel ticks, precomputed once (`n` Dijkstra runs).
///
/// Memory is `n²` `u64`s, so this is meant for floor-plan-sized graphs
/// (hundreds to a few thousand vertices).  Every query is an O(1) lookup.
pub struct DistanceTable {
    n:    usize,
    dist: Vec<u64>,
}

impl DistanceTable {
    pub fn build(graph: &PatrolGraph) -> Self {
        let n = graph.vertex_count();
        let mut dist = Vec::with_capacity(n * n);
        for v in graph.vertices() {
            dist.extend(dijkstra::single_source(graph, v));
        }
        Self { n, dist }
    }

    pub fn vertex_count(&self) -> usize {
        self.n
    }

    /// Ticks from `from` to `to`, `None` if unreachable or out of range.
    #[inline]
    pub fn get(&self, from: VertexId, to: VertexId) -> Option<u64> {
        if from.index() >= self.n || to.index() >= self.n {
            return None;
        }
        match self.dist[from.index() * self.n + to.index()] {
            UNREACHABLE => None,
            d => Some(d),
        }
    }
}

impl PathEstimator for DistanceTable {
    fn estimate_ticks(&self, graph: &PatrolGraph, from: VertexId, to: VertexId) -> Option<u64> {
        debug_assert_eq!(graph.vertex_count(), self.n, "distance table built for another graph");
        self.get(from, to)
    }
}
