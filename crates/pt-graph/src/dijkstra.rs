//! Shortest-tick searches over the patrol graph.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pt_core::VertexId;

use crate::PatrolGraph;

/// Distance value meaning "unreachable".
pub const UNREACHABLE: u64 = u64::MAX;

/// Shortest travel ticks from `source` to every vertex.
///
/// Unreachable vertices hold [`UNREACHABLE`].
pub fn single_source(graph: &PatrolGraph, source: VertexId) -> Vec<u64> {
    multi_source(graph, &[source]).into_iter().map(|(d, _)| d).collect()
}

/// Multi-source Dijkstra: for every vertex, the distance to the nearest
/// source and the index (into `sources`) of that source.
///
/// Ties between equidistant sources go to the lower source index, so the
/// result is a deterministic graph-Voronoi partition.  Unreachable vertices
/// hold `(UNREACHABLE, usize::MAX)`.
pub fn multi_source(graph: &PatrolGraph, sources: &[VertexId]) -> Vec<(u64, usize)> {
    let n = graph.vertex_count();
    let mut best = vec![(UNREACHABLE, usize::MAX); n];

    // Min-heap on (cost, source index, vertex).  The source index in the key
    // makes equal-cost ties resolve towards the lower source.
    let mut heap: BinaryHeap<Reverse<(u64, usize, VertexId)>> = BinaryHeap::new();
    for (i, &s) in sources.iter().enumerate() {
        if (0, i) < best[s.index()] {
            best[s.index()] = (0, i);
            heap.push(Reverse((0, i, s)));
        }
    }

    while let Some(Reverse((cost, src, v))) = heap.pop() {
        if (cost, src) > best[v.index()] {
            continue;
        }
        for (next, edge_cost) in graph.neighbors(v) {
            let cand = (cost.saturating_add(edge_cost as u64), src);
            if cand < best[next.index()] {
                best[next.index()] = cand;
                heap.push(Reverse((cand.0, src, next)));
            }
        }
    }

    best
}

/// Shortest travel ticks from `from` to `to`, stopping as soon as `to` is
/// settled.  `None` if `to` is unreachable.
pub fn point_to_point(graph: &PatrolGraph, from: VertexId, to: VertexId) -> Option<u64> {
    if from == to {
        return Some(0);
    }
    let mut dist = vec![UNREACHABLE; graph.vertex_count()];
    dist[from.index()] = 0;
    let mut heap: BinaryHeap<Reverse<(u64, VertexId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, v))) = heap.pop() {
        if v == to {
            return Some(cost);
        }
        if cost > dist[v.index()] {
            continue;
        }
        for (next, edge_cost) in graph.neighbors(v) {
            let new_cost = cost.saturating_add(edge_cost as u64);
            if new_cost < dist[next.index()] {
                dist[next.index()] = new_cost;
                heap.push(Reverse((new_cost, next)));
            }
        }
    }
    None
}
