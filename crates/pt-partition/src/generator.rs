//! Partition generator oracle.
//!
//! Invoked once, before the mission, by the coordinating agent (the lowest
//! id).  Its output seeds every replica, so it only has to be deterministic
//! for a given graph, agent list and RNG state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use pt_core::{AgentId, PartitionId, Point, SimRng, Tick, VertexId};
use pt_graph::dijkstra::{self, UNREACHABLE};
use pt_graph::{PathEstimator, PatrolGraph};

use crate::{
    MeetingPoint, MeetingSchedule, PartitionError, PartitionInfo, PartitionPlan, PartitionResult,
    Topology, EXCHANGE_TICKS,
};

// ── Trait ─────────────────────────────────────────────────────────────────────

pub trait PartitionGenerator {
    /// Produce a plan with exactly one partition per agent.
    fn generate(
        &self,
        graph:     &PatrolGraph,
        estimator: &dyn PathEstimator,
        agents:    &[AgentId],
        rng:       &mut SimRng,
    ) -> PartitionResult<PartitionPlan>;
}

// ── StaticGenerator ───────────────────────────────────────────────────────────

/// Returns a fixed, hand-written plan after validating it.
pub struct StaticGenerator {
    pub plan: PartitionPlan,
}

impl StaticGenerator {
    pub fn new(plan: PartitionPlan) -> Self {
        Self { plan }
    }
}

impl PartitionGenerator for StaticGenerator {
    fn generate(
        &self,
        graph:      &PatrolGraph,
        _estimator: &dyn PathEstimator,
        agents:     &[AgentId],
        _rng:       &mut SimRng,
    ) -> PartitionResult<PartitionPlan> {
        self.plan.validate(graph, agents)?;
        Ok(self.plan.clone())
    }
}

// ── VoronoiGenerator ──────────────────────────────────────────────────────────

/// Graph-Voronoi clustering with one cell per agent.
///
/// 1. Seeds: a random first vertex, then farthest-point sampling.
/// 2. Refinement: each seed moves to the cell vertex closest to the cell's
///    planar centroid, for up to `refine_iterations` rounds.
/// 3. One meeting point per adjacent cell pair, at the boundary vertex with
///    the smallest summed distance to both seeds.  It is added to both cells.
/// 4. Diameter: twice the seed's eccentricity within its final cell, plus
///    one exchange.  That bounds the walk between any two cell vertices and
///    the rendezvous the walk starts from.
/// 5. Schedules: greedy, so consecutive meetings of any partition leave
///    room for a diameter, an exchange and the trip between their vertices.
pub struct VoronoiGenerator {
    pub refine_iterations: usize,
}

impl Default for VoronoiGenerator {
    fn default() -> Self {
        Self { refine_iterations: 8 }
    }
}

impl PartitionGenerator for VoronoiGenerator {
    fn generate(
        &self,
        graph:     &PatrolGraph,
        estimator: &dyn PathEstimator,
        agents:    &[AgentId],
        rng:       &mut SimRng,
    ) -> PartitionResult<PartitionPlan> {
        let mut agents: Vec<AgentId> = agents.to_vec();
        agents.sort_unstable();
        agents.dedup();

        if agents.is_empty() {
            return Err(PartitionError::NoAgents);
        }
        let n = graph.vertex_count();
        if n < agents.len() {
            return Err(PartitionError::TooFewVertices { vertices: n, agents: agents.len() });
        }
        let reach = dijkstra::single_source(graph, VertexId(0));
        if let Some(i) = reach.iter().position(|d| *d == UNREACHABLE) {
            return Err(PartitionError::Disconnected(VertexId(i as u32)));
        }

        let seeds = self.place_seeds(graph, agents.len(), rng);
        let assignment = dijkstra::multi_source(graph, &seeds);

        let mut cells: Vec<BTreeSet<VertexId>> = vec![BTreeSet::new(); seeds.len()];
        for v in graph.vertices() {
            cells[assignment[v.index()].1].insert(v);
        }

        let meeting_points = meeting_points(graph, &seeds, &assignment, &mut cells);

        let mut partitions = Vec::with_capacity(seeds.len());
        for (i, (&seed, vertices)) in seeds.iter().zip(cells).enumerate() {
            let dist = dijkstra::single_source(graph, seed);
            let eccentricity = vertices.iter().map(|v| dist[v.index()]).max().unwrap_or(0);
            let id = PartitionId(i as u32);
            partitions.push(PartitionInfo {
                id,
                owner_hint: agents[i],
                meeting_points: meeting_points
                    .values()
                    .filter(|m| m.partitions.contains(&id))
                    .map(|m| m.vertex)
                    .collect(),
                vertices,
                diameter: 2 * eccentricity + EXCHANGE_TICKS,
            });
        }

        let topology = Topology::new(partitions, meeting_points.into_values());
        let schedules = greedy_schedules(&topology, graph, estimator);
        debug!(
            partitions = topology.partitions.len(),
            meeting_points = topology.meeting_points.len(),
            "voronoi partition plan generated",
        );

        let plan = PartitionPlan { topology, schedules };
        plan.validate(graph, &agents)?;
        Ok(plan)
    }
}

impl VoronoiGenerator {
    fn place_seeds(&self, graph: &PatrolGraph, k: usize, rng: &mut SimRng) -> Vec<VertexId> {
        let n = graph.vertex_count();
        let mut seeds = vec![VertexId(rng.gen_range(0..n as u32))];
        while seeds.len() < k {
            let dist = dijkstra::multi_source(graph, &seeds);
            // Farthest vertex; ties go to the lower id.
            let far = (0..n)
                .filter(|i| dist[*i].0 > 0)
                .max_by_key(|i| (dist[*i].0, std::cmp::Reverse(*i)));
            match far {
                Some(i) => seeds.push(VertexId(i as u32)),
                None => break,
            }
        }

        for _ in 0..self.refine_iterations {
            let assignment = dijkstra::multi_source(graph, &seeds);
            let mut members: Vec<Vec<VertexId>> = vec![Vec::new(); seeds.len()];
            for v in graph.vertices() {
                members[assignment[v.index()].1].push(v);
            }
            let refined: Vec<VertexId> = members
                .iter()
                .zip(&seeds)
                .map(|(cell, &seed)| {
                    let Some(c) = Point::centroid(cell.iter().map(|v| graph.pos(*v))) else {
                        return seed;
                    };
                    cell.iter()
                        .copied()
                        .min_by(|a, b| {
                            graph.pos(*a).distance_2(c)
                                .total_cmp(&graph.pos(*b).distance_2(c))
                                .then(a.cmp(b))
                        })
                        .unwrap_or(seed)
                })
                .collect();
            if refined == seeds {
                break;
            }
            seeds = refined;
        }
        seeds
    }
}

/// Pick one meeting vertex per adjacent cell pair and share it into both
/// cells.  A vertex chosen for several pairs becomes one meeting point.
fn meeting_points(
    graph:      &PatrolGraph,
    seeds:      &[VertexId],
    assignment: &[(u64, usize)],
    cells:      &mut [BTreeSet<VertexId>],
) -> BTreeMap<VertexId, MeetingPoint> {
    let seed_dist: Vec<Vec<u64>> = seeds.iter().map(|s| dijkstra::single_source(graph, *s)).collect();

    // (cell a, cell b) with a < b → (score, vertex) of the best candidate.
    let mut best: BTreeMap<(usize, usize), (u64, VertexId)> = BTreeMap::new();
    for u in graph.vertices() {
        let a = assignment[u.index()].1;
        for (w, _) in graph.neighbors(u) {
            let b = assignment[w.index()].1;
            if a == b {
                continue;
            }
            let score = seed_dist[a][u.index()].saturating_add(seed_dist[b][u.index()]);
            let key = (a.min(b), a.max(b));
            let cand = (score, u);
            best.entry(key)
                .and_modify(|cur| if cand < *cur { *cur = cand })
                .or_insert(cand);
        }
    }

    let mut points: BTreeMap<VertexId, MeetingPoint> = BTreeMap::new();
    for ((a, b), (_, v)) in best {
        cells[a].insert(v);
        cells[b].insert(v);
        points
            .entry(v)
            .or_insert_with(|| MeetingPoint { vertex: v, partitions: BTreeSet::new() })
            .partitions
            .extend([PartitionId(a as u32), PartitionId(b as u32)]);
    }
    // A meeting vertex shared by three pairs must lie in all its cells.
    for mp in points.values() {
        for p in &mp.partitions {
            cells[p.index()].insert(mp.vertex);
        }
    }
    points
}

/// Greedy initial schedules.  Meeting points are visited in vertex order
/// twice: the first pass fills `current_next`, the second `next_next`.
///
/// A partition's first slot is one diameter in, which covers the walk from
/// any start vertex.  Every later slot waits for the previous one plus a
/// diameter, an exchange and the trip from the previous meeting vertex.
fn greedy_schedules(
    topology:  &Topology,
    graph:     &PatrolGraph,
    estimator: &dyn PathEstimator,
) -> BTreeMap<VertexId, MeetingSchedule> {
    let mut last: BTreeMap<PartitionId, (Tick, VertexId)> = BTreeMap::new();
    let mut slot = |mp: &MeetingPoint| {
        let tick = mp
            .partitions
            .iter()
            .map(|p| {
                let diameter = topology.diameter(*p);
                match last.get(p) {
                    Some(&(prev, from)) => {
                        let trip = estimator.estimate_ticks(graph, from, mp.vertex).unwrap_or(diameter);
                        prev + diameter + EXCHANGE_TICKS + trip
                    }
                    None => Tick::ZERO + diameter,
                }
            })
            .max()
            .unwrap_or(Tick::ZERO);
        for p in &mp.partitions {
            last.insert(*p, (tick, mp.vertex));
        }
        tick
    };

    let current: Vec<(VertexId, Tick)> = topology
        .meeting_points
        .values()
        .map(|mp| (mp.vertex, slot(mp)))
        .collect();
    current
        .into_iter()
        .zip(topology.meeting_points.values())
        .map(|((v, c), mp)| (v, MeetingSchedule::new(c, slot(mp).max(c + 1))))
        .collect()
}
