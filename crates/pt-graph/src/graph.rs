//! Patrol graph representation and builder.
//!
//! # Data layout
//!
//! Adjacency uses **Compressed Sparse Row (CSR)** format.  Given a
//! `VertexId v`, its outgoing corridors occupy the slice:
//!
//! ```text
//! adj_to[ adj_start[v] .. adj_start[v+1] ]
//! ```
//!
//! with the matching traversal costs (in ticks) in `adj_cost`.  Neighbour
//! iteration is a contiguous memory scan, which keeps the Dijkstra inner loop
//! cheap.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps a planar `Point` to the nearest `VertexId`.
//! Used to snap agent start positions and floor-plan landmarks to vertices.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use pt_core::{Point, VertexId};

use crate::{GraphError, GraphResult};

// ── R-tree vertex entry ───────────────────────────────────────────────────────

#[derive(Clone)]
struct VertexEntry {
    point: [f32; 2],
    id:    VertexId,
}

impl RTreeObject for VertexEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VertexEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── PatrolGraph ───────────────────────────────────────────────────────────────

/// Patrol graph in CSR format plus a spatial index for vertex snapping.
///
/// Immutable once built.  Do not construct directly; use
/// [`PatrolGraphBuilder`].
pub struct PatrolGraph {
    // ── Vertex data ───────────────────────────────────────────────────────
    /// Planar position of each vertex.  Indexed by `VertexId`.
    pub vertex_pos: Vec<Point>,

    /// Optional colour tag of each vertex (floor-plan room class, zone, …).
    pub vertex_tag: Vec<Option<u32>>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// CSR row pointer.  Length = `vertex_count + 1`.
    pub adj_start: Vec<u32>,

    /// Destination vertex of each directed corridor.
    pub adj_to: Vec<VertexId>,

    /// Traversal cost of each directed corridor, in ticks (always ≥ 1).
    pub adj_cost: Vec<u32>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<VertexEntry>,
}

impl PatrolGraph {
    /// Construct an empty graph with no vertices.
    pub fn empty() -> Self {
        PatrolGraphBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn vertex_count(&self) -> usize {
        self.vertex_pos.len()
    }

    /// Number of directed corridors (an undirected corridor counts twice).
    pub fn edge_count(&self) -> usize {
        self.adj_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_pos.is_empty()
    }

    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        v.index() < self.vertex_pos.len()
    }

    /// `Ok(())` if `v` is a vertex of this graph.
    pub fn check_vertex(&self, v: VertexId) -> GraphResult<()> {
        if self.contains(v) { Ok(()) } else { Err(GraphError::VertexNotFound(v)) }
    }

    /// All vertex ids in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_pos.len()).map(|i| VertexId(i as u32))
    }

    // ── Vertex attributes ─────────────────────────────────────────────────

    #[inline]
    pub fn pos(&self, v: VertexId) -> Point {
        self.vertex_pos[v.index()]
    }

    #[inline]
    pub fn tag(&self, v: VertexId) -> Option<u32> {
        self.vertex_tag[v.index()]
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over `(neighbour, cost_ticks)` for every corridor leaving `v`.
    #[inline]
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = (VertexId, u32)> + '_ {
        let start = self.adj_start[v.index()] as usize;
        let end   = self.adj_start[v.index() + 1] as usize;
        (start..end).map(move |i| (self.adj_to[i], self.adj_cost[i]))
    }

    #[inline]
    pub fn degree(&self, v: VertexId) -> usize {
        let start = self.adj_start[v.index()] as usize;
        let end   = self.adj_start[v.index() + 1] as usize;
        end - start
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the vertex nearest to `pos`.
    ///
    /// Returns `None` only if the graph has no vertices.
    pub fn snap_to_vertex(&self, pos: Point) -> Option<VertexId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.x, pos.y])
            .map(|e| e.id)
    }

    /// Return up to `k` nearest vertices to `pos`, sorted by ascending distance.
    pub fn k_nearest_vertices(&self, pos: Point, k: usize) -> Vec<VertexId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.x, pos.y])
            .take(k)
            .map(|e| e.id)
            .collect()
    }
}

// ── PatrolGraphBuilder ────────────────────────────────────────────────────────

/// Construct a [`PatrolGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use pt_core::Point;
/// use pt_graph::PatrolGraphBuilder;
///
/// let mut b = PatrolGraphBuilder::new();
/// let a = b.add_vertex(Point::new(0.0, 0.0));
/// let c = b.add_vertex(Point::new(4.0, 0.0));
/// b.add_corridor(a, c, 2);
/// let graph = b.build();
/// assert_eq!(graph.vertex_count(), 2);
/// assert_eq!(graph.edge_count(), 2); // bidirectional
/// ```
pub struct PatrolGraphBuilder {
    positions: Vec<Point>,
    tags:      Vec<Option<u32>>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from: VertexId,
    to:   VertexId,
    cost: u32,
}

impl PatrolGraphBuilder {
    pub fn new() -> Self {
        Self { positions: Vec::new(), tags: Vec::new(), raw_edges: Vec::new() }
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            tags:      Vec::with_capacity(vertices),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a vertex and return its `VertexId` (sequential from 0).
    pub fn add_vertex(&mut self, pos: Point) -> VertexId {
        let id = VertexId(self.positions.len() as u32);
        self.positions.push(pos);
        self.tags.push(None);
        id
    }

    /// Add a vertex carrying a colour tag.
    pub fn add_tagged_vertex(&mut self, pos: Point, tag: u32) -> VertexId {
        let id = self.add_vertex(pos);
        self.tags[id.index()] = Some(tag);
        id
    }

    /// Add a **directed** corridor.  A cost of 0 is raised to 1 tick.
    pub fn add_directed_corridor(&mut self, from: VertexId, to: VertexId, cost_ticks: u32) {
        self.raw_edges.push(RawEdge { from, to, cost: cost_ticks.max(1) });
    }

    /// Add corridors in **both directions**.
    pub fn add_corridor(&mut self, a: VertexId, b: VertexId, cost_ticks: u32) {
        self.add_directed_corridor(a, b, cost_ticks);
        self.add_directed_corridor(b, a, cost_ticks);
    }

    /// Add a bidirectional corridor whose cost is the Euclidean length
    /// divided by `units_per_tick`, rounded up.
    pub fn add_corridor_by_distance(&mut self, a: VertexId, b: VertexId, units_per_tick: f32) {
        let length = self.positions[a.index()].distance(self.positions[b.index()]);
        let cost = (length / units_per_tick.max(f32::EPSILON)).ceil() as u32;
        self.add_corridor(a, b, cost);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`PatrolGraph`].
    pub fn build(self) -> PatrolGraph {
        let vertex_count = self.positions.len();
        let edge_count   = self.raw_edges.len();

        let mut raw = self.raw_edges;
        raw.sort_unstable_by_key(|e| (e.from.0, e.to.0));

        let adj_to:   Vec<VertexId> = raw.iter().map(|e| e.to).collect();
        let adj_cost: Vec<u32>      = raw.iter().map(|e| e.cost).collect();

        let mut adj_start = vec![0u32; vertex_count + 1];
        for e in &raw {
            adj_start[e.from.index() + 1] += 1;
        }
        for i in 1..=vertex_count {
            adj_start[i] += adj_start[i - 1];
        }
        debug_assert_eq!(adj_start[vertex_count] as usize, edge_count);

        let entries: Vec<VertexEntry> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| VertexEntry { point: [pos.x, pos.y], id: VertexId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        PatrolGraph {
            vertex_pos: self.positions,
            vertex_tag: self.tags,
            adj_start,
            adj_to,
            adj_cost,
            spatial_idx,
        }
    }
}

impl Default for PatrolGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
