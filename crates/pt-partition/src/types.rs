//! Partition data model.
//!
//! The [`Topology`] is the immutable part of a partition plan: which vertices
//! belong to which partition and where partitions meet.  It is built once,
//! wrapped in an `Arc`, and shared by every agent.  The mutable part (who
//! currently owns a partition, when the next meeting at a vertex is) lives
//! only in the replicated maps of each agent's `PartitionComponent`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use pt_core::{AgentId, PartitionId, Tick, VertexId};
use pt_graph::PatrolGraph;
use pt_stigmergy::{MapSnapshot, ReplicatedMap};

use crate::{PartitionError, PartitionResult};

// ── PartitionInfo ─────────────────────────────────────────────────────────────

/// A fixed subset of the patrol graph that one agent is responsible for.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionInfo {
    pub id:             PartitionId,
    /// Owner chosen by the generator.  Seeds the owner map; never consulted
    /// again once the mission runs.
    pub owner_hint:     AgentId,
    pub vertices:       BTreeSet<VertexId>,
    /// Meeting vertices this partition takes part in.
    pub meeting_points: Vec<VertexId>,
    /// Ticks needed to patrol the whole partition once.  At least 1.
    pub diameter:       u64,
}

// ── MeetingPoint ──────────────────────────────────────────────────────────────

/// A vertex shared by two or more partitions where their owners rendezvous.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeetingPoint {
    pub vertex:     VertexId,
    pub partitions: BTreeSet<PartitionId>,
}

// ── MeetingSchedule ───────────────────────────────────────────────────────────

/// The next two meeting ticks at a vertex.  `current_next <= next_next`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeetingSchedule {
    pub current_next: Tick,
    pub next_next:    Tick,
}

impl MeetingSchedule {
    pub fn new(current_next: Tick, next_next: Tick) -> Self {
        Self { current_next, next_next }
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.current_next <= self.next_next
    }

    /// Both ticks shifted `ticks` later.
    pub fn postponed(self, ticks: u64) -> Self {
        Self {
            current_next: self.current_next + ticks,
            next_next:    self.next_next + ticks,
        }
    }
}

impl fmt::Display for MeetingSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.current_next, self.next_next)
    }
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Arena of partitions and meeting points, addressed by id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    pub partitions:     BTreeMap<PartitionId, PartitionInfo>,
    pub meeting_points: BTreeMap<VertexId, MeetingPoint>,
}

impl Topology {
    /// Build the arena from lists.  Later duplicates replace earlier ones.
    pub fn new(
        partitions:     impl IntoIterator<Item = PartitionInfo>,
        meeting_points: impl IntoIterator<Item = MeetingPoint>,
    ) -> Self {
        Self {
            partitions:     partitions.into_iter().map(|p| (p.id, p)).collect(),
            meeting_points: meeting_points.into_iter().map(|m| (m.vertex, m)).collect(),
        }
    }

    #[inline]
    pub fn partition(&self, id: PartitionId) -> Option<&PartitionInfo> {
        self.partitions.get(&id)
    }

    #[inline]
    pub fn meeting_point(&self, vertex: VertexId) -> Option<&MeetingPoint> {
        self.meeting_points.get(&vertex)
    }

    /// Partitions meeting at `vertex`; empty if it is not a meeting point.
    pub fn partitions_at(&self, vertex: VertexId) -> impl Iterator<Item = PartitionId> + '_ {
        self.meeting_points
            .get(&vertex)
            .into_iter()
            .flat_map(|m| m.partitions.iter().copied())
    }

    pub fn diameter(&self, id: PartitionId) -> u64 {
        self.partitions.get(&id).map_or(0, |p| p.diameter)
    }
}

// ── PartitionPlan ─────────────────────────────────────────────────────────────

/// The generator's output: a topology plus the initial meeting schedules.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionPlan {
    pub topology:  Topology,
    pub schedules: BTreeMap<VertexId, MeetingSchedule>,
}

impl PartitionPlan {
    /// Check the plan against the graph and the mission's agent set.
    pub fn validate(&self, graph: &PatrolGraph, agents: &[AgentId]) -> PartitionResult<()> {
        let topo = &self.topology;

        if topo.partitions.len() != agents.len() {
            return Err(PartitionError::PartitionCountMismatch {
                partitions: topo.partitions.len(),
                agents:     agents.len(),
            });
        }
        let agent_set: BTreeSet<AgentId> = agents.iter().copied().collect();
        let mut hinted = BTreeSet::new();
        for p in topo.partitions.values() {
            if !agent_set.contains(&p.owner_hint) || !hinted.insert(p.owner_hint) {
                return Err(PartitionError::UnknownOwnerHint(p.owner_hint));
            }
        }

        let mut covered = vec![false; graph.vertex_count()];
        for p in topo.partitions.values() {
            for &v in &p.vertices {
                if !graph.contains(v) {
                    return Err(PartitionError::UnknownVertex(v));
                }
                covered[v.index()] = true;
            }
            for &m in &p.meeting_points {
                let listed = topo
                    .meeting_point(m)
                    .is_some_and(|mp| mp.partitions.contains(&p.id));
                if !listed {
                    return Err(PartitionError::MeetingOutsidePartition { vertex: m, partition: p.id });
                }
            }
        }
        if let Some(i) = covered.iter().position(|c| !c) {
            return Err(PartitionError::UncoveredVertex(VertexId(i as u32)));
        }

        for mp in topo.meeting_points.values() {
            for &pid in &mp.partitions {
                let p = topo.partition(pid).ok_or(PartitionError::UnknownPartition(pid))?;
                if !p.vertices.contains(&mp.vertex) || !p.meeting_points.contains(&mp.vertex) {
                    return Err(PartitionError::MeetingOutsidePartition {
                        vertex:    mp.vertex,
                        partition: pid,
                    });
                }
            }
            let schedule = self
                .schedules
                .get(&mp.vertex)
                .ok_or(PartitionError::MissingSchedule(mp.vertex))?;
            if !schedule.is_ordered() {
                return Err(PartitionError::UnorderedSchedule(mp.vertex));
            }
        }
        Ok(())
    }

    /// Initial contents of both replicated maps, written by `coordinator` at
    /// version 1.  Every replica is seeded from these snapshots.
    pub fn initial_maps(
        &self,
        coordinator: AgentId,
    ) -> (MapSnapshot<PartitionId, AgentId>, MapSnapshot<VertexId, MeetingSchedule>) {
        let mut owners = ReplicatedMap::new(coordinator);
        for p in self.topology.partitions.values() {
            owners.put(p.id, p.owner_hint, Tick::ZERO);
        }
        let mut schedules = ReplicatedMap::new(coordinator);
        for (&v, &s) in &self.schedules {
            schedules.put(v, s, Tick::ZERO);
        }
        (owners.send_all(), schedules.send_all())
    }

    /// Partition whose owner hint is `agent`.
    pub fn hinted_partition(&self, agent: AgentId) -> Option<&PartitionInfo> {
        self.topology.partitions.values().find(|p| p.owner_hint == agent)
    }
}
