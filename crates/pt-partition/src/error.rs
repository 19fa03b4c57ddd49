//! Partition-subsystem error type.
//!
//! Only plan construction and validation can fail.  Everything that happens
//! during a mission (lost messages, absent peers) is handled in-protocol.

use thiserror::Error;

use pt_core::{AgentId, PartitionId, VertexId};
use pt_graph::GraphError;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("cannot partition for zero agents")]
    NoAgents,

    #[error("graph has {vertices} vertices, too few for {agents} agents")]
    TooFewVertices { vertices: usize, agents: usize },

    #[error("patrol graph is disconnected: {0} is unreachable")]
    Disconnected(VertexId),

    #[error("plan has {partitions} partitions for {agents} agents")]
    PartitionCountMismatch { partitions: usize, agents: usize },

    #[error("{0} hinted as owner of a partition but is not a mission agent")]
    UnknownOwnerHint(AgentId),

    #[error("{0} is not covered by any partition")]
    UncoveredVertex(VertexId),

    #[error("{0} is not part of the patrol graph")]
    UnknownVertex(VertexId),

    #[error("meeting point references unknown {0}")]
    UnknownPartition(PartitionId),

    #[error("meeting {vertex} lies outside member {partition}")]
    MeetingOutsidePartition { vertex: VertexId, partition: PartitionId },

    #[error("schedule at {0} has current_next after next_next")]
    UnorderedSchedule(VertexId),

    #[error("meeting point {0} has no schedule")]
    MissingSchedule(VertexId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type PartitionResult<T> = Result<T, PartitionError>;
