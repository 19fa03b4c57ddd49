use pt_core::{AgentId, PatrolError, VertexId};
use pt_graph::GraphError;
use pt_partition::PartitionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("agent {0:?} is already in transit")]
    AlreadyInTransit(AgentId),

    #[error("agent {0:?} has not been placed on the graph")]
    NotPlaced(AgentId),

    #[error("no corridor from {from} to {to}")]
    NotAdjacent { from: VertexId, to: VertexId },
}

pub type MobilityResult<T> = Result<T, MobilityError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("mission configuration error: {0}")]
    Config(String),

    #[error("{what} length {got} does not match agent count {expected}")]
    AgentCountMismatch {
        expected: usize,
        got:      usize,
        what:     &'static str,
    },

    #[error(transparent)]
    Core(#[from] PatrolError),

    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),

    #[error("partition plan: {0}")]
    Plan(#[from] PartitionError),

    #[error("graph: {0}")]
    Graph(#[from] GraphError),

    #[error("mobility error: {0}")]
    Mobility(#[from] MobilityError),
}

pub type SimResult<T> = Result<T, SimError>;
