//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `PatrolError` as one
//! variant where they need to.  Protocol-level conditions (missing peers,
//! stale proposals) are never errors; only construction and I/O problems are.

use thiserror::Error;

use crate::{AgentId, PartitionId, VertexId};

/// The top-level error type for `pt-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum PatrolError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("partition {0} not found")]
    PartitionNotFound(PartitionId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `pt-*` crates.
pub type PatrolResult<T> = Result<T, PatrolError>;
