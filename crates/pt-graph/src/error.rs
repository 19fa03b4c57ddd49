//! Graph-subsystem error type.

use thiserror::Error;

use pt_core::VertexId;

/// Errors produced by `pt-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: VertexId, to: VertexId },

    #[error("vertex {0} not found in patrol graph")]
    VertexNotFound(VertexId),
}

pub type GraphResult<T> = Result<T, GraphError>;
