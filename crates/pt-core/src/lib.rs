//! `pt-core`: foundational types for the `rust_patrol` framework.
//!
//! This crate is a dependency of every other `pt-*` crate.  It intentionally
//! has no `pt-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `VertexId`, `PartitionId`                  |
//! | [`geo`]         | `Point` (planar workspace coordinate)                 |
//! | [`time`]        | `Tick`                                                |
//! | [`config`]      | `MissionConfig`, `ProtocolConfig`                     |
//! | [`rng`]         | `AgentRng` (per-agent), `SimRng` (global)             |
//! | [`error`]       | `PatrolError`, `PatrolResult`                         |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required to load `MissionConfig` from JSON.                |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{MissionConfig, ProtocolConfig};
pub use error::{PatrolError, PatrolResult};
pub use geo::Point;
pub use ids::{AgentId, PartitionId, VertexId};
pub use rng::{AgentRng, SimRng};
pub use time::Tick;
