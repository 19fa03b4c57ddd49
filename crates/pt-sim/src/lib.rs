//! `pt-sim`: tick-synchronous mission runner for the rust_patrol framework.
//!
//! # Five-phase tick loop
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Arrivals: agents at the end of a corridor land and record the visit.
//!   ② Failures: agents scheduled to fail now are removed for good.
//!   ③ Delivery: each live agent drains broadcasts sent before this tick.
//!   ④ Step:     PatrolAgent::step for every live agent
//!                 (parallel with the `parallel` feature):
//!                   absorb inbox → route suggestion → MeetingComponent::step
//!   ⑤ Apply:    in ascending AgentId order:
//!                   Follow/GoTo(v)  → begin one hop towards v
//!                   outbox          → BroadcastTransport::broadcast
//!                   events          → FaultTracker + SimObserver
//! ```
//!
//! # Crate layout
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`agent`]       | `PatrolAgent`, `AgentStep`, `AgentSnapshot`             |
//! | [`route`]       | `RouteSelector` trait, `IdlenessSelector`, `PatrolRoute` |
//! | [`mobility`]    | `MobilityEngine`, `MovementState`, `next_hop`           |
//! | [`transport`]   | `BroadcastTransport` trait, `LossyBroadcast`            |
//! | [`observer`]    | `SimObserver` trait, `NoopObserver`                     |
//! | [`builder`]     | `SimBuilder`                                            |
//! | [`sim`]         | `Sim`, `TickReport`                                     |
//! | [`error`]       | `SimError`, `MobilityError`                             |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs the step phase on Rayon's thread pool.            |
//! | `serde`    | Derives `Serialize`/`Deserialize` on `AgentSnapshot`.  |

pub mod agent;
pub mod builder;
pub mod error;
pub mod mobility;
pub mod observer;
pub mod route;
pub mod sim;
pub mod transport;

#[cfg(test)]
mod tests;

pub use agent::{AgentSnapshot, AgentStep, PatrolAgent};
pub use builder::SimBuilder;
pub use error::{MobilityError, MobilityResult, SimError, SimResult};
pub use mobility::{next_hop, MobilityEngine, MovementState};
pub use observer::{NoopObserver, SimObserver};
pub use route::{IdlenessSelector, PatrolRoute, RouteSelector};
pub use sim::{Sim, TickReport};
pub use transport::{BroadcastTransport, LossyBroadcast};
