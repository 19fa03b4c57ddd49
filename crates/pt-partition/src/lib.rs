//! `pt-partition`: who patrols what, and how agents agree on it.
//!
//! Every agent runs one [`PartitionComponent`].  It holds two replicated maps
//! (partition → owner and meeting vertex → schedule), answers "which vertices
//! should I patrol?", and drives the three-tick information exchange that
//! runs whenever agents meet at a shared vertex.  During that exchange the
//! component detects missing peers, takes over their partitions in two
//! phases, rebalances load, and writes the vertex's next schedule.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`types`]       | `PartitionInfo`, `MeetingPoint`, `MeetingSchedule`, `Topology`, `PartitionPlan` |
//! | [`message`]     | `Message`, `Envelope`, `Presence`, `Proposal`               |
//! | [`telemetry`]   | `ProtocolEvent`, `Telemetry` trait, `FaultTracker`          |
//! | [`component`]   | `PartitionComponent` (maps, patrol set, rendezvous round)   |
//! | [`exchange`]    | `ExchangePhase`, `ExchangeProgress`, `ExchangeOutcome`, the exchange itself |
//! | [`generator`]   | `PartitionGenerator` trait, `VoronoiGenerator`, `StaticGenerator` |
//! | [`error`]       | `PartitionError`, `PartitionResult<T>`                      |
//!
//! # Timing
//!
//! A broadcast sent at tick `t` is visible at `t + 1`.  The exchange is
//! therefore spread over [`EXCHANGE_TICKS`] consecutive calls:
//!
//! ```text
//! Announce  (t)     → OwnerSync, ScheduleSync, Presence
//! Propose   (t + 1) → Proposal, Presence          (maps from t are merged)
//! Resolve   (t + 2) → takeover / rebalance / schedule write, OwnerSync, ScheduleSync
//! ```

pub mod component;
pub mod error;
pub mod exchange;
pub mod generator;
pub mod message;
pub mod telemetry;
pub mod types;


pub use component::{PartitionComponent, PartitionSnapshot};
pub use error::{PartitionError, PartitionResult};
pub use exchange::{ExchangeOutcome, ExchangePhase, ExchangeProgress, EXCHANGE_TICKS};
pub use generator::{PartitionGenerator, StaticGenerator, VoronoiGenerator};
pub use message::{Envelope, Message, Presence, Proposal};
pub use telemetry::{FaultTracker, NoTelemetry, ProtocolEvent, Telemetry};
pub use types::{MeetingPoint, MeetingSchedule, PartitionInfo, PartitionPlan, Topology};
