//! `pt-meeting`: when and where an agent meets its peers.
//!
//! The [`MeetingComponent`] sits between the route selector and the mobility
//! layer.  Each tick it either lets the agent follow the selector's
//! suggestion or overrides it to head for, wait at, or exchange at a
//! meeting vertex.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`state`]       | `MeetingState`, `Meeting`, `MeetingClass`, `MovementDecision` |
//! | [`selection`]   | `select_meeting` (classify, rank, slot-in)                |
//! | [`component`]   | `MeetingComponent`, `StepContext`                         |
//!
//! # State machine
//!
//! ```text
//! Patrolling ──lookahead──▶ CommittedToMeeting ──arrive──▶ AtRendezvous
//!     ▲                                                         │
//!     └──────────── done ◀── Exchanging ◀── tick reached / all present early
//! ```

pub mod component;
pub mod selection;
pub mod state;

#[cfg(test)]
mod tests;

pub use component::{MeetingComponent, StepContext};
pub use selection::select_meeting;
pub use state::{Meeting, MeetingClass, MeetingState, MovementDecision};
