//! Broadcast messages exchanged between agents.
//!
//! Every message is fire-and-forget.  The transport may drop any copy; the
//! protocol tolerates that by resending full map snapshots at every exchange
//! and presence every tick an agent waits at a rendezvous.

use pt_core::{AgentId, PartitionId, Tick, VertexId};
use pt_stigmergy::MapSnapshot;

use crate::MeetingSchedule;

/// "I am waiting at `vertex`."  Repeated every tick at a rendezvous.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Presence {
    pub vertex:     VertexId,
    pub agent:      AgentId,
    pub arrived_at: Tick,
    /// The agent came here outside the schedule (a best-effort meeting) and
    /// must not be nominated for takeovers.
    pub overrode:   bool,
    /// The sender's exchange at `vertex` has already started.
    pub exchanging: bool,
}

/// One agent's suggestion for the next meeting tick at `vertex`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proposal {
    pub vertex:       VertexId,
    pub agent:        AgentId,
    pub next_meeting: Tick,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    OwnerSync(MapSnapshot<PartitionId, AgentId>),
    ScheduleSync(MapSnapshot<VertexId, MeetingSchedule>),
    Presence(Presence),
    Proposal(Proposal),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::OwnerSync(_)    => "owner_sync",
            Message::ScheduleSync(_) => "schedule_sync",
            Message::Presence(_)     => "presence",
            Message::Proposal(_)     => "proposal",
        }
    }
}

/// A message plus its sender and send tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub from:    AgentId,
    pub sent_at: Tick,
    pub message: Message,
}

impl Envelope {
    pub fn new(from: AgentId, sent_at: Tick, message: Message) -> Self {
        Self { from, sent_at, message }
    }
}
