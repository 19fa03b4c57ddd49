//! Protocol events and the sinks that consume them.
//!
//! Components never touch global counters.  They report what happened through
//! a [`Telemetry`] sink passed in by the caller; the mission runner collects
//! events per agent and forwards them to observers after each tick.

use pt_core::{AgentId, PartitionId, Tick, VertexId};

use crate::MeetingSchedule;

// ── ProtocolEvent ─────────────────────────────────────────────────────────────

/// Something noteworthy one agent observed or did.  `agent` is always the
/// reporting agent and `at` the tick it happened.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtocolEvent {
    /// Switched from patrolling to heading for a meeting.
    MeetingCommitted { agent: AgentId, at: Tick, vertex: VertexId, meeting_tick: Tick },
    RendezvousReached { agent: AgentId, at: Tick, vertex: VertexId },
    /// Everybody expected was already there, so the exchange started before
    /// the scheduled tick.
    MetEarly { agent: AgentId, at: Tick, vertex: VertexId, scheduled: Tick },
    ExchangeCompleted { agent: AgentId, at: Tick, vertex: VertexId, schedule: MeetingSchedule },
    PeerMissing { agent: AgentId, at: Tick, vertex: VertexId, partition: PartitionId, owner: AgentId },
    TakeoverProposed { agent: AgentId, at: Tick, vertex: VertexId, partition: PartitionId, owner: AgentId },
    /// Reported by the nominee only, after writing itself as owner.
    TakeoverConfirmed { agent: AgentId, at: Tick, vertex: VertexId, partition: PartitionId, previous: AgentId },
    TakeoverCancelled { agent: AgentId, at: Tick, vertex: VertexId, partition: PartitionId, owner: AgentId },
    Rebalanced { agent: AgentId, at: Tick, vertex: VertexId, partition: PartitionId, from: AgentId, to: AgentId },
    NoRoute { agent: AgentId, at: Tick, from: VertexId, to: VertexId },
}

impl ProtocolEvent {
    pub fn agent(&self) -> AgentId {
        match *self {
            ProtocolEvent::MeetingCommitted { agent, .. }
            | ProtocolEvent::RendezvousReached { agent, .. }
            | ProtocolEvent::MetEarly { agent, .. }
            | ProtocolEvent::ExchangeCompleted { agent, .. }
            | ProtocolEvent::PeerMissing { agent, .. }
            | ProtocolEvent::TakeoverProposed { agent, .. }
            | ProtocolEvent::TakeoverConfirmed { agent, .. }
            | ProtocolEvent::TakeoverCancelled { agent, .. }
            | ProtocolEvent::Rebalanced { agent, .. }
            | ProtocolEvent::NoRoute { agent, .. } => agent,
        }
    }

    pub fn at(&self) -> Tick {
        match *self {
            ProtocolEvent::MeetingCommitted { at, .. }
            | ProtocolEvent::RendezvousReached { at, .. }
            | ProtocolEvent::MetEarly { at, .. }
            | ProtocolEvent::ExchangeCompleted { at, .. }
            | ProtocolEvent::PeerMissing { at, .. }
            | ProtocolEvent::TakeoverProposed { at, .. }
            | ProtocolEvent::TakeoverConfirmed { at, .. }
            | ProtocolEvent::TakeoverCancelled { at, .. }
            | ProtocolEvent::Rebalanced { at, .. }
            | ProtocolEvent::NoRoute { at, .. } => at,
        }
    }

    /// The vertex the event is about (the destination for `NoRoute`).
    pub fn vertex(&self) -> VertexId {
        match *self {
            ProtocolEvent::MeetingCommitted { vertex, .. }
            | ProtocolEvent::RendezvousReached { vertex, .. }
            | ProtocolEvent::MetEarly { vertex, .. }
            | ProtocolEvent::ExchangeCompleted { vertex, .. }
            | ProtocolEvent::PeerMissing { vertex, .. }
            | ProtocolEvent::TakeoverProposed { vertex, .. }
            | ProtocolEvent::TakeoverConfirmed { vertex, .. }
            | ProtocolEvent::TakeoverCancelled { vertex, .. }
            | ProtocolEvent::Rebalanced { vertex, .. } => vertex,
            ProtocolEvent::NoRoute { to, .. } => to,
        }
    }

    pub fn partition(&self) -> Option<PartitionId> {
        match *self {
            ProtocolEvent::PeerMissing { partition, .. }
            | ProtocolEvent::TakeoverProposed { partition, .. }
            | ProtocolEvent::TakeoverConfirmed { partition, .. }
            | ProtocolEvent::TakeoverCancelled { partition, .. }
            | ProtocolEvent::Rebalanced { partition, .. } => Some(partition),
            _ => None,
        }
    }

    /// Stable snake_case name, used as the `kind` column of event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolEvent::MeetingCommitted { .. }  => "meeting_committed",
            ProtocolEvent::RendezvousReached { .. } => "rendezvous_reached",
            ProtocolEvent::MetEarly { .. }          => "met_early",
            ProtocolEvent::ExchangeCompleted { .. } => "exchange_completed",
            ProtocolEvent::PeerMissing { .. }       => "peer_missing",
            ProtocolEvent::TakeoverProposed { .. }  => "takeover_proposed",
            ProtocolEvent::TakeoverConfirmed { .. } => "takeover_confirmed",
            ProtocolEvent::TakeoverCancelled { .. } => "takeover_cancelled",
            ProtocolEvent::Rebalanced { .. }        => "rebalanced",
            ProtocolEvent::NoRoute { .. }           => "no_route",
        }
    }
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// Sink for [`ProtocolEvent`]s.
pub trait Telemetry {
    fn record(&mut self, event: ProtocolEvent);
}

impl Telemetry for Vec<ProtocolEvent> {
    fn record(&mut self, event: ProtocolEvent) {
        self.push(event);
    }
}

/// Discards every event.
pub struct NoTelemetry;

impl Telemetry for NoTelemetry {
    fn record(&mut self, _event: ProtocolEvent) {}
}

// ── FaultTracker ──────────────────────────────────────────────────────────────

/// Running counters over the fault-handling side of the protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultTracker {
    pub exchanges:           u64,
    pub early_meetings:      u64,
    pub peers_missing:       u64,
    pub takeovers_proposed:  u64,
    pub takeovers_confirmed: u64,
    pub takeovers_cancelled: u64,
    pub rebalances:          u64,
    pub no_route:            u64,
}

impl Telemetry for FaultTracker {
    fn record(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::ExchangeCompleted { .. } => self.exchanges += 1,
            ProtocolEvent::MetEarly { .. }          => self.early_meetings += 1,
            ProtocolEvent::PeerMissing { .. }       => self.peers_missing += 1,
            ProtocolEvent::TakeoverProposed { .. }  => self.takeovers_proposed += 1,
            ProtocolEvent::TakeoverConfirmed { .. } => self.takeovers_confirmed += 1,
            ProtocolEvent::TakeoverCancelled { .. } => self.takeovers_cancelled += 1,
            ProtocolEvent::Rebalanced { .. }        => self.rebalances += 1,
            ProtocolEvent::NoRoute { .. }           => self.no_route += 1,
            ProtocolEvent::MeetingCommitted { .. }
            | ProtocolEvent::RendezvousReached { .. } => {}
        }
    }
}
