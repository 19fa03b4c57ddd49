//! Plain data row types written by output backends.

use pt_partition::ProtocolEvent;
use pt_sim::AgentSnapshot;

/// One agent's protocol state at a snapshot tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshotRow {
    pub agent_id:          u32,
    pub tick:              u64,
    pub alive:             bool,
    /// `u32::MAX` while in transit or after the agent was lost.
    pub vertex:            u32,
    pub state:             &'static str,
    pub meeting_vertex:    Option<u32>,
    pub meeting_tick:      Option<u64>,
    /// Owned partition ids, `;`-separated.
    pub owned:             String,
    pub patrol_vertices:   u64,
    pub pending_takeovers: u64,
}

impl From<&AgentSnapshot> for AgentSnapshotRow {
    fn from(s: &AgentSnapshot) -> Self {
        let meeting = s.meeting.meeting();
        Self {
            agent_id:          s.partition.agent.0,
            tick:              s.tick.0,
            alive:             s.alive,
            vertex:            s.position.map_or(u32::MAX, |v| v.0),
            state:             s.meeting.name(),
            meeting_vertex:    meeting.map(|m| m.vertex.0),
            meeting_tick:      meeting.map(|m| m.tick.0),
            owned:             s.partition.owned.iter().map(|p| p.0.to_string()).collect::<Vec<_>>().join(";"),
            patrol_vertices:   s.partition.patrol_vertices as u64,
            pending_takeovers: s.partition.pending_takeovers as u64,
        }
    }
}

/// One protocol event.  Fields that do not apply to the event's kind are
/// left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEventRow {
    pub tick:      u64,
    pub agent_id:  u32,
    pub kind:      &'static str,
    pub vertex:    u32,
    pub partition: Option<u32>,
    /// The other agent involved: the missing owner, the previous owner, or
    /// the rebalancing counterpart.
    pub peer:      Option<u32>,
    /// A meeting tick, or the new schedule's `current_next`.
    pub meeting:   Option<u64>,
}

impl From<&ProtocolEvent> for ProtocolEventRow {
    fn from(e: &ProtocolEvent) -> Self {
        let (peer, meeting) = match *e {
            ProtocolEvent::MeetingCommitted { meeting_tick, .. } => (None, Some(meeting_tick.0)),
            ProtocolEvent::MetEarly { scheduled, .. }            => (None, Some(scheduled.0)),
            ProtocolEvent::ExchangeCompleted { schedule, .. }    => (None, Some(schedule.current_next.0)),
            ProtocolEvent::PeerMissing { owner, .. }
            | ProtocolEvent::TakeoverProposed { owner, .. }
            | ProtocolEvent::TakeoverCancelled { owner, .. }     => (Some(owner.0), None),
            ProtocolEvent::TakeoverConfirmed { previous, .. }    => (Some(previous.0), None),
            ProtocolEvent::Rebalanced { agent, from, to, .. }    => {
                (Some(if agent == from { to.0 } else { from.0 }), None)
            }
            ProtocolEvent::RendezvousReached { .. } | ProtocolEvent::NoRoute { .. } => (None, None),
        };
        Self {
            tick:      e.at().0,
            agent_id:  e.agent().0,
            kind:      e.kind(),
            vertex:    e.vertex().0,
            partition: e.partition().map(|p| p.0),
            peer,
            meeting,
        }
    }
}

/// Summary statistics for one mission tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:          u64,
    pub active_agents: u64,
    pub events:        u64,
}
