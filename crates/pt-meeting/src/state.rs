//! Meeting state machine types.

use pt_core::{Tick, VertexId};

// ── MeetingClass ──────────────────────────────────────────────────────────────

/// How a candidate meeting relates to the vertex's schedule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeetingClass {
    /// Too late for `current_next`, in time for `next_next`.  Served first:
    /// the agent already missed one round there.
    MissedCurrent,
    /// In time for `current_next`.
    Current,
    /// Too late for both scheduled ticks; go as soon as possible.
    BestEffort,
}

impl MeetingClass {
    /// Ranking priority, lower first.
    pub fn priority(self) -> u8 {
        match self {
            MeetingClass::MissedCurrent => 1,
            MeetingClass::Current       => 2,
            MeetingClass::BestEffort    => 3,
        }
    }

    /// Best-effort arrivals override the schedule and are never nominated
    /// for takeovers.
    pub fn is_override(self) -> bool {
        self == MeetingClass::BestEffort
    }
}

// ── Meeting ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meeting {
    pub vertex: VertexId,
    pub tick:   Tick,
    pub class:  MeetingClass,
}

impl Meeting {
    /// Placeholder for agents with nobody to meet.  Never reached.
    pub fn perpetual(vertex: VertexId) -> Self {
        Self { vertex, tick: Tick::FAR_FUTURE, class: MeetingClass::BestEffort }
    }

    pub fn is_perpetual(&self) -> bool {
        self.tick >= Tick::FAR_FUTURE
    }
}

// ── MeetingState ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeetingState {
    #[default]
    Patrolling,
    CommittedToMeeting(Meeting),
    AtRendezvous(Meeting),
    Exchanging(Meeting),
}

impl MeetingState {
    pub fn meeting(&self) -> Option<&Meeting> {
        match self {
            MeetingState::Patrolling => None,
            MeetingState::CommittedToMeeting(m)
            | MeetingState::AtRendezvous(m)
            | MeetingState::Exchanging(m) => Some(m),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeetingState::Patrolling            => "patrolling",
            MeetingState::CommittedToMeeting(_) => "committed",
            MeetingState::AtRendezvous(_)       => "at_rendezvous",
            MeetingState::Exchanging(_)         => "exchanging",
        }
    }
}

// ── MovementDecision ──────────────────────────────────────────────────────────

/// What the agent does with its body this tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementDecision {
    /// Take the route selector's suggestion.
    Follow(VertexId),
    /// Override the selector: head for this vertex.
    GoTo(VertexId),
    /// Stay on the current vertex.
    Hold,
    /// Still travelling; nothing to decide.
    Continue,
    /// No reachable target; stay put.
    Idle,
}

impl MovementDecision {
    pub fn target(&self) -> Option<VertexId> {
        match *self {
            MovementDecision::Follow(v) | MovementDecision::GoTo(v) => Some(v),
            _ => None,
        }
    }
}
