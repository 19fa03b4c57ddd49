//! Per-agent Meeting Component.

use tracing::{debug, warn};

use pt_core::{AgentId, Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};
use pt_partition::{Envelope, ExchangeProgress, PartitionComponent, ProtocolEvent, Telemetry};

use crate::{select_meeting, Meeting, MeetingState, MovementDecision};

/// Everything the component reads from the outside world for one step.
#[derive(Copy, Clone)]
pub struct StepContext<'a> {
    pub now:        Tick,
    /// Vertex the agent is standing on.
    pub position:   VertexId,
    /// Route selector's next vertex, `None` if it has nothing to suggest.
    pub suggestion: Option<VertexId>,
    pub graph:      &'a PatrolGraph,
    pub estimator:  &'a dyn PathEstimator,
}

impl StepContext<'_> {
    fn eta(&self, from: VertexId, to: VertexId) -> Option<u64> {
        self.estimator.estimate_ticks(self.graph, from, to)
    }
}

/// Rendezvous state machine of one agent.
pub struct MeetingComponent {
    me:      AgentId,
    state:   MeetingState,
    /// Latest selection result, kept for observers.
    planned: Option<Meeting>,
}

impl MeetingComponent {
    pub fn new(me: AgentId) -> Self {
        Self { me, state: MeetingState::Patrolling, planned: None }
    }

    pub fn state(&self) -> &MeetingState {
        &self.state
    }

    /// The meeting selected on the most recent patrolling step.
    pub fn planned(&self) -> Option<&Meeting> {
        self.planned.as_ref()
    }

    /// Cancellation hook: abandon whatever meeting is in progress.
    pub fn reset(&mut self, partition: &mut PartitionComponent) {
        partition.leave_round();
        self.state = MeetingState::Patrolling;
        self.planned = None;
    }

    /// Advance one tick.  Called only while the agent stands on a vertex.
    pub fn step(
        &mut self,
        ctx:       StepContext<'_>,
        partition: &mut PartitionComponent,
        out:       &mut Vec<Envelope>,
        telemetry: &mut dyn Telemetry,
    ) -> MovementDecision {
        match self.state {
            MeetingState::Patrolling => self.patrol(ctx, partition, out, telemetry),
            MeetingState::CommittedToMeeting(m) => self.travel(m, ctx, partition, out, telemetry),
            MeetingState::AtRendezvous(m) => self.wait(m, ctx, partition, out, telemetry),
            MeetingState::Exchanging(m) => self.exchange(m, ctx, partition, out, telemetry),
        }
    }

    // ── Patrolling ────────────────────────────────────────────────────────

    fn patrol(
        &mut self,
        ctx:       StepContext<'_>,
        partition: &mut PartitionComponent,
        out:       &mut Vec<Envelope>,
        telemetry: &mut dyn Telemetry,
    ) -> MovementDecision {
        self.state = MeetingState::Patrolling;
        let meeting = select_meeting(ctx.now, ctx.position, partition, ctx.graph, ctx.estimator);
        self.planned = Some(meeting);

        let follow = ctx.suggestion.map_or(MovementDecision::Hold, MovementDecision::Follow);
        if meeting.is_perpetual() {
            return follow;
        }

        // Would one more patrol step make us late?
        let step = ctx.suggestion.unwrap_or(ctx.position);
        let (step, first) = match ctx.eta(ctx.position, step) {
            Some(t) => (step, t),
            None => (ctx.position, 0),
        };
        let Some(rest) = ctx.eta(step, meeting.vertex) else {
            return follow;
        };
        if ctx.now + first + rest < meeting.tick {
            return follow;
        }

        debug!(
            agent = %self.me, vertex = %meeting.vertex, meeting = %meeting.tick,
            class = ?meeting.class, "committed to meeting",
        );
        telemetry.record(ProtocolEvent::MeetingCommitted {
            agent:        self.me,
            at:           ctx.now,
            vertex:       meeting.vertex,
            meeting_tick: meeting.tick,
        });
        self.travel(meeting, ctx, partition, out, telemetry)
    }

    // ── CommittedToMeeting ────────────────────────────────────────────────

    fn travel(
        &mut self,
        mut meeting: Meeting,
        ctx:         StepContext<'_>,
        partition:   &mut PartitionComponent,
        out:         &mut Vec<Envelope>,
        telemetry:   &mut dyn Telemetry,
    ) -> MovementDecision {
        if !partition.attends(meeting.vertex) {
            return self.patrol(ctx, partition, out, telemetry);
        }
        // Peers already concluded the round we were heading for.
        if let Some(s) = partition.schedule(meeting.vertex) {
            if s.current_next > meeting.tick {
                debug!(agent = %self.me, vertex = %meeting.vertex, meeting = %s.current_next, "meeting rebased");
                meeting.tick = s.current_next;
            }
        }

        if ctx.position == meeting.vertex {
            partition.attend(meeting.vertex, ctx.now, meeting.class.is_override());
            debug!(agent = %self.me, vertex = %meeting.vertex, "rendezvous reached");
            telemetry.record(ProtocolEvent::RendezvousReached {
                agent:  self.me,
                at:     ctx.now,
                vertex: meeting.vertex,
            });
            return self.wait(meeting, ctx, partition, out, telemetry);
        }

        self.state = MeetingState::CommittedToMeeting(meeting);
        if ctx.eta(ctx.position, meeting.vertex).is_none() {
            warn!(agent = %self.me, from = %ctx.position, to = %meeting.vertex, "no route to meeting");
            telemetry.record(ProtocolEvent::NoRoute {
                agent: self.me,
                at:    ctx.now,
                from:  ctx.position,
                to:    meeting.vertex,
            });
            return MovementDecision::Idle;
        }
        MovementDecision::GoTo(meeting.vertex)
    }

    // ── AtRendezvous ──────────────────────────────────────────────────────

    fn wait(
        &mut self,
        mut meeting: Meeting,
        ctx:         StepContext<'_>,
        partition:   &mut PartitionComponent,
        out:         &mut Vec<Envelope>,
        telemetry:   &mut dyn Telemetry,
    ) -> MovementDecision {
        if !partition.attends(meeting.vertex) {
            partition.leave_round();
            return self.patrol(ctx, partition, out, telemetry);
        }
        // Once on site, follow the vertex's schedule: wait for the upcoming
        // round, or for the later one if peers already held ours.
        if let Some(s) = partition.schedule(meeting.vertex) {
            if s.current_next > meeting.tick || (s.current_next >= ctx.now && s.current_next != meeting.tick) {
                debug!(agent = %self.me, vertex = %meeting.vertex, meeting = %s.current_next, "meeting rebased");
                meeting.tick = s.current_next;
            }
        }

        // Too late to join: peers resolve on what they had when they started.
        // Stay visible so they count us present, and catch the next round.
        if partition.exchange_under_way(ctx.now) {
            debug!(agent = %self.me, vertex = %meeting.vertex, "peers already exchanging, waiting for next round");
            partition.announce_presence(ctx.now, out);
            partition.leave_round();
            self.state = MeetingState::Patrolling;
            return MovementDecision::Hold;
        }

        if ctx.now >= meeting.tick {
            return self.exchange(meeting, ctx, partition, out, telemetry);
        }

        // Everyone expected is already here: start early, all on the same
        // tick (one after the latest arrival).
        let expected = partition.expected_attendees(meeting.vertex);
        let fresh = partition.fresh_presence(ctx.now);
        if expected.iter().all(|a| fresh.contains_key(a)) {
            let latest = expected
                .iter()
                .filter_map(|a| fresh.get(a).copied())
                .chain(partition.round_arrival())
                .max()
                .unwrap_or(ctx.now);
            if ctx.now >= latest + 1 {
                debug!(agent = %self.me, vertex = %meeting.vertex, scheduled = %meeting.tick, "meeting early");
                telemetry.record(ProtocolEvent::MetEarly {
                    agent:     self.me,
                    at:        ctx.now,
                    vertex:    meeting.vertex,
                    scheduled: meeting.tick,
                });
                return self.exchange(meeting, ctx, partition, out, telemetry);
            }
        }

        partition.announce_presence(ctx.now, out);
        self.state = MeetingState::AtRendezvous(meeting);
        MovementDecision::Hold
    }

    // ── Exchanging ────────────────────────────────────────────────────────

    fn exchange(
        &mut self,
        meeting:   Meeting,
        ctx:       StepContext<'_>,
        partition: &mut PartitionComponent,
        out:       &mut Vec<Envelope>,
        telemetry: &mut dyn Telemetry,
    ) -> MovementDecision {
        match partition.exchange_information(ctx.now, out, telemetry) {
            ExchangeProgress::InProgress(_) => {
                self.state = MeetingState::Exchanging(meeting);
                MovementDecision::Hold
            }
            ExchangeProgress::Done(_) | ExchangeProgress::NotAttending => {
                partition.leave_round();
                self.patrol(ctx, partition, out, telemetry)
            }
        }
    }
}
