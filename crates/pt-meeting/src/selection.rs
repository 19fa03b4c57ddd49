//! Meeting selection policy.
//!
//! Every meeting point of the agent's partitions that has at least one other
//! attendee and a known route is a candidate.  Candidates are classed by
//! whether the agent can still make the vertex's scheduled ticks, ranked by
//! `(class priority, target tick)`, and finally an earlier candidate is
//! slotted in ahead of the winner if visiting it first still gets the agent
//! to the winner on time.

use pt_core::{Tick, VertexId};
use pt_graph::{PathEstimator, PatrolGraph};
use pt_partition::{PartitionComponent, EXCHANGE_TICKS};

use crate::{Meeting, MeetingClass};

#[derive(Copy, Clone, Debug)]
struct Candidate {
    vertex:  VertexId,
    arrival: Tick,
    target:  Tick,
    class:   MeetingClass,
}

impl Candidate {
    fn rank(&self) -> (u8, Tick, VertexId) {
        (self.class.priority(), self.target, self.vertex)
    }

    fn meeting(&self) -> Meeting {
        Meeting { vertex: self.vertex, tick: self.target, class: self.class }
    }
}

/// Choose the meeting the agent at `position` should aim for next.
///
/// Returns a perpetual meeting (tick [`Tick::FAR_FUTURE`]) when there is no
/// candidate at all, e.g. for a lone agent.
pub fn select_meeting(
    now:       Tick,
    position:  VertexId,
    partition: &PartitionComponent,
    graph:     &PatrolGraph,
    estimator: &dyn PathEstimator,
) -> Meeting {
    let candidates: Vec<Candidate> = partition
        .my_meeting_points()
        .into_iter()
        .filter(|v| !partition.expected_attendees(*v).is_empty())
        .filter_map(|vertex| {
            let schedule = partition.schedule(vertex)?;
            let arrival = now + estimator.estimate_ticks(graph, position, vertex)?;
            let (class, target) = if arrival <= schedule.current_next {
                (MeetingClass::Current, schedule.current_next)
            } else if arrival <= schedule.next_next {
                (MeetingClass::MissedCurrent, schedule.next_next)
            } else {
                (MeetingClass::BestEffort, arrival)
            };
            Some(Candidate { vertex, arrival, target, class })
        })
        .collect();

    let Some(best) = candidates.iter().min_by_key(|c| c.rank()).copied() else {
        return Meeting::perpetual(position);
    };

    // Earliest candidate that fits before the winner.
    let slot_in = candidates
        .iter()
        .filter(|c| c.target < best.target)
        .filter(|c| {
            estimator
                .estimate_ticks(graph, c.vertex, best.vertex)
                .is_some_and(|hop| c.arrival.max(c.target) + EXCHANGE_TICKS + hop <= best.target)
        })
        .min_by_key(|c| (c.target, c.vertex));

    slot_in.unwrap_or(&best).meeting()
}
