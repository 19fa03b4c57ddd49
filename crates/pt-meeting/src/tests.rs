//! Unit tests for pt-meeting.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pt_core::{AgentId, PartitionId, Point, ProtocolConfig, Tick, VertexId};
use pt_graph::{DistanceTable, PathEstimator, PatrolGraph, PatrolGraphBuilder};
use pt_partition::{
    Envelope, MeetingPoint, MeetingSchedule, Message, PartitionComponent, PartitionInfo,
    PartitionPlan, ProtocolEvent, Topology,
};

use crate::{MeetingClass, MeetingComponent, MeetingState, MovementDecision, StepContext};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn set<T: Ord + Copy>(items: &[T]) -> BTreeSet<T> {
    items.iter().copied().collect()
}

/// Hub 0 with spokes 1..=6, every corridor 1 tick.
fn star_graph() -> PatrolGraph {
    let mut b = PatrolGraphBuilder::new();
    let hub = b.add_vertex(Point::new(0.0, 0.0));
    for i in 1..=6 {
        let v = b.add_vertex(Point::new((i as f32).cos(), (i as f32).sin()));
        b.add_corridor(hub, v, 1);
    }
    b.build()
}

/// Partition `i` = {hub, 2i+1, 2i+2}, all meeting at the hub at (50, 100).
fn star_components(agents: u32) -> Vec<PartitionComponent> {
    let v = VertexId;
    let partitions = (0..3u32).map(|i| PartitionInfo {
        id:             PartitionId(i),
        owner_hint:     AgentId(i),
        vertices:       set(&[v(0), v(2 * i + 1), v(2 * i + 2)]),
        meeting_points: vec![v(0)],
        diameter:       10,
    });
    let hub = MeetingPoint {
        vertex:     v(0),
        partitions: set(&[PartitionId(0), PartitionId(1), PartitionId(2)]),
    };
    let plan = PartitionPlan {
        topology:  Topology::new(partitions, [hub]),
        schedules: BTreeMap::from([(v(0), MeetingSchedule::new(Tick(50), Tick(100)))]),
    };
    let topology = Arc::new(plan.topology.clone());
    let (owners, schedules) = plan.initial_maps(AgentId(0));
    (0..agents)
        .map(|i| {
            let mut c = PartitionComponent::new(AgentId(i), topology.clone(), ProtocolConfig::default());
            c.seed(owners.clone(), schedules.clone());
            c
        })
        .collect()
}

fn ctx<'a>(
    graph:      &'a PatrolGraph,
    estimator:  &'a dyn PathEstimator,
    now:        u64,
    position:   u32,
    suggestion: Option<u32>,
) -> StepContext<'a> {
    StepContext {
        now: Tick(now),
        position: VertexId(position),
        suggestion: suggestion.map(VertexId),
        graph,
        estimator,
    }
}

fn deliver(comps: &mut [PartitionComponent], inbox: &[Envelope]) {
    for c in comps.iter_mut() {
        let id = c.id();
        for env in inbox.iter().filter(|e| e.from != id) {
            c.absorb(env);
        }
    }
}

/// Estimator that can be switched to report every route as missing.
struct Blockable {
    table:   DistanceTable,
    blocked: AtomicBool,
}

impl PathEstimator for Blockable {
    fn estimate_ticks(&self, graph: &PatrolGraph, from: VertexId, to: VertexId) -> Option<u64> {
        if self.blocked.load(Ordering::Relaxed) && from != to {
            return None;
        }
        self.table.estimate_ticks(graph, from, to)
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod selection {
    use super::*;
    use crate::{select_meeting, Meeting};

    #[test]
    fn classes_follow_schedule() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let comps = star_components(3);

        let m = select_meeting(Tick(0), VertexId(1), &comps[0], &g, &t);
        assert_eq!(m, Meeting { vertex: VertexId(0), tick: Tick(50), class: MeetingClass::Current });

        let m = select_meeting(Tick(60), VertexId(1), &comps[0], &g, &t);
        assert_eq!((m.tick, m.class), (Tick(100), MeetingClass::MissedCurrent));

        let m = select_meeting(Tick(150), VertexId(1), &comps[0], &g, &t);
        assert_eq!((m.tick, m.class), (Tick(151), MeetingClass::BestEffort));
    }

    #[test]
    fn nobody_to_meet_is_perpetual() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);

        let mut owners = comps[0].owners().clone();
        owners.put(PartitionId(1), AgentId(0), Tick(1));
        owners.put(PartitionId(2), AgentId(0), Tick(1));
        comps[0].absorb(&Envelope::new(AgentId(1), Tick(1), Message::OwnerSync(owners.send_all())));

        let m = select_meeting(Tick(2), VertexId(3), &comps[0], &g, &t);
        assert!(m.is_perpetual());
        assert_eq!(m.vertex, VertexId(3));
    }

    #[test]
    fn partitionless_agent_still_meets() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);

        let mut owners = comps[0].owners().clone();
        owners.put(PartitionId(1), AgentId(0), Tick(1));
        comps[1].absorb(&Envelope::new(AgentId(0), Tick(1), Message::OwnerSync(owners.send_all())));
        assert!(comps[1].owned_partitions().is_empty());

        let m = select_meeting(Tick(2), VertexId(3), &comps[1], &g, &t);
        assert!(!m.is_perpetual());
        assert_eq!(m, Meeting { vertex: VertexId(0), tick: Tick(50), class: MeetingClass::Current });
    }

    /// Line 0-1-2-3-4.  Partition 1 = {1, 2, 3} meets partition 0 at 1 and
    /// partition 2 at 3.
    fn line_component(sched_1: MeetingSchedule, sched_3: MeetingSchedule) -> (PatrolGraph, PartitionComponent) {
        let mut b = PatrolGraphBuilder::new();
        for i in 0..5 {
            b.add_vertex(Point::new(i as f32, 0.0));
        }
        for i in 0..4 {
            b.add_corridor(VertexId(i), VertexId(i + 1), 1);
        }
        let v = VertexId;
        let part = |id: u32, vs: &[u32], mps: &[u32]| PartitionInfo {
            id:             PartitionId(id),
            owner_hint:     AgentId(id),
            vertices:       vs.iter().copied().map(v).collect(),
            meeting_points: mps.iter().copied().map(v).collect(),
            diameter:       4,
        };
        let plan = PartitionPlan {
            topology: Topology::new(
                [part(0, &[0, 1], &[1]), part(1, &[1, 2, 3], &[1, 3]), part(2, &[3, 4], &[3])],
                [
                    MeetingPoint { vertex: v(1), partitions: set(&[PartitionId(0), PartitionId(1)]) },
                    MeetingPoint { vertex: v(3), partitions: set(&[PartitionId(1), PartitionId(2)]) },
                ],
            ),
            schedules: BTreeMap::from([(v(1), sched_1), (v(3), sched_3)]),
        };
        let (owners, schedules) = plan.initial_maps(AgentId(0));
        let mut c = PartitionComponent::new(AgentId(1), Arc::new(plan.topology), ProtocolConfig::default());
        c.seed(owners, schedules);
        (b.build(), c)
    }

    #[test]
    fn missed_round_outranks_current() {
        let (g, c) = line_component(
            MeetingSchedule::new(Tick(0), Tick(80)),
            MeetingSchedule::new(Tick(78), Tick(120)),
        );
        let t = DistanceTable::build(&g);
        let m = select_meeting(Tick(0), VertexId(2), &c, &g, &t);
        assert_eq!(m, Meeting { vertex: VertexId(1), tick: Tick(80), class: MeetingClass::MissedCurrent });
    }

    #[test]
    fn earlier_meeting_slotted_in_when_it_fits() {
        let (g, c) = line_component(
            MeetingSchedule::new(Tick(0), Tick(80)),
            MeetingSchedule::new(Tick(20), Tick(120)),
        );
        let t = DistanceTable::build(&g);
        let m = select_meeting(Tick(0), VertexId(2), &c, &g, &t);
        assert_eq!(m, Meeting { vertex: VertexId(3), tick: Tick(20), class: MeetingClass::Current });
    }
}

// ── State machine ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod state_machine {
    use super::*;

    #[test]
    fn patrols_until_lookahead_says_go() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mc = MeetingComponent::new(AgentId(0));
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        let d = mc.step(ctx(&g, &t, 10, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::Follow(VertexId(2)));
        assert_eq!(mc.state(), &MeetingState::Patrolling);
        assert_eq!(mc.planned().map(|m| m.tick), Some(Tick(50)));

        // 47 + eta(1→2)=2 + eta(2→0)=1 reaches 50: commit now.
        let d = mc.step(ctx(&g, &t, 47, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::GoTo(VertexId(0)));
        assert!(matches!(mc.state(), MeetingState::CommittedToMeeting(m) if m.tick == Tick(50)));
        assert!(matches!(events[..], [ProtocolEvent::MeetingCommitted { .. }]));
    }

    #[test]
    fn lone_survivor_exchanges_and_proposes_takeover() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mc = MeetingComponent::new(AgentId(0));
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        mc.step(ctx(&g, &t, 48, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        let d = mc.step(ctx(&g, &t, 49, 0, Some(1)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::Hold);
        assert!(matches!(mc.state(), MeetingState::AtRendezvous(_)));
        assert!(matches!(out.last().map(|e| &e.message), Some(Message::Presence(_))));

        out.clear();
        let d = mc.step(ctx(&g, &t, 50, 0, Some(1)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::Hold);
        assert!(matches!(mc.state(), MeetingState::Exchanging(_)));
        assert_eq!(out.len(), 3);

        mc.step(ctx(&g, &t, 51, 0, Some(1)), &mut comps[0], &mut out, &mut events);
        let d = mc.step(ctx(&g, &t, 52, 0, None), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::Hold);
        assert_eq!(mc.state(), &MeetingState::Patrolling);

        assert_eq!(comps[0].schedule(VertexId(0)), Some(MeetingSchedule::new(Tick(62), Tick(110))));
        assert_eq!(comps[0].debug_snapshot().pending_takeovers, 2);
        assert_eq!(mc.planned().map(|m| m.tick), Some(Tick(62)));
        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert!(kinds.contains(&"rendezvous_reached"));
        assert!(kinds.contains(&"exchange_completed"));
    }

    #[test]
    fn committed_meeting_rebases_when_peers_moved_on() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mc = MeetingComponent::new(AgentId(0));
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        mc.step(ctx(&g, &t, 48, 1, Some(2)), &mut comps[0], &mut out, &mut events);

        let mut schedules = comps[1].schedules().clone();
        schedules.put(VertexId(0), MeetingSchedule::new(Tick(100), Tick(110)), Tick(48));
        comps[0].absorb(&Envelope::new(AgentId(1), Tick(48), Message::ScheduleSync(schedules.send_all())));

        let d = mc.step(ctx(&g, &t, 49, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::GoTo(VertexId(0)));
        assert!(matches!(mc.state(), MeetingState::CommittedToMeeting(m) if m.tick == Tick(100)));
    }

    #[test]
    fn unreachable_meeting_idles() {
        let g = star_graph();
        let est = Blockable { table: DistanceTable::build(&g), blocked: AtomicBool::new(false) };
        let mut comps = star_components(3);
        let mut mc = MeetingComponent::new(AgentId(0));
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        mc.step(ctx(&g, &est, 48, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        est.blocked.store(true, Ordering::Relaxed);
        let d = mc.step(ctx(&g, &est, 49, 1, Some(2)), &mut comps[0], &mut out, &mut events);
        assert_eq!(d, MovementDecision::Idle);
        assert!(matches!(events.last(), Some(ProtocolEvent::NoRoute { to: VertexId(0), .. })));
    }

    #[test]
    fn reset_returns_to_patrolling() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mc = MeetingComponent::new(AgentId(0));
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        mc.step(ctx(&g, &t, 49, 0, None), &mut comps[0], &mut out, &mut events);
        mc.step(ctx(&g, &t, 50, 0, None), &mut comps[0], &mut out, &mut events);
        assert!(comps[0].round_vertex().is_some());

        mc.reset(&mut comps[0]);
        assert_eq!(mc.state(), &MeetingState::Patrolling);
        assert_eq!(comps[0].round_vertex(), None);
    }

    #[test]
    fn full_attendance_meets_early_and_in_step() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mcs: Vec<MeetingComponent> = (0..3).map(|i| MeetingComponent::new(AgentId(i))).collect();
        let mut events = Vec::<ProtocolEvent>::new();

        // Tick 47: each agent on its first spoke commits.
        let mut out = Vec::new();
        for i in 0..3 {
            let spoke = 2 * i as u32 + 1;
            let d = mcs[i].step(ctx(&g, &t, 47, spoke, Some(spoke + 1)), &mut comps[i], &mut out, &mut events);
            assert_eq!(d, MovementDecision::GoTo(VertexId(0)));
        }

        // Tick 48: all arrive at the hub and announce presence.
        for i in 0..3 {
            mcs[i].step(ctx(&g, &t, 48, 0, None), &mut comps[i], &mut out, &mut events);
        }
        deliver(&mut comps, &out);

        // Tick 49: everyone sees everyone, the exchange starts a tick early.
        let mut out = Vec::new();
        for i in 0..3 {
            mcs[i].step(ctx(&g, &t, 49, 0, None), &mut comps[i], &mut out, &mut events);
            assert!(matches!(mcs[i].state(), MeetingState::Exchanging(_)));
        }
        let early = events.iter().filter(|e| matches!(e, ProtocolEvent::MetEarly { .. })).count();
        assert_eq!(early, 3);

        for now in [50, 51] {
            deliver(&mut comps, &out);
            out = Vec::new();
            for i in 0..3 {
                mcs[i].step(ctx(&g, &t, now, 0, None), &mut comps[i], &mut out, &mut events);
            }
        }
        deliver(&mut comps, &out);

        for (mc, c) in mcs.iter().zip(&comps) {
            assert_eq!(mc.state(), &MeetingState::Patrolling);
            assert_eq!(c.schedule(VertexId(0)), Some(MeetingSchedule::new(Tick(100), Tick(110))));
            assert_eq!(c.debug_snapshot().pending_takeovers, 0);
        }
    }

    #[test]
    fn late_arrival_waits_for_the_next_round() {
        let g = star_graph();
        let t = DistanceTable::build(&g);
        let mut comps = star_components(3);
        let mut mcs: Vec<MeetingComponent> = (0..3).map(|i| MeetingComponent::new(AgentId(i))).collect();
        let mut events = Vec::<ProtocolEvent>::new();

        // Agent 2 commits in time but reaches the hub a tick after the
        // others have started.
        let d = mcs[2].step(ctx(&g, &t, 47, 5, Some(6)), &mut comps[2], &mut Vec::new(), &mut events);
        assert_eq!(d, MovementDecision::GoTo(VertexId(0)));

        let mut out = Vec::new();
        for i in 0..2 {
            mcs[i].step(ctx(&g, &t, 49, 0, None), &mut comps[i], &mut out, &mut events);
            mcs[i].step(ctx(&g, &t, 50, 0, None), &mut comps[i], &mut out, &mut events);
            assert!(matches!(mcs[i].state(), MeetingState::Exchanging(_)));
        }

        for now in [51, 52] {
            deliver(&mut comps, &out);
            out = Vec::new();
            for i in 0..2 {
                mcs[i].step(ctx(&g, &t, now, 0, None), &mut comps[i], &mut out, &mut events);
            }
            if now == 51 {
                let d = mcs[2].step(ctx(&g, &t, now, 0, None), &mut comps[2], &mut out, &mut events);
                assert_eq!(d, MovementDecision::Hold);
                assert_eq!(mcs[2].state(), &MeetingState::Patrolling);
                assert_eq!(comps[2].round_vertex(), None);
                assert!(out.iter().any(|e| e.from == AgentId(2) && matches!(e.message, Message::Presence(_))));
            }
        }
        deliver(&mut comps, &out);

        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert!(!kinds.contains(&"peer_missing"));
        assert_eq!(kinds.iter().filter(|k| **k == "exchange_completed").count(), 2);
        for c in &comps {
            assert_eq!(c.debug_snapshot().pending_takeovers, 0);
            assert_eq!(c.schedule(VertexId(0)), Some(MeetingSchedule::new(Tick(100), Tick(110))));
        }
    }
}
