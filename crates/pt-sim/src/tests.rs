//! Integration tests for pt-sim.

use std::collections::{BTreeMap, BTreeSet};

use pt_core::{AgentId, AgentRng, MissionConfig, PartitionId, Point, ProtocolConfig, SimRng, Tick, VertexId};
use pt_graph::{DistanceTable, PatrolGraph, PatrolGraphBuilder};
use pt_partition::{
    Envelope, FaultTracker, MeetingPoint, MeetingSchedule, Message, PartitionInfo, PartitionPlan,
    Presence, ProtocolEvent, StaticGenerator, Topology,
};

use crate::{
    BroadcastTransport, IdlenessSelector, LossyBroadcast, MobilityEngine, NoopObserver,
    PatrolRoute, RouteSelector, Sim, SimBuilder, SimError, SimObserver, next_hop,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn set<T: Ord + Copy>(items: &[T]) -> BTreeSet<T> {
    items.iter().copied().collect()
}

fn test_config(total_ticks: u64) -> MissionConfig {
    MissionConfig {
        total_ticks,
        seed:                    42,
        snapshot_interval_ticks: 0,
        drop_probability:        0.0,
        protocol:                ProtocolConfig::default(),
    }
}

/// Hub 0 with spokes 1..=6, every corridor 1 tick.
fn star_graph() -> PatrolGraph {
    let mut b = PatrolGraphBuilder::new();
    let hub = b.add_vertex(Point::new(0.0, 0.0));
    for i in 1..=6 {
        let angle = i as f32;
        let v = b.add_vertex(Point::new(angle.cos(), angle.sin()));
        b.add_corridor(hub, v, 1);
    }
    b.build()
}

/// Partition i = {hub, 2i+1, 2i+2}, all meeting at the hub at (50, 100).
fn star_plan() -> PartitionPlan {
    let v = |i: u32| VertexId(i);
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
    PartitionPlan {
        topology:  Topology::new(partitions, [hub]),
        schedules: BTreeMap::from([(v(0), MeetingSchedule::new(Tick(50), Tick(100)))]),
    }
}

fn star_sim(config: MissionConfig) -> SimBuilder<DistanceTable> {
    let graph = star_graph();
    let table = DistanceTable::build(&graph);
    SimBuilder::new(config, graph, table, 3).generator(StaticGenerator::new(star_plan()))
}

/// `w × h` grid, corridors of 1 tick.  Vertex id = `y * w + x`.
fn grid_graph(w: u32, h: u32) -> PatrolGraph {
    let mut b = PatrolGraphBuilder::new();
    for y in 0..h {
        for x in 0..w {
            b.add_vertex(Point::new(x as f32, y as f32));
        }
    }
    for y in 0..h {
        for x in 0..w {
            let v = VertexId(y * w + x);
            if x + 1 < w {
                b.add_corridor(v, VertexId(y * w + x + 1), 1);
            }
            if y + 1 < h {
                b.add_corridor(v, VertexId((y + 1) * w + x), 1);
            }
        }
    }
    b.build()
}

#[derive(Default)]
struct Recorder {
    events:    Vec<ProtocolEvent>,
    lost:      Vec<(AgentId, Tick)>,
    snapshots: Vec<Tick>,
    ended:     Option<(Tick, FaultTracker)>,
}

impl SimObserver for Recorder {
    fn on_snapshot(&mut self, tick: Tick, agents: &[crate::AgentSnapshot]) {
        assert!(!agents.is_empty());
        self.snapshots.push(tick);
    }

    fn on_protocol_event(&mut self, event: &ProtocolEvent) {
        self.events.push(event.clone());
    }

    fn on_agent_lost(&mut self, agent: AgentId, tick: Tick) {
        self.lost.push((agent, tick));
    }

    fn on_sim_end(&mut self, final_tick: Tick, faults: &FaultTracker) {
        self.ended = Some((final_tick, faults.clone()));
    }
}

fn schedule_at_hub<E: pt_graph::PathEstimator>(sim: &Sim<E>, agent: u32) -> Option<MeetingSchedule> {
    sim.agents[agent as usize].partition.schedule(VertexId(0))
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let sim = star_sim(test_config(10)).build().unwrap();
        assert_eq!(sim.agents.len(), 3);
        assert_eq!(sim.now, Tick::ZERO);
        assert!(sim.alive.iter().all(|a| *a));
        // Every replica is seeded with the coordinator's maps.
        for agent in &sim.agents {
            assert_eq!(agent.partition.owner_of(PartitionId(1)), Some(AgentId(1)));
            assert_eq!(agent.partition.schedule(VertexId(0)), Some(MeetingSchedule::new(Tick(50), Tick(100))));
        }
    }

    #[test]
    fn default_positions_are_lowest_vertex_of_hinted_partition() {
        let sim = star_sim(test_config(10)).build().unwrap();
        for i in 0..3 {
            assert_eq!(sim.mobility.position(AgentId(i)), Some(VertexId(0)));
            assert_eq!(sim.agents[i as usize].route.last_visit(VertexId(0)), Some(Tick::ZERO));
        }
    }

    #[test]
    fn position_count_mismatch_errors() {
        let err = star_sim(test_config(10))
            .initial_positions(vec![VertexId(1), VertexId(2)])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::AgentCountMismatch { expected: 3, got: 2, .. }));
    }

    #[test]
    fn position_off_graph_errors() {
        let err = star_sim(test_config(10))
            .initial_positions(vec![VertexId(1), VertexId(2), VertexId(99)])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Graph(_)));
    }

    #[test]
    fn failure_of_unknown_agent_errors() {
        let err = star_sim(test_config(10)).failure(AgentId(7), Tick(5)).build().err().unwrap();
        assert!(matches!(err, SimError::UnknownAgent(AgentId(7))));
    }

    #[test]
    fn bad_drop_probability_errors() {
        let mut config = test_config(10);
        config.drop_probability = 1.5;
        assert!(matches!(star_sim(config).build().err().unwrap(), SimError::Core(_)));
    }

    #[test]
    fn plan_for_wrong_agent_count_errors() {
        let graph = star_graph();
        let table = DistanceTable::build(&graph);
        let err = SimBuilder::new(test_config(10), graph, table, 2)
            .generator(StaticGenerator::new(star_plan()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Plan(_)));
    }

    #[test]
    fn voronoi_is_the_default_generator() {
        let graph = grid_graph(5, 5);
        let table = DistanceTable::build(&graph);
        let sim = SimBuilder::new(test_config(10), graph, table, 3).build().unwrap();
        assert_eq!(sim.plan.topology.partitions.len(), 3);
        assert_eq!(sim.coverage().len(), 25);
    }
}

// ── Mobility ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod mobility {
    use super::*;
    use crate::MobilityError;

    #[test]
    fn hop_lands_after_corridor_cost() {
        let mut b = PatrolGraphBuilder::new();
        let a = b.add_vertex(Point::new(0.0, 0.0));
        let c = b.add_vertex(Point::new(3.0, 0.0));
        b.add_corridor(a, c, 3);
        let graph = b.build();

        let mut m = MobilityEngine::new(1);
        m.place(AgentId(0), a, Tick(0));
        assert_eq!(m.begin_hop(AgentId(0), c, Tick(10), &graph).unwrap(), Tick(13));
        assert_eq!(m.position(AgentId(0)), None);
        assert!((m.state(AgentId(0)).progress(Tick(11)) - 1.0 / 3.0).abs() < 1e-6);

        assert!(m.tick_arrivals(Tick(12)).is_empty());
        assert_eq!(m.tick_arrivals(Tick(13)), vec![(AgentId(0), c)]);
        assert_eq!(m.position(AgentId(0)), Some(c));
    }

    #[test]
    fn hop_errors() {
        let graph = star_graph();
        let mut m = MobilityEngine::new(2);
        assert!(matches!(
            m.begin_hop(AgentId(0), VertexId(1), Tick(0), &graph),
            Err(MobilityError::NotPlaced(_))
        ));
        m.place(AgentId(0), VertexId(1), Tick(0));
        assert!(matches!(
            m.begin_hop(AgentId(0), VertexId(2), Tick(0), &graph),
            Err(MobilityError::NotAdjacent { .. })
        ));
        m.begin_hop(AgentId(0), VertexId(0), Tick(0), &graph).unwrap();
        assert!(matches!(
            m.begin_hop(AgentId(0), VertexId(0), Tick(0), &graph),
            Err(MobilityError::AlreadyInTransit(_))
        ));
    }

    #[test]
    fn next_hop_follows_a_shortest_route() {
        let graph = grid_graph(3, 1);
        let table = DistanceTable::build(&graph);
        assert_eq!(next_hop(&graph, &table, VertexId(0), VertexId(2)), Some(VertexId(1)));
        assert_eq!(next_hop(&graph, &table, VertexId(2), VertexId(0)), Some(VertexId(1)));
        assert_eq!(next_hop(&graph, &table, VertexId(1), VertexId(1)), None);
    }

    #[test]
    fn next_hop_to_spoke_goes_through_hub() {
        let graph = star_graph();
        let table = DistanceTable::build(&graph);
        assert_eq!(next_hop(&graph, &table, VertexId(3), VertexId(5)), Some(VertexId(0)));
    }
}

// ── Route selection ───────────────────────────────────────────────────────────

#[cfg(test)]
mod route {
    use super::*;

    #[test]
    fn idleness_counts_from_last_visit() {
        let mut r = PatrolRoute::new(3);
        assert_eq!(r.idleness(VertexId(1), Tick(10)), 11);
        r.visit(VertexId(1), Tick(4));
        assert_eq!(r.idleness(VertexId(1), Tick(10)), 6);
        // Out-of-range visits are ignored.
        r.visit(VertexId(9), Tick(4));
        assert_eq!(r.last_visit(VertexId(9)), None);
    }

    #[test]
    fn picks_most_idle_neighbour_in_patrol_set() {
        let graph = star_graph();
        let mut route = PatrolRoute::new(graph.vertex_count());
        route.visit(VertexId(1), Tick(8));
        route.visit(VertexId(2), Tick(3));
        let mut rng = AgentRng::new(1, AgentId(0));
        let patrol = set(&[VertexId(0), VertexId(1), VertexId(2)]);
        let next = IdlenessSelector.suggest_next_vertex(
            AgentId(0), VertexId(0), &patrol, &route, &graph, Tick(10), &mut rng,
        );
        assert_eq!(next, Some(VertexId(2)));
    }

    #[test]
    fn ignores_neighbours_outside_patrol_set() {
        let graph = star_graph();
        let route = PatrolRoute::new(graph.vertex_count());
        let patrol = set(&[VertexId(0), VertexId(3)]);
        for seed in 0..10 {
            let mut rng = AgentRng::new(seed, AgentId(0));
            let next = IdlenessSelector.suggest_next_vertex(
                AgentId(0), VertexId(0), &patrol, &route, &graph, Tick(10), &mut rng,
            );
            assert_eq!(next, Some(VertexId(3)));
        }
    }

    #[test]
    fn falls_back_to_distant_patrol_vertex() {
        let graph = grid_graph(4, 1);
        let mut route = PatrolRoute::new(4);
        route.visit(VertexId(2), Tick(9));
        let mut rng = AgentRng::new(1, AgentId(0));
        let patrol = set(&[VertexId(2), VertexId(3)]);
        let next = IdlenessSelector.suggest_next_vertex(
            AgentId(0), VertexId(0), &patrol, &route, &graph, Tick(10), &mut rng,
        );
        assert_eq!(next, Some(VertexId(3)));
    }

    #[test]
    fn nothing_to_suggest() {
        let graph = star_graph();
        let route = PatrolRoute::new(graph.vertex_count());
        let mut rng = AgentRng::new(1, AgentId(0));
        for patrol in [BTreeSet::new(), set(&[VertexId(0)])] {
            let next = IdlenessSelector.suggest_next_vertex(
                AgentId(0), VertexId(0), &patrol, &route, &graph, Tick(10), &mut rng,
            );
            assert_eq!(next, None);
        }
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod transport {
    use super::*;

    fn presence(from: u32, at: u64) -> Envelope {
        Envelope::new(AgentId(from), Tick(at), Message::Presence(Presence {
            vertex:     VertexId(0),
            agent:      AgentId(from),
            arrived_at: Tick(at),
            overrode:   false,
            exchanging: false,
        }))
    }

    #[test]
    fn delivered_next_tick_to_everyone_but_sender() {
        let mut t = LossyBroadcast::lossless();
        for i in 0..3 {
            t.register(AgentId(i));
        }
        t.broadcast(presence(0, 5));
        assert!(t.receive_all(AgentId(1), Tick(5)).is_empty());
        assert_eq!(t.receive_all(AgentId(1), Tick(6)).len(), 1);
        assert_eq!(t.receive_all(AgentId(2), Tick(6)).len(), 1);
        assert!(t.receive_all(AgentId(0), Tick(6)).is_empty());
        assert_eq!(t.in_flight(), 0);
        assert_eq!(t.delivered, 2);
    }

    #[test]
    fn later_broadcasts_stay_queued() {
        let mut t = LossyBroadcast::lossless();
        t.register(AgentId(0));
        t.register(AgentId(1));
        t.broadcast(presence(0, 5));
        t.broadcast(presence(0, 6));
        assert_eq!(t.receive_all(AgentId(1), Tick(6)).len(), 1);
        assert_eq!(t.in_flight(), 1);
        assert_eq!(t.receive_all(AgentId(1), Tick(7))[0].sent_at, Tick(6));
    }

    #[test]
    fn unregistered_agents_receive_nothing() {
        let mut t = LossyBroadcast::lossless();
        t.register(AgentId(0));
        t.register(AgentId(1));
        t.broadcast(presence(0, 1));
        t.unregister(AgentId(1));
        t.broadcast(presence(0, 2));
        assert!(t.receive_all(AgentId(1), Tick(9)).is_empty());
    }

    #[test]
    fn certain_loss_drops_everything() {
        let mut t = LossyBroadcast::new(1.0, SimRng::new(3));
        for i in 0..4 {
            t.register(AgentId(i));
        }
        t.broadcast(presence(0, 1));
        assert_eq!(t.dropped, 3);
        assert_eq!(t.in_flight(), 0);
    }

    #[test]
    fn partial_loss_is_per_copy() {
        let mut t = LossyBroadcast::new(0.5, SimRng::new(3));
        for i in 0..11 {
            t.register(AgentId(i));
        }
        for at in 0..20 {
            t.broadcast(presence(0, at));
        }
        assert_eq!(t.dropped + t.in_flight() as u64, 200);
        assert!(t.dropped > 0 && t.in_flight() > 0);
    }
}

// ── Full missions ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod mission {
    use super::*;

    /// Three agents share the hub.  Agent 1 is lost at tick 80; the other
    /// two notice at the next meeting, propose a takeover, and agent 0
    /// confirms it one round later.
    #[test]
    fn star_takeover_scenario() {
        let mut sim = star_sim(test_config(200)).failure(AgentId(1), Tick(80)).build().unwrap();
        let mut rec = Recorder::default();

        // First meeting: everybody there, schedule becomes (100, 100 + 10).
        sim.run_ticks(60, &mut rec).unwrap();
        for i in 0..3 {
            assert_eq!(schedule_at_hub(&sim, i), Some(MeetingSchedule::new(Tick(100), Tick(110))));
        }
        assert!(rec.events.iter().all(|e| e.partition().is_none()));

        // Second meeting: agent 1 is gone.  Proposed, not confirmed.
        sim.run_ticks(45, &mut rec).unwrap();
        assert_eq!(rec.lost, vec![(AgentId(1), Tick(80))]);
        for i in [0, 2] {
            assert_eq!(schedule_at_hub(&sim, i), Some(MeetingSchedule::new(Tick(110), Tick(120))));
            assert_eq!(sim.agents[i as usize].partition.owner_of(PartitionId(1)), Some(AgentId(1)));
        }
        assert!(rec.events.iter().any(|e| matches!(
            e,
            ProtocolEvent::TakeoverProposed { partition: PartitionId(1), owner: AgentId(1), .. }
        )));
        assert!(!rec.events.iter().any(|e| matches!(e, ProtocolEvent::TakeoverConfirmed { .. })));
        assert!(!sim.coverage().contains(&VertexId(3)));

        // Third meeting: still missing, so the lower proposer takes over.
        sim.run_ticks(10, &mut rec).unwrap();
        for i in [0, 2] {
            assert_eq!(sim.agents[i as usize].partition.owner_of(PartitionId(1)), Some(AgentId(0)));
        }
        let zero = sim.agents[0].partition.vertices_to_patrol();
        assert!(zero.contains(&VertexId(3)) && zero.contains(&VertexId(4)));
        assert!(!sim.agents[2].partition.vertices_to_patrol().contains(&VertexId(3)));
        assert_eq!(sim.coverage(), sim.graph.vertices().collect::<BTreeSet<_>>());

        let confirmed: Vec<&ProtocolEvent> = rec
            .events
            .iter()
            .filter(|e| matches!(e, ProtocolEvent::TakeoverConfirmed { .. }))
            .collect();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].agent(), AgentId(0));
        assert!(confirmed[0].at() >= Tick(110));
        assert_eq!(sim.faults.takeovers_confirmed, 1);

        // The fleet settles on one owner per partition.
        sim.run(&mut rec).unwrap();
        assert!(sim.owner_views().values().all(|owners| owners.len() == 1));
        let (end, faults) = rec.ended.clone().unwrap();
        assert_eq!(end, Tick(200));
        assert_eq!(faults, sim.faults);
    }

    #[test]
    fn takeover_always_follows_an_earlier_proposal() {
        let mut sim = star_sim(test_config(300)).failure(AgentId(2), Tick(30)).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let mut confirmations = 0;
        for e in &rec.events {
            if let ProtocolEvent::TakeoverConfirmed { agent, at, partition, .. } = e {
                confirmations += 1;
                let proposed_before = rec.events.iter().any(|p| matches!(
                    p,
                    ProtocolEvent::TakeoverProposed { agent: a, at: t, partition: q, .. }
                        if a == agent && q == partition && t < at
                ));
                assert!(proposed_before, "{e:?} had no earlier proposal");
            }
        }
        assert_eq!(confirmations, 1);
        assert_eq!(sim.agents[0].partition.owner_of(PartitionId(2)), Some(AgentId(0)));
    }

    #[test]
    fn hub_schedule_never_moves_backwards() {
        let mut sim = star_sim(test_config(400)).failure(AgentId(1), Tick(120)).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let mut last: BTreeMap<AgentId, Tick> = BTreeMap::new();
        let mut completed = 0;
        for e in &rec.events {
            if let ProtocolEvent::ExchangeCompleted { agent, schedule, .. } = e {
                completed += 1;
                assert!(schedule.is_ordered());
                if let Some(prev) = last.insert(*agent, schedule.current_next) {
                    assert!(schedule.current_next >= prev, "{agent}: {prev} → {}", schedule.current_next);
                }
            }
        }
        assert!(completed >= 6);
    }

    #[test]
    fn no_failures_means_no_ownership_changes() {
        let mut sim = star_sim(test_config(300)).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(sim.faults.peers_missing, 0);
        assert_eq!(sim.faults.takeovers_confirmed, 0);
        assert!(sim.faults.exchanges >= 6);
        assert!(sim.faults.early_meetings > 0);
        for i in 0..3u32 {
            assert_eq!(sim.agents[0].partition.owner_of(PartitionId(i)), Some(AgentId(i)));
        }
    }

    #[test]
    fn grid_mission_keeps_full_coverage() {
        let graph = grid_graph(6, 6);
        let table = DistanceTable::build(&graph);
        let mut sim = SimBuilder::new(test_config(400), graph, table, 4).build().unwrap();
        let all: BTreeSet<VertexId> = sim.graph.vertices().collect();
        for _ in 0..400 {
            sim.run_ticks(1, &mut NoopObserver).unwrap();
            assert_eq!(sim.coverage(), all, "coverage lost at {}", sim.now);
        }
        assert!(sim.faults.exchanges > 0);
    }

    /// Ownership moves under message loss (takeovers, rebalancing), but the
    /// newest owner entry always belongs to an agent that believes it.
    #[test]
    fn lossy_grid_mission_keeps_full_coverage() {
        let graph = grid_graph(9, 6);
        let table = DistanceTable::build(&graph);
        let mut config = test_config(600);
        config.drop_probability = 0.2;
        let mut sim = SimBuilder::new(config, graph, table, 5).build().unwrap();
        let all: BTreeSet<VertexId> = sim.graph.vertices().collect();
        for _ in 0..600 {
            sim.run_ticks(1, &mut NoopObserver).unwrap();
            assert_eq!(sim.coverage(), all, "coverage lost at {}", sim.now);
        }
        assert!(sim.faults.exchanges > 0);
    }

    #[test]
    fn voronoi_mission_without_failures_misses_nobody() {
        let graph = grid_graph(6, 6);
        let table = DistanceTable::build(&graph);
        let mut sim = SimBuilder::new(test_config(500), graph, table, 4).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let missing: Vec<&ProtocolEvent> = rec
            .events
            .iter()
            .filter(|e| matches!(e, ProtocolEvent::PeerMissing { .. }))
            .collect();
        assert!(missing.is_empty(), "{missing:?}");
        assert_eq!(sim.faults.peers_missing, 0);
        assert_eq!(sim.faults.takeovers_confirmed, 0);
        assert!(sim.faults.exchanges > 0);
    }

    #[test]
    fn total_radio_loss_never_shrinks_coverage() {
        let mut config = test_config(200);
        config.drop_probability = 1.0;
        let mut sim = star_sim(config).build().unwrap();
        sim.run(&mut NoopObserver).unwrap();
        // Nobody hears anybody, so everyone keeps its own partition and
        // claims the others as missing.
        for i in 0..3u32 {
            let agent = &sim.agents[i as usize];
            assert!(agent.partition.owned_partitions().contains(&PartitionId(i)));
        }
        assert!(sim.faults.peers_missing > 0);
        assert_eq!(sim.coverage(), sim.graph.vertices().collect::<BTreeSet<_>>());
    }

    #[test]
    fn snapshots_follow_interval() {
        let mut config = test_config(25);
        config.snapshot_interval_ticks = 10;
        let mut sim = star_sim(config).failure(AgentId(2), Tick(5)).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(rec.snapshots, vec![Tick(0), Tick(10), Tick(20)]);

        let snaps = sim.snapshots();
        assert_eq!(snaps.len(), 3);
        assert!(!snaps[2].alive);
        assert_eq!(snaps[2].position, None);
        assert_eq!(snaps[0].partition.owned, vec![PartitionId(0)]);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut sim = star_sim(test_config(10)).build().unwrap();
        assert!(sim.destroy(AgentId(1)));
        assert!(!sim.destroy(AgentId(1)));
        assert!(!sim.destroy(AgentId(9)));
        assert!(!sim.is_alive(AgentId(1)));
        assert_eq!(sim.live_agents().count(), 2);
    }
}

// ── PatrolAgent ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod patrol_agent {
    use super::*;
    use pt_meeting::MeetingState;

    #[test]
    fn reset_abandons_meeting_and_takeovers() {
        let mut sim = star_sim(test_config(100)).build().unwrap();
        let Sim { agents, graph, estimator, .. } = &mut sim;
        let agent = &mut agents[0];
        let (mut out, mut events) = (Vec::new(), Vec::<ProtocolEvent>::new());

        // Alone at the 50 meeting: both peers are proposed for takeover.
        agent.partition.attend(VertexId(0), Tick(50), false);
        for now in [Tick(50), Tick(51), Tick(52)] {
            agent.partition.exchange_information(now, &mut out, &mut events);
        }
        assert_eq!(agent.partition.debug_snapshot().pending_takeovers, 2);
        let schedule = agent.partition.schedule(VertexId(0));
        assert_eq!(schedule, Some(MeetingSchedule::new(Tick(62), Tick(110))));

        agent.step(Tick(62), Some(VertexId(0)), &[], graph, &*estimator, &IdlenessSelector);
        assert_ne!(agent.meeting.state(), &MeetingState::Patrolling);
        assert_eq!(agent.partition.round_vertex(), Some(VertexId(0)));

        agent.reset();
        assert_eq!(agent.meeting.state(), &MeetingState::Patrolling);
        assert_eq!(agent.partition.round_vertex(), None);
        assert_eq!(agent.partition.debug_snapshot().pending_takeovers, 0);
        assert_eq!(agent.partition.schedule(VertexId(0)), schedule);
    }
}
