//! Unit tests for pt-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, PartitionId, VertexId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn agent_ids_are_totally_ordered() {
        let mut ids = vec![AgentId(3), AgentId(0), AgentId(2)];
        ids.sort();
        assert_eq!(ids, vec![AgentId(0), AgentId(2), AgentId(3)]);
        assert_eq!(ids.iter().min(), Some(&AgentId(0)));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(VertexId::INVALID.0, u32::MAX);
        assert_eq!(PartitionId::default(), PartitionId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
        assert_eq!(VertexId(3).to_string(), "VertexId(3)");
    }
}

#[cfg(test)]
mod geo {
    use crate::Point;

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert!((a.distance_2(b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn centroid_of_square() {
        let c = Point::centroid([
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(c, Point::new(1.0, 1.0));
        assert!(Point::centroid(std::iter::empty()).is_none());
    }
}

#[cfg(test)]
mod time {
    use crate::{MissionConfig, Tick};

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(3).saturating_since(Tick(9)), 0);
    }

    #[test]
    fn far_future_does_not_overflow() {
        let t = Tick::FAR_FUTURE + 1_000_000;
        assert!(t > Tick::FAR_FUTURE);
        assert_eq!(Tick(u64::MAX) + 1, Tick(u64::MAX));
    }

    #[test]
    fn mission_end_tick() {
        let cfg = MissionConfig { total_ticks: 250, ..MissionConfig::default() };
        assert_eq!(cfg.end_tick(), Tick(250));
    }

    #[test]
    fn protocol_defaults() {
        let cfg = MissionConfig::default();
        assert_eq!(cfg.protocol.takeover_grace_ticks, 10);
        assert!(cfg.protocol.rebalance);
        assert_eq!(cfg.drop_probability, 0.0);
    }

    #[test]
    fn config_validation() {
        assert!(MissionConfig::default().validate().is_ok());

        let lossy = MissionConfig { drop_probability: -0.1, ..MissionConfig::default() };
        assert!(matches!(lossy.validate(), Err(crate::PatrolError::Config(_))));

        let mut no_grace = MissionConfig::default();
        no_grace.protocol.takeover_grace_ticks = 0;
        assert!(no_grace.validate().is_err());
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, AgentRng, SimRng};

    #[test]
    fn agent_rng_is_deterministic() {
        let mut a = AgentRng::new(7, AgentId(3));
        let mut b = AgentRng::new(7, AgentId(3));
        let xs: Vec<u32> = (0..8).map(|_| a.gen_range(0..1_000)).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.gen_range(0..1_000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn distinct_agents_get_distinct_streams() {
        let mut a = AgentRng::new(7, AgentId(0));
        let mut b = AgentRng::new(7, AgentId(1));
        let xs: Vec<u64> = (0..8).map(|_| a.gen_range(0..u64::MAX)).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.gen_range(0..u64::MAX)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn gen_bool_clamps() {
        let mut rng = SimRng::new(1);
        assert!(rng.gen_bool(2.0));
        assert!(!rng.gen_bool(-1.0));
    }

    #[test]
    fn child_streams_are_reproducible() {
        let mut root_a = SimRng::new(99);
        let mut root_b = SimRng::new(99);
        let mut ca = root_a.child(1);
        let mut cb = root_b.child(1);
        assert_eq!(ca.gen_range(0..10_000u32), cb.gen_range(0..10_000u32));
    }
}
