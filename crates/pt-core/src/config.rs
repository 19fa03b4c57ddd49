//! Mission and protocol configuration.
//!
//! Typically built in code or loaded from a JSON file by the application
//! crate (with the `serde` feature) and passed to the mission runner.

// ── ProtocolConfig ────────────────────────────────────────────────────────────

/// Tunable constants of the partition/rendezvous protocol.
///
/// None of these values are load-bearing for correctness; they shape how
/// quickly a missing agent's workload is reassigned.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProtocolConfig {
    /// Short interval used to pull a meeting in after a missing owner is
    /// detected, and to postpone the other meetings of a partition that has
    /// just been taken over.  Default: 10.
    pub takeover_grace_ticks: u64,

    /// Run the best-effort load-rebalancing step after each exchange.
    pub rebalance: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            takeover_grace_ticks: 10,
            rebalance:            true,
        }
    }
}

// ── MissionConfig ─────────────────────────────────────────────────────────────

/// Top-level mission configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MissionConfig {
    /// Total ticks to simulate.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Call `SimObserver::on_snapshot` every N ticks.  0 disables snapshots.
    pub snapshot_interval_ticks: u64,

    /// Probability that any single broadcast copy is silently dropped on its
    /// way to one receiver.  0.0 = lossless.
    pub drop_probability: f64,

    /// Protocol tunables shared by every agent.
    pub protocol: ProtocolConfig,
}

impl MissionConfig {
    /// The tick at which the mission ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> crate::Tick {
        crate::Tick(self.total_ticks)
    }

    /// Reject values no mission can run with.
    pub fn validate(&self) -> crate::PatrolResult<()> {
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(crate::PatrolError::Config(format!(
                "drop_probability {} is outside [0, 1]",
                self.drop_probability
            )));
        }
        if self.protocol.takeover_grace_ticks == 0 {
            return Err(crate::PatrolError::Config("takeover_grace_ticks must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            total_ticks:             1_000,
            seed:                    42,
            snapshot_interval_ticks: 0,
            drop_probability:        0.0,
            protocol:                ProtocolConfig::default(),
        }
    }
}
