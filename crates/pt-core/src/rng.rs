//! Deterministic per-agent and mission-level RNG wrappers.
//!
//! Each agent gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (agent_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive agent IDs uniformly across the seed space.
//! Agents never share RNG state, so the step phase can run in any order (or
//! in parallel) and still reproduce the same mission.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::AgentId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── AgentRng ──────────────────────────────────────────────────────────────────

/// Per-agent deterministic RNG.  Used by route selectors for tie-breaking.
pub struct AgentRng(SmallRng);

impl AgentRng {
    /// Seed deterministically from the run's global seed and an agent ID.
    pub fn new(global_seed: u64, agent: AgentId) -> Self {
        let seed = global_seed ^ (agent.0 as u64).wrapping_mul(MIXING_CONSTANT);
        AgentRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Choose a random element from a slice.
    /// Returns `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Mission-level RNG for global operations: the partition generator's first
/// seed vertex and the broadcast transport's drop decisions.
///
/// Used only in single-threaded contexts.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset, so independent
    /// subsystems do not perturb each other's random streams.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
