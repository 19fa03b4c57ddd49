//! Logical time model.
//!
//! Every agent advances one logical `Tick` at a time.  There is no wall-clock
//! mapping: travel costs, partition diameters and meeting schedules are all
//! expressed directly in ticks, so schedule arithmetic is exact integer math.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute mission tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// A tick that no mission reaches.  Used for the perpetual placeholder
    /// meeting of single-agent deployments.  Half of `u64::MAX` so that
    /// adding travel estimates to it cannot overflow.
    pub const FAR_FUTURE: Tick = Tick(u64::MAX / 2);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0.saturating_add(n))
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }

    /// Ticks elapsed from `earlier` to `self`, or 0 if `earlier` is later.
    #[inline]
    pub fn saturating_since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0.saturating_add(rhs))
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
