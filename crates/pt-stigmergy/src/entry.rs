//! Versioned map entries and the merge rule.

use std::cmp::Ordering;

use pt_core::{AgentId, Tick};

// ── StigmergyEntry ────────────────────────────────────────────────────────────

/// A value plus the metadata needed to order it against concurrent writes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StigmergyEntry<V> {
    pub value:      V,
    /// Agent that performed the write.
    pub writer:     AgentId,
    /// Tick of the write.  Informational; never consulted by [`resolve`].
    pub written_at: Tick,
    /// Per-key logical clock: one more than the version the writer replaced.
    pub version:    u64,
}

impl<V> StigmergyEntry<V> {
    pub fn new(value: V, writer: AgentId, written_at: Tick, version: u64) -> Self {
        Self { value, writer, written_at, version }
    }

    /// Precedence key.  Larger wins: higher version, then lower writer id.
    #[inline]
    fn precedence(&self) -> (u64, std::cmp::Reverse<AgentId>) {
        (self.version, std::cmp::Reverse(self.writer))
    }
}

// ── resolve ───────────────────────────────────────────────────────────────────

/// Outcome of comparing a local entry with an incoming one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    KeepLocal,
    TakeRemote,
}

/// Decide which of two entries for the same key survives a merge.
///
/// Pure and order-independent: for any two entries with distinct
/// `(version, writer)` the same entry wins whichever side it arrives on, and
/// merging an entry with itself is a no-op.
pub fn resolve<V: PartialEq + std::fmt::Debug>(
    local:  &StigmergyEntry<V>,
    remote: &StigmergyEntry<V>,
) -> Resolution {
    match remote.precedence().cmp(&local.precedence()) {
        Ordering::Greater => Resolution::TakeRemote,
        Ordering::Less    => Resolution::KeepLocal,
        Ordering::Equal   => {
            debug_assert_eq!(
                local.value, remote.value,
                "{} wrote two values at version {}",
                local.writer, local.version,
            );
            Resolution::KeepLocal
        }
    }
}
