//! The replica held by each agent.

use std::collections::BTreeMap;
use std::fmt::Debug;

use tracing::trace;

use pt_core::{AgentId, Tick};

use crate::{resolve, Resolution, StigmergyEntry};

// ── MapSnapshot ───────────────────────────────────────────────────────────────

/// Every entry of a replica, in key order.  The payload of a sync broadcast.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapSnapshot<K, V> {
    pub entries: Vec<(K, StigmergyEntry<V>)>,
}

impl<K, V> MapSnapshot<K, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for MapSnapshot<K, V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

// ── ReplicatedMap ─────────────────────────────────────────────────────────────

/// One agent's replica of a shared key/value map.
///
/// `get` and `put` are purely local.  Other replicas learn about a `put` only
/// when the owner broadcasts [`send_all`](Self::send_all) and they
/// [`merge`](Self::merge) it.
#[derive(Clone, Debug)]
pub struct ReplicatedMap<K, V> {
    owner:   AgentId,
    entries: BTreeMap<K, StigmergyEntry<V>>,
}

impl<K, V> ReplicatedMap<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + PartialEq + Debug,
{
    /// Empty replica owned by `owner`.  Writes are stamped with this id.
    pub fn new(owner: AgentId) -> Self {
        Self { owner, entries: BTreeMap::new() }
    }

    pub fn owner(&self) -> AgentId {
        self.owner
    }

    // ── Local access ──────────────────────────────────────────────────────

    /// Write `value` locally and return the new version.
    pub fn put(&mut self, key: K, value: V, now: Tick) -> u64 {
        let version = self.entries.get(&key).map_or(0, |e| e.version) + 1;
        self.entries.insert(key, StigmergyEntry::new(value, self.owner, now, version));
        version
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &K) -> Option<&StigmergyEntry<V>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, e)| (k, &e.value))
    }

    // ── Replication ───────────────────────────────────────────────────────

    /// Merge a single remote entry.  Returns `true` if the local value changed.
    pub fn merge_entry(&mut self, key: K, remote: StigmergyEntry<V>) -> bool {
        match self.entries.get(&key) {
            Some(local) if resolve(local, &remote) == Resolution::KeepLocal => false,
            _ => {
                trace!(
                    replica = %self.owner, key = ?key,
                    writer = %remote.writer, version = remote.version,
                    "stigmergy entry replaced",
                );
                self.entries.insert(key, remote);
                true
            }
        }
    }

    /// Merge every entry of a remote snapshot.  Returns the number of keys
    /// whose local value changed.
    pub fn merge(&mut self, snapshot: &MapSnapshot<K, V>) -> usize {
        snapshot
            .entries
            .iter()
            .filter(|(k, e)| self.merge_entry(k.clone(), e.clone()))
            .count()
    }

    /// Snapshot of the whole replica for broadcast.
    pub fn send_all(&self) -> MapSnapshot<K, V> {
        MapSnapshot {
            entries: self.entries.iter().map(|(k, e)| (k.clone(), e.clone())).collect(),
        }
    }

    /// Replace the replica's contents with `snapshot`.  Used once at mission
    /// start, so every replica begins from the same state.
    pub fn seed(&mut self, snapshot: MapSnapshot<K, V>) {
        self.entries = snapshot.entries.into_iter().collect();
    }
}
