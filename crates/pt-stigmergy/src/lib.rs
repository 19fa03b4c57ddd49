//! `pt-stigmergy`: a replicated key/value map with deterministic conflict
//! resolution, shared by agents that only talk through lossy broadcasts.
//!
//! Every agent holds a full replica.  Writes are local and instantaneous;
//! replicas converge by exchanging whole-map snapshots and applying the pure
//! [`resolve`] rule to every key.  No read or write ever blocks or sends a
//! message: propagation is the caller's job (`send_all` → broadcast →
//! `merge`).
//!
//! # Crate layout
//!
//! | Module     | Contents                                                 |
//! |------------|----------------------------------------------------------|
//! | [`entry`]  | `StigmergyEntry<V>`, `resolve`, `Resolution`             |
//! | [`map`]    | `ReplicatedMap<K, V>`, `MapSnapshot<K, V>`               |
//!
//! # Conflict rule
//!
//! 1. Higher `version` wins.  A writer always bumps the version it observed,
//!    so a deliberate overwrite supersedes what it replaced.
//! 2. Equal versions are concurrent writes: the lower writer id wins.
//! 3. A full tie keeps the local entry.

pub mod entry;
pub mod map;


pub use entry::{resolve, Resolution, StigmergyEntry};
pub use map::{MapSnapshot, ReplicatedMap};
