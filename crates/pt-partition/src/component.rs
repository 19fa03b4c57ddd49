//! Per-agent Partition Component.
//!
//! Owns the agent's two replicas (owners and schedules), the cached patrol
//! set derived from them, the buffer of the rendezvous round the agent is
//! currently attending, and the tentative takeovers awaiting confirmation.
//! Presence heard for other vertices is kept for a couple of ticks so an
//! agent arriving at a rendezvous knows who is already there.
//! The exchange itself lives in [`crate::exchange`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use pt_core::{AgentId, PartitionId, ProtocolConfig, Tick, VertexId};
use pt_stigmergy::{MapSnapshot, ReplicatedMap};

use crate::exchange::ExchangePhase;
use crate::{Envelope, MeetingSchedule, Message, Presence, Topology};

/// Presence older than this many ticks no longer counts as "here now".
pub(crate) const PRESENCE_FRESH_TICKS: u64 = 2;

// ── Round buffer ──────────────────────────────────────────────────────────────

/// What one peer told us about itself at the current rendezvous.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PeerPresence {
    pub arrived_at: Tick,
    pub overrode:   bool,
    pub exchanging: bool,
    pub sent_at:    Tick,
}

impl PeerPresence {
    fn is_fresh(&self, now: Tick) -> bool {
        self.sent_at + PRESENCE_FRESH_TICKS >= now
    }
}

/// State of the rendezvous round this agent is attending.
#[derive(Clone, Debug)]
pub(crate) struct Round {
    pub vertex:         VertexId,
    pub arrived_at:     Tick,
    pub overrode:       bool,
    /// Arrived no later than the vertex's `current_next`.  Only punctual
    /// rounds may propose or confirm takeovers.
    pub punctual:       bool,
    pub peers:          BTreeMap<AgentId, PeerPresence>,
    pub proposals:      BTreeMap<AgentId, Tick>,
    /// Next exchange phase to run; `None` until the exchange starts.
    pub phase:          Option<ExchangePhase>,
    pub local_proposal: Option<Tick>,
}

/// A takeover proposed at one round and awaiting the next round at the same
/// vertex for confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingTakeover {
    pub owner:       AgentId,
    pub proposers:   BTreeSet<AgentId>,
    pub proposed_at: Tick,
}

// ── PartitionSnapshot ─────────────────────────────────────────────────────────

/// Read-only view of a component for observers and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionSnapshot {
    pub agent:             AgentId,
    pub owned:             Vec<PartitionId>,
    pub patrol_vertices:   usize,
    pub round_vertex:      Option<VertexId>,
    pub phase:             Option<ExchangePhase>,
    pub pending_takeovers: usize,
}

// ── PartitionComponent ────────────────────────────────────────────────────────

pub struct PartitionComponent {
    pub(crate) me:        AgentId,
    pub(crate) topology:  Arc<Topology>,
    pub(crate) config:    ProtocolConfig,
    pub(crate) owners:    ReplicatedMap<PartitionId, AgentId>,
    pub(crate) schedules: ReplicatedMap<VertexId, MeetingSchedule>,

    // Patrol-set cache, rebuilt only when the owned id set changes.
    owned:       BTreeSet<PartitionId>,
    patrol:      BTreeSet<VertexId>,

    pub(crate) round:   Option<Round>,
    pub(crate) pending: BTreeMap<(VertexId, PartitionId), PendingTakeover>,
    /// Presence heard at vertices this agent is not attending.
    heard:              BTreeMap<VertexId, BTreeMap<AgentId, PeerPresence>>,
}

impl PartitionComponent {
    /// Empty component.  Call [`seed`](Self::seed) before the mission starts.
    pub fn new(me: AgentId, topology: Arc<Topology>, config: ProtocolConfig) -> Self {
        Self {
            me,
            topology,
            config,
            owners:    ReplicatedMap::new(me),
            schedules: ReplicatedMap::new(me),
            owned:     BTreeSet::new(),
            patrol:    BTreeSet::new(),
            round:     None,
            pending:   BTreeMap::new(),
            heard:     BTreeMap::new(),
        }
    }

    /// Load the coordinator's initial maps.
    pub fn seed(
        &mut self,
        owners:    MapSnapshot<PartitionId, AgentId>,
        schedules: MapSnapshot<VertexId, MeetingSchedule>,
    ) {
        self.owners.seed(owners);
        self.schedules.seed(schedules);
        self.refresh_patrol_set();
    }

    // ── Read helpers ──────────────────────────────────────────────────────

    pub fn id(&self) -> AgentId {
        self.me
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn owners(&self) -> &ReplicatedMap<PartitionId, AgentId> {
        &self.owners
    }

    pub fn schedules(&self) -> &ReplicatedMap<VertexId, MeetingSchedule> {
        &self.schedules
    }

    /// Partitions currently mapped to this agent.
    pub fn owned_partitions(&self) -> &BTreeSet<PartitionId> {
        &self.owned
    }

    /// Union of the vertex sets of every owned partition.
    pub fn vertices_to_patrol(&self) -> &BTreeSet<VertexId> {
        &self.patrol
    }

    pub fn owner_of(&self, partition: PartitionId) -> Option<AgentId> {
        self.owners.get(&partition).copied()
    }

    pub fn schedule(&self, vertex: VertexId) -> Option<MeetingSchedule> {
        self.schedules.get(&vertex).copied()
    }

    /// Partitions whose meetings this agent attends: the owned ones, or the
    /// hinted ones while it owns nothing, so it keeps meeting peers and can
    /// be handed work again.
    fn attended_partitions(&self) -> BTreeSet<PartitionId> {
        if !self.owned.is_empty() {
            return self.owned.clone();
        }
        self.topology
            .partitions
            .values()
            .filter(|p| p.owner_hint == self.me)
            .map(|p| p.id)
            .collect()
    }

    /// Meeting vertices of every attended partition.
    pub fn my_meeting_points(&self) -> BTreeSet<VertexId> {
        self.attended_partitions()
            .iter()
            .filter_map(|p| self.topology.partition(*p))
            .flat_map(|p| p.meeting_points.iter().copied())
            .collect()
    }

    /// `true` if `vertex` is one of [`my_meeting_points`](Self::my_meeting_points).
    pub fn attends(&self, vertex: VertexId) -> bool {
        let attended = self.attended_partitions();
        self.topology.partitions_at(vertex).any(|p| attended.contains(&p))
    }

    /// Current owners of the partitions meeting at `vertex`, minus this agent.
    pub fn expected_attendees(&self, vertex: VertexId) -> BTreeSet<AgentId> {
        self.topology
            .partitions_at(vertex)
            .filter_map(|p| self.owner_of(p))
            .filter(|a| *a != self.me)
            .collect()
    }

    // ── Incoming broadcasts ───────────────────────────────────────────────

    /// Apply one delivered broadcast.
    pub fn absorb(&mut self, envelope: &Envelope) {
        match &envelope.message {
            Message::OwnerSync(snapshot) => {
                if self.owners.merge(snapshot) > 0 {
                    self.refresh_patrol_set();
                }
            }
            Message::ScheduleSync(snapshot) => {
                self.schedules.merge(snapshot);
            }
            Message::Presence(p) => {
                let presence = PeerPresence {
                    arrived_at: p.arrived_at,
                    overrode:   p.overrode,
                    exchanging: p.exchanging,
                    sent_at:    envelope.sent_at,
                };
                match self.round.as_mut().filter(|r| r.vertex == p.vertex) {
                    Some(round) => {
                        round.peers.insert(p.agent, presence);
                    }
                    None => {
                        self.heard.entry(p.vertex).or_default().insert(p.agent, presence);
                    }
                }
            }
            Message::Proposal(p) => {
                if let Some(round) = self.round.as_mut().filter(|r| r.vertex == p.vertex) {
                    round.proposals.insert(p.agent, p.next_meeting);
                }
            }
        }
    }

    // ── Rendezvous round ──────────────────────────────────────────────────

    /// Start (or restart) a round at `vertex`.  Clears anything buffered for
    /// an earlier round; fresh presence already heard at `vertex` carries
    /// over.
    pub fn attend(&mut self, vertex: VertexId, now: Tick, overrode: bool) {
        let punctual = self.schedule(vertex).is_none_or(|s| now <= s.current_next);
        let peers: BTreeMap<AgentId, PeerPresence> = self
            .heard
            .remove(&vertex)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, p)| p.is_fresh(now))
            .collect();
        self.heard.retain(|_, peers| {
            peers.retain(|_, p| p.is_fresh(now));
            !peers.is_empty()
        });

        debug!(
            agent = %self.me, vertex = %vertex, overrode, punctual, heard = peers.len(),
            "attending rendezvous",
        );
        self.round = Some(Round {
            vertex,
            arrived_at: now,
            overrode,
            punctual,
            peers,
            proposals: BTreeMap::new(),
            phase: None,
            local_proposal: None,
        });
    }

    pub fn round_vertex(&self) -> Option<VertexId> {
        self.round.as_ref().map(|r| r.vertex)
    }

    /// Tick this agent started attending the current round.
    pub fn round_arrival(&self) -> Option<Tick> {
        self.round.as_ref().map(|r| r.arrived_at)
    }

    /// Broadcast this agent's presence at the current round, if any.
    pub fn announce_presence(&self, now: Tick, out: &mut Vec<Envelope>) {
        if let Some(round) = &self.round {
            out.push(Envelope::new(self.me, now, Message::Presence(Presence {
                vertex:     round.vertex,
                agent:      self.me,
                arrived_at: round.arrived_at,
                overrode:   round.overrode,
                exchanging: round.phase.is_some(),
            })));
        }
    }

    /// Arrival tick of every peer whose presence at the current round is
    /// fresh at `now`.  Does not include this agent.
    pub fn fresh_presence(&self, now: Tick) -> BTreeMap<AgentId, Tick> {
        self.round
            .iter()
            .flat_map(|r| r.peers.iter())
            .filter(|(_, p)| p.is_fresh(now))
            .map(|(a, p)| (*a, p.arrived_at))
            .collect()
    }

    /// `true` if a peer at the current round has started its exchange
    /// while this agent has not.  Joining then would resolve on half a
    /// round.
    pub fn exchange_under_way(&self, now: Tick) -> bool {
        self.round.as_ref().is_some_and(|r| {
            r.phase.is_none() && r.peers.values().any(|p| p.exchanging && p.is_fresh(now))
        })
    }

    /// `true` if the current round started no later than its scheduled tick.
    pub fn round_is_punctual(&self) -> bool {
        self.round.as_ref().is_some_and(|r| r.punctual)
    }

    pub fn leave_round(&mut self) {
        self.round = None;
    }

    /// Drop the round and every tentative takeover.  The replicated maps
    /// are kept.
    pub fn reset_transient(&mut self) {
        self.round = None;
        self.pending.clear();
        self.heard.clear();
    }

    // ── Observability ─────────────────────────────────────────────────────

    pub fn debug_snapshot(&self) -> PartitionSnapshot {
        PartitionSnapshot {
            agent:             self.me,
            owned:             self.owned.iter().copied().collect(),
            patrol_vertices:   self.patrol.len(),
            round_vertex:      self.round_vertex(),
            phase:             self.round.as_ref().and_then(|r| r.phase),
            pending_takeovers: self.pending.len(),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Recompute the owned set; rebuild the patrol set only if it changed.
    pub(crate) fn refresh_patrol_set(&mut self) {
        let owned: BTreeSet<PartitionId> = self
            .owners
            .iter()
            .filter(|(_, a)| **a == self.me)
            .map(|(p, _)| *p)
            .collect();
        if owned == self.owned {
            return;
        }
        self.patrol = owned
            .iter()
            .filter_map(|p| self.topology.partition(*p))
            .flat_map(|p| p.vertices.iter().copied())
            .collect();
        debug!(
            agent = %self.me, partitions = owned.len(), vertices = self.patrol.len(),
            "patrol set rebuilt",
        );
        self.owned = owned;
    }
}
