//! The rendezvous information exchange.
//!
//! A resumable three-phase procedure driven by one
//! [`PartitionComponent::exchange_information`] call per tick.  Each call
//! runs the next phase recorded in the component's round buffer, so an agent
//! can be interrupted between phases without losing its place.
//!
//! # Resolve order
//!
//! 1. Present set: this agent plus every peer with fresh presence.
//! 2. Missing owners: owners of partitions meeting here that are not present.
//!    Stale tentative takeovers are cancelled first.
//! 3. Two-phase takeover: a missing owner is only replaced on the second
//!    consecutive round at this vertex that finds it missing.  Rounds this
//!    agent joined after the scheduled tick neither propose nor confirm.
//! 4. Rebalancing, only if no owner was missing.  The taker writes the new
//!    owner; the giver lets go once it merges that write.
//! 5. Schedule write.

use std::collections::BTreeSet;

use tracing::{debug, info};

use pt_core::{AgentId, PartitionId, Tick, VertexId};

use crate::component::PendingTakeover;
use crate::{
    Envelope, MeetingSchedule, Message, PartitionComponent, ProtocolEvent, Proposal, Telemetry,
};

/// Number of consecutive ticks one exchange occupies.
pub const EXCHANGE_TICKS: u64 = 3;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExchangePhase {
    Announce,
    Propose,
    Resolve,
}

/// Result of one [`PartitionComponent::exchange_information`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeProgress {
    /// No round is being attended; nothing was done.
    NotAttending,
    /// A phase ran; the payload is the phase the next call will run.
    InProgress(ExchangePhase),
    Done(ExchangeOutcome),
}

/// What a completed exchange decided, from this agent's point of view.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ExchangeOutcome {
    pub vertex:     VertexId,
    pub schedule:   MeetingSchedule,
    pub present:    BTreeSet<AgentId>,
    /// `(partition, owner)` for every owner found absent.
    pub missing:    Vec<(PartitionId, AgentId)>,
    /// `(partition, new owner)` for every takeover confirmed this round.
    pub takeovers:  Vec<(PartitionId, AgentId)>,
    /// `(partition, giver, taker)` if a partition changed hands to balance load.
    pub rebalanced: Option<(PartitionId, AgentId, AgentId)>,
}

// ── Exchange ──────────────────────────────────────────────────────────────────

impl PartitionComponent {
    /// Phase the next exchange call will run, `None` if not exchanging.
    pub fn exchange_phase(&self) -> Option<ExchangePhase> {
        self.round.as_ref().and_then(|r| r.phase)
    }

    /// Run the next phase of the exchange at the attended vertex.
    pub fn exchange_information(
        &mut self,
        now:       Tick,
        out:       &mut Vec<Envelope>,
        telemetry: &mut dyn Telemetry,
    ) -> ExchangeProgress {
        let Some(round) = self.round.as_ref() else {
            return ExchangeProgress::NotAttending;
        };
        let vertex = round.vertex;

        match round.phase.unwrap_or(ExchangePhase::Announce) {
            ExchangePhase::Announce => {
                debug!(agent = %self.me, vertex = %vertex, "exchange: announce");
                self.set_phase(ExchangePhase::Propose);
                self.send_all(now, out);
                self.announce_presence(now, out);
                ExchangeProgress::InProgress(ExchangePhase::Propose)
            }
            ExchangePhase::Propose => {
                let proposal = self.local_proposal(now);
                debug!(agent = %self.me, vertex = %vertex, proposal = %proposal, "exchange: propose");
                out.push(Envelope::new(self.me, now, Message::Proposal(Proposal {
                    vertex,
                    agent:        self.me,
                    next_meeting: proposal,
                })));
                self.announce_presence(now, out);
                if let Some(r) = self.round.as_mut() {
                    r.local_proposal = Some(proposal);
                }
                self.set_phase(ExchangePhase::Resolve);
                ExchangeProgress::InProgress(ExchangePhase::Resolve)
            }
            ExchangePhase::Resolve => {
                let outcome = self.resolve(now, telemetry);
                self.send_all(now, out);
                self.round = None;
                ExchangeProgress::Done(outcome)
            }
        }
    }

    /// Queue full snapshots of both replicas.
    pub fn send_all(&self, now: Tick, out: &mut Vec<Envelope>) {
        out.push(Envelope::new(self.me, now, Message::OwnerSync(self.owners.send_all())));
        out.push(Envelope::new(self.me, now, Message::ScheduleSync(self.schedules.send_all())));
    }

    fn set_phase(&mut self, phase: ExchangePhase) {
        if let Some(r) = self.round.as_mut() {
            r.phase = Some(phase);
        }
    }

    /// Σ diameters of owned partitions + the latest `next_next` over this
    /// agent's meeting points.
    pub fn local_proposal(&self, now: Tick) -> Tick {
        let load: u64 = self.owned_partitions().iter().map(|p| self.topology.diameter(*p)).sum();
        let horizon = self
            .my_meeting_points()
            .iter()
            .filter_map(|v| self.schedule(*v))
            .map(|s| s.next_next)
            .max()
            .unwrap_or(now);
        horizon + load
    }

    // ── Resolve ───────────────────────────────────────────────────────────

    fn resolve(&mut self, now: Tick, telemetry: &mut dyn Telemetry) -> ExchangeOutcome {
        let Some(round) = self.round.clone() else {
            return ExchangeOutcome::default();
        };
        let vertex = round.vertex;

        let mut present: BTreeSet<AgentId> = self.fresh_presence(now).into_keys().collect();
        present.insert(self.me);
        let mut pool: BTreeSet<AgentId> = round
            .peers
            .iter()
            .filter(|(a, p)| present.contains(*a) && !p.overrode)
            .map(|(a, _)| *a)
            .collect();
        if !round.overrode {
            pool.insert(self.me);
        }

        let old = self.schedule(vertex).unwrap_or(MeetingSchedule::new(now, now));

        let (missing, takeovers) =
            self.handle_missing(vertex, now, round.punctual, &present, &pool, telemetry);
        let rebalanced = if missing.is_empty() && self.config.rebalance {
            self.rebalance(vertex, now, &pool, telemetry)
        } else {
            None
        };

        let proposals = round
            .proposals
            .values()
            .copied()
            .chain(round.local_proposal)
            .max();
        let schedule = self.next_schedule(old, now, !missing.is_empty(), proposals);
        self.schedules.put(vertex, schedule, now);

        debug!(
            agent = %self.me, vertex = %vertex, present = present.len(),
            schedule = %schedule, "exchange: resolved",
        );
        telemetry.record(ProtocolEvent::ExchangeCompleted { agent: self.me, at: now, vertex, schedule });

        ExchangeOutcome { vertex, schedule, present, missing, takeovers, rebalanced }
    }

    /// Schedule rule.  `current_next` moves to the old `next_next` (pulled in
    /// to `now + grace` if someone is missing) and never goes backwards;
    /// `next_next` is the latest proposal, strictly after `current_next`.
    pub(crate) fn next_schedule(
        &self,
        old:          MeetingSchedule,
        now:          Tick,
        peer_missing: bool,
        proposals:    Option<Tick>,
    ) -> MeetingSchedule {
        let mut current = old.next_next.max(now + 1);
        if peer_missing {
            current = current.min(now + self.config.takeover_grace_ticks);
        }
        current = current.max(old.current_next);
        let next = proposals.unwrap_or(current).max(current + 1);
        MeetingSchedule::new(current, next)
    }

    // ── Takeover ──────────────────────────────────────────────────────────

    fn handle_missing(
        &mut self,
        vertex:    VertexId,
        now:       Tick,
        punctual:  bool,
        present:   &BTreeSet<AgentId>,
        pool:      &BTreeSet<AgentId>,
        telemetry: &mut dyn Telemetry,
    ) -> (Vec<(PartitionId, AgentId)>, Vec<(PartitionId, AgentId)>) {
        let me = self.me;
        let at_vertex: Vec<PartitionId> = self.topology.partitions_at(vertex).collect();
        let mut missing = Vec::new();

        for &partition in &at_vertex {
            let Some(owner) = self.owner_of(partition) else { continue };
            let key = (vertex, partition);

            let stale = self
                .pending
                .get(&key)
                .is_some_and(|p| p.owner != owner || present.contains(&p.owner));
            if let Some(cancelled) = stale.then(|| self.pending.remove(&key)).flatten() {
                debug!(agent = %me, vertex = %vertex, partition = %partition, "takeover cancelled");
                telemetry.record(ProtocolEvent::TakeoverCancelled {
                    agent: me, at: now, vertex, partition, owner: cancelled.owner,
                });
            }

            if !present.contains(&owner) {
                telemetry.record(ProtocolEvent::PeerMissing { agent: me, at: now, vertex, partition, owner });
                missing.push((partition, owner));
            }
        }

        let mut takeovers = Vec::new();
        if !punctual {
            // Whoever left before we came is not evidence of absence.
            debug!(agent = %me, vertex = %vertex, missing = missing.len(), "late round, no takeover decisions");
            return (missing, takeovers);
        }
        for &(partition, owner) in &missing {
            let key = (vertex, partition);
            match self.pending.get(&key) {
                Some(pending) => {
                    let proposed_at = pending.proposed_at;
                    let nominee = pending
                        .proposers
                        .intersection(pool)
                        .next()
                        .or_else(|| pool.iter().next())
                        .copied();
                    // An empty pool cannot confirm; keep waiting.
                    let Some(nominee) = nominee else { continue };
                    self.pending.remove(&key);
                    takeovers.push((partition, nominee));
                    if nominee == me {
                        self.confirm_takeover(vertex, partition, owner, proposed_at, now, telemetry);
                    }
                }
                None => {
                    info!(
                        agent = %me, vertex = %vertex, partition = %partition, owner = %owner,
                        "owner missing, takeover proposed",
                    );
                    self.pending.insert(key, PendingTakeover {
                        owner,
                        proposers:   pool.clone(),
                        proposed_at: now,
                    });
                    telemetry.record(ProtocolEvent::TakeoverProposed { agent: me, at: now, vertex, partition, owner });
                }
            }
        }
        (missing, takeovers)
    }

    /// Write this agent as owner and push back the partition's other meetings.
    fn confirm_takeover(
        &mut self,
        vertex:      VertexId,
        partition:   PartitionId,
        previous:    AgentId,
        proposed_at: Tick,
        now:         Tick,
        telemetry:   &mut dyn Telemetry,
    ) {
        info!(
            agent = %self.me, vertex = %vertex, partition = %partition, previous = %previous,
            proposed = %proposed_at, "takeover confirmed",
        );
        self.owners.put(partition, self.me, now);
        self.refresh_patrol_set();

        let grace = self.config.takeover_grace_ticks;
        let others: Vec<VertexId> = self
            .topology
            .partition(partition)
            .map(|p| p.meeting_points.iter().copied().filter(|m| *m != vertex).collect())
            .unwrap_or_default();
        for m in others {
            if let Some(s) = self.schedule(m) {
                self.schedules.put(m, s.postponed(grace), now);
            }
        }
        telemetry.record(ProtocolEvent::TakeoverConfirmed {
            agent: self.me, at: now, vertex, partition, previous,
        });
    }

    // ── Rebalancing ───────────────────────────────────────────────────────

    fn rebalance(
        &mut self,
        vertex:    VertexId,
        now:       Tick,
        pool:      &BTreeSet<AgentId>,
        telemetry: &mut dyn Telemetry,
    ) -> Option<(PartitionId, AgentId, AgentId)> {
        let load = |agent: AgentId| self.owners.iter().filter(|(_, a)| **a == agent).count();

        // Ascending iteration + strict comparison gives ties to the lower id.
        let mut giver = None;
        let mut taker = None;
        for &a in pool {
            let n = load(a);
            if giver.is_none_or(|(_, g)| n > g) {
                giver = Some((a, n));
            }
            if taker.is_none_or(|(_, t)| n < t) {
                taker = Some((a, n));
            }
        }
        let ((giver, g), (taker, t)) = (giver?, taker?);
        if giver == taker || g < t + 3 {
            return None;
        }

        let partition = self
            .topology
            .partitions_at(vertex)
            .find(|p| self.owner_of(*p) == Some(giver))?;

        // Only the taker writes; the giver lets go when it merges the write.
        if self.me == taker {
            info!(
                agent = %self.me, vertex = %vertex, partition = %partition,
                from = %giver, "rebalancing partition",
            );
            self.owners.put(partition, taker, now);
            self.refresh_patrol_set();
            telemetry.record(ProtocolEvent::Rebalanced {
                agent: self.me, at: now, vertex, partition, from: giver, to: taker,
            });
        }
        Some((partition, giver, taker))
    }
}
