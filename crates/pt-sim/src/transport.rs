//! Broadcast medium between agents.
//!
//! There is no addressing: every envelope goes to every registered agent
//! except its sender.  A broadcast sent at tick `t` becomes visible at
//! `t + 1`, which is the only ordering guarantee the protocol relies on.

use std::collections::BTreeMap;

use tracing::trace;

use pt_core::{AgentId, SimRng, Tick};
use pt_partition::Envelope;

pub trait BroadcastTransport: Send {
    /// Start delivering to `agent`.
    fn register(&mut self, agent: AgentId);

    /// Stop delivering to `agent` and drop anything queued for it.
    fn unregister(&mut self, agent: AgentId);

    fn broadcast(&mut self, envelope: Envelope);

    /// Everything queued for `agent` that was sent before `now`.
    fn receive_all(&mut self, agent: AgentId, now: Tick) -> Vec<Envelope>;
}

// ── LossyBroadcast ────────────────────────────────────────────────────────────

/// Per-receiver queues with independent random loss.
///
/// Each copy of a broadcast is dropped with `drop_probability`, so one
/// broadcast can reach some peers and not others.
pub struct LossyBroadcast {
    drop_probability: f64,
    rng:              SimRng,
    inboxes:          BTreeMap<AgentId, Vec<Envelope>>,
    pub delivered:    u64,
    pub dropped:      u64,
}

impl LossyBroadcast {
    pub fn new(drop_probability: f64, rng: SimRng) -> Self {
        Self {
            drop_probability,
            rng,
            inboxes:   BTreeMap::new(),
            delivered: 0,
            dropped:   0,
        }
    }

    /// A transport that never loses anything.
    pub fn lossless() -> Self {
        Self::new(0.0, SimRng::new(0))
    }

    /// Copies queued and not yet received.
    pub fn in_flight(&self) -> usize {
        self.inboxes.values().map(Vec::len).sum()
    }
}

impl BroadcastTransport for LossyBroadcast {
    fn register(&mut self, agent: AgentId) {
        self.inboxes.entry(agent).or_default();
    }

    fn unregister(&mut self, agent: AgentId) {
        self.inboxes.remove(&agent);
    }

    fn broadcast(&mut self, envelope: Envelope) {
        trace!(from = %envelope.from, kind = envelope.message.kind(), "broadcast");
        for (agent, inbox) in self.inboxes.iter_mut() {
            if *agent == envelope.from {
                continue;
            }
            if self.drop_probability > 0.0 && self.rng.gen_bool(self.drop_probability) {
                self.dropped += 1;
                continue;
            }
            inbox.push(envelope.clone());
        }
    }

    fn receive_all(&mut self, agent: AgentId, now: Tick) -> Vec<Envelope> {
        let Some(inbox) = self.inboxes.get_mut(&agent) else {
            return Vec::new();
        };
        let (ready, later): (Vec<Envelope>, Vec<Envelope>) =
            std::mem::take(inbox).into_iter().partition(|e| e.sent_at < now);
        *inbox = later;
        self.delivered += ready.len() as u64;
        ready
    }
}
