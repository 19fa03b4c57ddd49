//! Mission observer trait for progress reporting and data collection.

use pt_core::{AgentId, Tick};
use pt_partition::{FaultTracker, ProtocolEvent};

use crate::AgentSnapshot;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points in the
/// tick loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: takeover printer
///
/// ```rust,ignore
/// struct TakeoverPrinter;
///
/// impl SimObserver for TakeoverPrinter {
///     fn on_protocol_event(&mut self, event: &ProtocolEvent) {
///         if let ProtocolEvent::TakeoverConfirmed { agent, partition, .. } = event {
///             println!("{agent} took over {partition}");
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called at the end of each tick.  `active` is the number of live
    /// agents that stood on a vertex and made a decision this tick.
    fn on_tick_end(&mut self, _tick: Tick, _active: usize) {}

    /// Called every `config.snapshot_interval_ticks` ticks with one entry per
    /// agent (lost agents included), in `AgentId` order.
    fn on_snapshot(&mut self, _tick: Tick, _agents: &[AgentSnapshot]) {}

    /// Called for every protocol event, in the order the apply phase saw them.
    fn on_protocol_event(&mut self, _event: &ProtocolEvent) {}

    /// Called when failure injection removes an agent.
    fn on_agent_lost(&mut self, _agent: AgentId, _tick: Tick) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick, _faults: &FaultTracker) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
