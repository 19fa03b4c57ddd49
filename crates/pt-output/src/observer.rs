//! `SimOutputObserver<W>`: bridges `SimObserver` to an `OutputWriter`.

use pt_core::Tick;
use pt_partition::{FaultTracker, ProtocolEvent};
use pt_sim::{AgentSnapshot, SimObserver};

use crate::row::{AgentSnapshotRow, ProtocolEventRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes snapshots, protocol events and tick
/// summaries to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:       W,
    tick_events:  u64,
    last_error:   Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, tick_events: 0, last_error: None }
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the mission).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_tick_start(&mut self, _tick: Tick) {
        self.tick_events = 0;
    }

    fn on_protocol_event(&mut self, event: &ProtocolEvent) {
        self.tick_events += 1;
        let result = self.writer.write_event(&ProtocolEventRow::from(event));
        self.store_err(result);
    }

    fn on_tick_end(&mut self, tick: Tick, active: usize) {
        let row = TickSummaryRow {
            tick:          tick.0,
            active_agents: active as u64,
            events:        self.tick_events,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_snapshot(&mut self, _tick: Tick, agents: &[AgentSnapshot]) {
        let rows: Vec<AgentSnapshotRow> = agents.iter().map(AgentSnapshotRow::from).collect();
        if !rows.is_empty() {
            let result = self.writer.write_snapshots(&rows);
            self.store_err(result);
        }
    }

    fn on_sim_end(&mut self, _final_tick: Tick, _faults: &FaultTracker) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
