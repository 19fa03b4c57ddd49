//! The `OutputWriter` trait implemented by backend writers.

use crate::{AgentSnapshotRow, OutputResult, ProtocolEventRow, TickSummaryRow};

/// Errors are returned to the observer, which stores the first one for
/// [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()>;

    fn write_event(&mut self, row: &ProtocolEventRow) -> OutputResult<()>;

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
