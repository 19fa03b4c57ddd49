//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `agent_snapshots.csv`
//! - `protocol_events.csv`
//! - `tick_summaries.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AgentSnapshotRow, OutputResult, ProtocolEventRow, TickSummaryRow};

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes mission output to three CSV files.
pub struct CsvWriter {
    snapshots: Writer<File>,
    events:    Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Open (or create) the CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut snapshots = Writer::from_path(dir.join("agent_snapshots.csv"))?;
        snapshots.write_record([
            "agent_id", "tick", "alive", "vertex", "state", "meeting_vertex", "meeting_tick",
            "owned", "patrol_vertices", "pending_takeovers",
        ])?;

        let mut events = Writer::from_path(dir.join("protocol_events.csv"))?;
        events.write_record(["tick", "agent_id", "kind", "vertex", "partition", "peer", "meeting"])?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(["tick", "active_agents", "events"])?;

        Ok(Self {
            snapshots,
            events,
            summaries,
            finished: false,
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_snapshots(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()> {
        for row in rows {
            self.snapshots.write_record(&[
                row.agent_id.to_string(),
                row.tick.to_string(),
                (row.alive as u8).to_string(),
                row.vertex.to_string(),
                row.state.to_string(),
                opt(row.meeting_vertex),
                opt(row.meeting_tick),
                row.owned.clone(),
                row.patrol_vertices.to_string(),
                row.pending_takeovers.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_event(&mut self, row: &ProtocolEventRow) -> OutputResult<()> {
        self.events.write_record(&[
            row.tick.to_string(),
            row.agent_id.to_string(),
            row.kind.to_string(),
            row.vertex.to_string(),
            opt(row.partition),
            opt(row.peer),
            opt(row.meeting),
        ])?;
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.active_agents.to_string(),
            row.events.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.snapshots.flush()?;
        self.events.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
