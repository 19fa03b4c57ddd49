//! `pt-output`: mission output writers for the rust_patrol framework.
//!
//! | Backend | Files created                                                    |
//! |---------|------------------------------------------------------------------|
//! | CSV     | `agent_snapshots.csv`, `protocol_events.csv`, `tick_summaries.csv` |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`SimOutputObserver`], which implements `pt_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pt_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output")).unwrap();
//! let mut obs = SimOutputObserver::new(writer);
//! sim.run(&mut obs).unwrap();
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{AgentSnapshotRow, ProtocolEventRow, TickSummaryRow};
pub use writer::OutputWriter;
