//! Listener implementations.
//!
//! - [`CsvSink`] parses each event as an edit and writes one CSV row per edit.
//! - [`JsonLinesSink`] archives every event as one JSON object per line;
//!   [`read_archive`] reads such an archive back.
//! - [`InMemorySink`] keeps delivered events in memory.
//!
//! File-backed sinks write through [`DurableFile`], which syncs to disk on
//! every flush.

pub mod csv_sink;
pub mod durable;
pub mod jsonl;
pub mod memory;

pub use {
    csv_sink::{CSV_COLUMNS, CsvSink, edit_row},
    durable::DurableFile,
    jsonl::{ArchivedLine, JsonLinesSink, read_archive},
    memory::InMemorySink,
};
