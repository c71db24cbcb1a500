//! End-to-end pipeline tests.
//!
//! Corpus in, ranked tables and run files out: in memory, then through the
//! on-disk indexes and the settings file the binary uses.

mod common;

#[path = "pipeline/search.rs"]
mod search;

#[path = "pipeline/on_disk.rs"]
mod on_disk;

#[path = "pipeline/report.rs"]
mod report;
