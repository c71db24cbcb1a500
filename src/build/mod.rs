// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Index construction from raw corpora.
//!
//! Two corpora, two indexers:
//!
//! - [`tables`]: a directory of JSON files, each mapping table keys to records.
//!   Flattened into documents by the active [`Strategy`](crate::strategy::Strategy).
//! - [`wiki`]: a JSON-lines encyclopedia dump. Filtered, then indexed as
//!   `title` / `text` / `id` documents for article lookup.
//!
//! Both append to whatever index already lives in the target directory.

pub mod tables;
pub mod wiki;

pub use tables::{load_tables, table_documents, TableIndexer};
pub use wiki::{parse_article, WikiIndexer, WikiStats};

#[cfg(feature = "parallel")]
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a known number of steps.
#[cfg(feature = "parallel")]
pub(crate) fn progress_bar(len: u64, prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:<12} [{bar:40.cyan/dim}] {pos}/{len} {msg}",
    ) {
        bar.set_style(style.progress_chars("━━╸"));
    }
    bar.set_prefix(prefix);
    bar
}

/// Spinner for a stream of unknown length.
#[cfg(feature = "parallel")]
pub(crate) fn progress_spinner(prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {prefix:<12} {pos} {msg}") {
        bar.set_style(style);
    }
    bar.set_prefix(prefix);
    bar
}
