// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! TREC run files for evaluation.
//!
//! One line per (query, table):
//!
//! ```text
//! <query id>\tQ0\t<table id>\t<rank>\t<score>\t<team>
//! ```
//!
//! Within a query, rows are ranked 1..k by descending score (stable, so equal
//! scores keep their input order). Across queries, rows are ordered by query
//! id then rank, which makes the file independent of the order queries ran in.
//!
//! Each run is written to a fresh `<yyyy-MM-dd-HH-mm-ss>.txt` and mirrored to
//! `top.txt`, which always holds the latest run.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::Result;
use crate::types::Query;

/// Team name written in the last column unless configured otherwise.
pub const DEFAULT_TEAM_NAME: &str = "vvolo01";

/// Name of the always-latest copy of the report.
pub const LATEST_REPORT: &str = "top.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// One line of a run file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrecRow {
    pub query_id: u64,
    pub table_id: String,
    pub rank: usize,
    pub score: f64,
    pub team: String,
}

impl fmt::Display for TrecRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\tQ0\t{}\t{}\t{:?}\t{}",
            self.query_id, self.table_id, self.rank, self.score, self.team
        )
    }
}

/// Rank one query's scores: descending score, dense ranks from 1.
pub fn rank_query<'a>(
    query_id: u64,
    scores: impl IntoIterator<Item = (&'a String, &'a f64)>,
    team: &str,
) -> Vec<TrecRow> {
    let mut rows: Vec<TrecRow> = scores
        .into_iter()
        .map(|(table_id, &score)| TrecRow {
            query_id,
            table_id: table_id.clone(),
            rank: 0,
            score,
            team: team.to_string(),
        })
        .collect();
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

/// Flatten every query's results into report order.
pub fn report_rows(results: &BTreeMap<Query, BTreeMap<String, f64>>, team: &str) -> Vec<TrecRow> {
    let mut rows: Vec<TrecRow> = results
        .iter()
        .flat_map(|(query, scores)| rank_query(query.id(), scores, team))
        .collect();
    rows.sort_by(|a, b| a.query_id.cmp(&b.query_id).then(a.rank.cmp(&b.rank)));
    rows
}

/// Writes run files into one directory.
#[derive(Debug, Clone)]
pub struct TrecReport {
    dir: PathBuf,
    team: String,
}

impl TrecReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            team: DEFAULT_TEAM_NAME.to_string(),
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a timestamped run file plus `top.txt`; returns the run file path.
    ///
    /// The timestamped file is created exclusively, so two runs in the same
    /// second fail instead of clobbering each other.
    pub fn create_report(&self, results: &BTreeMap<Query, BTreeMap<String, f64>>) -> Result<PathBuf> {
        let rows = report_rows(results, &self.team);
        let name = format!("{}.txt", Local::now().format(TIMESTAMP_FORMAT));
        self.write_rows(&name, &rows)
    }

    /// Write `rows` to `name` and mirror it to `top.txt`.
    pub fn write_rows(&self, name: &str, rows: &[TrecRow]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);

        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut out = BufWriter::new(file);
        for row in rows {
            writeln!(out, "{}", row)?;
        }
        out.flush()?;

        fs::copy(&path, self.dir.join(LATEST_REPORT))?;
        info!(path = %path.display(), rows = rows.len(), "wrote TREC report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_row_format() {
        let row = TrecRow {
            query_id: 7,
            table_id: "table-0001-590".into(),
            rank: 1,
            score: 0.7,
            team: "vvolo01".into(),
        };
        assert_eq!(row.to_string(), "7\tQ0\ttable-0001-590\t1\t0.7\tvvolo01");
    }

    #[test]
    fn test_ranks_dense_and_descending() {
        let rows = rank_query(1, &scores(&[("a", 0.1), ("b", 0.9), ("c", 0.5)]), "t");
        let order: Vec<(&str, usize)> = rows.iter().map(|r| (r.table_id.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("b", 1), ("c", 2), ("a", 3)]);
    }

    #[test]
    fn test_report_ordered_by_query_then_rank() {
        let mut results = BTreeMap::new();
        results.insert(Query::new(10, "later"), scores(&[("x", 0.2), ("y", 0.4)]));
        results.insert(Query::new(2, "earlier"), scores(&[("z", 1.0)]));
        let rows = report_rows(&results, "t");
        let keys: Vec<(u64, usize)> = rows.iter().map(|r| (r.query_id, r.rank)).collect();
        assert_eq!(keys, vec![(2, 1), (10, 1), (10, 2)]);
        assert_eq!(rows[1].table_id, "y");
    }

    #[test]
    fn test_write_and_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let report = TrecReport::new(dir.path().join("trec")).with_team("team");
        let rows = rank_query(3, &scores(&[("a", 0.5)]), "team");

        let path = report.write_rows("run.txt", &rows).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "3\tQ0\ta\t1\t0.5\tteam\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("trec").join(LATEST_REPORT)).unwrap(),
            written
        );

        // The run file is never overwritten.
        assert!(report.write_rows("run.txt", &rows).is_err());
    }
}
