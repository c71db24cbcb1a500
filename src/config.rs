// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Run configuration.
//!
//! Settings live in a TOML file (`tabula.toml` by default). Every data path is
//! relative to `mount/work_directory`, so one dataset can move between machines
//! by changing a single key:
//!
//! ```toml
//! mount = "/mnt/data"
//! work_directory = "tabula"
//! table_strategy = "singleField"
//!
//! [search]
//! n_top = 20
//! n_before_rerank = 200
//!
//! [report]
//! team_name = "vvolo01"
//! ```
//!
//! Missing keys fall back to defaults; unknown keys are an error, since a
//! misspelled path key would otherwise silently point at the default.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::searcher::{SearchLimits, N_BEFORE_RERANK_DEFAULT, N_TOP_DEFAULT};
use crate::strategy::Strategy;
use crate::trec::DEFAULT_TEAM_NAME;
use crate::types::Query;

/// Settings file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tabula.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_mount")]
    pub mount: PathBuf,
    #[serde(default = "default_work_directory")]
    pub work_directory: PathBuf,
    #[serde(default = "default_tables_index_directory")]
    pub tables_index_directory: PathBuf,
    #[serde(default = "default_json_table_directory")]
    pub json_table_directory: PathBuf,
    #[serde(default = "default_queries")]
    pub queries: PathBuf,
    #[serde(default = "default_enwiki_index_directory")]
    pub enwiki_index_directory: PathBuf,
    #[serde(default = "default_enwiki")]
    pub enwiki: PathBuf,
    #[serde(default = "default_word_vectors_model_file")]
    pub word_vectors_model_file: PathBuf,
    #[serde(default = "default_trec_output_directory")]
    pub trec_output_directory: PathBuf,
    #[serde(default = "default_table_strategy")]
    pub table_strategy: String,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    #[serde(default = "default_n_top")]
    pub n_top: usize,
    #[serde(default = "default_n_before_rerank")]
    pub n_before_rerank: usize,
    /// Re-check the article index on disk before every lookup, reloading it
    /// after a new commit. Off: load it once and hold it for the run.
    #[serde(default)]
    pub reopen_article_index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    #[serde(default = "default_team_name")]
    pub team_name: String,
}

fn default_mount() -> PathBuf {
    PathBuf::from(".")
}
fn default_work_directory() -> PathBuf {
    PathBuf::from("data")
}
fn default_tables_index_directory() -> PathBuf {
    PathBuf::from("tables_index")
}
fn default_json_table_directory() -> PathBuf {
    PathBuf::from("tables")
}
fn default_queries() -> PathBuf {
    PathBuf::from("queries.txt")
}
fn default_enwiki_index_directory() -> PathBuf {
    PathBuf::from("enwiki_index")
}
fn default_enwiki() -> PathBuf {
    PathBuf::from("enwiki.jsonl")
}
fn default_word_vectors_model_file() -> PathBuf {
    PathBuf::from("word_vectors.txt")
}
fn default_trec_output_directory() -> PathBuf {
    PathBuf::from("trec")
}
fn default_table_strategy() -> String {
    "singleField".to_string()
}
fn default_n_top() -> usize {
    N_TOP_DEFAULT
}
fn default_n_before_rerank() -> usize {
    N_BEFORE_RERANK_DEFAULT
}
fn default_team_name() -> String {
    DEFAULT_TEAM_NAME.to_string()
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            n_top: default_n_top(),
            n_before_rerank: default_n_before_rerank(),
            reopen_article_index: false,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            team_name: default_team_name(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mount: default_mount(),
            work_directory: default_work_directory(),
            tables_index_directory: default_tables_index_directory(),
            json_table_directory: default_json_table_directory(),
            queries: default_queries(),
            enwiki_index_directory: default_enwiki_index_directory(),
            enwiki: default_enwiki(),
            word_vectors_model_file: default_word_vectors_model_file(),
            trec_output_directory: default_trec_output_directory(),
            table_strategy: default_table_strategy(),
            search: SearchSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| Error::Config(format!("settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// `explicit` if given, else `./tabula.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }
        info!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
        let settings = Self::default();
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no run could work with.
    pub fn validate(&self) -> Result<()> {
        Strategy::from_name(&self.table_strategy)?;
        if self.search.n_top == 0 {
            return Err(Error::Config("search.n_top must be at least 1".to_string()));
        }
        if self.search.n_before_rerank < self.search.n_top {
            return Err(Error::Config(format!(
                "search.n_before_rerank ({}) must be at least search.n_top ({})",
                self.search.n_before_rerank, self.search.n_top
            )));
        }
        if self.report.team_name.trim().is_empty() || self.report.team_name.contains('\t') {
            return Err(Error::Config(
                "report.team_name must be non-empty and tab-free".to_string(),
            ));
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        self.mount.join(&self.work_directory)
    }

    pub fn tables_index_dir(&self) -> PathBuf {
        self.work_dir().join(&self.tables_index_directory)
    }

    pub fn json_table_dir(&self) -> PathBuf {
        self.work_dir().join(&self.json_table_directory)
    }

    pub fn queries_file(&self) -> PathBuf {
        self.work_dir().join(&self.queries)
    }

    pub fn enwiki_index_dir(&self) -> PathBuf {
        self.work_dir().join(&self.enwiki_index_directory)
    }

    pub fn enwiki_file(&self) -> PathBuf {
        self.work_dir().join(&self.enwiki)
    }

    pub fn word_vectors_file(&self) -> PathBuf {
        self.work_dir().join(&self.word_vectors_model_file)
    }

    pub fn trec_output_dir(&self) -> PathBuf {
        self.work_dir().join(&self.trec_output_directory)
    }

    pub fn strategy(&self) -> Result<Strategy> {
        Strategy::from_name(&self.table_strategy)
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            n_top: self.search.n_top,
            n_before_rerank: self.search.n_before_rerank,
        }
    }
}

// =============================================================================
// QUERIES FILE
// =============================================================================

static QUERY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(\s+)(.*)$").expect("query line regex must compile"));

/// Parse `<id><whitespace><text>`. `line_no` is 1-based, for the error.
pub fn parse_query_line(line: &str, line_no: usize) -> Result<Query> {
    let malformed = || {
        Error::Config(format!(
            "queries file line {}: expected '<id> <text>', got '{}'",
            line_no, line
        ))
    };
    let captures = QUERY_LINE.captures(line).ok_or_else(malformed)?;
    let id: u64 = captures[1].parse().map_err(|_| malformed())?;
    Ok(Query::new(id, &captures[3]))
}

/// Every query in the file, in file order. Blank lines are ignored.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let file = File::open(path).map_err(|e| {
        Error::Config(format!("cannot open queries {}: {}", path.display(), e))
    })?;
    let mut queries = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        queries.push(parse_query_line(line.trim_end(), i + 1)?);
    }
    Ok(queries)
}

/// The `n`-th query (0-based) of the file.
pub fn get_query(path: &Path, n: usize) -> Result<Query> {
    let queries = load_queries(path)?;
    let available = queries.len();
    queries.into_iter().nth(n).ok_or_else(|| {
        Error::Config(format!(
            "query number {} out of range ({} queries in {})",
            n,
            available,
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.search.n_top, 20);
        assert_eq!(s.search.n_before_rerank, 200);
        assert_eq!(s.report.team_name, "vvolo01");
        assert!(!s.search.reopen_article_index);
    }

    #[test]
    fn test_paths_resolve_under_work_dir() {
        let s = Settings::from_toml(
            r#"
            mount = "/mnt"
            work_directory = "tabula"
            tables_index_directory = "idx"
            "#,
        )
        .unwrap();
        assert_eq!(s.tables_index_dir(), PathBuf::from("/mnt/tabula/idx"));
        assert_eq!(s.queries_file(), PathBuf::from("/mnt/tabula/queries.txt"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = Settings::from_toml(r#"table_strategy = "tripleField""#).unwrap_err();
        assert_eq!(err.class(), "configuration");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::from_toml(r#"tables_idx = "x""#).is_err());
    }

    #[test]
    fn test_limits_validated() {
        assert!(Settings::from_toml("[search]\nn_top = 0").is_err());
        assert!(Settings::from_toml("[search]\nn_top = 50\nn_before_rerank = 10").is_err());
        let s = Settings::from_toml("[search]\nn_top = 5\nn_before_rerank = 50").unwrap();
        assert_eq!(
            s.limits(),
            SearchLimits {
                n_top: 5,
                n_before_rerank: 50
            }
        );
    }

    #[test]
    fn test_parse_query_line() {
        let q = parse_query_line("12   world interest rates table", 1).unwrap();
        assert_eq!(q.id(), 12);
        assert_eq!(q.text(), "world interest rates table");

        assert!(parse_query_line("no-id-here", 3).is_err());
        let err = parse_query_line("abc text", 4).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_load_and_get_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.txt");
        fs::write(&path, "1 world cup\n2 swiss cities\n\n").unwrap();
        assert_eq!(load_queries(&path).unwrap().len(), 2);
        assert_eq!(get_query(&path, 1).unwrap().text(), "swiss cities");
        assert!(get_query(&path, 2).is_err());
    }
}
