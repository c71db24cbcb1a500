// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Table corpus ingestion.
//!
//! Every `*.json` file in the corpus directory is an object of
//! `table key → record`. Files are independent, so they are parsed in parallel;
//! the result is then put back in a deterministic order (file name, then key)
//! before any document reference is assigned.
//!
//! A file that fails to parse is logged and skipped. One bad file in a corpus
//! of thousands shouldn't cost the whole build.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::index::{IndexWriter, InvertedIndex, LexicalIndex};
use crate::strategy::{Strategy, TableStrategy};
use crate::types::{DocumentBuilder, SearchableDocument, TableRecord, PAGE_TITLE, TABLE_NAME};

/// Parse one corpus file. Records come back in key order.
fn parse_table_file(path: &Path) -> Result<Vec<TableRecord>> {
    let content = fs::read_to_string(path)?;
    let tables: BTreeMap<String, TableRecord> = serde_json::from_str(&content)?;
    Ok(tables
        .into_iter()
        .map(|(key, record)| record.with_key(key))
        .collect())
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "table corpus directory {} does not exist",
            dir.display()
        )));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Skip-and-log policy for a single file.
fn keep_parsed(path: &Path, parsed: Result<Vec<TableRecord>>) -> Vec<TableRecord> {
    match parsed {
        Ok(records) => records,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping malformed table file");
            Vec::new()
        }
    }
}

/// Load every table in `dir`, ordered by file name then key.
pub fn load_tables(dir: &Path) -> Result<Vec<TableRecord>> {
    let files = list_json_files(dir)?;

    #[cfg(feature = "parallel")]
    let per_file: Vec<Vec<TableRecord>> = {
        let progress = super::progress_bar(files.len() as u64, "Loading");
        let counter = AtomicUsize::new(0);
        let total = files.len();
        // par_iter + collect keeps input order, so file order survives.
        let per_file = files
            .par_iter()
            .map(|path| {
                let records = keep_parsed(path, parse_table_file(path));
                let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
                progress.set_position(count as u64);
                if count % 10 == 0 || count == total {
                    progress.set_message(format!("{}/{}", count, total));
                }
                records
            })
            .collect();
        progress.finish_and_clear();
        per_file
    };

    #[cfg(not(feature = "parallel"))]
    let per_file: Vec<Vec<TableRecord>> = files
        .iter()
        .map(|path| keep_parsed(path, parse_table_file(path)))
        .collect();

    let records: Vec<TableRecord> = per_file.into_iter().flatten().collect();
    info!(files = files.len(), tables = records.len(), "loaded table corpus");
    Ok(records)
}

/// Turn records into documents: `tableName`, `pgTitle`, then the strategy's fields.
pub fn table_documents(
    records: &[TableRecord],
    strategy: &Strategy,
) -> Result<Vec<SearchableDocument>> {
    records
        .iter()
        .map(|record| {
            let mut builder = DocumentBuilder::new();
            builder
                .add(TABLE_NAME, record.key.as_str())
                .add(PAGE_TITLE, record.pg_title.as_str());
            strategy.populate(record, &mut builder)?;
            Ok(builder.build())
        })
        .collect()
}

/// Builds (or extends) the table index in one directory.
#[derive(Debug)]
pub struct TableIndexer<'a> {
    strategy: &'a Strategy,
    index_dir: PathBuf,
}

impl<'a> TableIndexer<'a> {
    pub fn new(strategy: &'a Strategy, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            strategy,
            index_dir: index_dir.into(),
        }
    }

    /// Index every table under `corpus_dir` and commit.
    pub fn index(&self, corpus_dir: &Path) -> Result<InvertedIndex> {
        let records = load_tables(corpus_dir)?;
        let documents = table_documents(&records, self.strategy)?;

        let mut writer = IndexWriter::open_or_create(&self.index_dir)?;
        writer.add_documents(documents);
        info!(
            strategy = self.strategy.name(),
            added = writer.pending(),
            "indexing tables"
        );
        let index = writer.commit()?;
        info!(docs = index.doc_count(), "table index ready");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SingleField;

    const FILE_A: &str = r#"{
        "table-0002-1": {"pgTitle": "Geneva", "secondTitle": "", "caption": "Districts",
            "title": ["District"], "data": [["Cité"]], "numericColumns": [],
            "numCols": 1, "numHeaderRows": 1, "numDataRows": 1},
        "table-0001-1": {"pgTitle": "Zurich", "secondTitle": "", "caption": "Quarters",
            "title": ["Quarter"], "data": [["Altstadt"]], "numericColumns": [],
            "numCols": 1, "numHeaderRows": 1, "numDataRows": 1}
    }"#;

    #[test]
    fn test_load_orders_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), FILE_A).unwrap();
        fs::write(dir.path().join("a.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = load_tables(dir.path()).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["table-0001-1", "table-0002-1"]);
    }

    #[test]
    fn test_missing_corpus_dir() {
        let err = load_tables(Path::new("/definitely/not/here")).unwrap_err();
        assert_eq!(err.class(), "configuration");
    }

    #[test]
    fn test_documents_carry_identity_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.json"), FILE_A).unwrap();
        let records = load_tables(dir.path()).unwrap();
        let strategy = Strategy::SingleField(SingleField::new());
        let docs = table_documents(&records, &strategy).unwrap();
        assert_eq!(docs[0].table_name(), Some("table-0001-1"));
        assert_eq!(docs[0].page_title(), Some("Zurich"));
        assert!(!docs[0].values(SingleField::FIELD).is_empty());
    }

    #[test]
    fn test_multi_field_build_fails_fast() {
        let corpus = tempfile::tempdir().unwrap();
        let index = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("t.json"), FILE_A).unwrap();
        let strategy = Strategy::from_name("multiField").unwrap();
        let err = TableIndexer::new(&strategy, index.path())
            .index(corpus.path())
            .unwrap_err();
        assert_eq!(err.class(), "not-implemented");
    }
}
