//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.
//! It provides canonical fixtures so tests don't each invent their own corpus.

#![doc(hidden)]

use crate::build::tables::table_documents;
use crate::build::wiki::WikiArticle;
use crate::embedding::EmbeddingStore;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::strategy::Strategy;
use crate::types::TableRecord;

/// Fluent construction of a [`TableRecord`]; counts are derived from the grid.
#[derive(Debug, Clone)]
pub struct TableRecordBuilder {
    record: TableRecord,
}

impl TableRecordBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            record: TableRecord {
                key: key.to_string(),
                pg_title: String::new(),
                second_title: String::new(),
                caption: String::new(),
                title: Vec::new(),
                data: Vec::new(),
                numeric_columns: Vec::new(),
                num_cols: 0,
                num_header_rows: 0,
                num_data_rows: 0,
            },
        }
    }

    pub fn pg_title(mut self, value: &str) -> Self {
        self.record.pg_title = value.to_string();
        self
    }

    pub fn second_title(mut self, value: &str) -> Self {
        self.record.second_title = value.to_string();
        self
    }

    pub fn caption(mut self, value: &str) -> Self {
        self.record.caption = value.to_string();
        self
    }

    pub fn columns(mut self, titles: &[&str]) -> Self {
        self.record.title = titles.iter().map(|t| t.to_string()).collect();
        self.record.num_header_rows = 1;
        self
    }

    pub fn row(mut self, cells: &[&str]) -> Self {
        self.record
            .data
            .push(cells.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn numeric(mut self, col: usize) -> Self {
        self.record.numeric_columns.push(col);
        self
    }

    pub fn build(mut self) -> TableRecord {
        let widest = self.record.data.iter().map(Vec::len).max().unwrap_or(0);
        self.record.num_cols = widest.max(self.record.title.len());
        self.record.num_data_rows = self.record.data.len();
        self.record
    }
}

/// Index `records` with `strategy`, in memory.
pub fn table_index(strategy: &Strategy, records: Vec<TableRecord>) -> Result<InvertedIndex> {
    Ok(InvertedIndex::from_documents(table_documents(
        &records, strategy,
    )?))
}

/// In-memory article index from `(title, text)` pairs; ids count from 1.
pub fn article_index(articles: &[(&str, &str)]) -> InvertedIndex {
    InvertedIndex::from_documents(articles.iter().zip(1u64..).map(|((title, text), id)| {
        WikiArticle {
            id,
            title: title.to_string(),
            text: text.to_string(),
        }
        .to_document()
    }))
}

/// A tiny 3-d vector space over analyzer tokens.
///
/// Axis 0 is "urban", axis 1 is "water", axis 2 is everything else.
pub fn toy_vectors() -> EmbeddingStore {
    const WORDS: &[(&str, [f32; 3])] = &[
        ("citi", [1.0, 0.0, 0.0]),
        ("street", [1.0, 0.0, 0.1]),
        ("build", [0.9, 0.0, 0.1]),
        ("district", [0.8, 0.0, 0.2]),
        ("zurich", [0.7, 0.1, 0.2]),
        ("lake", [0.0, 1.0, 0.0]),
        ("water", [0.0, 1.0, 0.1]),
        ("boat", [0.0, 0.9, 0.1]),
        ("port", [0.1, 0.8, 0.1]),
        ("geneva", [0.3, 0.6, 0.1]),
        ("footbal", [0.1, 0.0, 1.0]),
        ("football", [0.1, 0.0, 1.0]),
        ("world", [0.3, 0.3, 0.6]),
        ("cup", [0.0, 0.1, 0.9]),
    ];
    let mut store = EmbeddingStore::new(3);
    for (word, vector) in WORDS {
        // Dimensions are fixed above, insert cannot fail.
        let _ = store.insert(*word, vector);
    }
    store
}
