// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of the pipeline.
//!
//! A table comes in as a [`TableRecord`], gets flattened by a strategy into a
//! [`SearchableDocument`], comes back out of the lexical index as a
//! [`Candidate`], and finally lands in a report as a ranked row.
//!
//! # Invariants
//!
//! - **SearchableDocument**: the field bag is frozen once built. There is no
//!   `&mut` API on it; construction goes through [`DocumentBuilder`].
//! - **DocRef**: `doc < index.doc_count()` for every reference the index hands
//!   out. References are dense and assigned in insertion order.
//! - **Candidate sets**: reranking permutes them. Same length, same `DocRef`s.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Field holding the table identifier, added by the indexer to every document.
pub const TABLE_NAME: &str = "tableName";

/// Field holding the page title, added by the indexer to every document.
pub const PAGE_TITLE: &str = "pgTitle";

// =============================================================================
// DOCUMENT REFERENCES
// =============================================================================

/// Position of a document inside an index.
///
/// Prevents accidentally passing a rank or a count where a document is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DocRef(pub u32);

impl DocRef {
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// TABLE RECORDS
// =============================================================================

/// One table from the JSON corpus.
///
/// The corpus is a map from table key (`"table-0001-590"`) to the record body,
/// so the key lives outside the JSON object and is attached after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    #[serde(skip)]
    pub key: String,
    /// Title of the page the table was scraped from.
    pub pg_title: String,
    /// Section title above the table.
    pub second_title: String,
    pub caption: String,
    /// Column titles, in column order.
    pub title: Vec<String>,
    /// Row-major cell grid.
    pub data: Vec<Vec<String>>,
    /// Indices of the columns whose cells are numeric.
    pub numeric_columns: Vec<usize>,
    pub num_cols: usize,
    pub num_header_rows: usize,
    pub num_data_rows: usize,
}

impl TableRecord {
    /// Attach the corpus key to a parsed record.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Is column `col` flagged numeric?
    pub fn is_numeric_column(&self, col: usize) -> bool {
        self.numeric_columns.contains(&col)
    }

    /// Every cell value, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.data.iter().flatten().map(String::as_str)
    }
}

// =============================================================================
// SEARCHABLE DOCUMENTS
// =============================================================================

/// A multi-valued field bag: field name → values in insertion order.
///
/// Values may repeat (a table with two identical cells stores both). Built
/// once by [`DocumentBuilder`], never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchableDocument {
    fields: BTreeMap<String, Vec<String>>,
}

impl SearchableDocument {
    /// First value stored under `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values stored under `field`, in insertion order.
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate `(field, values)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// The table identifier, when the document came from the table indexer.
    pub fn table_name(&self) -> Option<&str> {
        self.get(TABLE_NAME)
    }

    pub fn page_title(&self) -> Option<&str> {
        self.get(PAGE_TITLE)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Accumulates field values for one document, then freezes them.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    fields: BTreeMap<String, Vec<String>>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `field`. Earlier values under the same name are kept.
    pub fn add(&mut self, field: &str, value: impl Into<String>) -> &mut Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn build(self) -> SearchableDocument {
        SearchableDocument {
            fields: self.fields,
        }
    }
}

// =============================================================================
// QUERIES AND CANDIDATES
// =============================================================================

/// A free-text query and the identifier it is reported under.
///
/// Ordering is by id first, so a `BTreeMap<Query, _>` iterates in report order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Query {
    id: u64,
    text: String,
}

impl Query {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Ad-hoc query with a random surrogate id.
    pub fn with_random_id(text: impl Into<String>) -> Self {
        Self::new(rand::thread_rng().gen(), text)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query{{id={}, text='{}'}}", self.id, self.text)
    }
}

/// A retrieved document and its current score.
///
/// Out of the lexical stage the score is BM25; out of the reranker it is the
/// blended cosine score. Same type either way, since reranking only rewrites
/// scores and order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub doc: DocRef,
    pub score: f64,
}

impl Candidate {
    pub fn new(doc: DocRef, score: f64) -> Self {
        Self { doc, score }
    }
}
