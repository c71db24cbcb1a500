// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! How a table becomes a document, and how a query finds it.
//!
//! A strategy owns three decisions that have to agree with each other:
//!
//! 1. **populate**: which fields a [`TableRecord`] is flattened into
//! 2. **parse_query**: which of those fields a free-text query targets
//! 3. **extract_labels**: which stored values describe the table for the
//!    embedding reranker
//!
//! The set of strategies is closed. [`Strategy`] is the tagged union the rest
//! of the crate holds; it is picked once, by name, at startup.

mod multi_field;
mod single_field;

pub use multi_field::MultiField;
pub use single_field::SingleField;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::query::StructuredQuery;
use crate::types::{DocumentBuilder, SearchableDocument, TableRecord};

/// The interface every table strategy implements.
pub trait TableStrategy: Send + Sync {
    /// Configuration name, e.g. `"singleField"`.
    fn name(&self) -> &'static str;

    /// Add this strategy's fields for `record` to `builder`.
    fn populate(&self, record: &TableRecord, builder: &mut DocumentBuilder) -> Result<()>;

    /// Parse free text into a query over this strategy's fields.
    fn parse_query(&self, text: &str) -> Result<StructuredQuery>;

    /// Analyzer tokens describing a stored document.
    fn extract_labels(&self, document: &SearchableDocument) -> Result<Vec<String>>;
}

/// The strategy selected for a run.
#[derive(Debug, Clone)]
pub enum Strategy {
    SingleField(SingleField),
    MultiField(MultiField),
}

impl Strategy {
    /// Every configurable name, for error messages and `--help`.
    pub const NAMES: [&'static str; 2] = [SingleField::NAME, MultiField::NAME];

    /// Pick a strategy by configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            SingleField::NAME => Ok(Strategy::SingleField(SingleField::new())),
            MultiField::NAME => Ok(Strategy::MultiField(MultiField)),
            other => Err(Error::Config(format!(
                "no table strategy named '{}' (expected one of: {})",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }

    fn inner(&self) -> &dyn TableStrategy {
        match self {
            Strategy::SingleField(s) => s,
            Strategy::MultiField(s) => s,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::SingleField(SingleField::new())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TableStrategy for Strategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn populate(&self, record: &TableRecord, builder: &mut DocumentBuilder) -> Result<()> {
        self.inner().populate(record, builder)
    }

    fn parse_query(&self, text: &str) -> Result<StructuredQuery> {
        self.inner().parse_query(text)
    }

    fn extract_labels(&self, document: &SearchableDocument) -> Result<Vec<String>> {
        self.inner().extract_labels(document)
    }
}
