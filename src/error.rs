// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy.
//!
//! Four classes matter to callers, and each has its own variant so a failed
//! search says exactly which one it hit:
//!
//! | Class              | Variant                              | Retry? |
//! |--------------------|--------------------------------------|--------|
//! | configuration      | `Config`, `MissingIndex`             | no     |
//! | malformed query    | `InvalidQuery`                       | no     |
//! | invariant violated | `Invariant`                          | no     |
//! | not implemented    | `NotImplemented`                     | no     |
//!
//! Transient scoring failures inside the reranker are a fifth class, but they
//! never escape it: see [`RerankError`], which only ever shows up inside a
//! `RerankOutcome::Fallback`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::query::QueryParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration error: index at {} does not exist or is empty", path.display())]
    MissingIndex { path: PathBuf },

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryParseError),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("corrupt index file {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("malformed table record '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("word vectors: {0}")]
    WordVectors(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short class name, used by the CLI when reporting a failed command.
    pub fn class(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::MissingIndex { .. } => "configuration",
            Error::InvalidQuery(_) => "invalid-query",
            Error::NotImplemented(_) => "not-implemented",
            Error::Invariant(_) => "invariant-violation",
            Error::CorruptIndex { .. } | Error::MalformedRecord { .. } => "data",
            Error::WordVectors(_) => "word-vectors",
            Error::Io(_) | Error::Json(_) => "io",
        }
    }
}

/// A uniqueness or bounds guarantee of the data model did not hold.
///
/// These are defects upstream (usually non-unique table identifiers in the
/// corpus), not conditions a caller should try to recover from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two results in one view mapped to the same key.
    #[error("duplicate key '{key}' in {view} view")]
    DuplicateKey { view: &'static str, key: String },

    /// A candidate referenced a document the index does not hold.
    #[error("document {doc} out of bounds (index holds {len} documents)")]
    DocumentOutOfBounds { doc: u32, len: usize },

    /// A stored document is missing a field every document must carry.
    #[error("document {doc} has no '{field}' field")]
    MissingField { doc: u32, field: &'static str },
}

/// Why a rerank pass fell back to the lexical order.
#[derive(Error, Debug)]
pub enum RerankError {
    #[error("no article found for page title '{0}'")]
    ArticleNotFound(String),

    #[error("none of the {what} tokens are in the embedding vocabulary")]
    NoKnownTokens { what: &'static str },

    #[error("candidate document {0} not found in index")]
    MissingDocument(u32),

    #[error("candidate document {doc} has no '{field}' field")]
    MissingField { doc: u32, field: &'static str },

    #[error("label extraction failed: {0}")]
    Labels(String),

    #[error("article lookup failed: {0}")]
    Lookup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::Config("x".into()).class(), "configuration");
        assert_eq!(
            Error::MissingIndex {
                path: PathBuf::from("/nope")
            }
            .class(),
            "configuration"
        );
        assert_eq!(Error::NotImplemented("x").class(), "not-implemented");
        let dup = InvariantViolation::DuplicateKey {
            view: "table",
            key: "table-1".into(),
        };
        assert_eq!(Error::from(dup).class(), "invariant-violation");
    }

    #[test]
    fn test_duplicate_key_message_names_key() {
        let dup = InvariantViolation::DuplicateKey {
            view: "table",
            key: "table-0001-590".into(),
        };
        let msg = Error::from(dup).to_string();
        assert!(msg.contains("table-0001-590"));
        assert!(msg.starts_with("invariant violation"));
    }
}
