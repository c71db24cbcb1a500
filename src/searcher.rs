// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Two-stage table search: lexical retrieval, then semantic rerank.
//!
//! ```text
//! query text ─parse─▶ StructuredQuery ─BM25─▶ top N_BEFORE_RERANK
//!            ─rerank─▶ reordered ─truncate─▶ top N_TOP ─▶ SearchResults
//! ```
//!
//! The wide first stage matters: the reranker can only promote tables the
//! lexical stage already found, so it gets ten times more candidates than the
//! caller asked for.
//!
//! A search either returns a complete ranked set or one error naming its class.
//! A rerank failure is not an error; it degrades to lexical order and the
//! results say so. An unusable article index is an error.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use crate::error::{InvariantViolation, RerankError, Result};
use crate::index::LexicalIndex;
use crate::rerank::{RerankOutcome, TableReranker};
use crate::strategy::TableStrategy;
use crate::types::{DocRef, SearchableDocument, TABLE_NAME};

/// Results returned to the caller.
pub const N_TOP_DEFAULT: usize = 20;

/// Candidates handed to the reranker.
pub const N_BEFORE_RERANK_DEFAULT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub n_top: usize,
    pub n_before_rerank: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            n_top: N_TOP_DEFAULT,
            n_before_rerank: N_BEFORE_RERANK_DEFAULT,
        }
    }
}

/// One ranked table.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub doc: DocRef,
    pub score: f64,
    pub document: &'a SearchableDocument,
}

/// Ranked results of one search.
#[derive(Debug)]
pub struct SearchResults<'a> {
    hits: Vec<SearchHit<'a>>,
    fallback: Option<RerankError>,
}

impl<'a> SearchResults<'a> {
    /// Hits, best first.
    pub fn hits(&self) -> &[SearchHit<'a>] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Whether the semantic rerank was applied (false after a fail-open).
    pub fn reranked(&self) -> bool {
        self.fallback.is_none()
    }

    /// Why reranking fell back to lexical order, if it did.
    pub fn fallback_cause(&self) -> Option<&RerankError> {
        self.fallback.as_ref()
    }

    /// Scores keyed by document reference.
    pub fn by_document(&self) -> Result<BTreeMap<DocRef, f64>> {
        let mut view = BTreeMap::new();
        for hit in &self.hits {
            if view.insert(hit.doc, hit.score).is_some() {
                return Err(InvariantViolation::DuplicateKey {
                    view: "document",
                    key: hit.doc.to_string(),
                }
                .into());
            }
        }
        Ok(view)
    }

    /// Scores keyed by table identifier.
    ///
    /// Two hits with the same identifier mean the corpus reused a key; that
    /// is reported, never silently collapsed.
    pub fn by_table_name(&self) -> Result<BTreeMap<String, f64>> {
        let mut view = BTreeMap::new();
        for hit in &self.hits {
            let name = hit
                .document
                .table_name()
                .ok_or(InvariantViolation::MissingField {
                    doc: hit.doc.get(),
                    field: TABLE_NAME,
                })?;
            if view.insert(name.to_string(), hit.score).is_some() {
                return Err(InvariantViolation::DuplicateKey {
                    view: "table",
                    key: name.to_string(),
                }
                .into());
            }
        }
        Ok(view)
    }
}

/// Runs queries against one table index.
pub struct TableSearcher<'a> {
    index: &'a dyn LexicalIndex,
    reranker: TableReranker<'a>,
    strategy: &'a dyn TableStrategy,
    limits: SearchLimits,
}

impl<'a> TableSearcher<'a> {
    pub fn new(
        index: &'a dyn LexicalIndex,
        reranker: TableReranker<'a>,
        strategy: &'a dyn TableStrategy,
    ) -> Self {
        Self {
            index,
            reranker,
            strategy,
            limits: SearchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// Search, returning the top `n_top` hits (fewer when fewer match).
    pub fn search(&self, text: &str) -> Result<SearchResults<'a>> {
        let start = Instant::now();
        let query = self.strategy.parse_query(text)?;

        let candidates = self.index.search(&query, self.limits.n_before_rerank);
        let retrieved = candidates.len();

        let outcome = self.reranker.rerank(candidates, self.index, text)?;
        let (mut ranked, fallback) = match outcome {
            RerankOutcome::Reranked(ranked) => (ranked, None),
            RerankOutcome::Fallback { candidates, cause } => (candidates, Some(cause)),
        };
        ranked.truncate(self.limits.n_top);

        let index = self.index;
        let hits = ranked
            .into_iter()
            .map(|c| {
                index
                    .document(c.doc)
                    .map(|document| SearchHit {
                        doc: c.doc,
                        score: c.score,
                        document,
                    })
                    .ok_or(InvariantViolation::DocumentOutOfBounds {
                        doc: c.doc.get(),
                        len: index.doc_count(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            query = text,
            retrieved,
            returned = hits.len(),
            reranked = fallback.is_none(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );
        Ok(SearchResults { hits, fallback })
    }

    /// Search and key the results by table identifier.
    pub fn search_table_names(&self, text: &str) -> Result<BTreeMap<String, f64>> {
        self.search(text)?.by_table_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::index::InvertedIndex;
    use crate::strategy::Strategy;
    use crate::testing::{article_index, table_index, toy_vectors, TableRecordBuilder};

    fn tables(keys: &[&str]) -> InvertedIndex {
        let records = keys
            .iter()
            .map(|key| {
                TableRecordBuilder::new(key)
                    .pg_title("Zurich")
                    .caption("City districts")
                    .columns(&["District"])
                    .row(&["Altstadt"])
                    .build()
            })
            .collect();
        table_index(&Strategy::default(), records).unwrap()
    }

    #[test]
    fn test_clamps_to_available() {
        let index = tables(&["t1", "t2", "t3"]);
        let articles = article_index(&[("Zurich", "a city with streets")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        let results = searcher.search("city").unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.reranked());
        assert_eq!(results.by_document().unwrap().len(), 3);
    }

    #[test]
    fn test_truncates_to_n_top() {
        let index = tables(&["t1", "t2", "t3"]);
        let articles = article_index(&[("Zurich", "a city with streets")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        )
        .with_limits(SearchLimits {
            n_top: 2,
            n_before_rerank: 200,
        });
        assert_eq!(searcher.search("district").unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_table_name_is_invariant_violation() {
        let index = tables(&["table-1", "table-1"]);
        let articles = article_index(&[("Zurich", "a city with streets")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        let err = searcher.search_table_names("city").unwrap_err();
        assert!(matches!(
            err,
            Error::Invariant(InvariantViolation::DuplicateKey { view: "table", ref key }) if key == "table-1"
        ));
    }

    #[test]
    fn test_invalid_query_is_not_a_search() {
        let index = tables(&["t1"]);
        let articles = article_index(&[("Zurich", "a city")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        assert_eq!(searcher.search("").unwrap_err().class(), "invalid-query");
        assert_eq!(
            searcher.search("\"unterminated").unwrap_err().class(),
            "invalid-query"
        );
    }

    #[test]
    fn test_stopword_query_returns_nothing() {
        let index = tables(&["t1"]);
        let articles = article_index(&[("Zurich", "a city")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        let results = searcher.search("the of").unwrap();
        assert!(results.is_empty());
        assert!(results.by_table_name().unwrap().is_empty());
    }

    #[test]
    fn test_fallback_is_reported_and_keeps_lexical_order() {
        let index = tables(&["t1", "t2"]);
        let articles = article_index(&[("Geneva", "a lake")]);
        let vectors = toy_vectors();
        let strategy = Strategy::default();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        let results = searcher.search("city").unwrap();
        assert!(!results.reranked());
        assert!(matches!(
            results.fallback_cause(),
            Some(RerankError::ArticleNotFound(_))
        ));
        let docs: Vec<u32> = results.hits().iter().map(|h| h.doc.get()).collect();
        assert_eq!(docs, vec![0, 1]);
    }

    #[test]
    fn test_multi_field_search_fails_fast() {
        let index = tables(&["t1"]);
        let articles = article_index(&[("Zurich", "a city")]);
        let vectors = toy_vectors();
        let strategy = Strategy::from_name("multiField").unwrap();
        let searcher = TableSearcher::new(
            &index,
            TableReranker::new(&vectors, &articles, &strategy),
            &strategy,
        );
        assert_eq!(searcher.search("city").unwrap_err().class(), "not-implemented");
    }
}
