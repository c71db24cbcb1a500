// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Semantic reranking of lexical candidates.
//!
//! BM25 finds tables that share words with the query. The reranker asks a
//! different question: is the *page* this table came from about what the
//! query is about? Each candidate gets
//!
//! ```text
//! score = (1 - γ) · cos(query, article) + γ · cos(query, table labels)
//! ```
//!
//! with `γ = 0.2`, where every vector is the mean word vector of analyzer
//! tokens. The article term dominates: a table's own cells are short and
//! noisy, the article behind it is not.
//!
//! # Fail-open
//!
//! If any candidate can't be scored (no article, nothing in vocabulary, a
//! lookup error), the whole pass is abandoned and the lexical order comes back
//! untouched. Mixing reranked and lexical scores in one list would be
//! meaningless, since they live on different scales. [`RerankOutcome`] says
//! which of the two happened and why.
//!
//! An article index that is missing, empty or corrupt is not a scoring
//! failure: it is a configuration error, and `rerank` returns it.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::analysis::EnglishAnalyzer;
use crate::article::ArticleLookup;
use crate::embedding::{cosine_similarity, WordVectors};
use crate::error::{Error, RerankError, Result};
use crate::index::LexicalIndex;
use crate::strategy::TableStrategy;
use crate::types::{Candidate, PAGE_TITLE};

/// Weight of the table's own labels in the blended score.
pub const GAMMA: f64 = 0.2;

/// Blend article and table similarity.
#[inline]
pub fn blend(article_sim: f64, table_sim: f64) -> f64 {
    (1.0 - GAMMA) * article_sim + GAMMA * table_sim
}

/// Why a rescore pass stopped early.
enum Abort {
    Fallback(RerankError),
    Fatal(Error),
}

impl Abort {
    fn from_lookup(err: Error) -> Self {
        match err {
            Error::MissingIndex { .. } | Error::CorruptIndex { .. } => Abort::Fatal(err),
            other => Abort::Fallback(RerankError::Lookup(other.to_string())),
        }
    }
}

impl From<RerankError> for Abort {
    fn from(cause: RerankError) -> Self {
        Abort::Fallback(cause)
    }
}

/// What a rerank pass produced.
#[derive(Debug)]
pub enum RerankOutcome {
    /// Rescored, sorted by descending blended score.
    Reranked(Vec<Candidate>),
    /// Scoring failed; `candidates` is the input, unchanged.
    Fallback {
        candidates: Vec<Candidate>,
        cause: RerankError,
    },
}

impl RerankOutcome {
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            RerankOutcome::Reranked(c) => c,
            RerankOutcome::Fallback { candidates, .. } => candidates,
        }
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            RerankOutcome::Reranked(c) => c,
            RerankOutcome::Fallback { candidates, .. } => candidates,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RerankOutcome::Fallback { .. })
    }

    pub fn cause(&self) -> Option<&RerankError> {
        match self {
            RerankOutcome::Reranked(_) => None,
            RerankOutcome::Fallback { cause, .. } => Some(cause),
        }
    }
}

/// Reranks candidates by embedding similarity.
pub struct TableReranker<'a> {
    vectors: &'a dyn WordVectors,
    articles: &'a dyn ArticleLookup,
    strategy: &'a dyn TableStrategy,
    analyzer: EnglishAnalyzer,
}

impl<'a> TableReranker<'a> {
    pub fn new(
        vectors: &'a dyn WordVectors,
        articles: &'a dyn ArticleLookup,
        strategy: &'a dyn TableStrategy,
    ) -> Self {
        Self {
            vectors,
            articles,
            strategy,
            analyzer: EnglishAnalyzer,
        }
    }

    fn mean_of(
        &self,
        text: &str,
        what: &'static str,
    ) -> std::result::Result<Vec<f32>, RerankError> {
        self.vectors
            .mean(&self.analyzer.tokenize(text))
            .ok_or(RerankError::NoKnownTokens { what })
    }

    /// Rescore `candidates` against `query_text`, or hand them back unchanged.
    ///
    /// Only an unusable article index is an `Err`.
    pub fn rerank(
        &self,
        candidates: Vec<Candidate>,
        index: &dyn LexicalIndex,
        query_text: &str,
    ) -> Result<RerankOutcome> {
        if candidates.is_empty() {
            return Ok(RerankOutcome::Reranked(candidates));
        }
        let start = Instant::now();

        match self.rescore(&candidates, index, query_text) {
            Ok(mut rescored) => {
                // Stable: equal scores keep their lexical order.
                rescored.sort_by(|a, b| b.score.total_cmp(&a.score));
                debug!(
                    candidates = rescored.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "reranked"
                );
                Ok(RerankOutcome::Reranked(rescored))
            }
            Err(Abort::Fatal(e)) => Err(e),
            Err(Abort::Fallback(cause)) => {
                warn!(
                    query = query_text,
                    error = %cause,
                    "rerank failed, keeping lexical order"
                );
                Ok(RerankOutcome::Fallback { candidates, cause })
            }
        }
    }

    fn rescore(
        &self,
        candidates: &[Candidate],
        index: &dyn LexicalIndex,
        query_text: &str,
    ) -> std::result::Result<Vec<Candidate>, Abort> {
        let query = self.mean_of(query_text, "query")?;
        // Many tables share a page; look each article up once per pass.
        let mut articles: HashMap<String, Vec<f32>> = HashMap::new();

        candidates
            .iter()
            .map(|candidate| {
                let doc_id = candidate.doc.get();
                let document = index
                    .document(candidate.doc)
                    .ok_or(RerankError::MissingDocument(doc_id))?;
                let page_title = document.page_title().ok_or(RerankError::MissingField {
                    doc: doc_id,
                    field: PAGE_TITLE,
                })?;

                let labels = self
                    .strategy
                    .extract_labels(document)
                    .map_err(|e| RerankError::Labels(e.to_string()))?;
                let table = self
                    .vectors
                    .mean(&labels)
                    .ok_or(RerankError::NoKnownTokens { what: "table label" })?;

                if !articles.contains_key(page_title) {
                    let article = self
                        .articles
                        .find_article(page_title)
                        .map_err(Abort::from_lookup)?
                        .ok_or_else(|| RerankError::ArticleNotFound(page_title.to_string()))?;
                    let mean = self.mean_of(&article.text, "article")?;
                    articles.insert(page_title.to_string(), mean);
                }
                let article = &articles[page_title];

                let score = blend(
                    f64::from(cosine_similarity(&query, article)),
                    f64::from(cosine_similarity(&query, &table)),
                );
                Ok(Candidate::new(candidate.doc, score))
            })
            .collect()
    }
}
