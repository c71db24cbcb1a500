// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Lexical retrieval: a per-field positional inverted index with BM25.
//!
//! # Scoring
//!
//! Okapi BM25 the way Lucene computes it:
//!
//! ```text
//! idf(t)    = ln(1 + (N - df + 0.5) / (df + 0.5))
//! score(t)  = idf(t) · tf / (tf + k1 · (1 - b + b · dl / avgdl))
//! ```
//!
//! with `k1 = 1.2`, `b = 0.75`. `N`, `df`, `dl` and `avgdl` are all per field.
//! A phrase scores like a single term whose idf is the sum of its terms' idfs
//! and whose tf is the number of phrase occurrences.
//!
//! # Boolean semantics
//!
//! - MUST_NOT excludes.
//! - If any MUST clause exists, every MUST clause has to match.
//! - Otherwise at least one SHOULD clause has to match.
//! - The score is the sum of every matching clause's score.
//!
//! Ties are broken by ascending [`DocRef`], so retrieval is deterministic.

pub mod format;
pub mod writer;

pub use format::SegmentStamp;
pub use writer::IndexWriter;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::analysis::{EnglishAnalyzer, Token};
use crate::error::{Error, Result};
use crate::query::{ClauseKind, Occur, StructuredQuery};
use crate::types::{Candidate, DocRef, SearchableDocument};

/// BM25 term-frequency saturation.
pub const K1: f64 = 1.2;

/// BM25 length normalization.
pub const B: f64 = 0.75;

/// Position gap between consecutive values of one field, so a phrase never
/// matches across two cells.
pub const POSITION_GAP: u32 = 100;

// =============================================================================
// TRAIT
// =============================================================================

/// Anything the searcher can retrieve candidates from.
pub trait LexicalIndex: Send + Sync {
    /// Top `limit` documents for `query`, best first.
    fn search(&self, query: &StructuredQuery, limit: usize) -> Vec<Candidate>;

    /// Stored fields of `doc`, or `None` when it is out of range.
    fn document(&self, doc: DocRef) -> Option<&SearchableDocument>;

    fn doc_count(&self) -> usize;
}

// =============================================================================
// POSTINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Posting {
    doc: u32,
    /// Sorted ascending.
    positions: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
struct FieldIndex {
    /// term → postings sorted by doc.
    postings: HashMap<String, Vec<Posting>>,
    /// Token count per doc (0 when the doc lacks this field).
    lengths: Vec<u32>,
    total_length: u64,
    docs_with_field: u32,
}

impl FieldIndex {
    fn avg_length(&self) -> f64 {
        if self.docs_with_field == 0 {
            return 0.0;
        }
        self.total_length as f64 / self.docs_with_field as f64
    }

    fn idf(&self, term: &str) -> f64 {
        let df = self.postings.get(term).map_or(0, Vec::len) as f64;
        let n = self.docs_with_field as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn bm25(&self, idf: f64, tf: f64, doc: u32) -> f64 {
        let dl = self.lengths.get(doc as usize).copied().unwrap_or(0) as f64;
        let avgdl = self.avg_length();
        let norm = if avgdl > 0.0 { dl / avgdl } else { 1.0 };
        idf * tf / (tf + K1 * (1.0 - B + B * norm))
    }

    fn positions(&self, term: &str, doc: u32) -> Option<&[u32]> {
        let postings = self.postings.get(term)?;
        postings
            .binary_search_by_key(&doc, |p| p.doc)
            .ok()
            .map(|i| postings[i].positions.as_slice())
    }

    /// Any-of term clause: doc → summed score.
    fn score_terms(&self, terms: &[String]) -> HashMap<u32, f64> {
        let mut scores = HashMap::new();
        for term in terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            for posting in postings {
                let tf = posting.positions.len() as f64;
                *scores.entry(posting.doc).or_insert(0.0) += self.bm25(idf, tf, posting.doc);
            }
        }
        scores
    }

    /// Exact phrase clause: doc → score.
    fn score_phrase(&self, tokens: &[Token]) -> HashMap<u32, f64> {
        let mut scores = HashMap::new();
        let Some((first, rest)) = tokens.split_first() else {
            return scores;
        };
        let Some(lead) = self.postings.get(&first.term) else {
            return scores;
        };
        if rest.iter().any(|t| !self.postings.contains_key(&t.term)) {
            return scores;
        }
        let idf: f64 = tokens.iter().map(|t| self.idf(&t.term)).sum();

        for posting in lead {
            let occurrences = posting
                .positions
                .iter()
                .filter(|&&start| {
                    rest.iter().all(|t| {
                        let offset = t.position - first.position;
                        self.positions(&t.term, posting.doc)
                            .is_some_and(|ps| ps.binary_search(&(start + offset)).is_ok())
                    })
                })
                .count();
            if occurrences > 0 {
                scores.insert(
                    posting.doc,
                    self.bm25(idf, occurrences as f64, posting.doc),
                );
            }
        }
        scores
    }
}

// =============================================================================
// INVERTED INDEX
// =============================================================================

/// An in-memory index over stored [`SearchableDocument`]s.
///
/// Documents get dense [`DocRef`]s in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    analyzer: EnglishAnalyzer,
    documents: Vec<SearchableDocument>,
    fields: HashMap<String, FieldIndex>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: impl IntoIterator<Item = SearchableDocument>) -> Self {
        let mut index = Self::new();
        for doc in documents {
            index.add_document(doc);
        }
        index
    }

    /// Open the index stored in `dir`.
    ///
    /// Fails with [`Error::MissingIndex`] when there is no segment or it holds
    /// no documents: every command needs a populated index to do anything.
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_stamped(dir).map(|(_, index)| index)
    }

    /// [`open`](Self::open), plus the stamp of the segment that was loaded.
    pub fn open_stamped(dir: &Path) -> Result<(SegmentStamp, Self)> {
        let (stamp, payload) =
            format::read_stamped_segment(dir)?.ok_or_else(|| Error::MissingIndex {
                path: dir.to_path_buf(),
            })?;
        if payload.documents.is_empty() {
            return Err(Error::MissingIndex {
                path: dir.to_path_buf(),
            });
        }
        let index = Self::from_documents(payload.documents);
        debug!(dir = %dir.display(), docs = index.doc_count(), "opened index");
        Ok((stamp, index))
    }

    /// Analyze and index one document, returning its reference.
    pub fn add_document(&mut self, document: SearchableDocument) -> DocRef {
        let doc = self.documents.len() as u32;

        for (name, values) in document.iter() {
            let field = self.fields.entry(name.to_string()).or_default();
            let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
            let mut length = 0u32;
            let mut base = 0u32;

            for value in values {
                let tokens = self.analyzer.analyze(value);
                let mut last = 0u32;
                for token in tokens {
                    last = token.position;
                    positions
                        .entry(token.term)
                        .or_default()
                        .push(base + token.position);
                    length += 1;
                }
                base += last + 1 + POSITION_GAP;
            }

            for (term, positions) in positions {
                field
                    .postings
                    .entry(term)
                    .or_default()
                    .push(Posting { doc, positions });
            }
            field.lengths.resize(doc as usize + 1, 0);
            field.lengths[doc as usize] = length;
            field.total_length += u64::from(length);
            if length > 0 {
                field.docs_with_field += 1;
            }
        }

        self.documents.push(document);
        DocRef(doc)
    }

    pub fn documents(&self) -> &[SearchableDocument] {
        &self.documents
    }

    /// Number of documents whose `field` contains `term` (already analyzed).
    pub fn doc_freq(&self, field: &str, term: &str) -> usize {
        self.fields
            .get(field)
            .and_then(|f| f.postings.get(term))
            .map_or(0, Vec::len)
    }

    fn clause_scores(&self, field: &str, kind: &ClauseKind) -> HashMap<u32, f64> {
        let Some(field) = self.fields.get(field) else {
            return HashMap::new();
        };
        match kind {
            ClauseKind::Terms(terms) => field.score_terms(terms),
            ClauseKind::Phrase(tokens) => field.score_phrase(tokens),
        }
    }
}

impl LexicalIndex for InvertedIndex {
    fn search(&self, query: &StructuredQuery, limit: usize) -> Vec<Candidate> {
        if limit == 0 || !query.has_positive_clause() {
            return Vec::new();
        }

        let mut excluded: HashSet<u32> = HashSet::new();
        let mut required: Option<HashMap<u32, f64>> = None;
        let mut optional: HashMap<u32, f64> = HashMap::new();

        for clause in &query.clauses {
            let scores = self.clause_scores(&clause.field, &clause.kind);
            match clause.occur {
                Occur::MustNot => excluded.extend(scores.into_keys()),
                Occur::Must => {
                    required = Some(match required {
                        None => scores,
                        Some(acc) => acc
                            .into_iter()
                            .filter_map(|(doc, s)| scores.get(&doc).map(|t| (doc, s + t)))
                            .collect(),
                    });
                }
                Occur::Should => {
                    for (doc, s) in scores {
                        *optional.entry(doc).or_insert(0.0) += s;
                    }
                }
            }
        }

        let matched: HashMap<u32, f64> = match required {
            Some(mut required) => {
                for (doc, s) in required.iter_mut() {
                    *s += optional.get(doc).copied().unwrap_or(0.0);
                }
                required
            }
            None => optional,
        };

        let mut hits: Vec<Candidate> = matched
            .into_iter()
            .filter(|(doc, _)| !excluded.contains(doc))
            .map(|(doc, score)| Candidate::new(DocRef(doc), score))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
        hits.truncate(limit);
        hits
    }

    fn document(&self, doc: DocRef) -> Option<&SearchableDocument> {
        self.documents.get(doc.as_usize())
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }
}
