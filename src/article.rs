// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Article lookup by page title.
//!
//! The reranker needs the encyclopedia article behind each table's page.
//! Lookup is a plain title search that keeps the single best hit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::analysis::EnglishAnalyzer;
use crate::build::wiki::{FIELD_ID, FIELD_TEXT, FIELD_TITLE};
use crate::error::{Error, Result};
use crate::index::format::{self, SegmentStamp};
use crate::index::{InvertedIndex, LexicalIndex};
use crate::query::StructuredQuery;
use crate::types::SearchableDocument;

/// A stored encyclopedia article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: Option<u64>,
    pub title: String,
    pub text: String,
}

impl Article {
    fn from_document(doc: &SearchableDocument) -> Self {
        Self {
            id: doc.get(FIELD_ID).and_then(|id| id.parse().ok()),
            title: doc.get(FIELD_TITLE).unwrap_or_default().to_string(),
            text: doc.get(FIELD_TEXT).unwrap_or_default().to_string(),
        }
    }
}

/// Finds the article for a page title.
pub trait ArticleLookup: Send + Sync {
    /// Best-matching article, or `None` when nothing matches at all.
    fn find_article(&self, title: &str) -> Result<Option<Article>>;
}

/// Top title hit in an already-open article index.
pub fn top_article<I: LexicalIndex + ?Sized>(index: &I, title: &str) -> Option<Article> {
    let query = StructuredQuery::single_clause(FIELD_TITLE, title, &EnglishAnalyzer);
    let hit = index.search(&query, 1).into_iter().next()?;
    index.document(hit.doc).map(Article::from_document)
}

/// Lookups against an index held in memory for the whole run.
impl ArticleLookup for InvertedIndex {
    fn find_article(&self, title: &str) -> Result<Option<Article>> {
        Ok(top_article(self, title))
    }
}

/// Lookups against the article index on disk, picking up new commits.
///
/// Every call re-reads the segment footer. The decoded index is held between
/// calls and only rebuilt when the footer stamp changes, since decoding costs
/// time proportional to the whole encyclopedia.
#[derive(Debug)]
pub struct ArticleSearcher {
    index_dir: PathBuf,
    loaded: RwLock<Option<(SegmentStamp, Arc<InvertedIndex>)>>,
}

impl ArticleSearcher {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            loaded: RwLock::new(None),
        }
    }

    /// Open and fully validate the index up front.
    ///
    /// A missing, empty or corrupt index fails here rather than on the first
    /// lookup.
    pub fn open(index_dir: impl Into<PathBuf>) -> Result<Self> {
        let searcher = Self::new(index_dir);
        searcher.current()?;
        Ok(searcher)
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// The index matching the segment on disk right now.
    fn current(&self) -> Result<Arc<InvertedIndex>> {
        let stamp = format::read_stamp(&self.index_dir)?.ok_or_else(|| Error::MissingIndex {
            path: self.index_dir.clone(),
        })?;
        if let Some((held, index)) = self.loaded.read().as_ref() {
            if *held == stamp {
                return Ok(Arc::clone(index));
            }
        }

        let (stamp, index) = InvertedIndex::open_stamped(&self.index_dir)?;
        let index = Arc::new(index);
        debug!(
            dir = %self.index_dir.display(),
            docs = index.doc_count(),
            "loaded article index"
        );
        *self.loaded.write() = Some((stamp, Arc::clone(&index)));
        Ok(index)
    }
}

impl ArticleLookup for ArticleSearcher {
    fn find_article(&self, title: &str) -> Result<Option<Article>> {
        let index = self.current()?;
        Ok(top_article(index.as_ref(), title))
    }
}
