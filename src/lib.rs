// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Table retrieval: lexical candidate search with embedding rerank.
//!
//! Tables scraped from encyclopedia pages are indexed with BM25. At query time
//! a wide lexical candidate set is reordered by how close, in word-vector
//! space, the query sits to each table's source article and to the table's
//! own labels.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  build::*     │────▶│  index       │────▶│  searcher    │
//! │ (tables, wiki)│     │ (BM25, .tbx) │     │ (two stages) │
//! └───────────────┘     └──────────────┘     └──────────────┘
//!        │                     ▲                    │
//!        ▼                     │                    ▼
//! ┌───────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  strategy     │     │  article     │◀────│  rerank      │
//! │ (doc shape)   │     │ (title find) │     │ (γ blend)    │
//! └───────────────┘     └──────────────┘     └──────────────┘
//!                                                   │
//!                                                   ▼
//!                                            ┌──────────────┐
//!                                            │  trec        │
//!                                            │ (run files)  │
//!                                            └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tabula::{Strategy, TableReranker, TableSearcher};
//!
//! let strategy = Strategy::default();
//! let reranker = TableReranker::new(&vectors, &articles, &strategy);
//! let searcher = TableSearcher::new(&tables, reranker, &strategy);
//!
//! for hit in searcher.search("zurich districts")?.hits() {
//!     println!("{:?} {}", hit.document.table_name(), hit.score);
//! }
//! ```

pub mod analysis;
pub mod article;
pub mod build;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod query;
pub mod rerank;
pub mod searcher;
pub mod strategy;
pub mod testing;
pub mod trec;
pub mod types;

// Re-exports for public API
pub use analysis::EnglishAnalyzer;
pub use article::{Article, ArticleLookup, ArticleSearcher};
pub use config::Settings;
pub use embedding::{cosine_similarity, EmbeddingStore, WordVectors};
pub use error::{Error, InvariantViolation, RerankError, Result};
pub use index::{IndexWriter, InvertedIndex, LexicalIndex};
pub use query::{QueryParser, StructuredQuery};
pub use rerank::{RerankOutcome, TableReranker, GAMMA};
pub use searcher::{SearchHit, SearchLimits, SearchResults, TableSearcher};
pub use strategy::{MultiField, SingleField, Strategy, TableStrategy};
pub use trec::{TrecReport, TrecRow};
pub use types::{Candidate, DocRef, Query, SearchableDocument, TableRecord};
