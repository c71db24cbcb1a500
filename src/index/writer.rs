// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Create-or-append index writer.
//!
//! Opening a directory that already holds a segment loads it, so new documents
//! are appended after the existing ones. Nothing touches disk until
//! [`IndexWriter::commit`].

use std::path::{Path, PathBuf};

use tracing::info;

use super::format::{self, SegmentPayload};
use super::{InvertedIndex, LexicalIndex};
use crate::error::Result;
use crate::types::{DocRef, SearchableDocument};

#[derive(Debug)]
pub struct IndexWriter {
    dir: PathBuf,
    documents: Vec<SearchableDocument>,
    existing: usize,
}

impl IndexWriter {
    /// Open `dir` for writing, loading any segment already there.
    pub fn open_or_create(dir: &Path) -> Result<Self> {
        let documents = format::read_segment(dir)?
            .map(|payload| payload.documents)
            .unwrap_or_default();
        let existing = documents.len();
        if existing > 0 {
            info!(dir = %dir.display(), existing, "appending to existing index");
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            documents,
            existing,
        })
    }

    /// Queue a document. References are dense and follow insertion order.
    pub fn add_document(&mut self, document: SearchableDocument) -> DocRef {
        self.documents.push(document);
        DocRef(self.documents.len() as u32 - 1)
    }

    pub fn add_documents(&mut self, documents: impl IntoIterator<Item = SearchableDocument>) {
        self.documents.extend(documents);
    }

    /// Documents added since open.
    pub fn pending(&self) -> usize {
        self.documents.len() - self.existing
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the segment and return the opened index.
    pub fn commit(self) -> Result<InvertedIndex> {
        let payload = SegmentPayload {
            documents: self.documents,
        };
        let path = format::write_segment(&self.dir, &payload)?;
        let index = InvertedIndex::from_documents(payload.documents);
        info!(
            path = %path.display(),
            docs = index.doc_count(),
            added = index.doc_count() - self.existing,
            "committed index"
        );
        Ok(index)
    }
}
