// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Word vectors for semantic reranking.
//!
//! Loaded once from a word2vec model file and read-only afterwards. Two file
//! formats are understood:
//!
//! - **text**: one `word v1 v2 … vd` per line, optionally preceded by a
//!   `count dim` header line (GloVe files have no header; the dimension comes
//!   from the first row)
//! - **binary** (`.bin`): an ASCII `count dim\n` header, then per word the word,
//!   a space, and `dim` little-endian `f32`s
//!
//! Vectors are stored in one flat buffer, `dim` floats per word.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Lookup of token vectors.
pub trait WordVectors: Send + Sync {
    fn dimension(&self) -> usize;

    /// The vector for `token`, or `None` when it is out of vocabulary.
    fn vector(&self, token: &str) -> Option<&[f32]>;

    /// Element-wise mean over the known tokens. `None` when no token is known.
    fn mean(&self, tokens: &[String]) -> Option<Vec<f32>> {
        let mut sum = vec![0.0f32; self.dimension()];
        let mut known = 0usize;
        for vector in tokens.iter().filter_map(|t| self.vector(t)) {
            for (acc, x) in sum.iter_mut().zip(vector) {
                *acc += x;
            }
            known += 1;
        }
        if known == 0 {
            return None;
        }
        let n = known as f32;
        sum.iter_mut().for_each(|x| *x /= n);
        Some(sum)
    }
}

/// Cosine similarity: dot(a,b) / (||a|| * ||b||)
///
/// Range: [-1, 1], higher = more similar.
/// Returns 0.0 if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in cosine similarity");
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// An in-memory word-vector table.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStore {
    dimension: usize,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl EmbeddingStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Add a word. The first vector for a word wins; later duplicates are ignored.
    pub fn insert(&mut self, word: impl Into<String>, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::WordVectors(format!(
                "vector has {} components, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        let slot = self.index.len();
        if let std::collections::hash_map::Entry::Vacant(entry) = self.index.entry(word.into()) {
            entry.insert(slot);
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Load a model, picking the format from the extension (`.bin` is binary).
    pub fn load(path: &Path) -> Result<Self> {
        let binary = path.extension().is_some_and(|ext| ext == "bin");
        let file = File::open(path).map_err(|e| {
            Error::WordVectors(format!("cannot open {}: {}", path.display(), e))
        })?;
        let reader = BufReader::new(file);
        let store = if binary {
            Self::read_binary(reader)?
        } else {
            Self::read_text(reader)?
        };
        info!(
            path = %path.display(),
            words = store.len(),
            dimension = store.dimension,
            "loaded word vectors"
        );
        Ok(store)
    }

    /// Parse the text format.
    pub fn read_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut store: Option<Self> = None;
        let mut buf = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if line_no == 0 && rest.len() == 1 {
                if let (Ok(_), Ok(dim)) = (word.parse::<usize>(), rest[0].parse::<usize>()) {
                    store = Some(Self::new(dim));
                    continue;
                }
            }

            let store = store.get_or_insert_with(|| Self::new(rest.len()));
            buf.clear();
            for value in &rest {
                buf.push(value.parse::<f32>().map_err(|_| {
                    Error::WordVectors(format!(
                        "line {}: '{}' is not a number",
                        line_no + 1,
                        value
                    ))
                })?);
            }
            store
                .insert(word, &buf)
                .map_err(|e| Error::WordVectors(format!("line {}: {}", line_no + 1, e)))?;
        }

        match store {
            Some(store) if store.dimension > 0 => Ok(store),
            _ => Err(Error::WordVectors("model file holds no vectors".to_string())),
        }
    }

    /// Parse the binary format.
    pub fn read_binary<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let mut parts = header.split_whitespace().map(str::parse::<usize>);
        let (count, dim) = match (parts.next(), parts.next()) {
            (Some(Ok(count)), Some(Ok(dim))) if dim > 0 => (count, dim),
            _ => {
                return Err(Error::WordVectors(format!(
                    "bad binary header '{}'",
                    header.trim()
                )))
            }
        };

        let mut store = Self::new(dim);
        let mut raw = vec![0u8; dim * 4];
        let mut vector = vec![0f32; dim];
        let mut word = Vec::new();

        for i in 0..count {
            word.clear();
            reader.read_until(b' ', &mut word)?;
            if word.last() != Some(&b' ') {
                return Err(Error::WordVectors(format!(
                    "truncated binary model: {} of {} words read",
                    i, count
                )));
            }
            word.pop();
            let text = String::from_utf8_lossy(&word);
            let text = text.trim_start_matches('\n');

            reader.read_exact(&mut raw).map_err(|_| {
                Error::WordVectors(format!(
                    "truncated binary model: vector {} of {} incomplete",
                    i + 1,
                    count
                ))
            })?;
            for (slot, chunk) in vector.iter_mut().zip(raw.chunks_exact(4)) {
                *slot = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            store.insert(text, &vector)?;
        }

        Ok(store)
    }
}

impl WordVectors for EmbeddingStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector(&self, token: &str) -> Option<&[f32]> {
        let slot = *self.index.get(token)?;
        self.data.get(slot * self.dimension..(slot + 1) * self.dimension)
    }
}
