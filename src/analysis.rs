// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Text analysis: turning strings into index terms.
//!
//! One analyzer serves every field, the query parser, article bodies and label
//! extraction. That matters more than any single filter choice: the reranker
//! looks tokens up in a word-vector vocabulary, so the query side and the
//! document side have to agree on exactly what a token is.
//!
//! # Pipeline
//!
//! 1. NFD normalize, drop combining marks ("café" → "cafe")
//! 2. Lowercase
//! 3. Split on anything that isn't alphanumeric or an apostrophe
//! 4. Strip English possessives ("switzerland's" → "switzerland")
//! 5. Drop stop words (the classic Lucene English set)
//! 6. Porter2 stem
//!
//! Positions count every word *before* stop-word removal, so "bank of america"
//! indexes `bank@0, america@2`. Phrase matching compares relative positions,
//! and the gap keeps "bank america" from matching it.

use std::sync::LazyLock;

use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

/// English stop words, sorted for binary search.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// Check if a word is a stop word.
#[inline]
pub fn is_stop_word(word: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&word).is_ok()
}

/// Normalize a string: strip diacritics, lowercase, collapse whitespace.
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word boundary detection: anything that is neither alphanumeric nor an apostrophe.
#[inline]
fn is_word_boundary(c: char) -> bool {
    !(c.is_alphanumeric() || c == '\'')
}

/// A token and its position in the unfiltered word stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: u32,
}

/// The English analyzer used for every field and every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishAnalyzer;

impl EnglishAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze `text` into stemmed terms with positions.
    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let normalized = normalize(&text.replace(['\u{2019}', '\u{2018}'], "'"));
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for raw in normalized.split(is_word_boundary) {
            let word = raw.trim_matches('\'');
            if word.is_empty() {
                continue;
            }
            let word = word
                .strip_suffix("'s")
                .unwrap_or(word)
                .trim_end_matches('\'');
            let current = position;
            position += 1;

            if word.is_empty() || is_stop_word(word) {
                continue;
            }
            tokens.push(Token {
                term: STEMMER.stem(word).into_owned(),
                position: current,
            });
        }

        tokens
    }

    /// Analyzed terms only, in order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.term).collect()
    }

    /// Analyze several values and concatenate their terms.
    pub fn tokenize_all<S: AsRef<str>>(&self, values: &[S]) -> Vec<String> {
        values
            .iter()
            .flat_map(|value| self.tokenize(value.as_ref()))
            .collect()
    }
}
