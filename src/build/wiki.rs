// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Encyclopedia dump ingestion.
//!
//! The dump is JSON lines, one `{"id", "title", "text"}` object per article
//! (the shape wiki extractors emit). Only real articles are indexed; pages that
//! exist for wiki plumbing are dropped:
//!
//! | Skipped            | Detected by                                   |
//! |--------------------|-----------------------------------------------|
//! | redirect           | `redirect` key, or text starting `#REDIRECT`  |
//! | category           | `Category:` title                             |
//! | disambiguation     | `(disambiguation)` title, `{{disambig…}}`     |
//! | stub               | `{{…stub}}` template in the text              |
//! | special/namespace  | `Special:`, `Template:`, `Help:` … titles     |
//! | project pages      | `Wikipedia:` and `File:` titles               |

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::{IndexWriter, InvertedIndex};
use crate::types::{DocumentBuilder, SearchableDocument};

/// Article title field.
pub const FIELD_TITLE: &str = "title";
/// Article body field.
pub const FIELD_TEXT: &str = "text";
/// Article id field, stored as its decimal string.
pub const FIELD_ID: &str = "id";

/// Title prefixes of non-article namespaces.
const NAMESPACES: &[&str] = &[
    "Book", "Draft", "Help", "Image", "Media", "MediaWiki", "Module", "Portal", "Special",
    "Talk", "Template", "TimedText", "User",
];

static STUB_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{[^{}]*stub\s*\}\}").expect("stub template regex must compile")
});

static DISAMBIGUATION_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{\s*(disambig|disambiguation|dab|hndis|geodis)\s*[|}]")
        .expect("disambiguation template regex must compile")
});

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawPage {
    id: RawId,
    title: String,
    text: String,
    #[serde(default)]
    redirect: Option<String>,
}

/// A dump page that survived filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiArticle {
    pub id: u64,
    pub title: String,
    pub text: String,
}

impl WikiArticle {
    pub fn to_document(&self) -> SearchableDocument {
        let mut builder = DocumentBuilder::new();
        builder
            .add(FIELD_TITLE, self.title.as_str())
            .add(FIELD_TEXT, self.text.as_str())
            .add(FIELD_ID, self.id.to_string());
        builder.build()
    }
}

/// Why a page was not indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Redirect,
    Category,
    Disambiguation,
    Stub,
    Special,
    Project,
}

fn namespace_of(title: &str) -> Option<&str> {
    title.split_once(':').map(|(ns, _)| ns.trim())
}

fn skip_reason(page: &RawPage, title: &str) -> Option<SkipReason> {
    if page.redirect.is_some()
        || page
            .text
            .trim_start()
            .get(..9)
            .is_some_and(|head| head.eq_ignore_ascii_case("#redirect"))
    {
        return Some(SkipReason::Redirect);
    }
    if title.starts_with("Wikipedia:") || title.starts_with("File:") {
        return Some(SkipReason::Project);
    }
    match namespace_of(title) {
        Some("Category") => return Some(SkipReason::Category),
        Some(ns)
            if NAMESPACES.contains(&ns)
                || ns.ends_with(" talk")
                || ns.eq_ignore_ascii_case("talk") =>
        {
            return Some(SkipReason::Special)
        }
        _ => {}
    }
    if title.ends_with("(disambiguation)") || DISAMBIGUATION_TEMPLATE.is_match(&page.text) {
        return Some(SkipReason::Disambiguation);
    }
    if STUB_TEMPLATE.is_match(&page.text) {
        return Some(SkipReason::Stub);
    }
    None
}

/// Parse one dump line.
///
/// `Ok(Err(reason))` is a well-formed page that should not be indexed.
pub fn parse_article(line: &str) -> Result<std::result::Result<WikiArticle, SkipReason>> {
    let page: RawPage = serde_json::from_str(line)?;
    let title = page.title.trim();
    if let Some(reason) = skip_reason(&page, title) {
        return Ok(Err(reason));
    }
    let id = match &page.id {
        RawId::Number(n) => *n,
        RawId::Text(s) => s.trim().parse().map_err(|_| Error::MalformedRecord {
            key: title.to_string(),
            reason: format!("article id '{}' is not an integer", s),
        })?,
    };
    Ok(Ok(WikiArticle {
        id,
        title: title.to_string(),
        text: page.text.trim().to_string(),
    }))
}

/// Counters for one dump pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WikiStats {
    pub indexed: usize,
    pub skipped: usize,
    pub malformed: usize,
}

/// Builds (or extends) the article index in one directory.
#[derive(Debug)]
pub struct WikiIndexer {
    index_dir: PathBuf,
}

impl WikiIndexer {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    /// Stream `dump` into the index and commit.
    pub fn index(&self, dump: &Path) -> Result<(InvertedIndex, WikiStats)> {
        let file = File::open(dump).map_err(|e| {
            Error::Config(format!("cannot open dump {}: {}", dump.display(), e))
        })?;
        let mut writer = IndexWriter::open_or_create(&self.index_dir)?;
        let mut stats = WikiStats::default();

        #[cfg(feature = "parallel")]
        let progress = super::progress_spinner("Indexing");

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_article(&line) {
                Ok(Ok(article)) => {
                    debug!(id = article.id, title = %article.title, "indexing article");
                    writer.add_document(article.to_document());
                    stats.indexed += 1;
                    #[cfg(feature = "parallel")]
                    progress.set_position(stats.indexed as u64);
                }
                Ok(Err(_)) => stats.skipped += 1,
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping malformed dump line");
                    stats.malformed += 1;
                }
            }
        }

        #[cfg(feature = "parallel")]
        progress.finish_and_clear();

        let index = writer.commit()?;
        info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            malformed = stats.malformed,
            "article index ready"
        );
        Ok((index, stats))
    }
}
