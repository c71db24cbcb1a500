// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query parsing: free text in, structured boolean query out.
//!
//! The grammar is the useful subset of Lucene's classic syntax:
//!
//! ```text
//! query   := clause*
//! clause  := [+|-] [field ':'] (word | '"' phrase '"')
//!          | 'AND' | 'OR' | 'NOT'
//! ```
//!
//! Bare clauses are SHOULD, `+` makes a clause MUST, `-` and `NOT` make it
//! MUST_NOT, and `AND` upgrades both of its neighbours to MUST. Everything
//! that isn't syntax goes through the analyzer, so `(football)` and `football`
//! are the same clause.
//!
//! A clause whose text analyzes to nothing (stop words, punctuation) is
//! dropped, just like Lucene drops it. A query that ends up with no positive
//! clauses is still valid; it simply matches nothing.

use thiserror::Error;

use crate::analysis::{EnglishAnalyzer, Token};

/// How a clause participates in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Should,
    Must,
    MustNot,
}

/// What a clause matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseKind {
    /// Any of these terms (a bare word can analyze into several).
    Terms(Vec<String>),
    /// All of these terms at these relative positions.
    Phrase(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub occur: Occur,
    pub kind: ClauseKind,
}

/// A parsed boolean query, ready for the lexical index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    pub clauses: Vec<Clause>,
}

impl StructuredQuery {
    /// One SHOULD clause over every analyzed term of `text`, no syntax.
    ///
    /// Used for title lookups, where page titles like `"Hawks: 2010 season"`
    /// must not be read as field prefixes or operators.
    pub fn single_clause(field: &str, text: &str, analyzer: &EnglishAnalyzer) -> Self {
        let terms = analyzer.tokenize(text);
        if terms.is_empty() {
            return Self::default();
        }
        Self {
            clauses: vec![Clause {
                field: field.to_string(),
                occur: Occur::Should,
                kind: ClauseKind::Terms(terms),
            }],
        }
    }

    /// Can this query match anything at all?
    pub fn has_positive_clause(&self) -> bool {
        self.clauses.iter().any(|c| c.occur != Occur::MustNot)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Why a query string was rejected. Positions are byte offsets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("cannot parse empty query")]
    Empty,

    #[error("unterminated quote starting at {position}")]
    UnterminatedQuote { position: usize },

    #[error("operator '{operator}' at {position} has nothing to apply to")]
    DanglingOperator { operator: String, position: usize },

    #[error("field '{field}' at {position} has no value")]
    EmptyField { field: String, position: usize },

    #[error("invalid field name '{field}' at {position}")]
    InvalidField { field: String, position: usize },
}

/// Raw lexical units, before analysis.
#[derive(Debug, PartialEq, Eq)]
enum Lexeme<'a> {
    And(usize),
    Or(usize),
    Not(usize),
    Clause {
        position: usize,
        prefix: Option<char>,
        field: Option<&'a str>,
        body: Body<'a>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Body<'a> {
    Word(&'a str),
    Phrase(&'a str),
}

fn lex(text: &str) -> Result<Vec<Lexeme<'_>>, QueryParseError> {
    let bytes = text.as_bytes();
    let mut lexemes = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        let prefix = match c {
            b'+' | b'-' => {
                i += 1;
                if i >= bytes.len() || bytes[i].is_ascii_whitespace() {
                    return Err(QueryParseError::DanglingOperator {
                        operator: (c as char).to_string(),
                        position: start,
                    });
                }
                Some(c as char)
            }
            _ => None,
        };

        if bytes[i] == b'"' {
            let (phrase, next) = read_phrase(text, i)?;
            lexemes.push(Lexeme::Clause {
                position: start,
                prefix,
                field: None,
                body: Body::Phrase(phrase),
            });
            i = next;
            continue;
        }

        let word_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'"' {
            i += 1;
        }
        let word = &text[word_start..i];

        if prefix.is_none() {
            match word {
                "AND" => {
                    lexemes.push(Lexeme::And(start));
                    continue;
                }
                "OR" => {
                    lexemes.push(Lexeme::Or(start));
                    continue;
                }
                "NOT" => {
                    lexemes.push(Lexeme::Not(start));
                    continue;
                }
                _ => {}
            }
        }

        match word.split_once(':') {
            Some((field, rest)) if !field.is_empty() => {
                if !is_valid_field(field) {
                    return Err(QueryParseError::InvalidField {
                        field: field.to_string(),
                        position: word_start,
                    });
                }
                let body = if !rest.is_empty() {
                    Body::Word(rest)
                } else if i < bytes.len() && bytes[i] == b'"' {
                    let (phrase, next) = read_phrase(text, i)?;
                    i = next;
                    Body::Phrase(phrase)
                } else {
                    return Err(QueryParseError::EmptyField {
                        field: field.to_string(),
                        position: word_start,
                    });
                };
                lexemes.push(Lexeme::Clause {
                    position: start,
                    prefix,
                    field: Some(field),
                    body,
                });
            }
            _ => lexemes.push(Lexeme::Clause {
                position: start,
                prefix,
                field: None,
                body: Body::Word(word),
            }),
        }
    }

    Ok(lexemes)
}

/// Read a quoted phrase starting at the opening quote; returns the inner text
/// and the offset just past the closing quote.
fn read_phrase(text: &str, open: usize) -> Result<(&str, usize), QueryParseError> {
    let inner_start = open + 1;
    match text[inner_start..].find('"') {
        Some(len) => Ok((&text[inner_start..inner_start + len], inner_start + len + 1)),
        None => Err(QueryParseError::UnterminatedQuote { position: open }),
    }
}

fn is_valid_field(field: &str) -> bool {
    let mut chars = field.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses free text into a [`StructuredQuery`] against a default field.
#[derive(Debug, Clone)]
pub struct QueryParser {
    default_field: String,
    analyzer: EnglishAnalyzer,
}

impl QueryParser {
    pub fn new(default_field: impl Into<String>, analyzer: EnglishAnalyzer) -> Self {
        Self {
            default_field: default_field.into(),
            analyzer,
        }
    }

    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    pub fn parse(&self, text: &str) -> Result<StructuredQuery, QueryParseError> {
        if text.trim().is_empty() {
            return Err(QueryParseError::Empty);
        }

        let lexemes = lex(text)?;
        let mut clauses: Vec<Clause> = Vec::new();
        // Occur forced on the next clause by a preceding AND / NOT.
        let mut pending: Option<(Occur, &'static str, usize)> = None;
        // Whether the last real lexeme was a clause (so AND/OR have a left side).
        let mut after_clause = false;
        // Clause index whose occur AND upgrades, or None when it was dropped.
        let mut last_clause: Option<usize> = None;

        for lexeme in lexemes {
            match lexeme {
                Lexeme::And(position) | Lexeme::Or(position) => {
                    let operator = if matches!(lexeme, Lexeme::And(_)) { "AND" } else { "OR" };
                    if !after_clause || pending.is_some() {
                        return Err(QueryParseError::DanglingOperator {
                            operator: operator.to_string(),
                            position,
                        });
                    }
                    if operator == "AND" {
                        if let Some(idx) = last_clause {
                            if clauses[idx].occur == Occur::Should {
                                clauses[idx].occur = Occur::Must;
                            }
                        }
                        pending = Some((Occur::Must, "AND", position));
                    } else {
                        pending = Some((Occur::Should, "OR", position));
                    }
                    after_clause = false;
                }
                Lexeme::Not(position) => {
                    if matches!(pending, Some((Occur::MustNot, _, _))) {
                        return Err(QueryParseError::DanglingOperator {
                            operator: "NOT".to_string(),
                            position,
                        });
                    }
                    pending = Some((Occur::MustNot, "NOT", position));
                    after_clause = false;
                }
                Lexeme::Clause {
                    prefix,
                    field,
                    body,
                    ..
                } => {
                    let mut occur = match prefix {
                        Some('+') => Occur::Must,
                        Some('-') => Occur::MustNot,
                        _ => Occur::Should,
                    };
                    if let Some((forced, _, _)) = pending.take() {
                        if occur != Occur::MustNot && forced != Occur::Should {
                            occur = forced;
                        }
                    }
                    after_clause = true;

                    let field = field.unwrap_or(&self.default_field).to_string();
                    let kind = match body {
                        Body::Word(word) => {
                            let terms = self.analyzer.tokenize(word);
                            (!terms.is_empty()).then_some(ClauseKind::Terms(terms))
                        }
                        Body::Phrase(phrase) => {
                            let tokens = self.analyzer.analyze(phrase);
                            match tokens.len() {
                                0 => None,
                                1 => Some(ClauseKind::Terms(
                                    tokens.into_iter().map(|t| t.term).collect(),
                                )),
                                _ => Some(ClauseKind::Phrase(tokens)),
                            }
                        }
                    };

                    last_clause = kind.map(|kind| {
                        clauses.push(Clause { field, occur, kind });
                        clauses.len() - 1
                    });
                }
            }
        }

        if let Some((_, operator, position)) = pending {
            return Err(QueryParseError::DanglingOperator {
                operator: operator.to_string(),
                position,
            });
        }

        Ok(StructuredQuery { clauses })
    }
}
