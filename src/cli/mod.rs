// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the tabula command-line interface.
//!
//! Two build steps and three ways to query. `index-wiki` and `index-tables`
//! build the article and table indexes; `search` runs free text, `query` runs
//! one line of the queries file, and `evaluate` runs all of them into a TREC
//! run file.

pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tabula",
    about = "Table retrieval with lexical search and embedding rerank",
    version
)]
pub struct Cli {
    /// Settings file (defaults to ./tabula.toml, then built-in defaults)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the article index from the encyclopedia dump
    IndexWiki,

    /// Build the table index from the JSON table corpus
    IndexTables,

    /// Search tables with free text
    Search {
        /// Query text, in the structured query syntax
        text: String,

        /// Override the number of results
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },

    /// Run one query from the queries file
    Query {
        /// Zero-based position of the query in the file
        n: usize,
    },

    /// Run every query and write a TREC run file
    Evaluate,
}
