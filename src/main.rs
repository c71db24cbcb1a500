// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::process;
use std::time::Instant;

use clap::Parser;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tabula::article::{ArticleLookup, ArticleSearcher};
use tabula::build::{TableIndexer, WikiIndexer};
use tabula::cli::display::print_results;
use tabula::cli::{Cli, Commands};
use tabula::config::{get_query, load_queries, Settings};
use tabula::embedding::EmbeddingStore;
use tabula::index::InvertedIndex;
use tabula::rerank::TableReranker;
use tabula::searcher::{SearchLimits, TableSearcher};
use tabula::strategy::{Strategy, TableStrategy};
use tabula::trec::TrecReport;
use tabula::{Error, Query, Result};

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ [{}] {}", e.class(), e);
        process::exit(1);
    }
}

/// Log to stderr so stdout only carries results. `RUST_LOG` overrides `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::IndexWiki => {
            let (index, stats) =
                WikiIndexer::new(settings.enwiki_index_dir()).index(&settings.enwiki_file())?;
            println!(
                "indexed {} articles ({} skipped, {} malformed), {} in index",
                stats.indexed,
                stats.skipped,
                stats.malformed,
                index.documents().len()
            );
        }
        Commands::IndexTables => {
            let strategy = settings.strategy()?;
            let index = TableIndexer::new(&strategy, settings.tables_index_dir())
                .index(&settings.json_table_dir())?;
            println!("{} tables in index", index.documents().len());
        }
        Commands::Search { text, top } => {
            let mut limits = settings.limits();
            if let Some(top) = top {
                if top == 0 {
                    return Err(Error::Config("--top must be at least 1".into()));
                }
                limits.n_top = top;
                limits.n_before_rerank = limits.n_before_rerank.max(top);
            }
            let engine = Engine::open(&settings, limits)?;
            run_query(&engine, &Query::with_random_id(text))?;
        }
        Commands::Query { n } => {
            let query = get_query(&settings.queries_file(), n)?;
            let engine = Engine::open(&settings, settings.limits())?;
            run_query(&engine, &query)?;
        }
        Commands::Evaluate => {
            let queries = load_queries(&settings.queries_file())?;
            let engine = Engine::open(&settings, settings.limits())?;
            let path = evaluate(&engine, &queries, &settings)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn run_query(engine: &Engine, query: &Query) -> Result<()> {
    let start = Instant::now();
    let results = engine.searcher().search(query.text())?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    // Surface duplicate identifiers even when only printing.
    results.by_table_name()?;
    print_results(query, &results, elapsed_ms);
    Ok(())
}

fn evaluate(engine: &Engine, queries: &[Query], settings: &Settings) -> Result<std::path::PathBuf> {
    let start = Instant::now();
    let searcher = engine.searcher();

    #[cfg(feature = "parallel")]
    let iter = queries.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = queries.iter();

    let results = iter
        .map(|query| {
            searcher
                .search_table_names(query.text())
                .map(|scores| (query.clone(), scores))
        })
        .collect::<Result<BTreeMap<Query, BTreeMap<String, f64>>>>()?;

    info!(
        queries = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "evaluation complete"
    );

    TrecReport::new(settings.trec_output_dir())
        .with_team(settings.report.team_name.clone())
        .create_report(&results)
}

/// Everything one search run needs, opened once.
struct Engine {
    strategy: Strategy,
    tables: InvertedIndex,
    vectors: EmbeddingStore,
    articles: Box<dyn ArticleLookup>,
    limits: SearchLimits,
}

impl Engine {
    fn open(settings: &Settings, limits: SearchLimits) -> Result<Self> {
        let strategy = settings.strategy()?;
        let tables = InvertedIndex::open(&settings.tables_index_dir())?;

        let article_dir = settings.enwiki_index_dir();
        let articles: Box<dyn ArticleLookup> = if settings.search.reopen_article_index {
            Box::new(ArticleSearcher::open(article_dir)?)
        } else {
            Box::new(InvertedIndex::open(&article_dir)?)
        };

        let vectors_path = settings.word_vectors_file();
        let vectors = EmbeddingStore::load(&vectors_path)?;
        info!(
            strategy = strategy.name(),
            tables = tables.documents().len(),
            words = vectors.len(),
            "search engine ready"
        );

        Ok(Self {
            strategy,
            tables,
            vectors,
            articles,
            limits,
        })
    }

    fn searcher(&self) -> TableSearcher<'_> {
        TableSearcher::new(
            &self.tables,
            TableReranker::new(&self.vectors, self.articles.as_ref(), &self.strategy),
            &self.strategy,
        )
        .with_limits(self.limits)
    }
}
