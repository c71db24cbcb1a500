//! Build both indexes on disk from a settings file, then search them.

use std::fs;

use super::common::{corpus, write_corpus, write_dump, write_vectors, ZURICH_DISTRICTS};
use tabula::build::{TableIndexer, WikiIndexer};
use tabula::config::{get_query, load_queries};
use tabula::{
    ArticleSearcher, EmbeddingStore, IndexWriter, InvertedIndex, LexicalIndex, Settings,
    TableReranker, TableSearcher,
};

/// Lay out a full working directory under a fresh temp root.
fn workspace() -> (tempfile::TempDir, Settings) {
    let root = tempfile::tempdir().unwrap();
    let config = root.path().join("tabula.toml");
    fs::write(
        &config,
        format!(
            "mount = \"{}\"\nwork_directory = \"data\"\n\n[search]\nn_top = 20\n",
            root.path().display()
        ),
    )
    .unwrap();
    let settings = Settings::discover(Some(&config)).unwrap();

    let records = corpus();
    write_corpus(&settings.json_table_dir(), "part-1.json", &records[..3]);
    write_corpus(&settings.json_table_dir(), "part-2.json", &records[3..]);
    write_dump(&settings.enwiki_file());
    write_vectors(&settings.word_vectors_file());
    fs::write(settings.queries_file(), "1 city\n2 \"world cup\"\n\n3 boats lake\n").unwrap();

    (root, settings)
}

#[test]
fn build_then_search_from_disk() {
    let (_root, settings) = workspace();

    let (_, stats) = WikiIndexer::new(settings.enwiki_index_dir())
        .index(&settings.enwiki_file())
        .unwrap();
    assert_eq!(stats.indexed, 4);
    assert_eq!(stats.skipped, 1);

    let strategy = settings.strategy().unwrap();
    TableIndexer::new(&strategy, settings.tables_index_dir())
        .index(&settings.json_table_dir())
        .unwrap();

    let tables = InvertedIndex::open(&settings.tables_index_dir()).unwrap();
    assert_eq!(tables.doc_count(), 5);

    let articles = ArticleSearcher::open(settings.enwiki_index_dir()).unwrap();
    let vectors = EmbeddingStore::load(&settings.word_vectors_file()).unwrap();
    let searcher = TableSearcher::new(
        &tables,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    )
    .with_limits(settings.limits());

    let results = searcher.search("city").unwrap();
    assert!(results.reranked(), "fell back: {:?}", results.fallback_cause());
    assert_eq!(results.hits()[0].document.table_name(), Some(ZURICH_DISTRICTS));
}

#[test]
fn reindexing_appends_and_surfaces_duplicates() {
    let (_root, settings) = workspace();
    let strategy = settings.strategy().unwrap();
    let indexer = TableIndexer::new(&strategy, settings.tables_index_dir());
    indexer.index(&settings.json_table_dir()).unwrap();
    let index = indexer.index(&settings.json_table_dir()).unwrap();
    assert_eq!(index.doc_count(), 10);

    let articles = tabula::testing::article_index(super::common::ARTICLES);
    let vectors = tabula::testing::toy_vectors();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );
    let err = searcher.search_table_names("city").unwrap_err();
    assert_eq!(err.class(), "invariant-violation");
}

#[test]
fn empty_article_index_fails_the_search() {
    let (_root, settings) = workspace();
    let strategy = settings.strategy().unwrap();
    let tables = TableIndexer::new(&strategy, settings.tables_index_dir())
        .index(&settings.json_table_dir())
        .unwrap();
    IndexWriter::open_or_create(&settings.enwiki_index_dir())
        .unwrap()
        .commit()
        .unwrap();

    let err = ArticleSearcher::open(settings.enwiki_index_dir()).unwrap_err();
    assert_eq!(err.class(), "configuration");

    // Opened lazily, the same index still fails the search instead of
    // degrading it to lexical order.
    let articles = ArticleSearcher::new(settings.enwiki_index_dir());
    let vectors = EmbeddingStore::load(&settings.word_vectors_file()).unwrap();
    let searcher = TableSearcher::new(
        &tables,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );
    let err = searcher.search("city").unwrap_err();
    assert_eq!(err.class(), "configuration");
}

#[test]
fn missing_index_is_a_configuration_error() {
    let (_root, settings) = workspace();
    let err = InvertedIndex::open(&settings.tables_index_dir()).unwrap_err();
    assert_eq!(err.class(), "configuration");
}

#[test]
fn queries_file() {
    let (_root, settings) = workspace();
    let queries = load_queries(&settings.queries_file()).unwrap();
    let ids: Vec<u64> = queries.iter().map(|q| q.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(queries[1].text(), "\"world cup\"");

    let third = get_query(&settings.queries_file(), 2).unwrap();
    assert_eq!(third.text(), "boats lake");
    assert_eq!(
        get_query(&settings.queries_file(), 3).unwrap_err().class(),
        "configuration"
    );
}
