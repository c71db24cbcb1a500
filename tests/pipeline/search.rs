//! Two-stage search over the in-memory fixture corpus.

use super::common::{articles, corpus, tables, ARTICLES, MATCH_ALL, ZURICH_DISTRICTS};
use tabula::testing::{article_index, table_index, toy_vectors, TableRecordBuilder};
use tabula::{
    EmbeddingStore, Error, InvariantViolation, LexicalIndex, RerankError, SearchLimits, Strategy,
    TableReranker, TableSearcher, TableStrategy,
};

// ============================================================================
// RANKING
// ============================================================================

#[test]
fn match_all_returns_every_table_once() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let results = searcher.search(MATCH_ALL).unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.reranked());

    let scores: Vec<f64> = results.hits().iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "not descending: {:?}", scores);
    assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));

    let by_name = results.by_table_name().unwrap();
    let mut expected: Vec<String> = corpus().into_iter().map(|r| r.key).collect();
    expected.sort();
    assert_eq!(by_name.keys().cloned().collect::<Vec<_>>(), expected);
}

#[test]
fn city_query_prefers_the_city_page() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let results = searcher.search("city").unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.hits()[0].document.table_name(), Some(ZURICH_DISTRICTS));
}

#[test]
fn phrase_and_exclusion() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let phrase = searcher.search_table_names("\"world cup\"").unwrap();
    assert_eq!(phrase.keys().collect::<Vec<_>>(), vec!["table-0003-1"]);

    let excluded = searcher.search_table_names("city NOT football").unwrap();
    assert_eq!(excluded.keys().collect::<Vec<_>>(), vec![ZURICH_DISTRICTS]);
}

#[test]
fn n_top_caps_results() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    )
    .with_limits(SearchLimits {
        n_top: 3,
        n_before_rerank: 200,
    });
    assert_eq!(searcher.search(MATCH_ALL).unwrap().len(), 3);
}

// ============================================================================
// FAIL-OPEN
// ============================================================================

#[test]
fn unknown_vocabulary_keeps_lexical_order() {
    let index = tables();
    let articles = articles();
    let vectors = EmbeddingStore::new(3);
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let results = searcher.search(MATCH_ALL).unwrap();
    assert!(!results.reranked());
    assert!(matches!(
        results.fallback_cause(),
        Some(RerankError::NoKnownTokens { what: "query" })
    ));

    let lexical = index.search(&strategy.parse_query(MATCH_ALL).unwrap(), 200);
    let got: Vec<(u32, f64)> = results.hits().iter().map(|h| (h.doc.get(), h.score)).collect();
    let want: Vec<(u32, f64)> = lexical.iter().map(|c| (c.doc.get(), c.score)).collect();
    assert_eq!(got, want);
}

#[test]
fn missing_article_keeps_lexical_order() {
    let index = tables();
    let partial: Vec<(&str, &str)> = ARTICLES
        .iter()
        .copied()
        .filter(|(title, _)| *title != "Lake Geneva")
        .collect();
    let articles = article_index(&partial);
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let results = searcher.search("lake").unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results.fallback_cause(),
        Some(RerankError::ArticleNotFound(title)) if title == "Lake Geneva"
    ));
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn duplicate_table_identifier_is_an_invariant_violation() {
    let mut records = corpus();
    records.push(
        TableRecordBuilder::new(ZURICH_DISTRICTS)
            .pg_title("Zurich")
            .caption("More city districts")
            .build(),
    );
    let index = table_index(&Strategy::default(), records).unwrap();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    let err = searcher.search_table_names("city").unwrap_err();
    assert_eq!(err.class(), "invariant-violation");
    assert!(matches!(
        err,
        Error::Invariant(InvariantViolation::DuplicateKey { ref key, .. }) if key == ZURICH_DISTRICTS
    ));
}

#[test]
fn malformed_query_is_rejected() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    for text in ["", "   ", "city AND", "\"open phrase"] {
        let err = searcher.search(text).unwrap_err();
        assert_eq!(err.class(), "invalid-query", "query {:?}", text);
    }
}

#[test]
fn multi_field_strategy_is_not_implemented() {
    let strategy = Strategy::from_name("multiField").unwrap();
    let err = table_index(&strategy, corpus()).unwrap_err();
    assert!(matches!(err, Error::NotImplemented(_)));
    assert!(strategy.parse_query("city").is_err());
}
