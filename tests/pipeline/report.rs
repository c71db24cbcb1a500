//! Evaluation runs written as TREC run files.

use std::collections::BTreeMap;
use std::fs;

use super::common::{articles, tables, ZURICH_DISTRICTS};
use tabula::testing::toy_vectors;
use tabula::trec::{DEFAULT_TEAM_NAME, LATEST_REPORT};
use tabula::{Query, Strategy, TableReranker, TableSearcher, TrecReport};

#[test]
fn evaluation_run_file() {
    let index = tables();
    let articles = articles();
    let vectors = toy_vectors();
    let strategy = Strategy::default();
    let searcher = TableSearcher::new(
        &index,
        TableReranker::new(&vectors, &articles, &strategy),
        &strategy,
    );

    // Inserted out of id order on purpose.
    let queries = [
        Query::new(3, "boats"),
        Query::new(1, "city"),
        Query::new(2, "\"world cup\""),
    ];
    let mut results = BTreeMap::new();
    for query in &queries {
        results.insert(query.clone(), searcher.search_table_names(query.text()).unwrap());
    }

    let dir = tempfile::tempdir().unwrap();
    let report = TrecReport::new(dir.path().join("trec"));
    let path = report.create_report(&results).unwrap();
    assert!(path.file_name().unwrap().to_string_lossy().ends_with(".txt"));

    let latest = fs::read_to_string(dir.path().join("trec").join(LATEST_REPORT)).unwrap();
    assert_eq!(latest, fs::read_to_string(&path).unwrap());

    let rows: Vec<Vec<&str>> = latest.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(rows.len(), 4);
    for row in &rows {
        assert_eq!(row.len(), 6);
        assert_eq!(row[1], "Q0");
        assert_eq!(row[5], DEFAULT_TEAM_NAME);
        assert!(row[4].parse::<f64>().is_ok());
    }

    let keys: Vec<(&str, &str)> = rows.iter().map(|r| (r[0], r[3])).collect();
    assert_eq!(keys, vec![("1", "1"), ("1", "2"), ("2", "1"), ("3", "1")]);
    assert_eq!(rows[0][2], ZURICH_DISTRICTS);
    assert_eq!(rows[2][2], "table-0003-1");
    assert_eq!(rows[3][2], "table-0002-1");
}

#[test]
fn custom_team_name() {
    let mut results = BTreeMap::new();
    results.insert(
        Query::new(7, "anything"),
        BTreeMap::from([("t".to_string(), 0.5)]),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = TrecReport::new(dir.path())
        .with_team("lab42")
        .create_report(&results)
        .unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "7\tQ0\tt\t1\t0.5\tlab42\n");
}
