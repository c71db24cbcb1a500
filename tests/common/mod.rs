//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tabula::testing::{article_index, table_index, TableRecordBuilder};
use tabula::{InvertedIndex, Strategy, TableRecord};

// ============================================================================
// CORPUS
// ============================================================================

/// Identifier of the Zurich districts table, the best answer for "city".
pub const ZURICH_DISTRICTS: &str = "table-0001-1";

/// Five tables over four pages.
pub fn corpus() -> Vec<TableRecord> {
    vec![
        TableRecordBuilder::new(ZURICH_DISTRICTS)
            .pg_title("Zurich")
            .caption("Districts of the city")
            .columns(&["District", "Population"])
            .row(&["Altstadt", "6000"])
            .row(&["Wiedikon", "50000"])
            .numeric(1)
            .build(),
        TableRecordBuilder::new("table-0001-2")
            .pg_title("Zurich")
            .caption("Tallest buildings")
            .columns(&["Building", "Street"])
            .row(&["Prime Tower", "Hardstrasse"])
            .build(),
        TableRecordBuilder::new("table-0002-1")
            .pg_title("Lake Geneva")
            .caption("Boats on the lake")
            .columns(&["Boat", "Port"])
            .row(&["Montreux", "Vevey"])
            .build(),
        TableRecordBuilder::new("table-0003-1")
            .pg_title("FIFA World Cup")
            .caption("World cup winners")
            .columns(&["Year", "Winner"])
            .row(&["2010", "Spain"])
            .numeric(0)
            .build(),
        TableRecordBuilder::new("table-0003-2")
            .pg_title("Football in Switzerland")
            .caption("City football clubs")
            .columns(&["Club", "City"])
            .row(&["FC Zurich", "Zurich"])
            .build(),
    ]
}

/// One article for every page in [`corpus`].
pub const ARTICLES: &[(&str, &str)] = &[
    ("Zurich", "Zurich is the largest city, with many streets and buildings."),
    ("Lake Geneva", "Lake Geneva is a lake with boats and ports."),
    ("FIFA World Cup", "The world cup is a football competition."),
    ("Football in Switzerland", "Football is played in every city."),
];

/// A query that lexically matches every table in [`corpus`].
pub const MATCH_ALL: &str = "city lake cup buildings";

pub fn tables() -> InvertedIndex {
    table_index(&Strategy::default(), corpus()).unwrap()
}

pub fn articles() -> InvertedIndex {
    article_index(ARTICLES)
}

// ============================================================================
// ON-DISK FIXTURES
// ============================================================================

/// Write `records` as one corpus file, keyed by table identifier.
pub fn write_corpus(dir: &Path, file: &str, records: &[TableRecord]) {
    let keyed: BTreeMap<&str, &TableRecord> =
        records.iter().map(|r| (r.key.as_str(), r)).collect();
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file), serde_json::to_string_pretty(&keyed).unwrap()).unwrap();
}

/// Write [`ARTICLES`] as a JSONL dump, with one redirect that must be skipped.
pub fn write_dump(path: &Path) {
    let mut lines: Vec<String> = ARTICLES
        .iter()
        .zip(1u64..)
        .map(|((title, text), id)| {
            serde_json::json!({ "id": id, "title": title, "text": text }).to_string()
        })
        .collect();
    lines.push(
        serde_json::json!({ "id": 99, "title": "Zürich", "text": "#REDIRECT [[Zurich]]" })
            .to_string(),
    );
    fs::write(path, lines.join("\n")).unwrap();
}

/// A small word-vector model in the text format.
pub fn write_vectors(path: &Path) {
    let model = "\
3 3
citi 1.0 0.0 0.0
lake 0.0 1.0 0.0
footbal 0.1 0.0 1.0
";
    fs::write(path, model).unwrap();
}
