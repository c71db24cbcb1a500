// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Everything in one field.
//!
//! Secondary title, caption, page title, column titles, then every cell in
//! row-major order, each stored as a separate value of `singleField`.

use super::TableStrategy;
use crate::analysis::EnglishAnalyzer;
use crate::error::Result;
use crate::query::{QueryParser, StructuredQuery};
use crate::types::{DocumentBuilder, SearchableDocument, TableRecord};

#[derive(Debug, Clone)]
pub struct SingleField {
    parser: QueryParser,
    analyzer: EnglishAnalyzer,
}

impl SingleField {
    pub const NAME: &'static str = "singleField";

    /// The one field every value goes into.
    pub const FIELD: &'static str = "singleField";

    pub fn new() -> Self {
        Self {
            parser: QueryParser::new(Self::FIELD, EnglishAnalyzer),
            analyzer: EnglishAnalyzer,
        }
    }
}

impl Default for SingleField {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStrategy for SingleField {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn populate(&self, record: &TableRecord, builder: &mut DocumentBuilder) -> Result<()> {
        builder
            .add(Self::FIELD, record.second_title.as_str())
            .add(Self::FIELD, record.caption.as_str())
            .add(Self::FIELD, record.pg_title.as_str());
        for title in &record.title {
            builder.add(Self::FIELD, title.as_str());
        }
        for cell in record.cells() {
            builder.add(Self::FIELD, cell);
        }
        Ok(())
    }

    fn parse_query(&self, text: &str) -> Result<StructuredQuery> {
        Ok(self.parser.parse(text)?)
    }

    fn extract_labels(&self, document: &SearchableDocument) -> Result<Vec<String>> {
        Ok(self.analyzer.tokenize_all(document.values(Self::FIELD)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TableRecordBuilder;

    #[test]
    fn test_populate_order() {
        let record = TableRecordBuilder::new("table-1")
            .pg_title("Switzerland")
            .second_title("Largest cities")
            .caption("Population")
            .columns(&["City", "Population"])
            .row(&["Zurich", "415,367"])
            .row(&["Geneva", "201,818"])
            .build();

        let mut builder = DocumentBuilder::new();
        SingleField::new().populate(&record, &mut builder).unwrap();
        let doc = builder.build();

        assert_eq!(
            doc.values(SingleField::FIELD),
            [
                "Largest cities",
                "Population",
                "Switzerland",
                "City",
                "Population",
                "Zurich",
                "415,367",
                "Geneva",
                "201,818"
            ]
        );
    }

    #[test]
    fn test_labels_are_analyzed_values() {
        let record = TableRecordBuilder::new("table-1")
            .pg_title("The Kinks")
            .caption("Albums")
            .columns(&["Year"])
            .row(&["1969"])
            .build();
        let strategy = SingleField::new();
        let mut builder = DocumentBuilder::new();
        strategy.populate(&record, &mut builder).unwrap();
        let labels = strategy.extract_labels(&builder.build()).unwrap();
        assert_eq!(labels, vec!["album", "kink", "year", "1969"]);
    }

    #[test]
    fn test_parse_query_targets_field() {
        let query = SingleField::new().parse_query("swiss cities").unwrap();
        assert!(query
            .clauses
            .iter()
            .all(|c| c.field == SingleField::FIELD));
    }

    #[test]
    fn test_parse_query_error_is_invalid_query() {
        let err = SingleField::new().parse_query("\"open").unwrap_err();
        assert_eq!(err.class(), "invalid-query");
    }
}
