// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! One field per table part. Not built yet: every operation fails fast, so
//! selecting it is caught on the first index or search instead of producing
//! empty documents.

use super::TableStrategy;
use crate::error::{Error, Result};
use crate::query::StructuredQuery;
use crate::types::{DocumentBuilder, SearchableDocument, TableRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiField;

impl MultiField {
    pub const NAME: &'static str = "multiField";
}

impl TableStrategy for MultiField {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn populate(&self, _record: &TableRecord, _builder: &mut DocumentBuilder) -> Result<()> {
        Err(Error::NotImplemented("multiField document population"))
    }

    fn parse_query(&self, _text: &str) -> Result<StructuredQuery> {
        Err(Error::NotImplemented("multiField query parsing"))
    }

    fn extract_labels(&self, _document: &SearchableDocument) -> Result<Vec<String>> {
        Err(Error::NotImplemented("multiField label extraction"))
    }
}
