//! Thin serving surface over the lookup engine.
//!
//! Mirrors the two pages of the original web front end: `index(count)`
//! and `search(name)`. Output is a `render::View`; drawing it is left to a
//! `render::Renderer`.

use crate::error::Result;
use crate::lookup::LookupEngine;
use crate::render::View;

/// Result of a search request as the user sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Blank query; nothing was looked up.
    NoQuery,
    NoMatches { query: String },
    Matches(View),
}

pub struct Service {
    engine: LookupEngine,
    fields: Vec<String>,
    page_size: usize,
}

impl Service {
    /// # Arguments
    /// * `engine` - Lookup engine for the served generation.
    /// * `schema` - Header row of that generation.
    /// * `display_fields` - Wanted projection; fields absent from `schema`
    ///   are dropped, and an empty result falls back to the whole schema.
    /// * `page_size` - Default count for `index`.
    pub fn new(engine: LookupEngine, schema: &[String], display_fields: &[String], page_size: usize) -> Self {
        let mut fields: Vec<String> = display_fields
            .iter()
            .filter(|f| schema.is_empty() || schema.contains(f))
            .cloned()
            .collect();
        if fields.is_empty() {
            fields = schema.to_vec();
        }
        Service {
            engine,
            fields,
            page_size,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    fn view(&self, records: Vec<crate::csv_processor::Record>) -> View {
        View {
            fields: self.fields.clone(),
            record_count: records.len(),
            records,
        }
    }

    /// First `count` records of the Name Set (page size when `None`).
    pub fn index(&self, count: Option<usize>) -> Result<View> {
        self.page(0, count.unwrap_or(self.page_size))
    }

    pub fn page(&self, offset: usize, limit: usize) -> Result<View> {
        Ok(self.view(self.engine.page(offset, limit)?))
    }

    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome::NoQuery);
        }
        let records = self.engine.prefix_search(query)?;
        if records.is_empty() {
            return Ok(SearchOutcome::NoMatches {
                query: query.to_string(),
            });
        }
        Ok(SearchOutcome::Matches(self.view(records)))
    }
}
