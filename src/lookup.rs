//! Read path: positional paging and prefix search over the Name Set.

use std::sync::Arc;

use crate::csv_processor::Record;
use crate::error::Result;
use crate::store::KeyValueStore;

/// Identifying names of one ingestion generation, in source row order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NameSet(Vec<String>);

impl NameSet {
    pub fn new(names: Vec<String>) -> Self {
        NameSet(names)
    }

    /// Collects `record[id_field]` from each record, skipping records
    /// that lack the field.
    pub fn from_records(records: &[Record], id_field: &str) -> Self {
        NameSet(
            records
                .iter()
                .filter_map(|r| r.get(id_field).cloned())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Records for `names[offset..offset + limit]`, in name order.
///
/// The window is clamped to `names`; a name missing from the store yields
/// an empty record in its slot.
pub fn page(store: &dyn KeyValueStore, names: &[String], offset: usize, limit: usize) -> Result<Vec<Record>> {
    names
        .iter()
        .skip(offset)
        .take(limit)
        .map(|name| store.get(name))
        .collect()
}

/// Names that start with `query` upper-cased, in scan order.
///
/// Stored names are compared as-is, so only upper-case names can match.
/// An empty query matches nothing.
pub fn matching_names<'a>(query: &str, names: &'a [String]) -> Vec<&'a String> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_uppercase();
    names.iter().filter(|name| name.starts_with(&needle)).collect()
}

/// Resolves every prefix match of `query` against the store.
pub fn prefix_search(store: &dyn KeyValueStore, query: &str, names: &[String]) -> Result<Vec<Record>> {
    let matches = matching_names(query, names);
    tracing::debug!(query = %query, matches = matches.len(), "prefix search");
    matches.into_iter().map(|name| store.get(name)).collect()
}

/// Store handle plus the Name Set it is served with.
#[derive(Clone)]
pub struct LookupEngine {
    store: Arc<dyn KeyValueStore>,
    names: Arc<NameSet>,
}

impl LookupEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, names: NameSet) -> Self {
        LookupEngine {
            store,
            names: Arc::new(names),
        }
    }

    pub fn names(&self) -> &NameSet {
        &self.names
    }

    pub fn page(&self, offset: usize, limit: usize) -> Result<Vec<Record>> {
        page(self.store.as_ref(), self.names.as_slice(), offset, limit)
    }

    pub fn prefix_search(&self, query: &str) -> Result<Vec<Record>> {
        prefix_search(self.store.as_ref(), query, self.names.as_slice())
    }
}
