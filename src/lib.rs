//! Daily equity bhavcopy ingestion and prefix lookup.
//!
//! Ingestion: `locator` → `fetcher` → `csv_processor` → `normalize` →
//! `loader`, driven by `pipeline`. Reads: `lookup`, wrapped by `serving`.

pub mod config;
pub mod csv_processor;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod loader;
pub mod locator;
pub mod lookup;
pub mod normalize;
pub mod pipeline;
pub mod render;
pub mod serving;
pub mod store;
pub mod utils;

pub use csv_processor::{Record, Table};
pub use error::{BhavError, Result};
pub use lookup::{LookupEngine, NameSet};
pub use store::{FileStore, KeyValueStore, MemoryStore};
