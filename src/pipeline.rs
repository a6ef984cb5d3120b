use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{self, HttpSource};
use crate::index::Manifest;
use crate::locator::{self, ArtifactPattern};
use crate::lookup::NameSet;
use crate::store::KeyValueStore;
use crate::{csv_processor, loader, normalize};

/// Outcome of one successful ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub artifact_url: String,
    pub entry_name: String,
    pub schema: Vec<String>,
    pub names: NameSet,
    pub loaded: usize,
    pub generation: u64,
}

impl IngestReport {
    pub fn manifest(&self, id_field: &str, ingested_at: chrono::DateTime<chrono::Utc>) -> Manifest {
        Manifest {
            artifact_url: self.artifact_url.clone(),
            entry_name: self.entry_name.clone(),
            ingested_at: ingested_at.timestamp(),
            generation: self.generation,
            id_field: id_field.to_string(),
            schema: self.schema.clone(),
            names: self.names.clone(),
        }
    }
}

/// Ingestion driver: locate, fetch, extract, parse, normalize, load.
///
/// Runs sequentially and stops at the first error; the store is only
/// touched by the final batch commit, so a failed run leaves the previous
/// generation servable.
pub struct Pipeline<'a> {
    source: &'a dyn HttpSource,
    store: &'a dyn KeyValueStore,
    config: &'a Config,
    show_progress: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn HttpSource, store: &'a dyn KeyValueStore, config: &'a Config) -> Self {
        Pipeline {
            source,
            store,
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Artifact URL for the period containing `date`.
    ///
    /// A configured direct URL short-circuits the listing page.
    pub fn resolve_artifact(&self, date: chrono::NaiveDate) -> Result<String> {
        if let Some(url) = &self.config.artifact_url {
            tracing::info!(url = %url, "using configured artifact url");
            return Ok(url.clone());
        }
        let pattern = ArtifactPattern::for_period(&self.config.artifact_prefix, &self.config.artifact_suffix, date)?;
        let html = self.source.get_text(&self.config.listing_url)?;
        let url = locator::locate_in_html(&html, &pattern)?;
        tracing::info!(url = %url, pattern = pattern.as_str(), "artifact located");
        Ok(url)
    }

    /// Runs every ingestion step for the period containing `date`.
    ///
    /// # Errors
    /// * Any `BhavError` raised by a step; nothing is retried here.
    pub fn run(&self, date: chrono::NaiveDate) -> Result<IngestReport> {
        self.config.validate()?;

        let artifact_url = self.resolve_artifact(date)?;
        let archive = self.source.get_bytes(&artifact_url)?;
        let (entry_name, content) = fetcher::extract_single(&archive)?;

        let table = csv_processor::parse(&content)?;
        let records = normalize::normalize(table.records, &self.config.id_field);

        let progress = if self.show_progress {
            loader::progress_bar(records.len())
        } else {
            indicatif::ProgressBar::hidden()
        };
        let loaded = loader::load_with_progress(self.store, &records, &self.config.id_field, &progress)?;
        let names = NameSet::from_records(&records, &self.config.id_field);

        tracing::info!(
            artifact = %artifact_url,
            entry = %entry_name,
            records = loaded,
            generation = self.store.generation(),
            "ingestion finished"
        );
        Ok(IngestReport {
            artifact_url,
            entry_name,
            schema: table.schema,
            names,
            loaded,
            generation: self.store.generation(),
        })
    }
}
