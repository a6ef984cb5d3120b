use crate::error::Result;
use crate::lookup::NameSet;
use crate::store::KeyValueStore;
use crate::utils;

const MANIFEST_FILE: &str = "manifest.bin";

/// What one ingestion run published, saved next to the store snapshots.
///
/// Lets a later process serve `index`/`search` without re-ingesting.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub artifact_url: String,
    pub entry_name: String,
    pub ingested_at: i64, // unix seconds
    pub generation: u64,
    pub id_field: String,
    pub schema: Vec<String>,
    pub names: NameSet,
}

impl Manifest {
    pub fn path<P: AsRef<std::path::Path>>(store_dir: P) -> std::path::PathBuf {
        store_dir.as_ref().join(MANIFEST_FILE)
    }
}

/// Serializes the manifest with bincode and writes it atomically.
pub fn save_manifest<P: AsRef<std::path::Path>>(store_dir: P, manifest: &Manifest) -> Result<()> {
    let data = bincode::serialize(manifest)?;
    utils::atomic_write(Manifest::path(store_dir), &data)?;
    Ok(())
}

/// Loads the manifest of the last successful run, if any.
pub fn load_manifest<P: AsRef<std::path::Path>>(store_dir: P) -> Result<Option<Manifest>> {
    let path = Manifest::path(store_dir);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    Ok(Some(bincode::deserialize(&data)?))
}

/// Picks the schema and Name Set to serve from `store`.
///
/// The manifest is used only when it describes the generation the store
/// currently publishes. Without one, or when they disagree (a run
/// committed records but died before saving its manifest), the Name Set
/// is rebuilt from the store's keys, sorted, and the schema is unknown.
pub fn resolve_names(store: &dyn KeyValueStore, manifest: Option<Manifest>) -> Result<(Vec<String>, NameSet)> {
    let current = store.generation();
    match manifest {
        Some(manifest) if manifest.generation == current => Ok((manifest.schema, manifest.names)),
        other => {
            if let Some(stale) = other {
                tracing::warn!(
                    manifest_generation = stale.generation,
                    store_generation = current,
                    "manifest does not match the store; serving store keys"
                );
            }
            let mut keys = store.keys()?;
            keys.sort();
            Ok((Vec::new(), NameSet::new(keys)))
        }
    }
}
