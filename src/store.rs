//! Key-value stores holding one field map per identifying name.
//!
//! Both backends publish a batch as a new generation: the batch is applied
//! to a private copy and the shared pointer is swapped only after the copy
//! is complete (and, for `FileStore`, durable). Readers never observe a
//! half-applied batch, and a failed commit leaves the previous generation
//! in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::csv_processor::Record;
use crate::error::{BhavError, Result};
use crate::utils;

/// Persistent store interface used by the loader and the lookup engine.
pub trait KeyValueStore: Send + Sync {
    /// Applies every `(key, fields)` pair as one unit. Each value fully
    /// replaces whatever was stored under its key.
    fn upsert_batch(&self, entries: Vec<(String, Record)>) -> Result<()>;

    /// Publishes a generation holding exactly `entries`. Keys missing from
    /// the batch are gone once it commits; on failure nothing changes.
    fn replace_all(&self, entries: Vec<(String, Record)>) -> Result<()>;

    /// Field map stored under `key`; empty when the key is absent.
    fn get(&self, key: &str) -> Result<Record>;

    /// All keys of the current generation, unordered.
    fn keys(&self) -> Result<Vec<String>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of successful batch commits behind the current contents.
    fn generation(&self) -> u64;
}

/// Contents of one published generation.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    generation: u64,
    entries: HashMap<String, Record>,
}

impl Snapshot {
    fn next(&self, batch: Vec<(String, Record)>) -> Snapshot {
        let mut entries = self.entries.clone();
        entries.extend(batch);
        Snapshot {
            generation: self.generation + 1,
            entries,
        }
    }

    fn replaced(&self, batch: Vec<(String, Record)>) -> Snapshot {
        Snapshot {
            generation: self.generation + 1,
            entries: batch.into_iter().collect(),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> BhavError {
    BhavError::store("store lock poisoned")
}

/// Shared current-generation pointer plus a single-writer guard.
#[derive(Default)]
struct Generations {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl Generations {
    fn new(snapshot: Snapshot) -> Self {
        Generations {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    fn current(&self) -> Result<Arc<Snapshot>> {
        Ok(Arc::clone(&*self.current.read().map_err(poisoned)?))
    }

    fn publish(&self, snapshot: Snapshot) -> Result<()> {
        *self.current.write().map_err(poisoned)? = Arc::new(snapshot);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Record> {
        Ok(self.current()?.entries.get(key).cloned().unwrap_or_default())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.current()?.entries.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.current()?.entries.len())
    }

    fn generation(&self) -> u64 {
        self.current().map(|s| s.generation).unwrap_or_default()
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    generations: Generations,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&self, build: impl FnOnce(&Snapshot) -> Snapshot) -> Result<()> {
        let _writer = self.generations.writer.lock().map_err(poisoned)?;
        let next = build(&*self.generations.current()?);
        self.generations.publish(next)
    }
}

impl KeyValueStore for MemoryStore {
    fn upsert_batch(&self, entries: Vec<(String, Record)>) -> Result<()> {
        self.commit(|current| current.next(entries))
    }

    fn replace_all(&self, entries: Vec<(String, Record)>) -> Result<()> {
        self.commit(|current| current.replaced(entries))
    }

    fn get(&self, key: &str) -> Result<Record> {
        self.generations.get(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.generations.keys()
    }

    fn len(&self) -> Result<usize> {
        self.generations.len()
    }

    fn generation(&self) -> u64 {
        self.generations.generation()
    }
}

const CURRENT_FILE: &str = "CURRENT";
const GENERATION_PREFIX: &str = "generation-";
const GENERATION_EXT: &str = ".idx";
/// Published generations kept on disk, newest first.
const KEEP_GENERATIONS: u64 = 2;

/// Directory-backed store.
///
/// Layout:
/// * `generation-NNNNNN.idx` - bincode snapshot of one generation.
/// * `CURRENT` - decimal number of the generation to serve.
///
/// A commit writes the next snapshot, then rewrites `CURRENT`, then swaps
/// the in-memory pointer. Both file writes go through `utils::atomic_write`.
pub struct FileStore {
    dir: std::path::PathBuf,
    generations: Generations,
}

impl FileStore {
    /// Opens (or creates) a store directory and maps its current generation.
    ///
    /// # Errors
    /// * `BhavError::Io` - the directory or snapshot cannot be read.
    /// * `BhavError::Store` - `CURRENT` or the snapshot is corrupt.
    pub fn open<P: AsRef<std::path::Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let pointer = dir.join(CURRENT_FILE);
        let snapshot = if pointer.exists() {
            let raw = std::fs::read_to_string(&pointer)?;
            let generation: u64 = raw
                .trim()
                .parse()
                .map_err(|e| BhavError::store(format!("corrupt {} pointer `{}`: {}", CURRENT_FILE, raw.trim(), e)))?;
            Self::read_snapshot(&Self::generation_path(&dir, generation))?
        } else {
            Snapshot::default()
        };

        tracing::info!(
            dir = %dir.display(),
            generation = snapshot.generation,
            keys = snapshot.entries.len(),
            "store opened"
        );
        Ok(FileStore {
            dir,
            generations: Generations::new(snapshot),
        })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn generation_path(dir: &std::path::Path, generation: u64) -> std::path::PathBuf {
        dir.join(format!("{}{:06}{}", GENERATION_PREFIX, generation, GENERATION_EXT))
    }

    fn read_snapshot(path: &std::path::Path) -> Result<Snapshot> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let snapshot = bincode::deserialize(&mmap)?;
        Ok(snapshot)
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let data = bincode::serialize(snapshot)?;
        let path = Self::generation_path(&self.dir, snapshot.generation);
        utils::atomic_write(&path, &data)
            .map_err(|e| BhavError::store(format!("writing {}: {}", path.display(), e)))?;
        utils::atomic_write(self.dir.join(CURRENT_FILE), snapshot.generation.to_string().as_bytes())
            .map_err(|e| BhavError::store(format!("publishing generation {}: {}", snapshot.generation, e)))
    }

    /// Removes snapshots older than the newest `KEEP_GENERATIONS`.
    fn prune(&self, current: u64) {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let Some(generation) = name
                .to_str()
                .and_then(|n| n.strip_prefix(GENERATION_PREFIX))
                .and_then(|n| n.strip_suffix(GENERATION_EXT))
                .and_then(|n| n.parse::<u64>().ok())
            else {
                continue;
            };
            if generation + KEEP_GENERATIONS <= current {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    tracing::warn!(generation, error = %e, "failed to prune old generation");
                }
            }
        }
    }

    fn commit(&self, build: impl FnOnce(&Snapshot) -> Snapshot) -> Result<()> {
        let _writer = self.generations.writer.lock().map_err(poisoned)?;
        let next = build(&*self.generations.current()?);
        let generation = next.generation;

        self.write_snapshot(&next)?;
        self.generations.publish(next)?;
        tracing::info!(generation, "generation published");

        self.prune(generation);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn upsert_batch(&self, entries: Vec<(String, Record)>) -> Result<()> {
        self.commit(|current| current.next(entries))
    }

    fn replace_all(&self, entries: Vec<(String, Record)>) -> Result<()> {
        self.commit(|current| current.replaced(entries))
    }

    fn get(&self, key: &str) -> Result<Record> {
        self.generations.get(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.generations.keys()
    }

    fn len(&self) -> Result<usize> {
        self.generations.len()
    }

    fn generation(&self) -> u64 {
        self.generations.generation()
    }
}
