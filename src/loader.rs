use crate::csv_processor::Record;
use crate::error::{BhavError, Result};
use crate::store::KeyValueStore;

/// Builds a progress bar styled like the rest of the CLI output.
pub fn progress_bar(len: usize) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(len as u64);
    let style = indicatif::ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records",
    )
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar
}

/// Publishes every record under its identifying field, as one batch.
///
/// See `load_with_progress`.
pub fn load(store: &dyn KeyValueStore, records: &[Record], id_field: &str) -> Result<usize> {
    load_with_progress(store, records, id_field, &indicatif::ProgressBar::hidden())
}

/// Publishes every record under `record[id_field]` as a fresh generation.
///
/// All keys are validated before anything is submitted, so a rejected
/// batch leaves the store untouched. The committed generation holds
/// exactly these records; keys from earlier runs that are missing here
/// no longer resolve. Re-loading the same records is a no-op in effect.
///
/// # Arguments
/// * `store` - Target store.
/// * `records` - Normalized records of one ingestion run.
/// * `id_field` - Field whose value becomes the key.
/// * `progress` - Advanced once per staged record; abandoned on failure.
///
/// # Returns
/// * `Result<usize>` - Number of records written.
///
/// # Errors
/// * `BhavError::Store` - a record has no or an empty identifying value,
///   two records share a key, or the batch commit failed.
pub fn load_with_progress(
    store: &dyn KeyValueStore,
    records: &[Record],
    id_field: &str,
    progress: &indicatif::ProgressBar,
) -> Result<usize> {
    let result = stage(records, id_field, progress).and_then(|entries| {
        let count = entries.len();
        store.replace_all(entries)?;
        Ok(count)
    });

    match result {
        Ok(count) => {
            progress.finish_and_clear();
            tracing::info!(records = count, generation = store.generation(), "index loaded");
            Ok(count)
        }
        Err(e) => {
            progress.abandon();
            Err(e)
        }
    }
}

fn stage(records: &[Record], id_field: &str, progress: &indicatif::ProgressBar) -> Result<Vec<(String, Record)>> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    let mut entries = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let key = match record.get(id_field) {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(BhavError::Store(format!(
                    "record {} has an empty `{}` key",
                    i + 1,
                    id_field
                )));
            }
        };
        if !seen.insert(key.as_str()) {
            return Err(BhavError::Store(format!(
                "record {} repeats key `{}`",
                i + 1,
                key
            )));
        }
        entries.push((key.clone(), record.clone()));
        progress.inc(1);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(name: &str, close: &str) -> Record {
        [("SC_NAME", name), ("CLOSE", close)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_record_reads_back_exactly() {
        let store = MemoryStore::new();
        let records = vec![record("FOO BAR", "11"), record("BAZ", "5")];
        assert_eq!(load(&store, &records, "SC_NAME").unwrap(), 2);
        for r in &records {
            assert_eq!(&store.get(&r["SC_NAME"]).unwrap(), r);
        }
    }

    #[test]
    fn empty_key_rejects_whole_batch() {
        let store = MemoryStore::new();
        let records = vec![record("FOO", "1"), record("", "2")];
        assert!(matches!(load(&store, &records, "SC_NAME"), Err(BhavError::Store(_))));
        assert_eq!(store.len().unwrap(), 0);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn missing_key_field_is_rejected() {
        let store = MemoryStore::new();
        let records = vec![record("FOO", "1")];
        assert!(matches!(load(&store, &records, "SC_CODE"), Err(BhavError::Store(_))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let store = MemoryStore::new();
        let records = vec![record("FOO", "1"), record("FOO", "2")];
        let err = load(&store, &records, "SC_NAME").unwrap_err();
        match err {
            BhavError::Store(msg) => assert!(msg.contains("repeats key `FOO`")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn failed_load_abandons_progress() {
        let store = MemoryStore::new();
        let records = vec![record("FOO", "1"), record("FOO", "2")];
        let bar = indicatif::ProgressBar::hidden();
        assert!(load_with_progress(&store, &records, "SC_NAME", &bar).is_err());
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 1);
    }

    #[test]
    fn successful_load_finishes_progress() {
        let store = MemoryStore::new();
        let bar = indicatif::ProgressBar::hidden();
        load_with_progress(&store, &[record("FOO", "1")], "SC_NAME", &bar).unwrap();
        assert!(bar.is_finished());
    }

    #[test]
    fn smaller_reload_drops_missing_keys() {
        let store = MemoryStore::new();
        load(&store, &[record("AAA", "1"), record("DELISTED", "2")], "SC_NAME").unwrap();
        load(&store, &[record("AAA", "1")], "SC_NAME").unwrap();
        assert!(store.get("DELISTED").unwrap().is_empty());
        assert_eq!(store.keys().unwrap(), vec!["AAA"]);
    }

    #[test]
    fn reload_is_idempotent() {
        let store = MemoryStore::new();
        let records = vec![record("FOO", "1")];
        load(&store, &records, "SC_NAME").unwrap();
        load(&store, &records, "SC_NAME").unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get("FOO").unwrap(), records[0]);
    }
}
