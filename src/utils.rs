use chrono::TimeZone;

/// Configures a custom Rayon thread pool with specified size.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Parses a `%Y-%m-%d` date, as accepted by `--date`.
pub fn parse_date(date_str: &str) -> anyhow::Result<chrono::NaiveDate> {
    let date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date `{}`: {}", date_str, e))?;
    Ok(date)
}

/// Formats Unix timestamp into readable string: YYYY-MM-DD HH:MM:SS (UTC).
pub fn format_timestamp(ts: i64) -> String {
    match chrono::Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{}", ts),
    }
}

/// Writes `data` to `path` via a sibling temp file, fsync and rename.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn atomic_write<P: AsRef<std::path::Path>>(path: P, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let path = path.as_ref();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        let date = parse_date("2018-12-12").unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2018, 12, 12).unwrap());
        assert!(parse_date("12/12/2018").is_err());
    }

    #[test]
    fn formats_epoch() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("CURRENT");
        atomic_write(&path, b"1").unwrap();
        atomic_write(&path, b"2").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"2");
        assert!(!dir.path().join("CURRENT.tmp").exists());
    }
}
