use std::io::Read;

use crate::error::{BhavError, Result};

/// Upper bound on the deflate expansion ratio; an entry inflating past
/// `archive_len * MAX_INFLATE_RATIO` is corrupt.
const MAX_INFLATE_RATIO: u64 = 1032;

/// Where the pipeline gets its listing page and archive bytes from.
///
/// `Fetcher` is the HTTP implementation; tests plug in canned responses.
pub trait HttpSource {
    fn get_text(&self, url: &str) -> Result<String>;
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP client with a whole-request timeout.
pub struct Fetcher {
    client: reqwest::blocking::Client,
}

impl Fetcher {
    /// Builds the client.
    ///
    /// # Arguments
    /// * `timeout` - Applied to every request; expiry surfaces as `BhavError::Fetch`.
    /// * `user_agent` - Sent on every request (the source rejects empty agents).
    pub fn new(timeout: std::time::Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| BhavError::Config(format!("http client: {}", e)))?;
        Ok(Self::from_client(client))
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Fetcher { client }
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response> {
        self.client
            .get(url)
            .send()
            .map_err(|e| BhavError::fetch(url, e))?
            .error_for_status()
            .map_err(|e| BhavError::fetch(url, e))
    }
}

impl HttpSource for Fetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        tracing::info!(url = %url, "fetching listing page");
        self.send(url)?.text().map_err(|e| BhavError::fetch(url, e))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::info!(url = %url, "downloading archive");
        let body = self.send(url)?.bytes().map_err(|e| BhavError::fetch(url, e))?;
        tracing::info!(url = %url, bytes = body.len(), "archive downloaded");
        Ok(body.to_vec())
    }
}

/// Reads the only entry of a ZIP archive.
///
/// # Returns
/// * `(name, content)` - Entry name and its fully inflated UTF-8 text.
///
/// # Errors
/// * `BhavError::Archive` - corrupt archive, zero entries, more than one
///   entry, or an entry that is not valid UTF-8.
///
/// The size declared in the archive header is never trusted for
/// allocation; reading stops at the inflation bound.
pub fn extract_single(archive_bytes: &[u8]) -> Result<(String, String)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes))?;

    match archive.len() {
        0 => return Err(BhavError::Archive("archive has no entries".into())),
        1 => {}
        n => {
            let names: Vec<&str> = archive.file_names().collect();
            return Err(BhavError::Archive(format!(
                "expected exactly one entry, found {}: {}",
                n,
                names.join(", ")
            )));
        }
    }

    let mut entry = archive.by_index(0)?;
    let name = entry.name().to_string();
    let limit = (archive_bytes.len() as u64).saturating_mul(MAX_INFLATE_RATIO);
    let mut content = String::new();
    (&mut entry)
        .take(limit.saturating_add(1))
        .read_to_string(&mut content)
        .map_err(|e| BhavError::Archive(format!("reading `{}`: {}", name, e)))?;
    if content.len() as u64 > limit {
        return Err(BhavError::Archive(format!(
            "`{}` inflates beyond {} bytes",
            name, limit
        )));
    }

    tracing::info!(entry = %name, bytes = content.len(), "archive entry extracted");
    Ok((name, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn single_entry_is_returned_unmodified() {
        let csv = "SC_CODE,SC_NAME\n1,FOO BAR  \n";
        let bytes = build_zip(&[("EQ121218.CSV", csv.as_bytes())]);
        let (name, content) = extract_single(&bytes).unwrap();
        assert_eq!(name, "EQ121218.CSV");
        assert_eq!(content, csv);
    }

    #[test]
    fn empty_archive_is_rejected() {
        let bytes = build_zip(&[]);
        assert!(matches!(extract_single(&bytes), Err(BhavError::Archive(_))));
    }

    #[test]
    fn multi_entry_archive_is_rejected() {
        let bytes = build_zip(&[("a.csv", &b"x\n"[..]), ("b.csv", &b"y\n"[..])]);
        let err = extract_single(&bytes).unwrap_err();
        match err {
            BhavError::Archive(msg) => assert!(msg.contains("found 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(extract_single(b"not a zip at all"), Err(BhavError::Archive(_))));
    }

    #[test]
    fn non_utf8_entry_is_rejected() {
        let bytes = build_zip(&[("bin.csv", &[0xffu8, 0xfe, 0x00, 0xc3][..])]);
        assert!(matches!(extract_single(&bytes), Err(BhavError::Archive(_))));
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = 0xffff_ffffu32;
        for byte in data {
            crc ^= *byte as u32;
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xedb8_8320 & mask);
            }
        }
        !crc
    }

    /// One stored entry whose ZIP64 extra field declares `uncompressed` bytes.
    fn zip64_stored(name: &str, data: &[u8], uncompressed: u64) -> Vec<u8> {
        let crc = crc32(data);
        let mut extra = Vec::new();
        extra.extend_from_slice(&1u16.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&uncompressed.to_le_bytes());
        extra.extend_from_slice(&(data.len() as u64).to_le_bytes());

        let mut out = Vec::new();
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u32.to_le_bytes()); // time + date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&extra);
        out.extend_from_slice(data);

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes()); // made by
        out.extend_from_slice(&45u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment
        out.extend_from_slice(&0u16.to_le_bytes()); // disk
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&extra);
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn truthful_zip64_header_extracts() {
        let bytes = zip64_stored("a.csv", b"A\n1\n", 4);
        let (name, content) = extract_single(&bytes).unwrap();
        assert_eq!(name, "a.csv");
        assert_eq!(content, "A\n1\n");
    }

    #[test]
    fn huge_declared_size_does_not_panic() {
        let bytes = zip64_stored("a.csv", b"A\n1\n", u64::MAX);
        match extract_single(&bytes) {
            Ok((name, content)) => {
                assert_eq!(name, "a.csv");
                assert_eq!(content, "A\n1\n");
            }
            Err(BhavError::Archive(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    /// Serves one connection with `response` (or nothing, when `None`).
    fn one_shot_server(response: Option<&'static str>) -> String {
        use std::io::Read;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                match response {
                    Some(raw) => {
                        let _ = stream.write_all(raw.as_bytes());
                    }
                    None => std::thread::sleep(std::time::Duration::from_secs(3)),
                }
            }
        });
        format!("http://{}/EQ121218_CSV.ZIP", addr)
    }

    fn local_fetcher(timeout: std::time::Duration) -> Fetcher {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .unwrap();
        Fetcher::from_client(client)
    }

    #[test]
    fn non_2xx_status_is_fetch_error() {
        let url = one_shot_server(Some(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ));
        let err = local_fetcher(std::time::Duration::from_secs(5))
            .get_bytes(&url)
            .unwrap_err();
        match err {
            BhavError::Fetch { url: failed, message } => {
                assert_eq!(failed, url);
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn silent_server_times_out_as_fetch_error() {
        let url = one_shot_server(None);
        let err = local_fetcher(std::time::Duration::from_millis(200))
            .get_text(&url)
            .unwrap_err();
        assert!(matches!(err, BhavError::Fetch { .. }));
    }

    #[test]
    fn successful_response_returns_body() {
        let url = one_shot_server(Some(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        ));
        let body = local_fetcher(std::time::Duration::from_secs(5))
            .get_bytes(&url)
            .unwrap();
        assert_eq!(body, b"hello");
    }
}
