//! Error taxonomy for the ingestion and lookup paths.
//!
//! Every ingestion variant is fatal to the run that raised it. Lookup code
//! only surfaces `Store` and `Io`; absent keys are not errors.

use thiserror::Error;

/// Top-level error for every operation in the crate.
#[derive(Error, Debug)]
pub enum BhavError {
    /// No hyperlink on the listing page matched the expected artifact name.
    #[error("no artifact link matches pattern `{pattern}`")]
    NotFound { pattern: String },

    /// Network failure, timeout or non-2xx response.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Empty, corrupt or multi-entry archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// Row/schema field-count mismatch or malformed delimited text.
    #[error("parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    /// Invalid key or failed batch commit.
    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BhavError {
    pub fn fetch(url: &str, err: impl std::fmt::Display) -> Self {
        BhavError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        BhavError::Store(err.to_string())
    }
}

impl From<zip::result::ZipError> for BhavError {
    fn from(err: zip::result::ZipError) -> Self {
        BhavError::Archive(err.to_string())
    }
}

impl From<bincode::Error> for BhavError {
    fn from(err: bincode::Error) -> Self {
        BhavError::Store(format!("snapshot encoding: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, BhavError>;
