/// Default listing page that publishes the daily equity archive.
pub const DEFAULT_LISTING_URL: &str = "https://www.bseindia.com/markets/MarketInfo/BhavCopy.aspx";

/// Field used as the store key.
pub const DEFAULT_ID_FIELD: &str = "SC_NAME";

/// Fields shown by the renderer, in display order.
pub const DEFAULT_DISPLAY_FIELDS: [&str; 6] = ["SC_CODE", "SC_NAME", "OPEN", "HIGH", "LOW", "CLOSE"];

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_STORE_DIR: &str = "bhav-store";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration shared by the pipeline and the serving layer.
///
/// Built from CLI arguments (see `cli::Args::into_config`); `Default`
/// gives the values used when nothing is overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listing_url: String,
    /// Direct artifact URL; skips the locator when set.
    pub artifact_url: Option<String>,
    pub artifact_prefix: String,
    pub artifact_suffix: String,
    pub id_field: String,
    pub display_fields: Vec<String>,
    pub page_size: usize,
    pub store_dir: std::path::PathBuf,
    pub timeout: std::time::Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            artifact_url: None,
            artifact_prefix: "EQ".to_string(),
            artifact_suffix: "_CSV.ZIP".to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            display_fields: DEFAULT_DISPLAY_FIELDS.iter().map(|f| f.to_string()).collect(),
            page_size: DEFAULT_PAGE_SIZE,
            store_dir: std::path::PathBuf::from(DEFAULT_STORE_DIR),
            timeout: std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("bhav-index/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.id_field.trim().is_empty() {
            return Err(crate::error::BhavError::Config("identifying field must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(crate::error::BhavError::Config("page size must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(crate::error::BhavError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}
