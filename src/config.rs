//! Runtime configuration
//!
//! Platform endpoints and downloader settings. Defaults carry the values the
//! platform expects; the CLI overrides the downloader side.

use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the platform's internal API
pub const DEFAULT_API_BASE_URL: &str = "https://platform-api.tver.jp";

/// Base URL of the public website, used to build episode playback URLs
pub const DEFAULT_WEB_BASE_URL: &str = "https://tver.jp";

/// The platform rejects requests without a recognizable desktop browser agent
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Per-request timeout for platform API calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default directory for downloaded media and artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Settings for talking to the platform API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// API base URL, without trailing slash
    pub api_base_url: String,
    /// Website base URL, without trailing slash
    pub web_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            web_base_url: DEFAULT_WEB_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PlatformConfig {
    /// Returns a copy pointing at a different API host
    ///
    /// Used to redirect the client to a local mock server in tests.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Settings for the external yt-dlp process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Program name or path of the yt-dlp executable
    pub program: PathBuf,
    /// Directory downloads and info files are written to
    pub output_dir: PathBuf,
    /// Arguments passed to every download invocation before `-o`
    pub options: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            options: vec![
                // Parallel fragment downloads
                "-N".to_string(),
                "10".to_string(),
                "--write-info-json".to_string(),
            ],
        }
    }
}
