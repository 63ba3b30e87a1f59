/// Application configuration
///
/// Stored as JSON. The API key is never written here; it comes from a
/// `CredentialStore`.
use crate::backends::gemini::GEMINI_API_BASE;
use crate::backends::BackendType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const DEFAULT_CAPTION_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 8;
pub const DEFAULT_MAX_WAIT_SECS: u64 = 15 * 60;

/// Environment override for `api_base`
pub const API_BASE_ENV: &str = "ARCHIVIST_API_BASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend type
    pub backend_type: BackendType,

    /// API endpoint base URL
    pub api_base: String,

    /// Model used for video jobs
    pub video_model: String,

    /// Model used for frame analysis
    pub caption_model: String,

    /// Delay between status queries
    pub poll_interval_secs: u64,

    /// Wall-clock budget for one job; `None` polls until the service answers
    pub max_wait_secs: Option<u64>,

    /// Per-request HTTP timeout
    pub request_timeout_secs: Option<u64>,

    /// Where finished videos are written by default
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_type: BackendType::Gemini,
            api_base: GEMINI_API_BASE.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            caption_model: DEFAULT_CAPTION_MODEL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_wait_secs: Some(DEFAULT_MAX_WAIT_SECS),
            request_timeout_secs: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// With backend type
    pub fn with_backend(mut self, backend_type: BackendType) -> Self {
        self.backend_type = backend_type;
        self
    }

    /// With API base URL
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn with_max_wait(mut self, secs: Option<u64>) -> Self {
        self.max_wait_secs = secs;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Apply environment overrides
    pub fn apply_env(mut self) -> Self {
        if let Some(base) = std::env::var(API_BASE_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            self.api_base = base;
        }
        self
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, else defaults; then apply the environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.apply_env())
    }
}
