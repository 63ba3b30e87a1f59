/// Generation service backends
///
/// Provides a unified interface for the external video service:
/// - Gemini API (Veo long-running operations)
/// - Scripted in-process mock
pub mod gemini;
pub mod mock;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use gemini::GeminiBackend;
pub use mock::{MockConfig, MockVideoBackend};

use crate::captioning::{CaptionProvider, SimpleCaptioner};
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::job::JobHandle;
use crate::request::VideoRequest;

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini API
    #[default]
    Gemini,
    /// In-process scripted backend
    Mock,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// External video generation service
#[async_trait::async_trait]
pub trait VideoBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Backend type
    fn backend_type(&self) -> BackendType;

    /// Check if backend is reachable with the current credential
    async fn is_available(&self) -> Result<bool>;

    /// Create a video job; the returned handle is normally not done yet
    async fn submit(&self, request: &VideoRequest) -> Result<JobHandle>;

    /// Query the job again, yielding a fresh handle
    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle>;

    /// Retrieve the finished video from its locator
    async fn fetch_asset(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Backend factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create the video backend selected in `config`
    pub fn video(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Arc<dyn VideoBackend>> {
        match config.backend_type {
            BackendType::Gemini => Ok(Arc::new(GeminiBackend::new(config, credentials)?)),
            BackendType::Mock => Ok(Arc::new(MockVideoBackend::new(MockConfig::default()))),
        }
    }

    /// Create the captioning provider matching `config`
    pub fn captioner(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Arc<dyn CaptionProvider>> {
        match config.backend_type {
            BackendType::Gemini => Ok(Arc::new(GeminiBackend::new(config, credentials)?)),
            BackendType::Mock => Ok(Arc::new(SimpleCaptioner::new(
                mock::MOCK_CAPTION.to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialStore;

    #[test]
    fn test_backend_type_display() {
        assert_eq!(BackendType::Gemini.to_string(), "gemini");
        assert_eq!(BackendType::Mock.to_string(), "mock");
        assert_eq!("MOCK".parse::<BackendType>().unwrap(), BackendType::Mock);
        assert!("replicate".parse::<BackendType>().is_err());
    }

    #[test]
    fn test_factory_selects_backend() {
        let credentials: Arc<dyn CredentialStore> = Arc::new(StaticCredentialStore::with_key("k"));
        let config = AppConfig::default().with_backend(BackendType::Mock);
        let backend = BackendFactory::video(&config, credentials.clone()).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Mock);

        let config = AppConfig::default();
        let backend = BackendFactory::video(&config, credentials.clone()).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Gemini);
        assert_eq!(
            BackendFactory::captioner(&config, credentials).unwrap().name(),
            "gemini"
        );
    }
}
