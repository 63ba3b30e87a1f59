/// API credential sources
///
/// The generation lifecycle only asks two things of a store: whether a
/// credential is selected, and to run the selection flow. Backends read the
/// current credential per request, so a re-selected key is picked up by the
/// next call.
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Environment variables consulted for an API key, in order
pub const API_KEY_ENV_VARS: [&str; 3] = ["ARCHIVIST_API_KEY", "GEMINI_API_KEY", "API_KEY"];

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn has_selected_credential(&self) -> Result<bool>;

    /// Run the selection flow and wait for it to finish
    async fn open_credential_selector(&self) -> Result<()>;

    /// Currently selected credential, if any
    fn current(&self) -> Option<String>;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First non-blank API key among `API_KEY_ENV_VARS`
pub fn key_from_env() -> Option<String> {
    key_from_vars(&API_KEY_ENV_VARS)
}

fn key_from_vars(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| non_empty(std::env::var(name).ok()))
}

/// In-memory store. Selection installs the queued replacement key, if any,
/// and counts how often it ran.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    key: RwLock<Option<String>>,
    replacement: RwLock<Option<String>>,
    selector_calls: AtomicUsize,
}

impl StaticCredentialStore {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: RwLock::new(non_empty(key)),
            ..Self::default()
        }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self::new(Some(key.into()))
    }

    /// Key handed out the next time the selector runs
    pub fn with_replacement(self, key: impl Into<String>) -> Self {
        *self.replacement.write() = Some(key.into());
        self
    }

    pub fn selector_calls(&self) -> usize {
        self.selector_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn has_selected_credential(&self) -> Result<bool> {
        Ok(self.key.read().is_some())
    }

    async fn open_credential_selector(&self) -> Result<()> {
        self.selector_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = self.replacement.write().take() {
            *self.key.write() = Some(key);
        }
        Ok(())
    }

    fn current(&self) -> Option<String> {
        self.key.read().clone()
    }
}
