//! Terminal presentation: key prompt and job progress bar

use anyhow::{Context, Result};
use archivist::{key_from_env, CredentialStore, GenerationJob, GenerationStatus};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

/// Credential store that asks for a key on stdin when none is selected
pub struct TerminalCredentialStore {
    key: RwLock<Option<String>>,
}

impl TerminalCredentialStore {
    /// Seed from an explicit key, falling back to the environment
    pub fn new(explicit: Option<String>) -> Self {
        let key = explicit
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(key_from_env);
        Self {
            key: RwLock::new(key),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for TerminalCredentialStore {
    async fn has_selected_credential(&self) -> Result<bool> {
        Ok(self.key.read().is_some())
    }

    async fn open_credential_selector(&self) -> Result<()> {
        let mut stderr = tokio::io::stderr();
        stderr.write_all(b"Enter API key: ").await?;
        stderr.flush().await?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("reading API key")?;
        let key = line.trim();
        if key.is_empty() {
            anyhow::bail!("no API key entered");
        }
        *self.key.write() = Some(key.to_string());
        Ok(())
    }

    fn current(&self) -> Option<String> {
        self.key.read().clone()
    }
}

/// The bar stays off screen while the credential prompt may be reading stdin
fn bar_visible(status: GenerationStatus) -> bool {
    !matches!(
        status,
        GenerationStatus::Idle | GenerationStatus::CheckingCredential
    )
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    bar
}

/// Draw job snapshots until the job reaches a terminal state
pub async fn render_progress(mut rx: watch::Receiver<GenerationJob>) {
    let mut bar: Option<ProgressBar> = None;

    while rx.changed().await.is_ok() {
        let job = rx.borrow_and_update().clone();
        if !bar_visible(job.status()) {
            continue;
        }
        let bar = bar.get_or_insert_with(new_bar);
        bar.set_position(job.progress() as u64);
        bar.set_message(job.message().to_string());
        match job.status() {
            GenerationStatus::Completed => {
                bar.finish_with_message(job.message().to_string());
                return;
            }
            GenerationStatus::Error => {
                bar.abandon_with_message(format!(
                    "{}: {}",
                    job.message(),
                    job.error().unwrap_or_default()
                ));
                return;
            }
            _ => {}
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}
