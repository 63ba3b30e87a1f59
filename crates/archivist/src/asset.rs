/// Downloaded video results
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Suggested download name: `archivist-{style}-{unix millis}.mp4`
pub fn suggested_filename(style_id: &str, timestamp_millis: i64) -> String {
    format!("archivist-{}-{}.mp4", style_id, timestamp_millis)
}

/// A finished video held in memory
#[derive(Clone, PartialEq, Eq)]
pub struct VideoAsset {
    bytes: Vec<u8>,
    content_type: String,
    source_uri: String,
    filename: String,
}

impl VideoAsset {
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        source_uri: impl Into<String>,
        style_id: &str,
    ) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            source_uri: source_uri.into(),
            filename: suggested_filename(style_id, chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Remote locator the bytes were fetched from
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Write the video to `dest`. A directory receives the suggested filename.
    pub fn save_to(&self, dest: &Path) -> Result<PathBuf> {
        let path = if dest.is_dir() {
            dest.join(&self.filename)
        } else {
            if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            dest.to_path_buf()
        };
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("writing video to {}", path.display()))?;
        tracing::info!("Saved {} bytes to {:?}", self.bytes.len(), path);
        Ok(path)
    }
}

impl fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoAsset")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .field("filename", &self.filename)
            .finish()
    }
}
