/// Generation job state and remote job handles
///
/// A single `GenerationJob` exists at a time. Its fields are private so
/// the transitions below are the only way to change it:
/// - result present only while `Completed`
/// - error present only while `Error`
/// - progress never decreases while `Generating`
use crate::asset::VideoAsset;
use crate::styles::LOADING_MESSAGES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const CHECKING_CREDENTIAL_MESSAGE: &str = "Checking permissions...";
pub const COMPLETED_MESSAGE: &str = "Restoration complete!";
pub const FAILED_MESSAGE: &str = "Restoration failed";

const CHECKING_CREDENTIAL_PROGRESS: u8 = 10;
const GENERATING_BASE_PROGRESS: u8 = 20;
const PROGRESS_PER_POLL: u32 = 5;
const PROGRESS_CEILING: u8 = 95;

/// Synthetic progress estimate for a poll count.
///
/// This is a placeholder ramp, not a remote progress signal: the service
/// reports only done/not done.
pub fn estimated_progress(poll_count: u32) -> u8 {
    let value = PROGRESS_PER_POLL
        .saturating_mul(poll_count)
        .saturating_add(GENERATING_BASE_PROGRESS as u32);
    value.min(PROGRESS_CEILING as u32) as u8
}

/// Index into a message list of length `len`, advancing every two polls
pub fn status_message_index(poll_count: u32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (poll_count / 2) as usize % len
}

pub fn status_message(poll_count: u32) -> &'static str {
    LOADING_MESSAGES[status_message_index(poll_count, LOADING_MESSAGES.len())]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStatus {
    Idle,
    CheckingCredential,
    Generating,
    Completed,
    Error,
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::CheckingCredential => write!(f, "checking-credential"),
            Self::Generating => write!(f, "generating"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    status: GenerationStatus,
    message: String,
    progress: u8,
    result: Option<Arc<VideoAsset>>,
    error: Option<String>,
}

impl Default for GenerationJob {
    fn default() -> Self {
        Self::idle()
    }
}

impl GenerationJob {
    pub fn idle() -> Self {
        Self {
            status: GenerationStatus::Idle,
            message: String::new(),
            progress: 0,
            result: None,
            error: None,
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&Arc<VideoAsset>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == GenerationStatus::Idle
    }

    pub fn begin_credential_check(&mut self) {
        *self = Self {
            status: GenerationStatus::CheckingCredential,
            message: CHECKING_CREDENTIAL_MESSAGE.to_string(),
            progress: CHECKING_CREDENTIAL_PROGRESS,
            result: None,
            error: None,
        };
    }

    pub fn begin_generating(&mut self) {
        self.status = GenerationStatus::Generating;
        self.message = status_message(0).to_string();
        self.progress = self.progress.max(GENERATING_BASE_PROGRESS);
    }

    /// Advance message and progress for the given poll iteration
    pub fn record_poll(&mut self, poll_count: u32) {
        if self.status != GenerationStatus::Generating {
            return;
        }
        self.message = status_message(poll_count).to_string();
        self.progress = self.progress.max(estimated_progress(poll_count));
    }

    pub fn complete(&mut self, asset: Arc<VideoAsset>) {
        *self = Self {
            status: GenerationStatus::Completed,
            message: COMPLETED_MESSAGE.to_string(),
            progress: 100,
            result: Some(asset),
            error: None,
        };
    }

    pub fn fail(&mut self, description: impl Into<String>) {
        *self = Self {
            status: GenerationStatus::Error,
            message: FAILED_MESSAGE.to_string(),
            progress: 0,
            result: None,
            error: Some(description.into()),
        };
    }

    pub fn reset(&mut self) {
        *self = Self::idle();
    }
}

/// Error object reported by the remote service on a finished operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: Option<i32>,
    pub message: String,
}

/// Opaque handle to a remote generation job.
///
/// Treated as a value: each status query yields a new handle that replaces
/// the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub name: String,
    pub done: bool,
    pub result_uri: Option<String>,
    pub error: Option<RemoteError>,
}

impl JobHandle {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            result_uri: None,
            error: None,
        }
    }

    pub fn finished(name: impl Into<String>, result_uri: Option<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            result_uri,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> Arc<VideoAsset> {
        Arc::new(VideoAsset::new(
            vec![0, 1, 2],
            "video/mp4",
            "https://example.test/v",
            "noir-detective",
        ))
    }

    #[test]
    fn test_progress_ramp() {
        assert_eq!(estimated_progress(0), 20);
        assert_eq!(estimated_progress(1), 25);
        assert_eq!(estimated_progress(15), 95);
        assert_eq!(estimated_progress(16), 95);
        assert_eq!(estimated_progress(u32::MAX), 95);

        let mut last = 0;
        for poll in 0..100 {
            let progress = estimated_progress(poll);
            assert!(progress >= last);
            assert!(progress <= 95);
            last = progress;
        }
    }

    #[test]
    fn test_message_index_cycles() {
        let expected = [0, 1, 1, 2, 2];
        for (poll, want) in (1..=5).zip(expected) {
            assert_eq!(status_message_index(poll, 8), want);
        }
        assert_eq!(status_message_index(5, 2), 0);
        assert_eq!(status_message_index(16, 8), 0);
        assert_eq!(status_message_index(3, 0), 0);
        assert_eq!(status_message(0), LOADING_MESSAGES[0]);
    }

    #[test]
    fn test_lifecycle_invariants() {
        let mut job = GenerationJob::idle();
        assert!(job.is_idle());
        assert_eq!(job.progress(), 0);

        job.begin_credential_check();
        assert_eq!(job.status(), GenerationStatus::CheckingCredential);
        assert_eq!(job.message(), CHECKING_CREDENTIAL_MESSAGE);

        job.begin_generating();
        assert_eq!(job.status(), GenerationStatus::Generating);
        assert_eq!(job.progress(), 20);

        job.record_poll(3);
        assert_eq!(job.progress(), 35);
        // never moves backwards
        job.record_poll(1);
        assert_eq!(job.progress(), 35);

        job.complete(asset());
        assert_eq!(job.status(), GenerationStatus::Completed);
        assert_eq!(job.progress(), 100);
        assert!(job.result().is_some());
        assert!(job.error().is_none());

        job.fail("boom");
        assert_eq!(job.status(), GenerationStatus::Error);
        assert_eq!(job.progress(), 0);
        assert!(job.result().is_none());
        assert_eq!(job.error(), Some("boom"));
        assert_eq!(job.message(), FAILED_MESSAGE);

        job.reset();
        assert_eq!(job, GenerationJob::idle());
    }

    #[test]
    fn test_record_poll_ignored_outside_generating() {
        let mut job = GenerationJob::idle();
        job.record_poll(4);
        assert_eq!(job.progress(), 0);
        assert!(job.message().is_empty());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(GenerationStatus::CheckingCredential.to_string(), "checking-credential");
        assert!(GenerationStatus::Error.is_terminal());
        assert!(!GenerationStatus::Generating.is_terminal());
    }
}
