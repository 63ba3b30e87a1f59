/// Scripted in-process backend
///
/// Finishes after a configured number of polls and records every request,
/// so the lifecycle can run without network access.
use super::{BackendType, VideoBackend};
use crate::job::{JobHandle, RemoteError};
use crate::request::VideoRequest;
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;

pub const MOCK_RESULT_URI: &str = "mock://archivist/video.mp4";
pub const MOCK_CAPTION: &str = "A quiet street at dusk with a tram passing under gas lamps.";

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Poll on which the job reports done (1 = first poll)
    pub polls_until_done: u32,

    /// Locator carried by the finished handle; `None` simulates a missing result
    pub result_uri: Option<String>,

    /// Remote error attached to the finished handle
    pub remote_error: Option<String>,

    /// Bytes served by `fetch_asset`
    pub asset_bytes: Vec<u8>,

    pub submit_error: Option<String>,

    /// Errors returned by successive polls before normal behavior resumes
    pub poll_errors: VecDeque<String>,

    pub fetch_error: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            polls_until_done: 2,
            result_uri: Some(MOCK_RESULT_URI.to_string()),
            remote_error: None,
            asset_bytes: b"\x00\x00\x00\x18ftypmp42mock-archivist-video".to_vec(),
            submit_error: None,
            poll_errors: VecDeque::new(),
            fetch_error: None,
        }
    }
}

impl MockConfig {
    pub fn with_polls_until_done(mut self, polls: u32) -> Self {
        self.polls_until_done = polls;
        self
    }

    pub fn without_result(mut self) -> Self {
        self.result_uri = None;
        self
    }

    pub fn with_remote_error(mut self, message: impl Into<String>) -> Self {
        self.remote_error = Some(message.into());
        self
    }

    pub fn with_submit_error(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    pub fn with_poll_error(mut self, message: impl Into<String>) -> Self {
        self.poll_errors.push_back(message.into());
        self
    }

    pub fn with_fetch_error(mut self, message: impl Into<String>) -> Self {
        self.fetch_error = Some(message.into());
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    requests: Vec<VideoRequest>,
    polls: u32,
    fetches: Vec<String>,
    poll_errors: VecDeque<String>,
}

pub struct MockVideoBackend {
    config: MockConfig,
    state: Mutex<MockState>,
}

impl MockVideoBackend {
    pub fn new(config: MockConfig) -> Self {
        let state = MockState {
            poll_errors: config.poll_errors.clone(),
            ..MockState::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Requests submitted so far
    pub fn requests(&self) -> Vec<VideoRequest> {
        self.state.lock().requests.clone()
    }

    pub fn poll_count(&self) -> u32 {
        self.state.lock().polls
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().fetches.clone()
    }
}

#[async_trait::async_trait]
impl VideoBackend for MockVideoBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    async fn submit(&self, request: &VideoRequest) -> Result<JobHandle> {
        if let Some(ref message) = self.config.submit_error {
            anyhow::bail!("{}", message);
        }
        self.state.lock().requests.push(request.clone());
        Ok(JobHandle::pending(format!(
            "models/{}/operations/{}",
            request.model,
            uuid::Uuid::new_v4()
        )))
    }

    async fn refresh(&self, handle: &JobHandle) -> Result<JobHandle> {
        let mut state = self.state.lock();
        state.polls += 1;
        if let Some(message) = state.poll_errors.pop_front() {
            anyhow::bail!("{}", message);
        }
        if state.polls < self.config.polls_until_done {
            return Ok(JobHandle::pending(handle.name.clone()));
        }

        let mut finished = JobHandle::finished(handle.name.clone(), self.config.result_uri.clone());
        if let Some(ref message) = self.config.remote_error {
            finished.result_uri = None;
            finished.error = Some(RemoteError {
                code: None,
                message: message.clone(),
            });
        }
        Ok(finished)
    }

    async fn fetch_asset(&self, locator: &str) -> Result<Vec<u8>> {
        self.state.lock().fetches.push(locator.to_string());
        if let Some(ref message) = self.config.fetch_error {
            anyhow::bail!("{}", message);
        }
        Ok(self.config.asset_bytes.clone())
    }
}
