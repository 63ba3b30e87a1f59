/// Generation lifecycle: credential gate, submission, polling, result fetch
///
/// `idle -> checking-credential -> generating -> completed | error`
///
/// The poll loop suspends only on the fixed interval and on backend calls.
/// Every job transition is published on a watch channel.
use crate::asset::VideoAsset;
use crate::backends::VideoBackend;
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::error::GenerationError;
use crate::job::{GenerationJob, JobHandle};
use crate::request::VideoRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub video_model: String,
    pub poll_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl From<&AppConfig> for GenerationSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            video_model: config.video_model.clone(),
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Owns the single job record and broadcasts every change
#[derive(Debug)]
pub struct JobTracker {
    job: GenerationJob,
    sender: watch::Sender<GenerationJob>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(GenerationJob::idle());
        Self {
            job: GenerationJob::idle(),
            sender,
        }
    }

    pub fn job(&self) -> &GenerationJob {
        &self.job
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationJob> {
        self.sender.subscribe()
    }

    pub fn update(&mut self, apply: impl FnOnce(&mut GenerationJob)) {
        apply(&mut self.job);
        self.sender.send_replace(self.job.clone());
    }

    pub fn reset(&mut self) {
        self.update(GenerationJob::reset);
    }
}

/// Drives one job from submission to a terminal state
pub struct Generator {
    backend: Arc<dyn VideoBackend>,
    credentials: Arc<dyn CredentialStore>,
    settings: GenerationSettings,
}

impl Generator {
    pub fn new(
        backend: Arc<dyn VideoBackend>,
        credentials: Arc<dyn CredentialStore>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            backend,
            credentials,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn VideoBackend> {
        &self.backend
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Run `request` to completion on `tracker`.
    ///
    /// Refuses to start unless the job is idle; in that case the job is left
    /// untouched. Any other failure leaves the job in the error state.
    pub async fn run(
        &self,
        tracker: &mut JobTracker,
        request: VideoRequest,
        style_id: &str,
    ) -> Result<Arc<VideoAsset>, GenerationError> {
        if !tracker.job().is_idle() {
            return Err(GenerationError::Busy(tracker.job().status()));
        }

        match self.drive(tracker, &request, style_id).await {
            Ok(asset) => {
                info!("Generation complete: {} bytes", asset.len());
                tracker.update(|job| job.complete(asset.clone()));
                Ok(asset)
            }
            Err(err) => {
                warn!("Generation failed: {}", err);
                tracker.update(|job| job.fail(err.to_string()));
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        tracker: &mut JobTracker,
        request: &VideoRequest,
        style_id: &str,
    ) -> Result<Arc<VideoAsset>, GenerationError> {
        tracker.update(GenerationJob::begin_credential_check);
        self.ensure_credential().await?;

        tracker.update(GenerationJob::begin_generating);
        info!(
            "Submitting {} job to {} (style {}, {})",
            request.shape,
            self.backend.name(),
            style_id,
            request.aspect_ratio
        );
        let mut handle = self
            .backend
            .submit(request)
            .await
            .map_err(|err| GenerationError::Submission(format!("{:#}", err)))?;

        let started = Instant::now();
        let mut poll_count = 0u32;
        while !handle.done {
            poll_count += 1;
            tracker.update(|job| job.record_poll(poll_count));

            tokio::time::sleep(self.settings.poll_interval).await;

            handle = self.poll(&handle).await?;
            debug!("Poll {} for {}: done={}", poll_count, handle.name, handle.done);

            if let Some(budget) = self.settings.max_wait {
                if !handle.done && started.elapsed() >= budget {
                    return Err(GenerationError::TimedOut(budget));
                }
            }
        }

        self.fetch_result(&handle, style_id).await
    }

    async fn ensure_credential(&self) -> Result<(), GenerationError> {
        let selected = self
            .credentials
            .has_selected_credential()
            .await
            .map_err(|err| GenerationError::Credential(format!("{:#}", err)))?;
        if !selected {
            info!("No credential selected, opening selector");
            self.credentials
                .open_credential_selector()
                .await
                .map_err(|err| GenerationError::Credential(format!("{:#}", err)))?;
        }
        Ok(())
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobHandle, GenerationError> {
        match self.backend.refresh(handle).await {
            Ok(next) => Ok(next),
            Err(err) if GenerationError::is_credential_expiry(&err) => {
                warn!("Credential rejected while polling, reselecting");
                if let Err(select_err) = self.credentials.open_credential_selector().await {
                    warn!("Credential reselection failed: {:#}", select_err);
                }
                Err(GenerationError::SessionExpired)
            }
            Err(err) => Err(GenerationError::Poll(format!("{:#}", err))),
        }
    }

    async fn fetch_result(
        &self,
        handle: &JobHandle,
        style_id: &str,
    ) -> Result<Arc<VideoAsset>, GenerationError> {
        if let Some(ref remote) = handle.error {
            return Err(GenerationError::Poll(remote.message.clone()));
        }
        let locator = handle
            .result_uri
            .as_deref()
            .ok_or(GenerationError::MissingResult)?;

        info!("Downloading result for {}", handle.name);
        let bytes = self
            .backend
            .fetch_asset(locator)
            .await
            .map_err(|err| GenerationError::Fetch(format!("{:#}", err)))?;
        if bytes.is_empty() {
            return Err(GenerationError::Fetch("empty response body".to_string()));
        }

        Ok(Arc::new(VideoAsset::new(
            bytes,
            VIDEO_CONTENT_TYPE,
            locator,
            style_id,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::Anchors;
    use crate::backends::{MockConfig, MockVideoBackend};
    use crate::credentials::StaticCredentialStore;
    use crate::job::GenerationStatus;
    use crate::styles::AspectRatio;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            video_model: "veo-test".to_string(),
            poll_interval: Duration::from_millis(1),
            max_wait: None,
        }
    }

    fn request() -> VideoRequest {
        VideoRequest::build("veo-test", &Anchors::new(), AspectRatio::Landscape, "prompt")
    }

    #[tokio::test]
    async fn test_tracker_publishes_updates() {
        let mut tracker = JobTracker::new();
        let mut rx = tracker.subscribe();
        tracker.update(GenerationJob::begin_credential_check);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status(), GenerationStatus::CheckingCredential);
    }

    #[tokio::test]
    async fn test_missing_credential_opens_selector() {
        let credentials = Arc::new(StaticCredentialStore::new(None).with_replacement("k"));
        let backend = Arc::new(MockVideoBackend::new(MockConfig::default()));
        let generator = Generator::new(backend, credentials.clone(), settings());
        let mut tracker = JobTracker::new();

        generator.run(&mut tracker, request(), "vhs-90s").await.unwrap();
        assert_eq!(credentials.selector_calls(), 1);
        assert_eq!(tracker.job().status(), GenerationStatus::Completed);
    }

    struct RefusingStore;

    #[async_trait::async_trait]
    impl CredentialStore for RefusingStore {
        async fn has_selected_credential(&self) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn open_credential_selector(&self) -> anyhow::Result<()> {
            anyhow::bail!("selection dismissed")
        }

        fn current(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_failed_selection_fails_job_before_submit() {
        let backend = Arc::new(MockVideoBackend::new(MockConfig::default()));
        let generator = Generator::new(backend.clone(), Arc::new(RefusingStore), settings());
        let mut tracker = JobTracker::new();

        let err = generator.run(&mut tracker, request(), "vhs-90s").await.unwrap_err();
        assert!(matches!(err, GenerationError::Credential(_)));
        assert_eq!(tracker.job().status(), GenerationStatus::Error);
        assert_eq!(tracker.job().progress(), 0);
        assert!(tracker.job().error().unwrap().contains("selection dismissed"));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_fails_job() {
        let backend = Arc::new(MockVideoBackend::new(
            MockConfig::default()
                .with_polls_until_done(1)
                .with_remote_error("prompt rejected by safety filter"),
        ));
        let generator = Generator::new(
            backend.clone(),
            Arc::new(StaticCredentialStore::with_key("k")),
            settings(),
        );
        let mut tracker = JobTracker::new();

        let err = generator.run(&mut tracker, request(), "vhs-90s").await.unwrap_err();
        assert!(matches!(err, GenerationError::Poll(_)));
        assert_eq!(tracker.job().error(), Some("prompt rejected by safety filter"));
        assert!(backend.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_empty_download_is_fetch_error() {
        let mut config = MockConfig::default().with_polls_until_done(1);
        config.asset_bytes.clear();
        let generator = Generator::new(
            Arc::new(MockVideoBackend::new(config)),
            Arc::new(StaticCredentialStore::with_key("k")),
            settings(),
        );
        let mut tracker = JobTracker::new();

        let err = generator.run(&mut tracker, request(), "vhs-90s").await.unwrap_err();
        assert!(matches!(err, GenerationError::Fetch(_)));
        assert_eq!(tracker.job().status(), GenerationStatus::Error);
    }
}
