/// The single-view session: inputs, one generation job, frame analysis
use crate::anchors::{AnchorSlot, Anchors, ImageAnchor};
use crate::asset::VideoAsset;
use crate::backends::BackendFactory;
use crate::captioning::{postprocess, AnalysisStatus, CaptionProvider, FrameAnalyzer};
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::error::GenerationError;
use crate::generation::{GenerationSettings, Generator, JobTracker};
use crate::job::GenerationJob;
use crate::prompt::compose_prompt;
use crate::request::VideoRequest;
use crate::styles::{AspectRatio, StylePreset, UnknownStyle};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

pub struct Studio {
    anchors: Anchors,
    instruction: String,
    analysis_text: Option<String>,
    style: &'static StylePreset,
    aspect_ratio: AspectRatio,
    tracker: JobTracker,
    analyzer: FrameAnalyzer,
    generator: Generator,
    captioner: Arc<dyn CaptionProvider>,
}

impl Studio {
    pub fn new(generator: Generator, captioner: Arc<dyn CaptionProvider>) -> Self {
        Self {
            anchors: Anchors::new(),
            instruction: String::new(),
            analysis_text: None,
            style: StylePreset::default_style(),
            aspect_ratio: AspectRatio::default(),
            tracker: JobTracker::new(),
            analyzer: FrameAnalyzer::new(),
            generator,
            captioner,
        }
    }

    /// Build backends from `config`
    pub fn from_config(config: &AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let backend = BackendFactory::video(config, credentials.clone())?;
        let captioner = BackendFactory::captioner(config, credentials.clone())?;
        let generator = Generator::new(backend, credentials, GenerationSettings::from(config));
        Ok(Self::new(generator, captioner))
    }

    pub fn set_anchor(&mut self, slot: AnchorSlot, anchor: ImageAnchor) {
        if slot == AnchorSlot::Primary {
            self.analysis_text = None;
        }
        self.anchors.set(slot, anchor);
    }

    /// Clearing the primary anchor also drops its analysis
    pub fn clear_anchor(&mut self, slot: AnchorSlot) {
        if slot == AnchorSlot::Primary {
            self.analysis_text = None;
        }
        self.anchors.clear(slot);
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    pub fn set_instruction(&mut self, text: impl Into<String>) {
        self.instruction = text.into();
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn analysis_text(&self) -> Option<&str> {
        self.analysis_text.as_deref()
    }

    pub fn select_style(&mut self, id: &str) -> Result<&'static StylePreset, UnknownStyle> {
        let style = StylePreset::by_id(id).ok_or_else(|| UnknownStyle(id.to_string()))?;
        self.style = style;
        Ok(style)
    }

    pub fn style(&self) -> &'static StylePreset {
        self.style
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn job(&self) -> &GenerationJob {
        self.tracker.job()
    }

    /// Observe job transitions
    pub fn subscribe(&self) -> watch::Receiver<GenerationJob> {
        self.tracker.subscribe()
    }

    pub fn analysis_status(&self) -> &AnalysisStatus {
        self.analyzer.status()
    }

    pub fn composed_prompt(&self) -> String {
        compose_prompt(Some(self.instruction.as_str()), self.style)
    }

    /// The request `generate` would submit with the current inputs
    pub fn build_request(&self) -> VideoRequest {
        VideoRequest::build(
            &self.generator.settings().video_model,
            &self.anchors,
            self.aspect_ratio,
            &self.composed_prompt(),
        )
    }

    pub async fn generate(&mut self) -> Result<Arc<VideoAsset>, GenerationError> {
        let request = self.build_request();
        self.generator
            .run(&mut self.tracker, request, self.style.id)
            .await
    }

    /// Describe the primary anchor and fold the text into the instruction
    pub async fn analyze_primary(&mut self) -> Result<String, GenerationError> {
        if !self.tracker.job().is_idle() {
            return Err(GenerationError::Busy(self.tracker.job().status()));
        }
        let anchor = self
            .anchors
            .primary()
            .cloned()
            .ok_or(GenerationError::NoPrimaryAnchor)?;

        let text = self
            .analyzer
            .analyze(self.captioner.as_ref(), &anchor)
            .await?;
        self.instruction = postprocess::append_to_instruction(&self.instruction, &text);
        self.analysis_text = Some(text.clone());
        Ok(text)
    }

    /// Return the job to idle, keeping inputs
    pub fn reset_job(&mut self) {
        self.tracker.reset();
    }

    /// Return to a blank session: job idle, anchors and instruction cleared
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.anchors.clear_all();
        self.instruction.clear();
        self.analysis_text = None;
        self.analyzer.reset();
    }
}
