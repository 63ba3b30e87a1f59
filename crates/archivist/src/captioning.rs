/// Frame analysis
///
/// Asks a multimodal text service to describe the primary anchor so the
/// description can be folded into the instruction. Runs on its own status and
/// never touches the generation job.
use crate::anchors::ImageAnchor;
use crate::error::GenerationError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const ANALYSIS_INSTRUCTION: &str = "Describe this image in detail, focusing on elements that would look interesting in a vintage film clip. Keep it under 50 words.";

/// Used when the service answers with no text
pub const EMPTY_ANALYSIS_TEXT: &str = "Analysis complete.";

pub const ANALYZING_MESSAGE: &str = "Analyzing frame composition...";

/// Caption generated for an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    /// Caption text
    pub text: String,

    /// Provider that generated the caption
    pub provider: String,
}

/// Caption provider trait
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Describe `image` following `instruction`
    async fn caption(&self, image: &ImageAnchor, instruction: &str) -> Result<Caption>;
}

/// Fixed-text captioning, for offline runs
pub struct SimpleCaptioner {
    default_caption: String,
}

impl SimpleCaptioner {
    pub fn new(default_caption: String) -> Self {
        Self { default_caption }
    }
}

#[async_trait]
impl CaptionProvider for SimpleCaptioner {
    fn name(&self) -> &str {
        "simple"
    }

    async fn caption(&self, _image: &ImageAnchor, _instruction: &str) -> Result<Caption> {
        Ok(Caption {
            text: self.default_caption.clone(),
            provider: "simple".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Generating,
    Error(String),
}

/// One-shot analysis runner with its own transient status
#[derive(Debug, Default)]
pub struct FrameAnalyzer {
    status: AnalysisStatus,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &AnalysisStatus {
        &self.status
    }

    /// Describe `image`; returns cleaned text, never empty
    pub async fn analyze(
        &mut self,
        provider: &dyn CaptionProvider,
        image: &ImageAnchor,
    ) -> Result<String, GenerationError> {
        self.status = AnalysisStatus::Generating;
        tracing::debug!("Analyzing anchor with {}", provider.name());

        match provider.caption(image, ANALYSIS_INSTRUCTION).await {
            Ok(caption) => {
                self.status = AnalysisStatus::Idle;
                let text = postprocess::clean_caption(&caption.text);
                if text.is_empty() {
                    Ok(EMPTY_ANALYSIS_TEXT.to_string())
                } else {
                    Ok(text)
                }
            }
            Err(err) => {
                tracing::warn!("Frame analysis failed: {:#}", err);
                let err = GenerationError::Analysis(format!("{:#}", err));
                self.status = AnalysisStatus::Error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        self.status = AnalysisStatus::Idle;
    }
}

/// Caption post-processing utilities
pub mod postprocess {
    /// Clean up caption (collapse whitespace, trim)
    pub fn clean_caption(caption: &str) -> String {
        caption.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Fold an analysis into the user's instruction
    pub fn append_to_instruction(instruction: &str, analysis: &str) -> String {
        if instruction.trim().is_empty() {
            analysis.to_string()
        } else {
            format!("{} - {}", instruction, analysis)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::tests::png_bytes;

    struct FailingCaptioner;

    #[async_trait]
    impl CaptionProvider for FailingCaptioner {
        fn name(&self) -> &str {
            "failing"
        }

        async fn caption(&self, _image: &ImageAnchor, _instruction: &str) -> Result<Caption> {
            anyhow::bail!("quota exhausted")
        }
    }

    fn anchor() -> ImageAnchor {
        ImageAnchor::from_bytes(png_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_simple_captioner() {
        let mut analyzer = FrameAnalyzer::new();
        let captioner = SimpleCaptioner::new("  a   steam locomotive ".to_string());
        let text = analyzer.analyze(&captioner, &anchor()).await.unwrap();

        assert_eq!(text, "a steam locomotive");
        assert_eq!(*analyzer.status(), AnalysisStatus::Idle);
    }

    #[tokio::test]
    async fn test_empty_caption_fallback() {
        let mut analyzer = FrameAnalyzer::new();
        let text = analyzer
            .analyze(&SimpleCaptioner::new(String::new()), &anchor())
            .await
            .unwrap();
        assert_eq!(text, EMPTY_ANALYSIS_TEXT);
    }

    #[tokio::test]
    async fn test_failure_sets_error_status() {
        let mut analyzer = FrameAnalyzer::new();
        let err = analyzer.analyze(&FailingCaptioner, &anchor()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Analysis(_)));
        match analyzer.status() {
            AnalysisStatus::Error(msg) => assert!(msg.contains("quota exhausted")),
            other => panic!("unexpected status {:?}", other),
        }
        analyzer.reset();
        assert_eq!(*analyzer.status(), AnalysisStatus::Idle);
    }

    #[test]
    fn test_append_to_instruction() {
        assert_eq!(
            postprocess::append_to_instruction("", "a foggy harbor"),
            "a foggy harbor"
        );
        assert_eq!(
            postprocess::append_to_instruction("slow pan", "a foggy harbor"),
            "slow pan - a foggy harbor"
        );
    }

    #[test]
    fn test_clean_caption() {
        assert_eq!(postprocess::clean_caption("  extra   spaces\nhere  "), "extra spaces here");
    }
}
