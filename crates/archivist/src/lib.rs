/// Archivist: vintage motion generation client
///
/// Collects up to two anchor images, a free-text instruction, a style preset
/// and an aspect ratio, then runs one video job against an external
/// generation service: credential gate, submission, polling, download.
pub mod anchors;
pub mod asset;
pub mod backends;
pub mod captioning;
pub mod config;
pub mod credentials;
pub mod error;
pub mod generation;
pub mod job;
pub mod prompt;
pub mod request;
pub mod studio;
pub mod styles;

pub use anchors::{AnchorError, AnchorSlot, Anchors, ImageAnchor};
pub use asset::VideoAsset;
pub use backends::{BackendFactory, BackendType, VideoBackend};
pub use captioning::{AnalysisStatus, Caption, CaptionProvider, FrameAnalyzer};
pub use config::AppConfig;
pub use credentials::{key_from_env, CredentialStore, StaticCredentialStore};
pub use error::GenerationError;
pub use generation::{GenerationSettings, Generator, JobTracker};
pub use job::{GenerationJob, GenerationStatus, JobHandle};
pub use prompt::compose_prompt;
pub use request::{RequestShape, VideoRequest};
pub use studio::Studio;
pub use styles::{AspectRatio, StylePreset, LOADING_MESSAGES, VINTAGE_STYLES};
