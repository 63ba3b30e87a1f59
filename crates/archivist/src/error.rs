use crate::job::GenerationStatus;
use std::time::Duration;
use thiserror::Error;

/// Fixed text shown when the credential expired mid-poll
pub const SESSION_EXPIRED_MESSAGE: &str = "Key session expired. Please retry.";

/// Marker the service puts in errors for an expired or unknown credential
pub const CREDENTIAL_EXPIRED_SIGNAL: &str = "Requested entity was not found";

/// Failures of the generation lifecycle and the analysis path.
///
/// Every lifecycle variant except `Busy` ends the job in the error state
/// with the variant's display text as its description.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("a job is already {0}; reset before starting another")]
    Busy(GenerationStatus),

    #[error("credential selection failed: {0}")]
    Credential(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    #[error("{0}")]
    Poll(String),

    #[error("No video URL returned from API")]
    MissingResult,

    #[error("video download failed: {0}")]
    Fetch(String),

    #[error("generation did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("frame analysis needs a primary anchor image")]
    NoPrimaryAnchor,

    #[error("Analysis failed: {0}")]
    Analysis(String),
}

impl GenerationError {
    /// Whether an error chain carries the credential-expiry marker
    pub fn is_credential_expiry(err: &anyhow::Error) -> bool {
        format!("{:#}", err).contains(CREDENTIAL_EXPIRED_SIGNAL)
    }
}
