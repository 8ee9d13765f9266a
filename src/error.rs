//! Error taxonomy for the analysis path.
//!
//! Every failure between image selection and a rendered diagnosis is one of
//! these kinds; nothing else escapes to the presentation layer.

use thiserror::Error;

/// Message shown when the provider cannot be reached or returns garbage.
/// The underlying cause is logged, never shown to the user.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Failed to analyze the image. The AI model may be unavailable or the image \
     could not be processed. Please try again later.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The selected file could not be read or is not a recognizable image.
    #[error("could not encode image: {0}")]
    Encoding(String),

    /// Analyze was called with an empty payload. A UI that stages images
    /// before enabling the analyze action never triggers this.
    #[error("invalid analysis input: {0}")]
    InvalidInput(String),

    /// The provider returned text that is not JSON or does not carry the
    /// expected response envelope.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider looked at the image and declined to diagnose it
    /// (not a plant, too blurry). Domain-level, not a transport failure.
    #[error("{0}")]
    Rejected(String),

    /// Transport failure, timeout, or provider-side error.
    #[error("analysis service unavailable")]
    Unavailable,
}

impl AnalysisError {
    /// The text safe to show an end user. Rejections are surfaced verbatim;
    /// transport and parse failures collapse into one generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Encoding(_) => {
                "Could not read the selected image. Please choose a different file.".to_string()
            }
            Self::InvalidInput(_) => "Please select an image first.".to_string(),
            Self::Rejected(reason) => reason.clone(),
            Self::MalformedResponse(_) | Self::Unavailable => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
