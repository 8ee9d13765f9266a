//! Plant leaf disease diagnosis over Google Gemini.
//!
//! The library half holds the orchestration core: the image encoder, the
//! analysis client behind the [`PlantAnalyzer`] seam, the validated
//! [`AnalysisResult`] sum type, and the session state machine. The binary
//! half wires them into an axum server with an embedded page.

pub mod diagnosis;
pub mod error;
pub mod gemini;
pub mod image;
pub mod server;
pub mod session;

pub use diagnosis::AnalysisResult;
pub use error::AnalysisError;
pub use gemini::{GeminiClient, PlantAnalyzer};
pub use image::ImagePayload;
pub use session::{Session, SessionError, Status};
