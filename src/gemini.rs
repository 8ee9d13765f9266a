//! Analysis Client: one `generateContent` call to Google Gemini per
//! diagnosis, no retry, no caching.
//!
//! The network boundary sits behind [`PlantAnalyzer`] so handlers and tests
//! can swap in a stub without a real provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::diagnosis::AnalysisResult;
use crate::error::AnalysisError;
use crate::image::ImagePayload;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed instruction sent with every image. Ambiguity handling (not a
/// plant, unclear photo) is delegated to the model's `error` field.
const INSTRUCTION: &str = "You are an expert agricultural botanist specializing in plant \
    pathology. Analyze this image of a plant leaf. Identify any diseases or pests. Respond \
    ONLY in JSON format matching the schema. If a disease is found, provide its name, \
    description, treatments, and prevention tips. If the plant is healthy, set isHealthy to \
    true. If the image isn't a plant or is unclear, provide an error message.";

/// Capability interface for the external analysis call.
#[async_trait]
pub trait PlantAnalyzer: Send + Sync {
    /// Exactly one outbound request per invocation. Every call is billed by
    /// the provider; callers are expected to gate repeat invocations.
    async fn analyze(&self, payload: &ImagePayload) -> Result<AnalysisResult, AnalysisError>;
}

/// Google Gemini implementation of [`PlantAnalyzer`].
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the API endpoint, e.g. to point at a mock server in tests.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn request_body(&self, payload: &ImagePayload) -> Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": payload.mime_type,
                            "data": payload.data,
                        }
                    },
                    { "text": INSTRUCTION }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        })
    }
}

/// Schema declared to the provider. Advisory only: every field is nullable
/// and nothing here is trusted when the response comes back.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isHealthy": { "type": "BOOLEAN", "nullable": true },
            "healthyMessage": { "type": "STRING", "nullable": true },
            "diseaseName": { "type": "STRING", "nullable": true },
            "description": { "type": "STRING", "nullable": true },
            "treatmentSuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "nullable": true
            },
            "preventativeCare": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "nullable": true
            },
            "error": { "type": "STRING", "nullable": true }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the diagnosis out of a raw `generateContent` response body.
fn diagnosis_from_body(body: &str) -> Result<AnalysisResult, AnalysisError> {
    let envelope: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid response envelope: {e}")))?;

    let text = envelope
        .candidates
        .first()
        .and_then(|c| c.content.parts.iter().find_map(|p| p.text.as_deref()))
        .ok_or_else(|| {
            AnalysisError::MalformedResponse("response carries no text part".to_string())
        })?;

    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| AnalysisError::MalformedResponse(format!("diagnosis is not JSON: {e}")))?;

    AnalysisResult::from_response(&value)
}

#[async_trait]
impl PlantAnalyzer for GeminiClient {
    async fn analyze(&self, payload: &ImagePayload) -> Result<AnalysisResult, AnalysisError> {
        if payload.data.is_empty() {
            return Err(AnalysisError::InvalidInput("empty image data".to_string()));
        }
        if payload.mime_type.is_empty() {
            return Err(AnalysisError::InvalidInput("empty mime type".to_string()));
        }

        debug!(model = %self.model, mime_type = %payload.mime_type, "sending analysis request");

        let response = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .json(&self.request_body(payload))
            .send()
            .await
            .map_err(|e| {
                error!(cause = %e, "analysis request failed to reach provider");
                AnalysisError::Unavailable
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(cause = %e, "failed to read provider response body");
            AnalysisError::Unavailable
        })?;

        if !status.is_success() {
            error!(%status, body = %body, "provider returned an error status");
            return Err(AnalysisError::Unavailable);
        }

        diagnosis_from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_generate_content_url() {
        let client = GeminiClient::new("key123")
            .with_base_url("https://example.test/v1beta")
            .with_model("gemini-custom");
        assert_eq!(
            client.request_url(),
            "https://example.test/v1beta/models/gemini-custom:generateContent?key=key123"
        );
    }

    #[test]
    fn request_carries_image_instruction_and_schema() {
        let client = GeminiClient::new("k");
        let body = client.request_body(&ImagePayload {
            data: "Zm9v".to_string(),
            mime_type: "image/png".to_string(),
        });

        let part = &body["contents"][0]["parts"][0]["inline_data"];
        assert_eq!(part["data"], "Zm9v");
        assert_eq!(part["mime_type"], "image/png");
        assert_eq!(body["contents"][0]["parts"][1]["text"], INSTRUCTION);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body["generationConfig"]["responseSchema"]["properties"]["error"].is_object());
    }

    #[test]
    fn extracts_diagnosis_from_envelope() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"isHealthy\": true}" }] }
            }]
        })
        .to_string();

        let result = diagnosis_from_body(&body).unwrap();
        assert_eq!(result, AnalysisResult::Healthy { message: None });
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            diagnosis_from_body("<html>oops</html>"),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn envelope_without_text_part_is_malformed() {
        let body = r#"{ "candidates": [] }"#;
        assert!(matches!(
            diagnosis_from_body(body),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_json_diagnosis_text_is_malformed() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "the plant looks fine" }] }
            }]
        })
        .to_string();
        assert!(matches!(
            diagnosis_from_body(&body),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn empty_payload_fails_before_any_network_call() {
        // Unroutable base URL: reaching the network would fail differently.
        let client = GeminiClient::new("k").with_base_url("http://127.0.0.1:1");

        let err = client
            .analyze(&ImagePayload {
                data: String::new(),
                mime_type: "image/png".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let err = client
            .analyze(&ImagePayload {
                data: "Zm9v".to_string(),
                mime_type: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }
}
