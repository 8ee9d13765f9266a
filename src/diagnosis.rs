//! Diagnosis model: the provider's loosely-typed JSON turned into an
//! explicit sum type.
//!
//! The schema declared to the provider marks every field optional and
//! enforces no mutual exclusivity, so the raw response must be tagged here.
//! Precedence when several fields are populated: a non-empty `error` wins,
//! then `isHealthy: true`, then a non-empty `diseaseName`; anything else is
//! inconclusive.

use serde::Serialize;
use serde_json::Value;

use crate::error::AnalysisError;

/// Outcome of one analysis. Exactly one shape per result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisResult {
    /// No disease found.
    #[serde(rename_all = "camelCase")]
    Healthy { message: Option<String> },

    /// A disease was identified, with treatment advice. List ordering is
    /// preserved exactly as returned by the provider.
    #[serde(rename_all = "camelCase")]
    Diseased {
        disease_name: String,
        description: String,
        treatment_suggestions: Vec<String>,
        preventative_care: Vec<String>,
    },

    /// The response was well-formed but populated none of the known shapes.
    Inconclusive,
}

impl AnalysisResult {
    /// The single validating constructor. Treats every field of `value` as
    /// optional and applies the tagging precedence; a populated `error`
    /// field is a domain-level rejection, not a result.
    pub fn from_response(value: &Value) -> Result<Self, AnalysisError> {
        if let Some(reason) = non_empty_str(value, "error") {
            return Err(AnalysisError::Rejected(reason.to_string()));
        }

        if value.get("isHealthy").and_then(Value::as_bool) == Some(true) {
            return Ok(Self::Healthy {
                message: non_empty_str(value, "healthyMessage").map(str::to_string),
            });
        }

        if let Some(name) = non_empty_str(value, "diseaseName") {
            return Ok(Self::Diseased {
                disease_name: name.to_string(),
                description: non_empty_str(value, "description")
                    .unwrap_or_default()
                    .to_string(),
                treatment_suggestions: string_list(value, "treatmentSuggestions"),
                preventative_care: string_list(value, "preventativeCare"),
            });
        }

        Ok(Self::Inconclusive)
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn healthy_response_tags_as_healthy() {
        let result = AnalysisResult::from_response(&json!({ "isHealthy": true })).unwrap();
        assert_eq!(result, AnalysisResult::Healthy { message: None });
    }

    #[test]
    fn diseased_response_keeps_all_fields_and_ordering() {
        let result = AnalysisResult::from_response(&json!({
            "diseaseName": "Leaf Blight",
            "description": "Fungal infection of the foliage.",
            "treatmentSuggestions": ["Remove affected leaves", "Apply fungicide"],
            "preventativeCare": ["Avoid overhead watering"],
        }))
        .unwrap();

        assert_eq!(
            result,
            AnalysisResult::Diseased {
                disease_name: "Leaf Blight".to_string(),
                description: "Fungal infection of the foliage.".to_string(),
                treatment_suggestions: vec![
                    "Remove affected leaves".to_string(),
                    "Apply fungicide".to_string(),
                ],
                preventative_care: vec!["Avoid overhead watering".to_string()],
            }
        );
    }

    #[test]
    fn error_field_wins_over_everything_else() {
        let err = AnalysisResult::from_response(&json!({
            "error": "Image does not show a plant",
            "isHealthy": true,
            "diseaseName": "Leaf Blight",
        }))
        .unwrap_err();

        match err {
            AnalysisError::Rejected(reason) => {
                assert_eq!(reason, "Image does not show a plant");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn healthy_wins_over_disease_when_both_are_set() {
        let result = AnalysisResult::from_response(&json!({
            "isHealthy": true,
            "diseaseName": "Leaf Blight",
        }))
        .unwrap();
        assert!(matches!(result, AnalysisResult::Healthy { .. }));
    }

    #[test]
    fn empty_error_string_is_not_a_rejection() {
        let result = AnalysisResult::from_response(&json!({
            "error": "",
            "isHealthy": true,
        }))
        .unwrap();
        assert!(matches!(result, AnalysisResult::Healthy { .. }));
    }

    #[test]
    fn unknown_shape_is_inconclusive() {
        let result = AnalysisResult::from_response(&json!({ "isHealthy": false })).unwrap();
        assert_eq!(result, AnalysisResult::Inconclusive);

        let result = AnalysisResult::from_response(&json!({})).unwrap();
        assert_eq!(result, AnalysisResult::Inconclusive);
    }

    #[test]
    fn missing_disease_fields_default_to_empty() {
        let result =
            AnalysisResult::from_response(&json!({ "diseaseName": "Rust" })).unwrap();
        assert_eq!(
            result,
            AnalysisResult::Diseased {
                disease_name: "Rust".to_string(),
                description: String::new(),
                treatment_suggestions: vec![],
                preventative_care: vec![],
            }
        );
    }
}
