//! Response schema adapters
//!
//! Diagnosis backends have answered in several shapes over time. Each known shape has one
//! adapter; the adapter is picked by which label field is present, never by guessing from
//! values. Everything is normalized into a [`DiagnosisResult`] with a fractional confidence.
//!
//! | schema  | label field   | confidence | treatment                      |
//! |---------|---------------|------------|--------------------------------|
//! | Plan    | `diseaseName` | fraction   | `treatments.{organic,chemical}`|
//! | Flat    | `prediction`  | fraction   | `treatment` text               |
//! | Legacy  | `disease`     | percent    | `treatment` text               |

use leafguard_core::models::{
    record_id_from_reference, Artifacts, Confidence, DiagnosisResult, PlantCondition, Severity,
    Treatment,
};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("response has no recognizable diagnosis label")]
    UnknownShape,

    #[error("response is missing '{0}'")]
    MissingField(&'static str),

    #[error("confidence out of range: {0}")]
    InvalidConfidence(f64),

    #[error("diagnosis service reported an error: {0}")]
    Backend(String),
}

/// Known response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    Plan,
    Flat,
    Legacy,
}

/// Pick the adapter for a payload by field presence.
pub fn detect(payload: &Value) -> Option<ResponseSchema> {
    let object = payload.as_object()?;
    if object.contains_key("diseaseName") || object.contains_key("treatments") {
        Some(ResponseSchema::Plan)
    } else if object.contains_key("prediction") {
        Some(ResponseSchema::Flat)
    } else if object.contains_key("disease") {
        Some(ResponseSchema::Legacy)
    } else {
        None
    }
}

/// Normalize a payload, leaving artifact references as returned.
pub fn normalize(payload: &Value) -> Result<DiagnosisResult, SchemaError> {
    normalize_with(payload, |reference| reference.to_string())
}

/// Normalize a payload, passing artifact references through `resolve` (e.g. to make them absolute).
pub fn normalize_with<F>(payload: &Value, resolve: F) -> Result<DiagnosisResult, SchemaError>
where
    F: Fn(&str) -> String,
{
    let object = payload.as_object().ok_or(SchemaError::NotAnObject)?;

    let Some(schema) = detect(payload) else {
        if let Some(message) = string_field(object, "error") {
            return Err(SchemaError::Backend(message));
        }
        return Err(SchemaError::UnknownShape);
    };

    match schema {
        ResponseSchema::Plan => from_plan(object, &resolve),
        ResponseSchema::Flat => from_flat(object, &resolve),
        ResponseSchema::Legacy => from_legacy(object),
    }
}

fn from_plan<F>(object: &Map<String, Value>, resolve: &F) -> Result<DiagnosisResult, SchemaError>
where
    F: Fn(&str) -> String,
{
    let confidence = confidence_field(object, Confidence::from_fraction)?;
    let mut builder =
        DiagnosisResult::builder(string_field(object, "diseaseName").unwrap_or_default(), confidence)
            .severity(severity_field(object))
            .overview(string_field(object, "overview"))
            .treatment(object.get("treatments").and_then(plan_treatment))
            .prevention(string_field(object, "prevention"))
            .artifacts(artifacts(object, resolve));

    if let Some(is_healthy) = object.get("isHealthy").and_then(Value::as_bool) {
        builder = builder.condition(if is_healthy {
            PlantCondition::Healthy
        } else {
            PlantCondition::Diseased
        });
    }

    Ok(builder.build())
}

fn from_flat<F>(object: &Map<String, Value>, resolve: &F) -> Result<DiagnosisResult, SchemaError>
where
    F: Fn(&str) -> String,
{
    let confidence = confidence_field(object, Confidence::from_reported)?;
    let record_id = ["report_url", "pdf_url", "image_url"]
        .into_iter()
        .find_map(|key| string_field(object, key))
        .and_then(|reference| record_id_from_reference(&reference));

    Ok(
        DiagnosisResult::builder(string_field(object, "prediction").unwrap_or_default(), confidence)
            .severity(severity_field(object))
            .treatment(string_field(object, "treatment").map(Treatment::Text))
            .prevention(string_field(object, "prevention"))
            .artifacts(artifacts(object, resolve))
            .record_id(record_id)
            .build(),
    )
}

fn from_legacy(object: &Map<String, Value>) -> Result<DiagnosisResult, SchemaError> {
    let confidence = confidence_field(object, Confidence::from_percent)?;

    Ok(
        DiagnosisResult::builder(string_field(object, "disease").unwrap_or_default(), confidence)
            .severity(severity_field(object))
            .treatment(string_field(object, "treatment").map(Treatment::Text))
            .prevention(string_field(object, "prevention"))
            .build(),
    )
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn confidence_field<P, E>(object: &Map<String, Value>, parse: P) -> Result<Confidence, SchemaError>
where
    P: Fn(f64) -> Result<Confidence, E>,
{
    let raw = match object.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
    .ok_or(SchemaError::MissingField("confidence"))?;

    parse(raw).map_err(|_| SchemaError::InvalidConfidence(raw))
}

fn severity_field(object: &Map<String, Value>) -> Option<Severity> {
    let label = object.get("severity").and_then(Value::as_str)?;
    let severity = Severity::parse_lenient(label);
    if severity.is_none() {
        tracing::debug!(severity = %label, "Unrecognized severity label");
    }
    severity
}

fn plan_treatment(treatments: &Value) -> Option<Treatment> {
    let list = |key: &str| -> Vec<String> {
        treatments
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    Some(Treatment::Plan {
        organic: list("organic"),
        chemical: list("chemical"),
    })
}

fn artifacts<F>(object: &Map<String, Value>, resolve: &F) -> Artifacts
where
    F: Fn(&str) -> String,
{
    Artifacts {
        report_url: string_field(object, "report_url")
            .or_else(|| string_field(object, "pdf_url"))
            .map(|r| resolve(&r)),
        annotated_image_url: string_field(object, "image_url").map(|r| resolve(&r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_by_field_presence() {
        assert_eq!(detect(&json!({"diseaseName": "x"})), Some(ResponseSchema::Plan));
        assert_eq!(detect(&json!({"prediction": "x"})), Some(ResponseSchema::Flat));
        assert_eq!(detect(&json!({"disease": "x"})), Some(ResponseSchema::Legacy));
        assert_eq!(detect(&json!({"label": "x"})), None);
        assert_eq!(detect(&json!([1, 2])), None);
    }

    #[test]
    fn test_plan_schema() {
        let result = normalize(&json!({
            "diseaseName": "Tomato Late Blight",
            "confidence": 0.92,
            "isHealthy": false,
            "overview": "Late blight is destructive.",
            "treatments": {
                "organic": ["Remove infected plants."],
                "chemical": ["Apply mancozeb."]
            }
        }))
        .unwrap();

        assert_eq!(result.disease_name(), "Tomato Late Blight");
        assert_eq!(result.confidence().value(), 0.92);
        assert_eq!(result.overview(), Some("Late blight is destructive."));
        assert!(matches!(
            result.treatment(),
            Treatment::Plan { organic, chemical } if organic.len() == 1 && chemical.len() == 1
        ));
    }

    #[test]
    fn test_plan_schema_healthy_flag() {
        let result = normalize(&json!({
            "diseaseName": "Potato Plant",
            "confidence": 0.99,
            "isHealthy": true,
            "treatments": {"organic": [], "chemical": []}
        }))
        .unwrap();

        assert!(result.is_healthy());
        assert_eq!(result.severity(), Severity::None);
    }

    #[test]
    fn test_flat_schema_with_artifacts() {
        let result = normalize_with(
            &json!({
                "prediction": "Apple Black Rot",
                "confidence": 0.7731,
                "treatment": "Remove infected branches and use fungicide.",
                "prevention": "Harvest ripe fruit and disinfect tools.",
                "severity": "High",
                "image_url": "/images/20240501_101500.png",
                "report_url": "/reports/20240501_101500.pdf"
            }),
            |r| format!("http://api{}", r),
        )
        .unwrap();

        assert_eq!(result.severity(), Severity::High);
        assert_eq!(result.record_id(), Some("20240501_101500"));
        assert_eq!(
            result.artifacts().report_url.as_deref(),
            Some("http://api/reports/20240501_101500.pdf")
        );
        assert_eq!(
            result.artifacts().annotated_image_url.as_deref(),
            Some("http://api/images/20240501_101500.png")
        );
        assert_eq!(
            result.treatment(),
            &Treatment::Text("Remove infected branches and use fungicide.".to_string())
        );
    }

    #[test]
    fn test_flat_schema_healthy_label() {
        let result = normalize(&json!({
            "prediction": "Healthy",
            "confidence": 0.97,
            "severity": "N/A"
        }))
        .unwrap();
        assert!(result.is_healthy());
        assert_eq!(result.severity(), Severity::None);
    }

    #[test]
    fn test_flat_schema_unknown_severity_defaults() {
        let result = normalize(&json!({
            "prediction": "Leaf Curl",
            "confidence": 0.6,
            "severity": "Unknown"
        }))
        .unwrap();
        assert_eq!(result.severity(), Severity::Medium);
        assert!(!result.severity_is_rated());
        assert_eq!(result.severity_label(), "Unrated");
        assert_eq!(
            result.prevention(),
            leafguard_core::models::NO_PREVENTION_PLACEHOLDER
        );
    }

    #[test]
    fn test_legacy_schema_percent_confidence() {
        let result = normalize(&json!({
            "disease": "Powdery Mildew on Roses",
            "confidence": 87,
            "treatment": "Use neem oil spray.",
            "severity": "Medium"
        }))
        .unwrap();
        assert_eq!(result.confidence().value(), 0.87);
        assert_eq!(result.severity(), Severity::Medium);
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(normalize(&json!("oops")), Err(SchemaError::NotAnObject));
        assert_eq!(normalize(&json!({"label": "x"})), Err(SchemaError::UnknownShape));
        assert_eq!(
            normalize(&json!({"prediction": "x"})),
            Err(SchemaError::MissingField("confidence"))
        );
        assert_eq!(
            normalize(&json!({"disease": "x", "confidence": 250})),
            Err(SchemaError::InvalidConfidence(250.0))
        );
        assert_eq!(
            normalize(&json!({"error": "model not loaded"})),
            Err(SchemaError::Backend("model not loaded".to_string()))
        );
    }
}
