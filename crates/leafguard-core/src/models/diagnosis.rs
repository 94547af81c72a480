use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Label used when the classifier reports no disease.
pub const HEALTHY_LABEL: &str = "Healthy";
/// Label used when the endpoint omits the disease name.
pub const UNKNOWN_DISEASE_LABEL: &str = "Unknown Disease";
pub const NO_TREATMENT_PLACEHOLDER: &str = "No treatment recommendation available.";
pub const NO_PREVENTION_PLACEHOLDER: &str = "No prevention tips available.";
pub const HEALTHY_TREATMENT_TEXT: &str = "No treatment needed.";
/// Shown in place of the severity when the endpoint gave no usable rating.
pub const UNRATED_SEVERITY_LABEL: &str = "Unrated";

/// Severity reported alongside a diagnosis. Informational only, never computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse the labels historically emitted by diagnosis backends.
    ///
    /// Returns `None` for labels that do not map onto the scale (e.g. "Unknown").
    pub fn parse_lenient(label: &str) -> Option<Severity> {
        match label.trim().to_lowercase().as_str() {
            "" | "none" | "n/a" | "na" => Some(Severity::None),
            "low" | "mild" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" | "severe" => Some(Severity::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Whether the diagnosis denotes a healthy plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantCondition {
    Healthy,
    Diseased,
}

impl PlantCondition {
    /// Classify a label such as `Healthy`, `Potato___healthy` or `Healthy Potato Plant`.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.to_lowercase().replace('_', " ");
        if normalized.split_whitespace().any(|word| word == "healthy") {
            PlantCondition::Healthy
        } else {
            PlantCondition::Diseased
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, PlantCondition::Healthy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Confidence out of range: {0}")]
pub struct ConfidenceError(pub f64);

/// Classifier confidence, always stored as a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn from_fraction(value: f64) -> Result<Self, ConfidenceError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Confidence(value))
        } else {
            Err(ConfidenceError(value))
        }
    }

    pub fn from_percent(value: f64) -> Result<Self, ConfidenceError> {
        Self::from_fraction(value / 100.0).map_err(|_| ConfidenceError(value))
    }

    /// Clamp into `[0, 1]`; NaN becomes 0.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Confidence(0.0)
        } else {
            Confidence(value.clamp(0.0, 1.0))
        }
    }

    /// Accept either a fraction or an already scaled percentage.
    ///
    /// Values above 1 are read as percentages.
    pub fn from_reported(value: f64) -> Result<Self, ConfidenceError> {
        if value > 1.0 {
            Self::from_percent(value)
        } else {
            Self::from_fraction(value)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn percent(&self) -> f64 {
        self.0 * 100.0
    }

    /// Format as a percentage with a fixed number of decimals, e.g. `92.00%`.
    pub fn format_percent(&self, decimals: usize) -> String {
        format!("{:.*}%", decimals, self.percent())
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::from_fraction(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Treatment guidance, either split into organic/chemical plans or a single block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    Plan {
        organic: Vec<String>,
        chemical: Vec<String>,
    },
    Text(String),
}

impl Treatment {
    pub fn placeholder() -> Self {
        Treatment::Text(NO_TREATMENT_PLACEHOLDER.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Treatment::Plan { organic, chemical } => organic.is_empty() && chemical.is_empty(),
            Treatment::Text(text) => text.trim().is_empty(),
        }
    }
}

/// Downloadable artifacts produced by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_image_url: Option<String>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.report_url.is_none() && self.annotated_image_url.is_none()
    }
}

/// Derive a server record id from an artifact reference such as `/reports/20240501_101500.pdf`.
///
/// The backend names every artifact of one diagnosis after the same timestamp, so the file
/// stem identifies the record.
pub fn record_id_from_reference(reference: &str) -> Option<String> {
    let file_name = reference
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    if stem.trim().is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Normalized diagnosis. Immutable once built.
///
/// Healthy results always carry `Severity::None`; diseased results never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    disease_name: String,
    condition: PlantCondition,
    confidence: Confidence,
    severity: Severity,
    /// The endpoint reported no usable severity for a diseased result
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    severity_unrated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overview: Option<String>,
    treatment: Treatment,
    prevention: String,
    #[serde(default, skip_serializing_if = "Artifacts::is_empty")]
    artifacts: Artifacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record_id: Option<String>,
}

impl DiagnosisResult {
    pub fn builder(disease_name: impl Into<String>, confidence: Confidence) -> DiagnosisResultBuilder {
        DiagnosisResultBuilder {
            disease_name: disease_name.into(),
            confidence,
            condition: None,
            severity: None,
            overview: None,
            treatment: None,
            prevention: None,
            artifacts: Artifacts::default(),
            record_id: None,
        }
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }

    pub fn condition(&self) -> PlantCondition {
        self.condition
    }

    pub fn is_healthy(&self) -> bool {
        self.condition.is_healthy()
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the severity came from the endpoint rather than the unrated fallback.
    pub fn severity_is_rated(&self) -> bool {
        !self.severity_unrated
    }

    /// Severity as displayed, `Unrated` when the endpoint gave no usable rating.
    pub fn severity_label(&self) -> &'static str {
        if self.severity_unrated {
            UNRATED_SEVERITY_LABEL
        } else {
            self.severity.as_str()
        }
    }

    pub fn overview(&self) -> Option<&str> {
        self.overview.as_deref()
    }

    pub fn treatment(&self) -> &Treatment {
        &self.treatment
    }

    pub fn prevention(&self) -> &str {
        &self.prevention
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Identifier assigned by the diagnosis endpoint, if any.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }
}

pub struct DiagnosisResultBuilder {
    disease_name: String,
    confidence: Confidence,
    condition: Option<PlantCondition>,
    severity: Option<Severity>,
    overview: Option<String>,
    treatment: Option<Treatment>,
    prevention: Option<String>,
    artifacts: Artifacts,
    record_id: Option<String>,
}

impl DiagnosisResultBuilder {
    /// Override label-based health detection (for schemas with an explicit flag).
    pub fn condition(mut self, condition: PlantCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }

    pub fn overview(mut self, overview: Option<String>) -> Self {
        self.overview = overview.filter(|o| !o.trim().is_empty());
        self
    }

    pub fn treatment(mut self, treatment: Option<Treatment>) -> Self {
        self.treatment = treatment.filter(|t| !t.is_empty());
        self
    }

    pub fn prevention(mut self, prevention: Option<String>) -> Self {
        self.prevention = prevention.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn artifacts(mut self, artifacts: Artifacts) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn record_id(mut self, record_id: Option<String>) -> Self {
        self.record_id = record_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn build(self) -> DiagnosisResult {
        let disease_name = match self.disease_name.trim() {
            "" => UNKNOWN_DISEASE_LABEL.to_string(),
            name => name.to_string(),
        };
        let condition = self
            .condition
            .unwrap_or_else(|| PlantCondition::from_label(&disease_name));

        let severity_unrated = condition == PlantCondition::Diseased
            && matches!(self.severity, Some(Severity::None) | None);
        let (severity, treatment) = match condition {
            PlantCondition::Healthy => (
                Severity::None,
                self.treatment
                    .unwrap_or_else(|| Treatment::Text(HEALTHY_TREATMENT_TEXT.to_string())),
            ),
            PlantCondition::Diseased => (
                // Unrated diseases sort at the midpoint of the scale.
                match self.severity {
                    Some(Severity::None) | None => Severity::Medium,
                    Some(severity) => severity,
                },
                self.treatment.unwrap_or_else(Treatment::placeholder),
            ),
        };

        DiagnosisResult {
            disease_name,
            condition,
            confidence: self.confidence,
            severity,
            severity_unrated,
            overview: self.overview,
            treatment,
            prevention: self
                .prevention
                .unwrap_or_else(|| NO_PREVENTION_PLACEHOLDER.to_string()),
            artifacts: self.artifacts,
            record_id: self.record_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidence(value: f64) -> Confidence {
        Confidence::from_fraction(value).unwrap()
    }

    #[test]
    fn test_severity_parse_lenient() {
        assert_eq!(Severity::parse_lenient("Moderate"), Some(Severity::Medium));
        assert_eq!(Severity::parse_lenient("N/A"), Some(Severity::None));
        assert_eq!(Severity::parse_lenient(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse_lenient("Unknown"), None);
    }

    #[test]
    fn test_condition_from_label() {
        assert!(PlantCondition::from_label("Healthy").is_healthy());
        assert!(PlantCondition::from_label("Potato___healthy").is_healthy());
        assert!(PlantCondition::from_label("Healthy Potato Plant").is_healthy());
        assert!(!PlantCondition::from_label("Apple Scab").is_healthy());
        assert!(!PlantCondition::from_label("Unhealthyish Rot").is_healthy());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(Confidence::from_fraction(1.2).is_err());
        assert!(Confidence::from_fraction(-0.1).is_err());
        assert!(Confidence::from_fraction(f64::NAN).is_err());
        assert_eq!(Confidence::from_percent(92.0).unwrap().value(), 0.92);
        assert_eq!(Confidence::from_reported(87.0).unwrap().value(), 0.87);
        assert_eq!(Confidence::from_reported(0.87).unwrap().value(), 0.87);
        assert!(Confidence::from_reported(150.0).is_err());
        assert_eq!(Confidence::saturating(1.7).value(), 1.0);
        assert_eq!(Confidence::saturating(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_confidence_format() {
        assert_eq!(confidence(0.92).format_percent(2), "92.00%");
        assert_eq!(confidence(0.921).format_percent(0), "92%");
    }

    #[test]
    fn test_healthy_result_has_no_severity() {
        let result = DiagnosisResult::builder("Healthy", confidence(0.99))
            .severity(Some(Severity::High))
            .build();
        assert!(result.is_healthy());
        assert_eq!(result.severity(), Severity::None);
        assert_eq!(
            result.treatment(),
            &Treatment::Text(HEALTHY_TREATMENT_TEXT.to_string())
        );
    }

    #[test]
    fn test_diseased_result_defaults() {
        let result = DiagnosisResult::builder("Apple Scab", confidence(0.78))
            .severity(Some(Severity::None))
            .treatment(Some(Treatment::Text("  ".to_string())))
            .build();
        assert!(!result.is_healthy());
        assert_eq!(result.severity(), Severity::Medium);
        assert_eq!(result.treatment(), &Treatment::placeholder());
        assert_eq!(result.prevention(), NO_PREVENTION_PLACEHOLDER);
    }

    #[test]
    fn test_record_id_from_reference() {
        assert_eq!(
            record_id_from_reference("/reports/20240501_101500.pdf").as_deref(),
            Some("20240501_101500")
        );
        assert_eq!(
            record_id_from_reference("20240501_101500.pdf").as_deref(),
            Some("20240501_101500")
        );
        assert_eq!(
            record_id_from_reference("http://host/images/abc.png?v=2").as_deref(),
            Some("abc")
        );
        assert_eq!(record_id_from_reference("/reports/"), None);
    }

    #[test]
    fn test_empty_name_uses_unknown_label() {
        let result = DiagnosisResult::builder("  ", confidence(0.5)).build();
        assert_eq!(result.disease_name(), UNKNOWN_DISEASE_LABEL);
    }

    #[test]
    fn test_result_json_shape() {
        let result = DiagnosisResult::builder("Apple Scab", confidence(0.85))
            .severity(Some(Severity::Medium))
            .treatment(Some(Treatment::Plan {
                organic: vec!["Prune".to_string()],
                chemical: vec!["Captan".to_string()],
            }))
            .build();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["confidence"], 0.85);
        assert_eq!(json["condition"], "diseased");
        assert_eq!(json["treatment"]["plan"]["organic"][0], "Prune");
        assert!(json.get("artifacts").is_none());

        let back: DiagnosisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_result_rejects_out_of_range_confidence() {
        let json = serde_json::json!({
            "disease_name": "Apple Scab",
            "condition": "diseased",
            "confidence": 3.0,
            "severity": "Medium",
            "treatment": { "text": "x" },
            "prevention": "y"
        });
        assert!(serde_json::from_value::<DiagnosisResult>(json).is_err());
    }
}
