//! Simulated diagnoses for deployments without a backend.

use crate::provider::DiagnosisProvider;
use async_trait::async_trait;
use leafguard_core::models::{
    Confidence, DiagnosisResult, Severity, Treatment, UploadCandidate,
};
use leafguard_core::LeafguardError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;

/// Picks a diagnosis uniformly at random from a fixed catalog after an artificial delay.
pub struct MockDiagnosisProvider {
    catalog: Vec<DiagnosisResult>,
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl MockDiagnosisProvider {
    pub fn new(delay: Duration) -> Self {
        Self::with_rng(default_catalog(), delay, StdRng::from_os_rng())
    }

    /// Deterministic picks for tests and demos.
    pub fn with_seed(delay: Duration, seed: u64) -> Self {
        Self::with_rng(default_catalog(), delay, StdRng::seed_from_u64(seed))
    }

    pub fn with_catalog(catalog: Vec<DiagnosisResult>, delay: Duration) -> Self {
        Self::with_rng(catalog, delay, StdRng::from_os_rng())
    }

    fn with_rng(catalog: Vec<DiagnosisResult>, delay: Duration, rng: StdRng) -> Self {
        Self {
            catalog,
            delay,
            rng: Mutex::new(rng),
        }
    }

    pub fn catalog(&self) -> &[DiagnosisResult] {
        &self.catalog
    }
}

#[async_trait]
impl DiagnosisProvider for MockDiagnosisProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn diagnose(&self, candidate: &UploadCandidate) -> Result<DiagnosisResult, LeafguardError> {
        if self.catalog.is_empty() {
            return Err(LeafguardError::Internal(
                "Mock diagnosis catalog is empty".to_string(),
            ));
        }

        tokio::time::sleep(self.delay).await;

        let index = self.rng.lock().await.random_range(0..self.catalog.len());
        let result = self.catalog[index].clone();

        tracing::info!(
            provider = "mock",
            file_name = %candidate.file().file_name,
            disease = %result.disease_name(),
            "Simulated diagnosis"
        );

        Ok(result)
    }
}

fn catalog_entry(
    name: &str,
    confidence: f64,
    severity: Severity,
    overview: Option<&str>,
    treatment: Treatment,
    prevention: Option<&str>,
) -> DiagnosisResult {
    DiagnosisResult::builder(name, Confidence::saturating(confidence))
        .severity(Some(severity))
        .overview(overview.map(str::to_string))
        .treatment(Some(treatment))
        .prevention(prevention.map(str::to_string))
        .build()
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Plausible diagnoses covering each presentation branch.
pub fn default_catalog() -> Vec<DiagnosisResult> {
    vec![
        catalog_entry(
            "Tomato Late Blight",
            0.92,
            Severity::High,
            Some("Late blight is a destructive disease affecting tomatoes and potatoes, caused by the oomycete Phytophthora infestans. It thrives in cool, moist conditions."),
            Treatment::Plan {
                organic: lines(&[
                    "Remove and destroy infected plants immediately.",
                    "Ensure good air circulation around plants.",
                    "Apply copper-based fungicides preventatively.",
                    "Water at the base of plants to keep foliage dry.",
                ]),
                chemical: lines(&[
                    "Apply fungicides containing mancozeb, chlorothalonil, or fluopicolide.",
                    "Alternate fungicide types to prevent resistance.",
                    "Follow label instructions carefully for application rates and timing.",
                ]),
            },
            Some("Plant resistant varieties and avoid overhead irrigation."),
        ),
        catalog_entry(
            "Powdery Mildew on Roses",
            0.87,
            Severity::Medium,
            None,
            Treatment::Text(
                "Use potassium bicarbonate or neem oil spray. Prune for better airflow. Avoid overhead watering.".to_string(),
            ),
            None,
        ),
        catalog_entry(
            "Apple Scab",
            0.85,
            Severity::Medium,
            Some("Apple scab is a common fungal disease caused by Venturia inaequalis. It affects leaves, fruit, and twigs."),
            Treatment::Plan {
                organic: lines(&[
                    "Rake and destroy fallen leaves in autumn to reduce overwintering spores.",
                    "Prune trees for better air circulation.",
                    "Apply sulfur or copper-based sprays.",
                    "Choose scab-resistant apple varieties.",
                ]),
                chemical: lines(&[
                    "Apply fungicides like captan, myclobutanil, or thiophanate-methyl.",
                    "Timing is critical; start applications at green tip and continue through petal fall.",
                    "Consult local extension services for recommended spray schedules.",
                ]),
            },
            Some("Improve air circulation and avoid overhead watering."),
        ),
        catalog_entry(
            "Corn Common Rust",
            0.95,
            Severity::Low,
            None,
            Treatment::Text(
                "Usually minor; resistant varieties are key. Fungicides may be needed for susceptible sweet corn.".to_string(),
            ),
            None,
        ),
        catalog_entry(
            "Potato Early Blight",
            0.89,
            Severity::High,
            None,
            Treatment::Text(
                "Practice crop rotation. Apply protective fungicides. Ensure adequate plant nutrition.".to_string(),
            ),
            None,
        ),
        catalog_entry(
            "Healthy Potato Plant",
            0.99,
            Severity::None,
            Some("The plant appears to be in good health. Continue good agricultural practices."),
            Treatment::Plan {
                organic: Vec::new(),
                chemical: Vec::new(),
            },
            Some("Maintain regular inspection and care."),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafguard_core::models::{PreviewUri, SelectedFile};
    use std::collections::HashSet;

    fn candidate() -> UploadCandidate {
        UploadCandidate::new(
            SelectedFile::new("leaf.jpg", "image/jpeg", vec![1, 2, 3]),
            PreviewUri::new("data:image/jpeg;base64,AQID".to_string()),
        )
    }

    #[test]
    fn test_catalog_shape() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 6);
        for result in &catalog {
            let confidence = result.confidence().value();
            assert!(confidence > 0.0 && confidence < 1.0);
            assert!(!result.disease_name().is_empty());
            assert_eq!(result.is_healthy(), result.severity() == Severity::None);
        }
        assert!(catalog[5].is_healthy());
    }

    #[tokio::test]
    async fn test_every_pick_is_well_formed() {
        let provider = MockDiagnosisProvider::with_seed(Duration::ZERO, 7);
        let mut seen = HashSet::new();

        for _ in 0..200 {
            let result = provider.diagnose(&candidate()).await.unwrap();
            let confidence = result.confidence().value();
            assert!(confidence > 0.0 && confidence < 1.0);
            assert!(!result.disease_name().is_empty());
            seen.insert(result.disease_name().to_string());
        }

        assert_eq!(seen.len(), provider.catalog().len());
    }

    #[tokio::test]
    async fn test_same_seed_same_sequence() {
        let a = MockDiagnosisProvider::with_seed(Duration::ZERO, 42);
        let b = MockDiagnosisProvider::with_seed(Duration::ZERO, 42);

        for _ in 0..10 {
            assert_eq!(
                a.diagnose(&candidate()).await.unwrap(),
                b.diagnose(&candidate()).await.unwrap()
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_configured_delay() {
        let provider = MockDiagnosisProvider::with_seed(Duration::from_millis(2500), 1);
        let start = tokio::time::Instant::now();

        provider.diagnose(&candidate()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_an_error() {
        let provider = MockDiagnosisProvider::with_catalog(Vec::new(), Duration::ZERO);
        assert!(provider.diagnose(&candidate()).await.is_err());
    }
}
