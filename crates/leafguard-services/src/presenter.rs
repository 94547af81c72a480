//! Result presenter
//!
//! Maps a [`DiagnosisResult`] onto the view shown to the user. Rendering decisions live here
//! and nowhere else; providers only hand over normalized results.

use leafguard_core::models::{Artifacts, DiagnosisResult, Severity, Treatment};
use serde::Serialize;
use std::fmt::Write;

pub const HEALTHY_HEADLINE: &str = "Great News!";
pub const HEALTHY_MESSAGE: &str =
    "Your plant appears to be healthy. Keep up the good work with plant care!";
pub const CHEMICAL_SAFETY_NOTE: &str =
    "Always follow product label instructions and safety precautions when using chemical treatments.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    /// High above 0.8, Moderate above 0.5, Low otherwise.
    pub fn from_fraction(value: f64) -> Self {
        if value > 0.8 {
            ConfidenceBand::High
        } else if value > 0.5 {
            ConfidenceBand::Moderate
        } else {
            ConfidenceBand::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TreatmentView {
    /// Organic and chemical plans side by side
    Tabs {
        organic: Vec<String>,
        chemical: Vec<String>,
    },
    /// One block of guidance
    Single { steps: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReportBody {
    Healthy {
        headline: String,
        message: String,
    },
    Diseased {
        severity: Severity,
        /// `Unrated` when the endpoint gave no usable severity
        severity_label: String,
        overview: Option<String>,
        treatment: TreatmentView,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub title: String,
    pub confidence_text: String,
    pub confidence_band: ConfidenceBand,
    pub body: ReportBody,
    pub prevention: String,
    pub artifacts: Artifacts,
}

/// Display policy for results.
#[derive(Debug, Clone, Copy)]
pub struct ResultPresenter {
    decimals: usize,
}

impl Default for ResultPresenter {
    fn default() -> Self {
        Self { decimals: 2 }
    }
}

impl ResultPresenter {
    pub fn new(decimals: usize) -> Self {
        Self { decimals }
    }

    pub fn present(&self, result: &DiagnosisResult) -> ReportView {
        let confidence = result.confidence();

        let body = if result.is_healthy() {
            ReportBody::Healthy {
                headline: HEALTHY_HEADLINE.to_string(),
                message: result.overview().unwrap_or(HEALTHY_MESSAGE).to_string(),
            }
        } else {
            ReportBody::Diseased {
                severity: result.severity(),
                severity_label: result.severity_label().to_string(),
                overview: result.overview().map(str::to_string),
                treatment: treatment_view(result.treatment()),
            }
        };

        ReportView {
            title: result.disease_name().to_string(),
            confidence_text: confidence.format_percent(self.decimals),
            confidence_band: ConfidenceBand::from_fraction(confidence.value()),
            body,
            prevention: result.prevention().to_string(),
            artifacts: result.artifacts().clone(),
        }
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render_text(&self, view: &ReportView) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", view.title);
        let _ = writeln!(
            out,
            "Confidence: {} ({:?})",
            view.confidence_text, view.confidence_band
        );

        match &view.body {
            ReportBody::Healthy { headline, message } => {
                let _ = writeln!(out, "\n{}\n{}", headline, message);
            }
            ReportBody::Diseased {
                severity_label,
                overview,
                treatment,
                ..
            } => {
                let _ = writeln!(out, "Severity: {}", severity_label);
                if let Some(overview) = overview {
                    let _ = writeln!(out, "\nQuick Overview\n{}", overview);
                }
                match treatment {
                    TreatmentView::Tabs { organic, chemical } => {
                        let _ = writeln!(out, "\nOrganic Treatments");
                        write_steps(&mut out, organic);
                        let _ = writeln!(out, "\nChemical Treatments");
                        write_steps(&mut out, chemical);
                        let _ = writeln!(out, "  ({})", CHEMICAL_SAFETY_NOTE);
                    }
                    TreatmentView::Single { steps } => {
                        let _ = writeln!(out, "\nTreatment");
                        write_steps(&mut out, steps);
                    }
                }
            }
        }

        let _ = writeln!(out, "\nPrevention\n{}", view.prevention);
        if let Some(report) = &view.artifacts.report_url {
            let _ = writeln!(out, "\nReport: {}", report);
        }
        if let Some(image) = &view.artifacts.annotated_image_url {
            let _ = writeln!(out, "Image: {}", image);
        }
        out
    }
}

fn write_steps(out: &mut String, steps: &[String]) {
    for step in steps {
        let _ = writeln!(out, "  - {}", step);
    }
}

fn treatment_view(treatment: &Treatment) -> TreatmentView {
    match treatment {
        Treatment::Plan { organic, chemical } if !organic.is_empty() && !chemical.is_empty() => {
            TreatmentView::Tabs {
                organic: organic.clone(),
                chemical: chemical.clone(),
            }
        }
        Treatment::Plan { organic, chemical } => TreatmentView::Single {
            steps: organic.iter().chain(chemical.iter()).cloned().collect(),
        },
        Treatment::Text(text) => TreatmentView::Single {
            steps: vec![text.clone()],
        },
    }
}
