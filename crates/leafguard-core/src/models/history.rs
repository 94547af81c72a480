use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::diagnosis::DiagnosisResult;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 5;

/// Follow-up status of a recorded diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentStatus {
    Healthy,
    Treated,
    Monitoring,
    Untreated,
}

impl TreatmentStatus {
    pub fn parse_lenient(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "healthy" => Some(TreatmentStatus::Healthy),
            "treated" => Some(TreatmentStatus::Treated),
            "monitoring" => Some(TreatmentStatus::Monitoring),
            "untreated" => Some(TreatmentStatus::Untreated),
            _ => None,
        }
    }
}

impl Display for TreatmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TreatmentStatus::Healthy => write!(f, "healthy"),
            TreatmentStatus::Treated => write!(f, "treated"),
            TreatmentStatus::Monitoring => write!(f, "monitoring"),
            TreatmentStatus::Untreated => write!(f, "untreated"),
        }
    }
}

/// A diagnosis committed to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source_image_reference: String,
    pub status: TreatmentStatus,
    #[serde(flatten)]
    pub result: DiagnosisResult,
}

impl HistoryEntry {
    /// Build an entry for a fresh diagnosis.
    ///
    /// Uses the endpoint-assigned record id when present, otherwise a generated one.
    pub fn from_result(
        result: DiagnosisResult,
        source_image_reference: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let id = result
            .record_id()
            .map(str::to_string)
            .unwrap_or_else(|| generate_entry_id(timestamp));
        let status = if result.is_healthy() {
            TreatmentStatus::Healthy
        } else {
            TreatmentStatus::Untreated
        };

        Self {
            id,
            timestamp,
            source_image_reference: source_image_reference.into(),
            status,
            result,
        }
    }
}

/// Generate a history id: `diag_<unix millis>_<5 base36 chars>`.
pub fn generate_entry_id(timestamp: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.random_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("diag_{}_{}", timestamp.timestamp_millis(), suffix)
}

/// Summary counters shown above the history list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub treated: usize,
    pub monitoring: usize,
    pub untreated: usize,
    pub healthy: usize,
}

impl HistoryStats {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        entries.iter().fold(
            HistoryStats {
                total: entries.len(),
                ..Default::default()
            },
            |mut stats, entry| {
                match entry.status {
                    TreatmentStatus::Treated => stats.treated += 1,
                    TreatmentStatus::Monitoring => stats.monitoring += 1,
                    TreatmentStatus::Untreated => stats.untreated += 1,
                    TreatmentStatus::Healthy => {}
                }
                if entry.result.is_healthy() {
                    stats.healthy += 1;
                }
                stats
            },
        )
    }
}
