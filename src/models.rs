//! Data models for stored analyses.
//!
//! This module contains the analysis record persisted in the result
//! store, the diagnosis enumeration, and the fixed lookup tables the
//! simulated analysis draws from.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence values the simulated analysis picks from.
pub const CONFIDENCE_CANDIDATES: [f64; 6] = [94.2, 87.6, 91.3, 79.8, 96.7, 83.1];

/// Outcome of an analysis.
///
/// Values read back from storage that are not one of the four known
/// outcomes are kept verbatim in `Other` instead of failing the load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Diagnosis {
    Healthy,
    Coccidiosis,
    NewcastleDisease,
    Salmonella,
    Other(String),
}

impl Diagnosis {
    /// The outcomes the simulated analysis chooses between.
    pub const ALL: [Diagnosis; 4] = [
        Diagnosis::Healthy,
        Diagnosis::Coccidiosis,
        Diagnosis::NewcastleDisease,
        Diagnosis::Salmonella,
    ];

    /// Display label, identical to the persisted form.
    pub fn label(&self) -> &str {
        match self {
            Diagnosis::Healthy => "Healthy",
            Diagnosis::Coccidiosis => "Coccidiosis",
            Diagnosis::NewcastleDisease => "Newcastle Disease",
            Diagnosis::Salmonella => "Salmonella",
            Diagnosis::Other(s) => s,
        }
    }

    /// Canned recommendations. Unknown outcomes use the Healthy list.
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Diagnosis::Coccidiosis => &[
                "Isolate affected birds immediately",
                "Contact veterinarian for treatment",
                "Provide clean water with electrolytes",
                "Deep clean and disinfect housing",
                "Monitor closely for 1-2 weeks",
            ],
            Diagnosis::NewcastleDisease => &[
                "URGENT: Contact veterinarian immediately",
                "Quarantine all birds",
                "Report to local authorities",
                "Implement strict biosecurity",
                "Consider vaccination program",
            ],
            Diagnosis::Salmonella => &[
                "Isolate affected birds",
                "Implement strict hygiene protocols",
                "Test water and feed sources",
                "Consult veterinarian for treatment",
                "Monitor flock health daily",
            ],
            Diagnosis::Healthy | Diagnosis::Other(_) => &[
                "Continue current feeding and housing practices",
                "Maintain regular health monitoring",
                "Ensure clean water supply",
                "Keep good biosecurity measures",
            ],
        }
    }

    pub fn health_status(&self) -> HealthStatus {
        match self {
            Diagnosis::Healthy => HealthStatus::Good,
            Diagnosis::Coccidiosis | Diagnosis::NewcastleDisease | Diagnosis::Salmonella => {
                HealthStatus::DiseaseDetected
            }
            Diagnosis::Other(_) => HealthStatus::Unknown,
        }
    }

    /// Newcastle disease is notifiable and needs a vet right away.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Diagnosis::NewcastleDisease)
    }

    /// Returns an emoji representation of the diagnosis.
    pub fn emoji(&self) -> &'static str {
        match self.health_status() {
            HealthStatus::Good => "🟢",
            HealthStatus::DiseaseDetected if self.is_urgent() => "🔴",
            HealthStatus::DiseaseDetected => "🟠",
            HealthStatus::Unknown => "⚪",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Diagnosis {
    fn from(s: &str) -> Self {
        match s {
            "Healthy" => Diagnosis::Healthy,
            "Coccidiosis" => Diagnosis::Coccidiosis,
            "Newcastle Disease" => Diagnosis::NewcastleDisease,
            "Salmonella" => Diagnosis::Salmonella,
            other => Diagnosis::Other(other.to_string()),
        }
    }
}

impl From<String> for Diagnosis {
    fn from(s: String) -> Self {
        Diagnosis::from(s.as_str())
    }
}

impl From<Diagnosis> for String {
    fn from(d: Diagnosis) -> Self {
        match d {
            Diagnosis::Other(s) => s,
            known => known.label().to_string(),
        }
    }
}

/// Coarse flock status derived from the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Good,
    DiseaseDetected,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Good => write!(f, "Good"),
            HealthStatus::DiseaseDetected => write!(f, "Disease Detected"),
            HealthStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Display bucket for a confidence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    Low,
    Moderate,
    High,
}

impl ConfidenceLevel {
    pub fn from_percent(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceLevel::High
        } else if confidence >= 60.0 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "Low"),
            ConfidenceLevel::Moderate => write!(f, "Moderate"),
            ConfidenceLevel::High => write!(f, "High"),
        }
    }
}

/// One stored analysis outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique identifier (`analysis_<millis>_<suffix>` for new records).
    pub id: String,
    /// Creation time.
    pub date: DateTime<Utc>,
    /// Diagnosis label.
    pub diagnosis: Diagnosis,
    /// Confidence percentage in [0, 100].
    pub confidence: f64,
    /// Data URI or relative path of the analysed image.
    pub image: String,
    /// Ordered follow-up actions.
    pub recommendations: Vec<String>,
}

impl AnalysisRecord {
    /// Creates a record with the canned recommendations for `diagnosis`.
    pub fn new(
        id: String,
        date: DateTime<Utc>,
        diagnosis: Diagnosis,
        confidence: f64,
        image: String,
    ) -> Self {
        let recommendations = diagnosis
            .recommendations()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            id,
            date,
            diagnosis,
            confidence,
            image,
            recommendations,
        }
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_percent(self.confidence)
    }

    /// First 12 characters of the id, as shown on history cards.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(12) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// Creation date as `Jun 29, 2025, 02:30 PM`.
    pub fn formatted_date(&self) -> String {
        self.date.format("%b %-d, %Y, %I:%M %p").to_string()
    }
}

/// Records shown when storage holds nothing usable.
pub fn sample_records() -> Vec<AnalysisRecord> {
    let sample = |id: &str,
                  (y, mo, d, h, mi): (i32, u32, u32, u32, u32),
                  diagnosis: &str,
                  confidence: f64,
                  image: &str,
                  recommendations: [&str; 2]| AnalysisRecord {
        id: id.to_string(),
        date: Utc
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap_or_default(),
        diagnosis: Diagnosis::from(diagnosis),
        confidence,
        image: image.to_string(),
        recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
    };

    vec![
        sample(
            "sample_1",
            (2025, 6, 29, 14, 30),
            "Healthy",
            94.2,
            "images/salmo.592.jpg",
            ["Continue current practices", "Maintain monitoring"],
        ),
        sample(
            "sample_2",
            (2025, 6, 29, 16, 45),
            "Coccidiosis",
            87.6,
            "images/salmo.855.jpg",
            ["Isolate birds", "Contact veterinarian"],
        ),
        sample(
            "sample_3",
            (2025, 6, 30, 9, 15),
            "Newcastle Disease",
            91.3,
            "images/salmo.969.jpg",
            ["URGENT vet contact", "Quarantine all birds"],
        ),
        sample(
            "sample_4",
            (2025, 6, 30, 11, 22),
            "Salmonella",
            79.8,
            "images/salmo.997.jpg",
            ["Isolate birds", "Hygiene protocols"],
        ),
        sample(
            "sample_5",
            (2025, 6, 30, 13, 5),
            "Healthy",
            96.7,
            "images/salmo_FgtaloI.855.jpg",
            ["Continue monitoring", "Good practices"],
        ),
    ]
}
