//! History statistics.
//!
//! Summaries over the stored analyses, shown at the top of the history
//! listing.

use crate::models::{AnalysisRecord, Diagnosis, HealthStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and averages over a list of analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Number of analyses.
    pub total: usize,
    /// Analyses per diagnosis label.
    pub by_diagnosis: BTreeMap<String, usize>,
    /// Mean confidence, `None` for an empty history.
    pub average_confidence: Option<f64>,
    /// Analyses whose diagnosis is anything but healthy.
    pub needs_attention: usize,
    /// Analyses with an urgent diagnosis.
    pub urgent: usize,
}

impl HistorySummary {
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            *summary
                .by_diagnosis
                .entry(record.diagnosis.label().to_string())
                .or_insert(0) += 1;

            if record.diagnosis.health_status() != HealthStatus::Good {
                summary.needs_attention += 1;
            }
            if record.diagnosis.is_urgent() {
                summary.urgent += 1;
            }
        }

        if !records.is_empty() {
            let sum: f64 = records.iter().map(|r| r.confidence).sum();
            summary.average_confidence = Some(sum / records.len() as f64);
        }

        summary
    }

    /// Count for one diagnosis.
    #[allow(dead_code)] // Utility for callers that need a single count
    pub fn count(&self, diagnosis: &Diagnosis) -> usize {
        self.by_diagnosis
            .get(diagnosis.label())
            .copied()
            .unwrap_or(0)
    }
}

/// Records with `diagnosis`, in store order.
pub fn filter_by_diagnosis<'a>(
    records: &'a [AnalysisRecord],
    diagnosis: &Diagnosis,
) -> Vec<&'a AnalysisRecord> {
    records
        .iter()
        .filter(|r| &r.diagnosis == diagnosis)
        .collect()
}
