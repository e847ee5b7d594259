//! History and detail view rendering.
//!
//! Turns stored analyses into terminal text, Markdown or JSON.

use crate::analysis::HistorySummary;
use crate::cli::OutputFormat;
use crate::models::AnalysisRecord;
use anyhow::Result;
use serde::Serialize;

const BAR_WIDTH: usize = 20;

/// Render the history listing in the requested format.
///
/// `summary` describes the whole store; `records` are the ones listed,
/// which may be a filtered or truncated subset.
pub fn render_history(
    format: OutputFormat,
    summary: &HistorySummary,
    records: &[AnalysisRecord],
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_history_text(records, summary)),
        OutputFormat::Markdown => Ok(generate_history_markdown(records, summary)),
        OutputFormat::Json => generate_json_history(records, summary),
    }
}

/// Render one analysis in the requested format.
pub fn render_detail(format: OutputFormat, record: &AnalysisRecord) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_detail_text(record)),
        OutputFormat::Markdown => Ok(generate_detail_markdown(record)),
        OutputFormat::Json => serde_json::to_string_pretty(record).map_err(Into::into),
    }
}

/// `[##########----------]` for a percentage.
pub fn confidence_bar(confidence: f64, width: usize) -> String {
    let filled = ((confidence.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Short description of the stored image reference.
///
/// Data URIs are summarised instead of dumping the payload.
pub fn describe_image(image: &str) -> String {
    if image.is_empty() {
        return "(none)".to_string();
    }

    match image
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, payload)) => {
            let padding = payload.chars().rev().take_while(|&c| c == '=').count();
            let bytes = (payload.len() / 4 * 3).saturating_sub(padding);
            format!("embedded {} ({} bytes)", mime, bytes)
        }
        None => image.to_string(),
    }
}

fn generate_summary_line(summary: &HistorySummary) -> String {
    if summary.total == 0 {
        return "No analyses yet.".to_string();
    }

    let counts: Vec<String> = summary
        .by_diagnosis
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect();

    let mut line = format!(
        "{} analyses ({})",
        summary.total,
        counts.join(", ")
    );
    if let Some(avg) = summary.average_confidence {
        line.push_str(&format!(", average confidence {:.1}%", avg));
    }
    line
}

fn generate_shown_line(records: &[AnalysisRecord], summary: &HistorySummary) -> Option<String> {
    (records.len() != summary.total)
        .then(|| format!("Showing {} of {} analyses", records.len(), summary.total))
}

/// Generate the history listing as terminal text.
pub fn generate_history_text(records: &[AnalysisRecord], summary: &HistorySummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("📋 {}\n", generate_summary_line(summary)));
    if summary.needs_attention > 0 {
        output.push_str(&format!(
            "   ⚠️  {} need attention, {} urgent\n",
            summary.needs_attention, summary.urgent
        ));
    }
    if let Some(shown) = generate_shown_line(records, summary) {
        output.push_str(&format!("   {}\n", shown));
    }

    for record in records {
        output.push('\n');
        output.push_str(&format!(
            "{} Analysis #{}...\n",
            record.diagnosis.emoji(),
            record.short_id()
        ));
        output.push_str(&format!("   Id:         {}\n", record.id));
        output.push_str(&format!("   Date:       {}\n", record.formatted_date()));
        output.push_str(&format!("   Diagnosis:  {}\n", record.diagnosis));
        output.push_str(&format!(
            "   Confidence: {}% {} {}\n",
            record.confidence,
            confidence_bar(record.confidence, BAR_WIDTH),
            record.confidence_level()
        ));
    }

    output
}

/// Generate the detail view as terminal text.
pub fn generate_detail_text(record: &AnalysisRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("🐔 Analysis {}\n\n", record.id));
    if record.diagnosis.is_urgent() {
        output.push_str("   🚨 URGENT: contact a veterinarian immediately\n\n");
    }
    output.push_str(&format!(
        "   Diagnosis:  {} {}\n",
        record.diagnosis.emoji(),
        record.diagnosis
    ));
    output.push_str(&format!(
        "   Status:     {}\n",
        record.diagnosis.health_status()
    ));
    output.push_str(&format!(
        "   Confidence: {}% {} {}\n",
        record.confidence,
        confidence_bar(record.confidence, BAR_WIDTH),
        record.confidence_level()
    ));
    output.push_str(&format!("   Date:       {}\n", record.formatted_date()));
    output.push_str(&format!("   Image:      {}\n", describe_image(&record.image)));

    output.push_str("\n   Recommendations:\n");
    if record.recommendations.is_empty() {
        output.push_str("     (none)\n");
    }
    for (i, rec) in record.recommendations.iter().enumerate() {
        output.push_str(&format!("     {}. {}\n", i + 1, rec));
    }

    output
}

/// Generate the history listing as Markdown.
pub fn generate_history_markdown(records: &[AnalysisRecord], summary: &HistorySummary) -> String {
    let mut output = String::new();

    output.push_str("# Analysis History\n\n");
    output.push_str(&format!("{}\n\n", generate_summary_line(summary)));

    if !summary.by_diagnosis.is_empty() {
        output.push_str("| Diagnosis | Count |\n");
        output.push_str("|:---|:---:|\n");
        let mut counts: Vec<_> = summary.by_diagnosis.iter().collect();
        counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        for (label, count) in counts {
            output.push_str(&format!("| {} | {} |\n", label, count));
        }
        output.push('\n');
    }

    if records.is_empty() {
        return output;
    }

    output.push_str("## Analyses\n\n");
    if let Some(shown) = generate_shown_line(records, summary) {
        output.push_str(&format!("_{}_\n\n", shown));
    }
    output.push_str("| Id | Date | Diagnosis | Confidence |\n");
    output.push_str("|:---|:---|:---|:---:|\n");
    for record in records {
        output.push_str(&format!(
            "| `{}` | {} | {} {} | {}% |\n",
            record.id,
            record.formatted_date(),
            record.diagnosis.emoji(),
            record.diagnosis,
            record.confidence
        ));
    }
    output.push('\n');

    output
}

/// Generate the detail view as Markdown.
pub fn generate_detail_markdown(record: &AnalysisRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Analysis {}\n\n", record.id));
    if record.diagnosis.is_urgent() {
        output.push_str("> 🚨 **URGENT:** contact a veterinarian immediately.\n\n");
    }

    output.push_str(&format!(
        "- **Diagnosis:** {} {}\n",
        record.diagnosis.emoji(),
        record.diagnosis
    ));
    output.push_str(&format!(
        "- **Status:** {}\n",
        record.diagnosis.health_status()
    ));
    output.push_str(&format!(
        "- **Confidence:** {}% ({})\n",
        record.confidence,
        record.confidence_level()
    ));
    output.push_str(&format!("- **Date:** {}\n", record.formatted_date()));
    output.push_str(&format!(
        "- **Image:** {}\n\n",
        describe_image(&record.image)
    ));

    if !record.recommendations.is_empty() {
        output.push_str("## Recommendations\n\n");
        for (i, rec) in record.recommendations.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        output.push('\n');
    }

    output
}

#[derive(Serialize)]
struct HistoryDocument<'a> {
    summary: &'a HistorySummary,
    analyses: &'a [AnalysisRecord],
}

/// Generate the history listing as JSON.
pub fn generate_json_history(
    records: &[AnalysisRecord],
    summary: &HistorySummary,
) -> Result<String> {
    let doc = HistoryDocument {
        summary,
        analyses: records,
    };
    serde_json::to_string_pretty(&doc).map_err(Into::into)
}
