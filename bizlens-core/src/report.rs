//! Report post-processing
//!
//! Extracts structured signals from the generated text and assembles the
//! final response payload. The only signal today is the chart marker: when
//! the generator includes it, the response type flips to `chart` and a
//! minimal series is built from the leading raw rows so a front end can
//! render something immediately.

use serde::{Deserialize, Serialize};

use crate::aggregate::TableSummary;
use crate::classify::ColumnSignals;
use crate::prompt::CHART_MARKER;
use crate::stats::FullAnalysis;
use crate::types::{
    Cell, Decision, EligibilityReport, Industry, RoleMapping, Table, ValidatedTotals,
};
use crate::validate::ConfidenceLevel;

/// Rows used to build the fallback chart series.
const CHART_ROWS: usize = 10;

/// Kind of response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Text,
    Chart,
}

/// One point in the fallback chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Flattened eligibility flags, mirroring the response contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFlags {
    pub growth_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_reason: Option<String>,
    pub stats_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_reason: Option<String>,
    pub forecast_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_reason: Option<String>,
}

impl From<&EligibilityReport> for ValidationFlags {
    fn from(report: &EligibilityReport) -> Self {
        let split = |d: &Decision| (d.allowed, d.reason.clone());
        let (growth_allowed, growth_reason) = split(&report.growth);
        let (stats_allowed, stats_reason) = split(&report.statistics);
        let (forecast_allowed, forecast_reason) = split(&report.forecast);
        Self {
            growth_allowed,
            growth_reason,
            stats_allowed,
            stats_reason,
            forecast_allowed,
            forecast_reason,
        }
    }
}

/// The core's contribution to the final analysis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub response_type: ResponseType,
    /// Generated report text, marker stripped
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<Vec<ChartPoint>>,
    pub confidence: ConfidenceLevel,
    pub industry: Industry,
    /// Primary-column statistics; `None` when gated off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<FullAnalysis>,
    pub available_columns: ColumnSignals,
    /// Resolved role-to-column assignment
    pub roles: RoleMapping,
    pub validation_flags: ValidationFlags,
    pub validated_totals: ValidatedTotals,
    /// Lossless aggregation of the analyzed table
    pub summary: TableSummary,
    pub warnings: Vec<String>,
}

/// Outcome of scanning the completion for structured signals.
#[derive(Debug, Clone)]
pub struct ProcessedCompletion {
    pub response_type: ResponseType,
    pub content: String,
    pub chart_data: Option<Vec<ChartPoint>>,
}

/// Scan a completion for the chart marker and build the chart series from
/// the first rows of the raw table when present.
pub fn process_completion(answer: &str, table: &Table) -> ProcessedCompletion {
    if !answer.contains(CHART_MARKER) {
        return ProcessedCompletion {
            response_type: ResponseType::Text,
            content: answer.to_string(),
            chart_data: None,
        };
    }

    let content = answer.replace(CHART_MARKER, "").trim().to_string();
    let chart_data = chart_series(table);

    tracing::debug!(points = chart_data.len(), "Chart marker detected");

    ProcessedCompletion {
        response_type: ResponseType::Chart,
        content,
        chart_data: Some(chart_data),
    }
}

/// Minimal chart series from the first rows: label from the leading cells,
/// value from the last column.
fn chart_series(table: &Table) -> Vec<ChartPoint> {
    table
        .rows
        .iter()
        .take(CHART_ROWS)
        .enumerate()
        .map(|(i, row)| {
            let first = row.first().map(Cell::render).unwrap_or_default();
            let second = row
                .get(1)
                .map(Cell::render)
                .unwrap_or_else(|| i.to_string());
            let value = row
                .last()
                .and_then(Cell::as_number)
                .unwrap_or(0.0);
            ChartPoint {
                label: format!("{} - {}", first, second),
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_table;

    fn table() -> Table {
        parse_table("Month,Channel,Revenue\nJan,organic,100\nFeb,paid,200\nMar,organic,300\n")
            .unwrap()
    }

    #[test]
    fn test_plain_answer_stays_text() {
        let processed = process_completion("Revenue grew 20%.", &table());
        assert_eq!(processed.response_type, ResponseType::Text);
        assert_eq!(processed.content, "Revenue grew 20%.");
        assert!(processed.chart_data.is_none());
    }

    #[test]
    fn test_chart_marker_flips_type_and_strips_marker() {
        let processed = process_completion("Revenue grew 20%.\nSHOW_CHART", &table());
        assert_eq!(processed.response_type, ResponseType::Chart);
        assert_eq!(processed.content, "Revenue grew 20%.");
        let chart = processed.chart_data.unwrap();
        assert_eq!(chart.len(), 3);
        assert_eq!(chart[0].label, "Jan - organic");
        assert_eq!(chart[0].value, 100.0);
    }

    #[test]
    fn test_chart_series_caps_at_ten_rows() {
        let mut raw = String::from("Month,Revenue\n");
        for i in 0..25 {
            raw.push_str(&format!("P{},{}\n", i, i * 10));
        }
        let table = parse_table(&raw).unwrap();
        let processed = process_completion("SHOW_CHART", &table);
        assert_eq!(processed.chart_data.unwrap().len(), 10);
    }

    #[test]
    fn test_non_numeric_last_column_charts_as_zero() {
        let table = parse_table("Month,Status\nJan,active\nFeb,churned\n").unwrap();
        let processed = process_completion("SHOW_CHART", &table);
        let chart = processed.chart_data.unwrap();
        assert_eq!(chart[0].value, 0.0);
    }

    #[test]
    fn test_validation_flags_from_eligibility() {
        let report = EligibilityReport {
            growth: Decision::allow(),
            statistics: Decision::deny("too small"),
            forecast: Decision::deny("no date column"),
        };
        let flags = ValidationFlags::from(&report);
        assert!(flags.growth_allowed);
        assert!(flags.growth_reason.is_none());
        assert!(!flags.stats_allowed);
        assert_eq!(flags.stats_reason.as_deref(), Some("too small"));
        assert!(!flags.forecast_allowed);
    }
}
