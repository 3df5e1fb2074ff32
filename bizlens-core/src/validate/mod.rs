//! Eligibility gating and integrity validation
//!
//! The gate decides which metric families (growth, statistics, forecast)
//! the report generator is allowed to present, so that trend lines fitted
//! on five data points never ship as confident findings. Denials are not
//! errors: they are [`Decision`] values whose reasons reach the prompt
//! assembler verbatim as hard constraints.
//!
//! Integrity validation computes exact revenue/spend totals directly from
//! the table so downstream narrative cites verified numbers only.

use crate::error::{Error, Result};
use crate::types::{Decision, EligibilityReport, Table, ValidatedTotals};
use serde::{Deserialize, Serialize};

/// Header fragments that indicate a time axis for growth checks.
const GROWTH_DATE_FRAGMENTS: &[&str] = &["date", "month", "week", "year"];
/// Forecasting requires a stricter notion of a date column.
const FORECAST_DATE_FRAGMENTS: &[&str] = &["date", "month"];

/// Minimum rows for statistical analysis.
pub const MIN_ROWS_STATISTICS: usize = 30;
/// Minimum rows (time periods) for forecasting.
pub const MIN_ROWS_FORECAST: usize = 12;
/// Minimum rows (time periods) for growth rates.
pub const MIN_ROWS_GROWTH: usize = 2;

/// Check whether growth-rate reporting is allowed.
pub fn check_growth(table: &Table) -> Decision {
    if table.find_column(GROWTH_DATE_FRAGMENTS).is_none() {
        return Decision::deny("No date/time column found. Growth rate requires time-series data.");
    }

    if table.row_count() < MIN_ROWS_GROWTH {
        return Decision::deny(format!(
            "Need at least {} time periods (have {})",
            MIN_ROWS_GROWTH,
            table.row_count()
        ));
    }

    Decision::allow()
}

/// Check whether statistical analysis is allowed.
pub fn check_statistics(table: &Table) -> Decision {
    if table.row_count() < MIN_ROWS_STATISTICS {
        return Decision::deny(format!(
            "Sample size too small ({} rows). Need >={} for statistical significance.",
            table.row_count(),
            MIN_ROWS_STATISTICS
        ));
    }

    Decision::allow()
}

/// Check whether forecasting is allowed.
pub fn check_forecast(table: &Table) -> Decision {
    if table.find_column(FORECAST_DATE_FRAGMENTS).is_none() {
        return Decision::deny("Forecasting requires date/time column");
    }

    if table.row_count() < MIN_ROWS_FORECAST {
        return Decision::deny(format!(
            "Need >={} time periods for forecasting (have {})",
            MIN_ROWS_FORECAST,
            table.row_count()
        ));
    }

    Decision::allow()
}

/// Run all three eligibility checks.
pub fn check_eligibility(table: &Table) -> EligibilityReport {
    EligibilityReport {
        growth: check_growth(table),
        statistics: check_statistics(table),
        forecast: check_forecast(table),
    }
}

/// Outcome of integrity validation: exact totals plus any warnings raised
/// while computing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub totals: ValidatedTotals,
    pub warnings: Vec<String>,
}

/// Compute exact revenue and spend totals from the table.
///
/// Non-numeric cells in financial columns are coerced to zero with a
/// warning rather than aborting; an empty table is a hard error because
/// nothing downstream can run without rows.
pub fn validate_integrity(table: &Table) -> Result<IntegrityReport> {
    if table.rows.is_empty() {
        return Err(Error::Validation("no data rows found".to_string()));
    }

    let mut warnings = Vec::new();

    let revenue_index = table.find_column(&["revenue", "sales"]);
    let spend_index = table.find_column(&["spend", "cost"]);

    let mut total_revenue = 0.0;
    if let Some(index) = revenue_index {
        for row in &table.rows {
            match row.get(index).and_then(|c| c.as_number()) {
                Some(value) => {
                    if value < 0.0 {
                        warnings.push(format!("Negative revenue detected: {}", value));
                    }
                    total_revenue += value;
                }
                None => {
                    if let Some(cell) = row.get(index) {
                        warnings.push(format!("Invalid revenue value: {}", cell));
                    }
                }
            }
        }
    }

    let mut total_spend = 0.0;
    if let Some(index) = spend_index {
        for row in &table.rows {
            if let Some(value) = row.get(index).and_then(|c| c.as_number()) {
                total_spend += value;
            }
        }
    }

    let row_count = table.row_count();
    let totals = ValidatedTotals {
        total_revenue,
        avg_revenue: total_revenue / row_count as f64,
        total_spend,
        avg_spend: total_spend / row_count as f64,
        row_count,
        revenue_column: revenue_index.map(|i| table.headers[i].clone()),
        spend_column: spend_index.map(|i| table.headers[i].clone()),
    };

    tracing::debug!(
        total_revenue = totals.total_revenue,
        total_spend = totals.total_spend,
        rows = totals.row_count,
        warnings = warnings.len(),
        "Validated table totals"
    );

    Ok(IntegrityReport { totals, warnings })
}

// ============================================
// Sample-size confidence guidance
// ============================================

/// Confidence tier for a given sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Insufficient,
    Low,
    Moderate,
    Good,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Insufficient => "insufficient",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Moderate => "moderate",
            ConfidenceLevel::Good => "good",
            ConfidenceLevel::High => "high",
        }
    }
}

/// Language guidance for the report generator, tiered by sample size.
///
/// Keeps small-sample analyses from being narrated with statistical
/// certainty: below 30 rows the generated text must hedge, and R² or
/// p-values may only be mentioned from the moderate tier upward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceGuidance {
    pub level: ConfidenceLevel,
    pub description: &'static str,
    pub disclaimer_prefix: String,
    pub confidence_percent: u8,
    pub show_r_squared: bool,
    pub language_guideline: &'static str,
}

/// Map a sample size to its confidence guidance tier.
pub fn confidence_for(sample_size: usize) -> ConfidenceGuidance {
    if sample_size < 10 {
        ConfidenceGuidance {
            level: ConfidenceLevel::Insufficient,
            description: "Very limited data - trends may not be reliable",
            disclaimer_prefix: format!("Analysis of {} data points suggests", sample_size),
            confidence_percent: 0,
            show_r_squared: false,
            language_guideline:
                "Use cautious language like \"appears to\", \"suggests\", \"indicates a pattern\"",
        }
    } else if sample_size < 30 {
        ConfidenceGuidance {
            level: ConfidenceLevel::Low,
            description: "Limited data - patterns observed but not statistically validated",
            disclaimer_prefix: format!("Based on {} data points", sample_size),
            confidence_percent: 60,
            show_r_squared: false,
            language_guideline:
                "Use moderate language like \"shows a trend\", \"demonstrates a pattern\"",
        }
    } else if sample_size < 100 {
        ConfidenceGuidance {
            level: ConfidenceLevel::Moderate,
            description: "Reasonable sample size - trends are meaningful",
            disclaimer_prefix: format!("Analysis of {} data points", sample_size),
            confidence_percent: 75,
            show_r_squared: true,
            language_guideline: "Can use stronger language but mention sample size",
        }
    } else if sample_size < 500 {
        ConfidenceGuidance {
            level: ConfidenceLevel::Good,
            description: "Good sample size - statistical patterns are reliable",
            disclaimer_prefix: format!("Based on {} data points", sample_size),
            confidence_percent: 85,
            show_r_squared: true,
            language_guideline: "Use confident language with statistical backing",
        }
    } else {
        ConfidenceGuidance {
            level: ConfidenceLevel::High,
            description: "Large sample size - high statistical confidence",
            disclaimer_prefix: format!("Analysis of {} data points", sample_size),
            confidence_percent: 95,
            show_r_squared: true,
            language_guideline: "Full confidence in statistical conclusions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_table;

    fn table(raw: &str) -> Table {
        parse_table(raw).unwrap()
    }

    #[test]
    fn test_growth_requires_date_column() {
        let t = table("Product,Revenue\nA,100\nB,200\n");
        let decision = check_growth(&t);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("date/time column"));
    }

    #[test]
    fn test_growth_allowed_with_month_column() {
        let t = table("Month,Revenue\nJan,100\nFeb,200\n");
        assert!(check_growth(&t).allowed);
    }

    #[test]
    fn test_statistics_denied_below_30_rows() {
        let t = table("Month,Revenue\nJan,100\nFeb,200\n");
        let decision = check_statistics(&t);
        assert!(!decision.allowed);
        let reason = decision.reason.unwrap();
        assert!(reason.contains("30"));
        assert!(reason.contains("2 rows"));
    }

    #[test]
    fn test_statistics_allowed_at_30_rows() {
        let mut raw = String::from("Month,Revenue\n");
        for i in 0..30 {
            raw.push_str(&format!("P{},100\n", i));
        }
        assert!(check_statistics(&table(&raw)).allowed);
    }

    #[test]
    fn test_statistics_monotonic_in_row_count() {
        // Once allowed at N rows, adding rows can never revoke it.
        let mut raw = String::from("Month,Revenue\n");
        for i in 0..30 {
            raw.push_str(&format!("P{},100\n", i));
        }
        assert!(check_statistics(&table(&raw)).allowed);
        for i in 30..90 {
            raw.push_str(&format!("P{},100\n", i));
            assert!(check_statistics(&table(&raw)).allowed);
        }
    }

    #[test]
    fn test_forecast_thresholds() {
        let t = table("Month,Revenue\nJan,100\nFeb,200\n");
        let decision = check_forecast(&t);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("12"));

        let mut raw = String::from("Month,Revenue\n");
        for i in 0..12 {
            raw.push_str(&format!("P{},100\n", i));
        }
        assert!(check_forecast(&table(&raw)).allowed);

        // Week satisfies the growth vocabulary but not the forecast one.
        let mut raw = String::from("Week,Revenue\n");
        for i in 0..12 {
            raw.push_str(&format!("W{},100\n", i));
        }
        let t = table(&raw);
        assert!(check_growth(&t).allowed);
        assert!(!check_forecast(&t).allowed);
    }

    #[test]
    fn test_validate_integrity_totals() {
        let t = table("Month,Revenue,Spend\nJan,50000,10000\nFeb,60000,12000\n");
        let report = validate_integrity(&t).unwrap();
        assert_eq!(report.totals.total_revenue, 110000.0);
        assert_eq!(report.totals.avg_revenue, 55000.0);
        assert_eq!(report.totals.total_spend, 22000.0);
        assert_eq!(report.totals.revenue_column.as_deref(), Some("Revenue"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_validate_integrity_coerces_bad_cells_with_warnings() {
        let t = table("Month,Revenue\nJan,100\nFeb,n/a\nMar,-50\n");
        let report = validate_integrity(&t).unwrap();
        assert_eq!(report.totals.total_revenue, 50.0);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("Invalid")));
        assert!(report.warnings.iter().any(|w| w.contains("Negative")));
    }

    #[test]
    fn test_validate_integrity_no_financial_columns() {
        let t = table("Name,City\nAlice,Pune\n");
        let report = validate_integrity(&t).unwrap();
        assert_eq!(report.totals.total_revenue, 0.0);
        assert!(report.totals.revenue_column.is_none());
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(confidence_for(5).level, ConfidenceLevel::Insufficient);
        assert_eq!(confidence_for(10).level, ConfidenceLevel::Low);
        assert_eq!(confidence_for(30).level, ConfidenceLevel::Moderate);
        assert_eq!(confidence_for(100).level, ConfidenceLevel::Good);
        assert_eq!(confidence_for(500).level, ConfidenceLevel::High);

        assert!(!confidence_for(29).show_r_squared);
        assert!(confidence_for(30).show_r_squared);
    }
}
