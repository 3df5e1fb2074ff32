//! Lossless table aggregation
//!
//! Produces per-column statistics and derived segment breakdowns over the
//! whole table, with no sampling. For large tables this summary carries the
//! numeric truth into the prompt while representative samples (see
//! [`crate::sample`]) supply concrete example rows.
//!
//! A column is treated as numeric or categorical based on the type of its
//! FIRST cell. This is a deliberate, documented simplification: a mixed
//! column whose first cell is text is summarized categorically even if most
//! cells are numbers. The strategy sits behind [`TypeInference`] so callers
//! can swap it, but the default must not silently change.

use crate::stats::NumericSeries;
use crate::types::{Cell, ColumnRole, RoleMapping, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fragments locating the status-like column for segmentation.
const STATUS_FRAGMENTS: &[&str] = &["status", "state", "category"];
/// Fragments locating the geography column.
const GEO_FRAGMENTS: &[&str] = &["country", "region", "location"];

/// How many top categorical values to keep per breakdown.
const TOP_VALUES: usize = 10;
/// Histogram bucket count for numeric columns.
const DISTRIBUTION_BUCKETS: usize = 5;

// ============================================
// Type inference strategy
// ============================================

/// Strategy deciding whether a column is numeric.
pub trait TypeInference {
    fn is_numeric(&self, column: &[Cell]) -> bool;
}

/// Default strategy: inspect only the first cell.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstCellTypeInference;

impl TypeInference for FirstCellTypeInference {
    fn is_numeric(&self, column: &[Cell]) -> bool {
        column.first().map(Cell::is_number).unwrap_or(false)
    }
}

// ============================================
// Summary types
// ============================================

/// Statistics for one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumn {
    pub header: String,
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub iqr_outlier_count: usize,
    pub z_score_outlier_count: usize,
    /// Histogram buckets: "<start>-<end>" label to row count
    pub distribution: Vec<(String, usize)>,
}

/// One value/count/percentage entry in a categorical breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

/// Summary for one categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub header: String,
    pub unique_values: usize,
    pub top_values: Vec<ValueCount>,
}

/// Per-column summary: numeric or categorical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnSummary {
    Numeric(NumericColumn),
    Categorical(CategoricalColumn),
}

/// Churn figures derived from a status column containing "churn" values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnSummary {
    pub churn_rate_pct: f64,
    pub churned: usize,
    pub active: usize,
}

/// Table-level headline numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overview {
    pub total_rows: usize,
    pub data_quality: String,
    pub total_revenue: Option<f64>,
    pub avg_revenue: Option<f64>,
    pub revenue_range: Option<(f64, f64)>,
    pub total_cost: Option<f64>,
    pub gross_profit: Option<f64>,
    pub profit_margin_pct: Option<f64>,
    pub total_quantity: Option<f64>,
    pub total_users: Option<f64>,
    pub churn: Option<ChurnSummary>,
}

/// Row counts per time period, plus first-vs-last period revenue growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePatterns {
    /// (period, row count) sorted by period key
    pub distribution: Vec<(String, usize)>,
    /// Percent revenue change from first to last period; `None` when the
    /// first period's revenue is zero or no revenue column exists
    pub revenue_growth_pct: Option<f64>,
}

/// Categorical segment breakdowns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segments {
    pub by_status: Option<Vec<ValueCount>>,
    pub by_geography: Option<Vec<ValueCount>>,
    pub by_channel: Option<Vec<ValueCount>>,
}

/// Complete lossless aggregation of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub overview: Overview,
    pub columns: Vec<ColumnSummary>,
    pub time_patterns: Option<TimePatterns>,
    pub segments: Segments,
}

// ============================================
// Aggregation
// ============================================

/// Aggregate a table with the default first-cell type inference.
pub fn summarize_table(table: &Table, roles: &RoleMapping) -> TableSummary {
    summarize_table_with(table, roles, &FirstCellTypeInference)
}

/// Aggregate a table with an explicit type-inference strategy.
pub fn summarize_table_with(
    table: &Table,
    roles: &RoleMapping,
    typer: &dyn TypeInference,
) -> TableSummary {
    let columns = summarize_columns(table, typer);
    let overview = build_overview(table, roles);
    let time_patterns = build_time_patterns(table, roles);
    let segments = build_segments(table, roles);

    TableSummary {
        overview,
        columns,
        time_patterns,
        segments,
    }
}

fn summarize_columns(table: &Table, typer: &dyn TypeInference) -> Vec<ColumnSummary> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let column = table.column(index);
            if typer.is_numeric(&column) {
                ColumnSummary::Numeric(summarize_numeric(header, &column))
            } else {
                ColumnSummary::Categorical(summarize_categorical(header, &column))
            }
        })
        .collect()
}

fn summarize_numeric(header: &str, column: &[Cell]) -> NumericColumn {
    let values: Vec<f64> = column.iter().filter_map(Cell::as_number).collect();
    let series = NumericSeries::new(values.clone());

    NumericColumn {
        header: header.to_string(),
        count: series.len(),
        sum: series.sum().unwrap_or(0.0),
        mean: series.mean(),
        median: series.median(),
        min: series.min(),
        max: series.max(),
        std_dev: series.population_std_dev(),
        q1: series.percentile(25.0),
        q3: series.percentile(75.0),
        iqr: series.iqr(),
        skewness: series.skewness(),
        kurtosis: series.kurtosis(),
        iqr_outlier_count: series.detect_outliers_iqr().map(|o| o.count).unwrap_or(0),
        z_score_outlier_count: series
            .detect_outliers_z_score()
            .map(|o| o.count)
            .unwrap_or(0),
        distribution: distribution_buckets(&values, DISTRIBUTION_BUCKETS),
    }
}

fn summarize_categorical(header: &str, column: &[Cell]) -> CategoricalColumn {
    let total = column.len();
    let frequency = tally(column.iter().map(Cell::render));

    let mut sorted: Vec<(String, usize)> = frequency.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let unique_values = sorted.len();
    let top_values = sorted
        .into_iter()
        .take(TOP_VALUES)
        .map(|(value, count)| ValueCount {
            value,
            count,
            percentage: percentage(count, total),
        })
        .collect();

    CategoricalColumn {
        header: header.to_string(),
        unique_values,
        top_values,
    }
}

/// Equal-width histogram over the value range. A constant column collapses
/// into a single bucket.
fn distribution_buckets(values: &[f64], bucket_count: usize) -> Vec<(String, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![(format!("{:.0}-{:.0}", min, max), finite.len())];
    }

    let bucket_size = (max - min) / bucket_count as f64;
    let mut counts = vec![0usize; bucket_count];
    for v in &finite {
        let index = (((v - min) / bucket_size) as usize).min(bucket_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let start = min + i as f64 * bucket_size;
            let end = if i == bucket_count - 1 {
                max
            } else {
                start + bucket_size
            };
            (format!("{:.0}-{:.0}", start, end), count)
        })
        .collect()
}

fn build_overview(table: &Table, roles: &RoleMapping) -> Overview {
    let total_rows = table.row_count();
    let data_quality = if total_rows >= 1000 {
        "excellent"
    } else if total_rows >= 100 {
        "good"
    } else {
        "fair"
    }
    .to_string();

    let mut overview = Overview {
        total_rows,
        data_quality,
        ..Overview::default()
    };

    if let Some(index) = roles.get(ColumnRole::Revenue) {
        let series = NumericSeries::new(table.numeric_column(index));
        if !series.is_empty() {
            let total = series.sum().unwrap_or(0.0);
            overview.total_revenue = Some(total);
            overview.avg_revenue = Some(total / total_rows as f64);
            overview.revenue_range = series.min().zip(series.max());
        }
    }

    if let Some(index) = roles.get(ColumnRole::Cost) {
        let series = NumericSeries::new(table.numeric_column(index));
        if !series.is_empty() {
            overview.total_cost = series.sum();
        }
    }

    if let (Some(revenue), Some(cost)) = (overview.total_revenue, overview.total_cost) {
        overview.gross_profit = Some(revenue - cost);
        if revenue != 0.0 {
            overview.profit_margin_pct = Some((revenue - cost) / revenue * 100.0);
        }
    }

    if let Some(index) = roles.get(ColumnRole::Quantity) {
        let series = NumericSeries::new(table.numeric_column(index));
        if !series.is_empty() {
            overview.total_quantity = series.sum();
        }
    }

    if let Some(index) = roles.get(ColumnRole::User) {
        let series = NumericSeries::new(table.numeric_column(index));
        if !series.is_empty() {
            overview.total_users = series.sum();
        }
    }

    overview.churn = build_churn(table);
    overview
}

/// Churn figures when a status-like column has values containing "churn".
fn build_churn(table: &Table) -> Option<ChurnSummary> {
    let index = table.find_column(STATUS_FRAGMENTS)?;
    let total = table.row_count();

    let churned = table
        .rows
        .iter()
        .filter(|row| {
            row.get(index)
                .map(|c| c.render().to_lowercase().contains("churn"))
                .unwrap_or(false)
        })
        .count();

    if churned == 0 {
        return None;
    }

    Some(ChurnSummary {
        churn_rate_pct: percentage(churned, total),
        churned,
        active: total - churned,
    })
}

fn build_time_patterns(table: &Table, roles: &RoleMapping) -> Option<TimePatterns> {
    let date_index = roles.get(ColumnRole::Date)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &table.rows {
        if let Some(cell) = row.get(date_index) {
            *counts.entry(cell.render()).or_insert(0) += 1;
        }
    }

    let mut distribution: Vec<(String, usize)> = counts.into_iter().collect();
    distribution.sort_by(|a, b| a.0.cmp(&b.0));

    let revenue_growth_pct = roles.get(ColumnRole::Revenue).and_then(|revenue_index| {
        period_growth(table, date_index, revenue_index, &distribution)
    });

    Some(TimePatterns {
        distribution,
        revenue_growth_pct,
    })
}

/// Revenue change from the first to the last period key.
fn period_growth(
    table: &Table,
    date_index: usize,
    revenue_index: usize,
    distribution: &[(String, usize)],
) -> Option<f64> {
    if distribution.len() < 2 {
        return None;
    }
    let first_period = &distribution.first()?.0;
    let last_period = &distribution.last()?.0;

    let period_revenue = |period: &str| -> f64 {
        table
            .rows
            .iter()
            .filter(|row| {
                row.get(date_index)
                    .map(|c| c.render() == period)
                    .unwrap_or(false)
            })
            .filter_map(|row| row.get(revenue_index).and_then(Cell::as_number))
            .sum()
    };

    let first_revenue = period_revenue(first_period);
    let last_revenue = period_revenue(last_period);

    if first_revenue == 0.0 {
        return None;
    }
    Some((last_revenue - first_revenue) / first_revenue * 100.0)
}

fn build_segments(table: &Table, roles: &RoleMapping) -> Segments {
    Segments {
        by_status: table
            .find_column(STATUS_FRAGMENTS)
            .map(|i| breakdown(table, i, usize::MAX)),
        by_geography: table
            .find_column(GEO_FRAGMENTS)
            .map(|i| breakdown(table, i, TOP_VALUES)),
        by_channel: roles
            .get(ColumnRole::Channel)
            .map(|i| breakdown(table, i, usize::MAX)),
    }
}

fn breakdown(table: &Table, index: usize, limit: usize) -> Vec<ValueCount> {
    let total = table.row_count();
    let frequency = tally(
        table
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .map(Cell::render),
    );

    let mut sorted: Vec<(String, usize)> = frequency.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    sorted
        .into_iter()
        .take(limit)
        .map(|(value, count)| ValueCount {
            value,
            count,
            percentage: percentage(count, total),
        })
        .collect()
}

fn tally(values: impl Iterator<Item = String>) -> HashMap<String, usize> {
    let mut frequency = HashMap::new();
    for value in values {
        *frequency.entry(value).or_insert(0) += 1;
    }
    frequency
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ColumnClassifier, KeywordClassifier};
    use crate::ingest::parse_table;

    fn summarize(raw: &str) -> TableSummary {
        let table = parse_table(raw).unwrap();
        let classification = KeywordClassifier::new().classify(&table.headers);
        summarize_table(&table, &classification.roles)
    }

    #[test]
    fn test_numeric_and_categorical_split() {
        let summary = summarize("Month,Revenue\nJan,100\nFeb,200\nMar,300\n");
        assert!(matches!(summary.columns[0], ColumnSummary::Categorical(_)));
        assert!(matches!(summary.columns[1], ColumnSummary::Numeric(_)));
    }

    #[test]
    fn test_first_cell_decides_column_type() {
        // Second cell is numeric but the first is text, so the whole column
        // is summarized categorically.
        let summary = summarize("Label,Value\na,n/a\nb,100\nc,200\n");
        assert!(matches!(summary.columns[1], ColumnSummary::Categorical(_)));
    }

    #[test]
    fn test_numeric_column_statistics() {
        let summary = summarize("Month,Revenue\nJan,100\nFeb,200\nMar,300\nApr,400\n");
        let ColumnSummary::Numeric(col) = &summary.columns[1] else {
            panic!("revenue column should be numeric");
        };
        assert_eq!(col.count, 4);
        assert_eq!(col.sum, 1000.0);
        assert_eq!(col.mean, Some(250.0));
        assert_eq!(col.median, Some(250.0));
        assert_eq!(col.min, Some(100.0));
        assert_eq!(col.max, Some(400.0));
        assert!(!col.distribution.is_empty());
    }

    #[test]
    fn test_overview_revenue_and_profit() {
        let summary = summarize("Month,Revenue,Cost\nJan,1000,400\nFeb,2000,600\n");
        assert_eq!(summary.overview.total_revenue, Some(3000.0));
        assert_eq!(summary.overview.avg_revenue, Some(1500.0));
        assert_eq!(summary.overview.total_cost, Some(1000.0));
        assert_eq!(summary.overview.gross_profit, Some(2000.0));
        let margin = summary.overview.profit_margin_pct.unwrap();
        assert!((margin - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_data_quality_tiers() {
        let summary = summarize("A,B\n1,2\n3,4\n");
        assert_eq!(summary.overview.data_quality, "fair");

        let mut raw = String::from("A,B\n");
        for i in 0..150 {
            raw.push_str(&format!("{},{}\n", i, i));
        }
        assert_eq!(summarize(&raw).overview.data_quality, "good");
    }

    #[test]
    fn test_churn_summary() {
        let summary = summarize(
            "Customer,Status\nA,active\nB,churned\nC,active\nD,churned\nE,active\n",
        );
        let churn = summary.overview.churn.unwrap();
        assert_eq!(churn.churned, 2);
        assert_eq!(churn.active, 3);
        assert!((churn.churn_rate_pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_churn_values_means_no_churn_summary() {
        let summary = summarize("Customer,Status\nA,active\nB,active\n");
        assert!(summary.overview.churn.is_none());
        // The status breakdown still exists.
        assert!(summary.segments.by_status.is_some());
    }

    #[test]
    fn test_time_patterns_and_period_growth() {
        let summary = summarize(
            "Month,Revenue\nJan,100\nJan,100\nFeb,150\nMar,300\n",
        );
        let patterns = summary.time_patterns.unwrap();
        assert_eq!(patterns.distribution.len(), 3);
        // Periods sort lexically: Feb, Jan, Mar. First=Feb (150), last=Mar (300).
        assert_eq!(patterns.distribution[0].0, "Feb");
        let growth = patterns.revenue_growth_pct.unwrap();
        assert!((growth - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_geography_top_10() {
        let mut raw = String::from("Country,Revenue\n");
        for i in 0..15 {
            for _ in 0..=i {
                raw.push_str(&format!("C{:02},100\n", i));
            }
        }
        let summary = summarize(&raw);
        let geo = summary.segments.by_geography.unwrap();
        assert_eq!(geo.len(), 10);
        // Sorted descending by count.
        assert_eq!(geo[0].value, "C14");
        assert!(geo[0].count > geo[9].count);
    }

    #[test]
    fn test_channel_breakdown() {
        let summary =
            summarize("Month,Channel,Revenue\nJan,organic,100\nFeb,paid,200\nMar,organic,300\n");
        let channels = summary.segments.by_channel.unwrap();
        assert_eq!(channels[0].value, "organic");
        assert_eq!(channels[0].count, 2);
    }

    #[test]
    fn test_constant_column_single_bucket() {
        let buckets = distribution_buckets(&[5.0, 5.0, 5.0], 5);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].1, 3);
    }
}
