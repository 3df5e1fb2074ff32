//! Representative row sampling
//!
//! A prompt cannot carry a 50,000-row table, but the generator still needs
//! concrete rows to ground its narrative. This module picks a bounded,
//! stratified subset: early rows, recent rows, top earners, churned
//! accounts, and an even stride across the rest. The lossless numeric truth
//! travels separately via [`crate::aggregate`]; samples are illustrations,
//! never the source of totals.
//!
//! Must run after classification: the top-by-revenue strategy needs the
//! resolved revenue column.

use crate::types::{Cell, ColumnRole, RoleMapping, Table};

/// Default target sample size.
pub const DEFAULT_SAMPLE_TARGET: usize = 60;

/// Rows taken from the start of the table.
const HEAD_ROWS: usize = 15;
/// Rows taken from the end of the table.
const TAIL_ROWS: usize = 15;
/// Top rows by revenue.
const TOP_REVENUE_ROWS: usize = 10;
/// Churned rows kept.
const CHURNED_ROWS: usize = 10;

/// A bounded selection of table rows with the original headers.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// True when the table fit inside the target and no selection happened
    pub complete: bool,
}

/// Extract a representative subset of at most `target` rows.
///
/// Tables at or under the target pass through whole. Otherwise the union of
/// the strategies is deduplicated (exact row match, first occurrence wins)
/// and truncated to the target.
pub fn representative_sample(table: &Table, roles: &RoleMapping, target: usize) -> SampleSet {
    if table.rows.len() <= target {
        return SampleSet {
            headers: table.headers.clone(),
            rows: table.rows.clone(),
            complete: true,
        };
    }

    let data = &table.rows;
    let mut samples: Vec<Vec<Cell>> = Vec::new();

    // Early period
    samples.extend_from_slice(&data[..HEAD_ROWS.min(data.len())]);

    // Recent period
    samples.extend_from_slice(&data[data.len().saturating_sub(TAIL_ROWS)..]);

    // High performers by revenue
    if let Some(revenue_index) = roles.get(ColumnRole::Revenue) {
        let mut by_revenue: Vec<&Vec<Cell>> = data.iter().collect();
        by_revenue.sort_by(|a, b| {
            let ra = a.get(revenue_index).and_then(Cell::as_number).unwrap_or(0.0);
            let rb = b.get(revenue_index).and_then(Cell::as_number).unwrap_or(0.0);
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });
        samples.extend(by_revenue.into_iter().take(TOP_REVENUE_ROWS).cloned());
    }

    // Churned/problem cases
    if let Some(status_index) = table.find_column(&["status"]) {
        let churned = data.iter().filter(|row| {
            row.get(status_index)
                .map(|c| c.render().to_lowercase().contains("churn"))
                .unwrap_or(false)
        });
        samples.extend(churned.take(CHURNED_ROWS).cloned());
    }

    // Even stride across the whole table
    let step = (data.len() / 10).max(1);
    let mut i = 0;
    while i < data.len() && samples.len() < target {
        samples.push(data[i].clone());
        i += step;
    }

    // Dedupe exact rows, keeping first occurrence order
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<Vec<Cell>> = Vec::new();
    for row in samples {
        let key = row_key(&row);
        if seen.insert(key) {
            unique.push(row);
        }
    }
    unique.truncate(target);

    tracing::debug!(
        total_rows = data.len(),
        sampled = unique.len(),
        target,
        "Extracted representative samples"
    );

    SampleSet {
        headers: table.headers.clone(),
        rows: unique,
        complete: false,
    }
}

fn row_key(row: &[Cell]) -> String {
    row.iter()
        .map(Cell::render)
        .collect::<Vec<_>>()
        .join("\u{1f}")
}
