//! Core domain types for bizlens
//!
//! These types form the data model shared by every pipeline stage:
//!
//! | Term | Definition |
//! |------|------------|
//! | **Table** | Parsed tabular input: ordered headers plus positionally aligned rows |
//! | **Cell** | One value in a row; numeric or text, inferred per cell at parse time |
//! | **ColumnRole** | Semantic meaning assigned to a column (revenue, date, channel, ...) |
//! | **Industry** | Label from a fixed taxonomy, detected from header vocabulary |
//! | **Decision** | Outcome of an eligibility check, with a reason when denied |
//! | **AnalysisRecord** | Append-only persisted snapshot of one analysis call |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Cells and tables
// ============================================

/// A single table cell.
///
/// Type is decided per cell when the raw input is parsed; a column can mix
/// numbers and text freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numeric value if this cell holds one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    /// String rendering used for frequency tallies and prompt rows.
    pub fn render(&self) -> String {
        match self {
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Parsed tabular input.
///
/// Invariant: every row has exactly `headers.len()` cells. Rows violating
/// this are dropped at parse time and counted in `skipped_rows`. A table is
/// constructed once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Column names in input order (uniqueness not enforced)
    pub headers: Vec<String>,
    /// Data rows, positionally aligned to `headers`
    pub rows: Vec<Vec<Cell>>,
    /// Malformed rows dropped during parsing
    #[serde(default)]
    pub skipped_rows: usize,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            headers,
            rows,
            skipped_rows: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// All values of one column, in row order.
    pub fn column(&self, index: usize) -> Vec<Cell> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).cloned())
            .collect()
    }

    /// Numeric values of one column, non-numeric cells skipped.
    pub fn numeric_column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).and_then(Cell::as_number))
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Index of the first header whose lowercased form contains any of the
    /// given fragments.
    pub fn find_column(&self, fragments: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            let lower = h.to_lowercase();
            fragments.iter().any(|f| lower.contains(f))
        })
    }
}

// ============================================
// Column roles
// ============================================

/// Semantic role a column can play in downstream metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Revenue,
    Cost,
    User,
    Date,
    Channel,
    Product,
    Quantity,
    Arpu,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 8] = [
        ColumnRole::Revenue,
        ColumnRole::Cost,
        ColumnRole::User,
        ColumnRole::Date,
        ColumnRole::Channel,
        ColumnRole::Product,
        ColumnRole::Quantity,
        ColumnRole::Arpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Revenue => "revenue",
            ColumnRole::Cost => "cost",
            ColumnRole::User => "user",
            ColumnRole::Date => "date",
            ColumnRole::Channel => "channel",
            ColumnRole::Product => "product",
            ColumnRole::Quantity => "quantity",
            ColumnRole::Arpu => "arpu",
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sparse assignment from role to column index.
///
/// At most one column per role (first match over header order wins); one
/// column may satisfy several roles, which is not prevented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleMapping {
    pub revenue: Option<usize>,
    pub cost: Option<usize>,
    pub user: Option<usize>,
    pub date: Option<usize>,
    pub channel: Option<usize>,
    pub product: Option<usize>,
    pub quantity: Option<usize>,
    pub arpu: Option<usize>,
}

impl RoleMapping {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Revenue => self.revenue,
            ColumnRole::Cost => self.cost,
            ColumnRole::User => self.user,
            ColumnRole::Date => self.date,
            ColumnRole::Channel => self.channel,
            ColumnRole::Product => self.product,
            ColumnRole::Quantity => self.quantity,
            ColumnRole::Arpu => self.arpu,
        }
    }

    pub fn set(&mut self, role: ColumnRole, index: usize) {
        let slot = match role {
            ColumnRole::Revenue => &mut self.revenue,
            ColumnRole::Cost => &mut self.cost,
            ColumnRole::User => &mut self.user,
            ColumnRole::Date => &mut self.date,
            ColumnRole::Channel => &mut self.channel,
            ColumnRole::Product => &mut self.product,
            ColumnRole::Quantity => &mut self.quantity,
            ColumnRole::Arpu => &mut self.arpu,
        };
        if slot.is_none() {
            *slot = Some(index);
        }
    }
}

// ============================================
// Industry taxonomy
// ============================================

/// Industry label detected from header vocabulary.
///
/// Closed taxonomy; `Business` is the default when no industry scores above
/// the detection threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Fintech,
    Saas,
    Ecommerce,
    Healthcare,
    Logistics,
    Manufacturing,
    Retail,
    Education,
    RealEstate,
    Hospitality,
    Media,
    Telecom,
    Energy,
    Marketing,
    Business,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Fintech => "fintech",
            Industry::Saas => "saas",
            Industry::Ecommerce => "ecommerce",
            Industry::Healthcare => "healthcare",
            Industry::Logistics => "logistics",
            Industry::Manufacturing => "manufacturing",
            Industry::Retail => "retail",
            Industry::Education => "education",
            Industry::RealEstate => "realestate",
            Industry::Hospitality => "hospitality",
            Industry::Media => "media",
            Industry::Telecom => "telecom",
            Industry::Energy => "energy",
            Industry::Marketing => "marketing",
            Industry::Business => "business",
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Industry {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fintech" => Ok(Industry::Fintech),
            "saas" => Ok(Industry::Saas),
            "ecommerce" => Ok(Industry::Ecommerce),
            "healthcare" => Ok(Industry::Healthcare),
            "logistics" => Ok(Industry::Logistics),
            "manufacturing" => Ok(Industry::Manufacturing),
            "retail" => Ok(Industry::Retail),
            "education" => Ok(Industry::Education),
            "realestate" => Ok(Industry::RealEstate),
            "hospitality" => Ok(Industry::Hospitality),
            "media" => Ok(Industry::Media),
            "telecom" => Ok(Industry::Telecom),
            "energy" => Ok(Industry::Energy),
            "marketing" => Ok(Industry::Marketing),
            "business" => Ok(Industry::Business),
            _ => Err(format!("unknown industry: {}", s)),
        }
    }
}

// ============================================
// Eligibility decisions
// ============================================

/// Outcome of one eligibility check.
///
/// Denials carry a human-readable reason that is surfaced verbatim to the
/// report generator as a hard constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Independent eligibility decisions for the three gated metric families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub growth: Decision,
    pub statistics: Decision,
    pub forecast: Decision,
}

// ============================================
// Validated totals
// ============================================

/// Exact financial totals computed directly from the table.
///
/// These are handed to the report generator as the only permissible source
/// of revenue/spend figures, so it cites verified numbers instead of
/// recomputing its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatedTotals {
    pub total_revenue: f64,
    pub avg_revenue: f64,
    pub total_spend: f64,
    pub avg_spend: f64,
    pub row_count: usize,
    pub revenue_column: Option<String>,
    pub spend_column: Option<String>,
}

// ============================================
// Analysis records (persisted)
// ============================================

/// Metrics snapshot stored with each analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMetrics {
    pub row_count: usize,
    pub column_count: usize,
    pub total_revenue: f64,
    pub avg_revenue: f64,
}

/// One persisted analysis call: question, generated answer, and the metrics
/// snapshot it was based on. Owned by a user identity; append-only, never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning user identity
    pub user_id: String,
    /// Dataset this analysis ran against (if any)
    pub dataset_id: Option<String>,
    /// The question asked
    pub question: String,
    /// Generated answer text
    pub answer: String,
    /// Detected industry label
    pub industry: Industry,
    /// Metrics snapshot at analysis time
    pub metrics: RecordMetrics,
    /// SHA-256 of the assembled prompt, for dedup/debugging
    pub prompt_hash: Option<String>,
    /// When this analysis was created
    pub created_at: DateTime<Utc>,
}
