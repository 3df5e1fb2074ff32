//! Header classification
//!
//! Assigns semantic roles to columns and an industry label to the whole
//! table by matching normalized header names against keyword vocabularies.
//!
//! This is a best-effort heuristic by design: false positives and negatives
//! on unusual header names are expected behavior, not bugs. The strategy is
//! behind the [`ColumnClassifier`] trait so a rule-set or model-based
//! classifier can replace it without touching callers.

use crate::types::{ColumnRole, Industry, RoleMapping};
use serde::{Deserialize, Serialize};

/// Points awarded per matched industry term.
const INDUSTRY_TERM_WEIGHT: u32 = 2;
/// Points awarded per matched generic business term.
const GENERIC_TERM_WEIGHT: u32 = 1;
/// Minimum winning score; anything at or below this falls back to
/// [`Industry::Business`].
const INDUSTRY_SCORE_THRESHOLD: u32 = 3;

/// Substring keywords per semantic role, matched against normalized headers.
const ROLE_KEYWORDS: &[(ColumnRole, &[&str])] = &[
    (
        ColumnRole::Revenue,
        &["revenue", "amount", "sales", "price", "income", "earnings"],
    ),
    (ColumnRole::Cost, &["cost", "expense", "spend", "cogs"]),
    (
        ColumnRole::User,
        &["user", "customer", "subscriber", "member", "account", "client"],
    ),
    (
        ColumnRole::Date,
        &["date", "month", "time", "year", "week", "quarter"],
    ),
    (
        ColumnRole::Channel,
        &["channel", "source", "medium", "acquisition"],
    ),
    (
        ColumnRole::Product,
        &["product", "item", "category", "service", "sku"],
    ),
    (
        ColumnRole::Quantity,
        &["quantity", "volume", "count", "units"],
    ),
    (ColumnRole::Arpu, &["arpu"]),
];

/// Per-industry vocabularies. Order matters: ties are resolved by the first
/// maximum encountered while iterating this table.
const INDUSTRY_KEYWORDS: &[(Industry, &[&str])] = &[
    (
        Industry::Fintech,
        &[
            "transaction", "payment", "wallet", "balance", "transfer", "loan", "credit", "debit",
            "card", "bank", "arpu", "aum", "tnx",
        ],
    ),
    (
        Industry::Saas,
        &[
            "mrr", "arr", "churn", "ltv", "cac", "subscription", "plan", "tier", "license", "user",
            "mau", "dau", "retention",
        ],
    ),
    (
        Industry::Ecommerce,
        &[
            "cart", "checkout", "order", "shipping", "delivery", "product", "inventory", "sku",
            "basket", "purchase",
        ],
    ),
    (
        Industry::Healthcare,
        &[
            "patient", "doctor", "appointment", "diagnosis", "treatment", "prescription",
            "hospital", "clinic", "medical", "health",
        ],
    ),
    (
        Industry::Logistics,
        &[
            "shipment", "delivery", "carrier", "tracking", "freight", "warehouse", "dispatch",
            "route", "driver", "vehicle",
        ],
    ),
    (
        Industry::Manufacturing,
        &[
            "production", "yield", "defect", "quality", "assembly", "machine", "downtime",
            "throughput", "batch", "plant",
        ],
    ),
    (
        Industry::Retail,
        &[
            "store", "branch", "pos", "cashier", "footfall", "traffic", "basket", "merchandise",
            "inventory", "stock",
        ],
    ),
    (
        Industry::Education,
        &[
            "student", "course", "enrollment", "grade", "teacher", "class", "exam", "tuition",
            "campus", "learning",
        ],
    ),
    (
        Industry::RealEstate,
        &[
            "property", "listing", "rent", "lease", "tenant", "mortgage", "sqft", "bedroom",
            "apartment", "house",
        ],
    ),
    (
        Industry::Hospitality,
        &[
            "booking", "reservation", "guest", "room", "occupancy", "checkin", "checkout", "hotel",
            "restaurant", "travel",
        ],
    ),
    (
        Industry::Media,
        &[
            "view", "impression", "click", "engagement", "content", "video", "article", "stream",
            "watch", "listen",
        ],
    ),
    (
        Industry::Telecom,
        &[
            "call", "sms", "network", "tower", "subscriber", "voice", "roaming", "minutes",
            "bandwidth",
        ],
    ),
    (
        Industry::Energy,
        &[
            "power", "electricity", "consumption", "kwh", "meter", "grid", "generation", "solar",
            "wind", "fuel",
        ],
    ),
    (
        Industry::Marketing,
        &[
            "campaign", "impression", "click", "conversion", "ctr", "cpa", "roas", "spend",
            "audience",
        ],
    ),
];

/// Generic business terms. These score into a separate bucket that never
/// wins outright; they only indicate the table is business data at all.
const GENERIC_TERMS: &[&str] = &[
    "revenue", "sales", "customer", "date", "amount", "total", "count", "id",
];

/// Column presence signals derived from headers.
///
/// A coarse summary of which metric families the table can support at all,
/// included in the analysis response alongside the role mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSignals {
    pub has_revenue: bool,
    pub has_cost: bool,
    pub has_profit: bool,
    pub has_users: bool,
    pub has_retention: bool,
    pub has_transactions: bool,
    pub has_quantity: bool,
    pub has_growth: bool,
    pub has_date: bool,
    pub has_location: bool,
    pub has_product: bool,
    pub has_conversion: bool,
}

/// Result of classifying a header list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Role-to-column assignment
    pub roles: RoleMapping,
    /// Detected industry label
    pub industry: Industry,
    /// Coarse availability signals
    pub signals: ColumnSignals,
}

/// Strategy interface for header classification.
pub trait ColumnClassifier: Send + Sync {
    /// Classify a header list into roles plus an industry label.
    ///
    /// Must be pure: identical headers always produce identical output.
    fn classify(&self, headers: &[String]) -> Classification;
}

/// Default keyword-matching classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ColumnClassifier for KeywordClassifier {
    fn classify(&self, headers: &[String]) -> Classification {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let roles = map_roles(&normalized);
        let industry = detect_industry(&normalized);
        let signals = detect_signals(&normalized);

        tracing::debug!(industry = %industry, "Classified headers");

        Classification {
            roles,
            industry,
            signals,
        }
    }
}

/// Lowercase and strip underscores/spaces so "Monthly_Active Users" matches
/// "monthlyactiveusers".
fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .collect()
}

/// Assign each role to the first header containing one of its keywords.
fn map_roles(normalized: &[String]) -> RoleMapping {
    let mut mapping = RoleMapping::default();

    for (role, keywords) in ROLE_KEYWORDS {
        let hit = normalized
            .iter()
            .position(|h| keywords.iter().any(|kw| h.contains(kw)));
        if let Some(index) = hit {
            mapping.set(*role, index);
        }
    }

    mapping
}

/// Score every industry vocabulary against the headers and pick the highest
/// score above the threshold; generic-only matches fall back to Business.
fn detect_industry(normalized: &[String]) -> Industry {
    let mut best = Industry::Business;
    let mut best_score = 0u32;

    for (industry, terms) in INDUSTRY_KEYWORDS {
        let score: u32 = terms
            .iter()
            .filter(|term| normalized.iter().any(|h| h.contains(*term)))
            .count() as u32
            * INDUSTRY_TERM_WEIGHT;

        if score > best_score && score > INDUSTRY_SCORE_THRESHOLD {
            best_score = score;
            best = *industry;
        }
    }

    // Generic terms never win; they are only logged for diagnostics.
    let generic_score: u32 = GENERIC_TERMS
        .iter()
        .filter(|term| normalized.iter().any(|h| h.contains(*term)))
        .count() as u32
        * GENERIC_TERM_WEIGHT;

    tracing::trace!(
        winner = %best,
        score = best_score,
        generic_score,
        "Industry detection scores"
    );

    best
}

fn detect_signals(normalized: &[String]) -> ColumnSignals {
    let any = |terms: &[&str]| normalized.iter().any(|h| terms.iter().any(|t| h.contains(t)));

    ColumnSignals {
        has_revenue: any(&["revenue", "amount", "sales", "price", "income", "earnings"]),
        has_cost: any(&["cost", "expense", "spend"]),
        has_profit: any(&["profit", "margin", "ebitda"]),
        has_users: any(&["user", "customer", "subscriber", "member", "account", "client"]),
        has_retention: any(&["retention", "churn"]),
        has_transactions: any(&["transaction", "order", "purchase", "payment", "sale"]),
        has_quantity: any(&["quantity", "volume", "count", "units"]),
        has_growth: any(&["growth", "increase", "rate"]),
        has_date: any(&["date", "time", "month", "quarter", "year", "week"]),
        has_location: any(&["country", "region", "city", "location", "geography"]),
        has_product: any(&["product", "item", "category", "service", "sku"]),
        has_conversion: any(&["conversion", "rate"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_role_mapping_first_match_wins() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&["Gross Revenue", "Net Revenue", "Date"]));
        assert_eq!(result.roles.revenue, Some(0));
        assert_eq!(result.roles.date, Some(2));
        assert_eq!(result.roles.cost, None);
    }

    #[test]
    fn test_column_may_hold_multiple_roles() {
        let c = KeywordClassifier::new();
        // "Sales Month" contains both a revenue keyword and a date keyword.
        let result = c.classify(&headers(&["Sales Month", "Units"]));
        assert_eq!(result.roles.revenue, Some(0));
        assert_eq!(result.roles.date, Some(0));
        assert_eq!(result.roles.quantity, Some(1));
    }

    #[test]
    fn test_normalization_strips_underscores_and_spaces() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&["Monthly_Active Users"]));
        assert_eq!(result.roles.user, Some(0));
    }

    #[test]
    fn test_marketing_industry_detection() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&[
            "Campaign",
            "Impressions",
            "Clicks",
            "Conversions",
            "Spend",
            "Revenue",
        ]));
        assert_eq!(result.industry, Industry::Marketing);
    }

    #[test]
    fn test_generic_headers_default_to_business() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&["Month", "Revenue"]));
        assert_eq!(result.industry, Industry::Business);
    }

    #[test]
    fn test_saas_industry_detection() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&["Plan", "MRR", "Churn Rate", "Subscription Tier"]));
        assert_eq!(result.industry, Industry::Saas);
    }

    #[test]
    fn test_single_hit_below_threshold_is_business() {
        let c = KeywordClassifier::new();
        // One fintech term scores 2, which does not clear the threshold.
        let result = c.classify(&headers(&["Wallet", "Value"]));
        assert_eq!(result.industry, Industry::Business);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = KeywordClassifier::new();
        let hs = headers(&["Campaign", "Impressions", "Clicks", "Spend"]);
        let first = c.classify(&hs);
        let second = c.classify(&hs);
        assert_eq!(first.roles, second.roles);
        assert_eq!(first.industry, second.industry);
        assert_eq!(first.signals, second.signals);
    }

    #[test]
    fn test_signals() {
        let c = KeywordClassifier::new();
        let result = c.classify(&headers(&["Order Date", "Revenue", "Country", "Status"]));
        assert!(result.signals.has_revenue);
        assert!(result.signals.has_date);
        assert!(result.signals.has_location);
        assert!(!result.signals.has_profit);
    }
}
