//! Prompt assembly
//!
//! Builds the system instruction and user content handed to the
//! text-generation service. The assembled prompt carries four things the
//! generator must not invent for itself: the verified totals, the
//! eligibility constraints (denial reasons verbatim), the lossless
//! aggregation, and a bounded set of concrete example rows.
//!
//! Assembly is a pure function of its inputs; identical analysis state
//! produces an identical prompt (and hash).

use sha2::{Digest, Sha256};

use crate::aggregate::TableSummary;
use crate::classify::Classification;
use crate::config::AnalysisConfig;
use crate::llm::ChatMessage;
use crate::sample::SampleSet;
use crate::stats::FullAnalysis;
use crate::types::{Cell, EligibilityReport, Table, ValidatedTotals};
use crate::validate::{confidence_for, ConfidenceGuidance};

/// Marker the generator emits when the answer should ship with a chart.
pub const CHART_MARKER: &str = "SHOW_CHART";

/// Everything the assembler needs to build a prompt.
pub struct PromptContext<'a> {
    pub question: &'a str,
    pub table: &'a Table,
    pub classification: &'a Classification,
    pub eligibility: &'a EligibilityReport,
    pub totals: &'a ValidatedTotals,
    pub warnings: &'a [String],
    pub summary: &'a TableSummary,
    pub sample: &'a SampleSet,
    /// Primary-column statistics; absent when the eligibility gate denied
    /// statistical analysis
    pub statistics: Option<&'a FullAnalysis>,
    pub settings: &'a AnalysisConfig,
}

/// An assembled system + user message pair.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

impl AssembledPrompt {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }

    /// SHA-256 of the full prompt text, stored with the analysis record.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.system.as_bytes());
        hasher.update(self.user.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Assemble the prompt pair for one analysis request.
pub fn assemble(ctx: &PromptContext<'_>) -> AssembledPrompt {
    let confidence = confidence_for(ctx.table.row_count());

    AssembledPrompt {
        system: build_system(ctx),
        user: build_user(ctx, &confidence),
    }
}

fn build_system(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();
    let row_count = ctx.table.row_count();

    out.push_str(&format!(
        "You are a professional data analyst for the {} industry.\n\n",
        ctx.classification.industry
    ));
    out.push_str(
        "YOUR TASK:\nAnalyze the provided dataset and answer the user's question with clear, actionable insights.\n\n",
    );

    out.push_str("VALIDATED DATA (DO NOT RECALCULATE):\n");
    if ctx.totals.total_revenue > 0.0 {
        out.push_str(&format!(
            "Total Revenue: {:.2} (VERIFIED)\n",
            ctx.totals.total_revenue
        ));
        out.push_str(&format!(
            "Average Revenue: {:.2} (VERIFIED)\n",
            ctx.totals.avg_revenue
        ));
    }
    if ctx.totals.total_spend > 0.0 {
        out.push_str(&format!(
            "Total Spend: {:.2} (VERIFIED)\n",
            ctx.totals.total_spend
        ));
    }
    out.push_str(&format!("Sample Size: {} data points\n\n", row_count));

    out.push_str("CRITICAL RULES:\n");
    out.push_str("1. Use ONLY the validated totals shown above.\n");
    if row_count < 30 {
        out.push_str(&format!(
            "2. With only {} data points, focus on observable trends rather than statistical significance.\n",
            row_count
        ));
    } else {
        out.push_str("2. Provide statistical insights.\n");
    }
    match &ctx.eligibility.growth {
        d if d.allowed => out.push_str("3. Growth analysis is allowed.\n"),
        d => out.push_str(&format!(
            "3. DO NOT calculate growth rates - {}\n",
            d.reason.as_deref().unwrap_or("not permitted")
        )),
    }
    out.push_str("4. Be specific and actionable.\n");
    out.push_str("5. If asked about totals, use the VERIFIED values above.\n\n");

    out.push_str("RESPONSE FORMAT:\n");
    out.push_str("- Start with the key finding\n");
    out.push_str("- Provide 2-3 actionable insights\n");
    out.push_str("- Use bullet points for clarity\n");
    out.push_str("- Keep language business-friendly\n");
    out.push_str(&format!(
        "- If a chart would materially help the answer, include the token {} on its own line\n",
        CHART_MARKER
    ));

    out
}

fn build_user(ctx: &PromptContext<'_>, confidence: &ConfidenceGuidance) -> String {
    let mut out = String::new();

    out.push_str(ctx.question);
    out.push_str("\n\n");
    out.push_str(&data_context(ctx));
    out.push_str(&statistical_context(ctx, confidence));
    out.push_str(&constraints(ctx));

    if !ctx.warnings.is_empty() {
        out.push_str("\nDATA QUALITY WARNINGS:\n");
        for warning in ctx.warnings {
            out.push_str(&format!("- {}\n", warning));
        }
    }

    out
}

fn data_context(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();
    let row_count = ctx.table.row_count();

    out.push_str("DATASET ANALYSIS\n");
    out.push_str(&format!("Total Rows Analyzed: {}\n", row_count));
    out.push_str(&format!(
        "Industry Detected: {}\n",
        ctx.classification.industry
    ));
    out.push_str(&format!("Columns: {}\n\n", ctx.table.headers.join(", ")));

    out.push_str("VALIDATED FINANCIAL METRICS (calculated from actual data):\n");
    if ctx.totals.total_revenue > 0.0 {
        out.push_str(&format!("Total Revenue: {:.2}\n", ctx.totals.total_revenue));
        out.push_str(&format!("Average Revenue: {:.2}\n", ctx.totals.avg_revenue));
    }
    if ctx.totals.total_spend > 0.0 {
        out.push_str(&format!("Total Spend: {:.2}\n", ctx.totals.total_spend));
    }
    if ctx.totals.total_revenue > 0.0 && ctx.totals.total_spend > 0.0 {
        out.push_str(&format!(
            "Profit: {:.2}\n",
            ctx.totals.total_revenue - ctx.totals.total_spend
        ));
    }
    out.push('\n');

    if row_count > ctx.settings.large_table_rows {
        // Two-stage rendering: lossless aggregate plus bounded examples.
        out.push_str("STAGE 1: COMPLETE STATISTICAL OVERVIEW (all rows, no sampling)\n");
        match serde_json::to_string_pretty(ctx.summary) {
            Ok(json) => out.push_str(&json),
            Err(_) => out.push_str("(aggregation unavailable)"),
        }
        out.push_str("\n\n");

        out.push_str(&format!(
            "STAGE 2: REPRESENTATIVE SAMPLES ({} examples)\n",
            ctx.sample.rows.len()
        ));
        out.push_str(&render_rows(
            &ctx.sample.headers,
            &ctx.sample.rows,
            ctx.settings.prompt_sample_rows,
        ));
        out.push_str(&format!(
            "\nNOTE: You have access to COMPLETE statistics from all {} rows above, plus specific example rows for reference.\n\n",
            row_count
        ));
    } else {
        out.push_str(&format!("COMPLETE DATASET ({} rows):\n", row_count));
        out.push_str(&render_rows(&ctx.table.headers, &ctx.table.rows, row_count));
        out.push('\n');
    }

    out
}

fn statistical_context(ctx: &PromptContext<'_>, confidence: &ConfidenceGuidance) -> String {
    let mut out = String::new();
    let row_count = ctx.table.row_count();

    out.push_str("STATISTICAL CONTEXT:\n");
    out.push_str(&format!("- Sample Size: {} data points\n", row_count));
    out.push_str(&format!(
        "- Statistical Confidence: {}\n",
        confidence.level.as_str().to_uppercase()
    ));
    out.push_str(&format!("- Guidance: {}\n", confidence.language_guideline));

    if row_count < 30 {
        out.push_str(&format!(
            "\nIMPORTANT: With only {} data points, you MUST:\n",
            row_count
        ));
        out.push_str(&format!(
            "1. Start insights with \"{}\"\n",
            confidence.disclaimer_prefix
        ));
        out.push_str(
            "2. Use cautious language (avoid \"proves\", \"confirms\", \"statistically significant\")\n",
        );
        out.push_str(
            "3. Add disclaimer: \"Note: Limited sample size - validate with more data before major decisions\"\n",
        );
        out.push_str("4. Do NOT claim statistical significance or high confidence\n");
    }
    if !confidence.show_r_squared {
        out.push_str("5. Do NOT mention R-squared or p-values (insufficient data for these metrics)\n");
    }

    if let Some(stats) = ctx.statistics {
        out.push_str("\nSTATISTICAL FINDINGS (verified):\n");
        if let Some(mean) = stats.mean {
            out.push_str(&format!("- Mean: {:.2}\n", mean));
        }
        if let (Some(min), Some(max)) = (stats.min, stats.max) {
            out.push_str(&format!("- Range: {:.2} to {:.2}\n", min, max));
        }
        if let Some(trend) = &stats.trend {
            out.push_str(&format!(
                "- Trend: {} (R-squared = {:.2}, {})\n",
                trend.direction.as_str(),
                trend.r_squared,
                trend.strength.as_str()
            ));
        }
        if let Some(ci) = &stats.confidence_interval_95 {
            out.push_str(&format!(
                "- 95% Confidence Interval: {:.2} to {:.2}\n",
                ci.lower, ci.upper
            ));
        }
        if let Some(growth) = &stats.growth_significance {
            out.push_str(&format!(
                "- Growth Significance: t = {:.2} ({})\n",
                growth.t_statistic,
                if growth.significant {
                    "statistically significant"
                } else {
                    "not significant"
                }
            ));
        }
        let anomalies = stats
            .outliers_z_score
            .as_ref()
            .map(|o| o.count)
            .unwrap_or(0);
        out.push_str(&format!("- Anomalies Detected: {} outliers\n", anomalies));
    } else {
        out.push_str(&format!(
            "\n- Limited sample size ({} rows) - showing trends only\n",
            row_count
        ));
    }

    out.push('\n');
    out
}

fn constraints(ctx: &PromptContext<'_>) -> String {
    let mut out = String::from("IMPORTANT CONSTRAINTS:\n");
    let mut any = false;

    for (label, decision) in [
        ("Growth Rate", &ctx.eligibility.growth),
        ("Statistical Tests", &ctx.eligibility.statistics),
        ("Forecasting", &ctx.eligibility.forecast),
    ] {
        if !decision.allowed {
            if let Some(reason) = &decision.reason {
                out.push_str(&format!("- {}: {}\n", label, reason));
                any = true;
            }
        }
    }

    if !any {
        out.push_str("- None\n");
    }
    out
}

fn render_rows(headers: &[String], rows: &[Vec<Cell>], limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&headers.join(" | "));
    out.push('\n');
    for row in rows.iter().take(limit) {
        let line: Vec<String> = row.iter().map(Cell::render).collect();
        out.push_str(&line.join(" | "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize_table;
    use crate::classify::{ColumnClassifier, KeywordClassifier};
    use crate::ingest::parse_table;
    use crate::sample::representative_sample;
    use crate::stats::NumericSeries;
    use crate::validate::{check_eligibility, validate_integrity};

    struct Fixture {
        table: Table,
        classification: Classification,
        eligibility: EligibilityReport,
        totals: ValidatedTotals,
        warnings: Vec<String>,
        summary: TableSummary,
        sample: SampleSet,
        statistics: Option<FullAnalysis>,
        settings: AnalysisConfig,
    }

    impl Fixture {
        fn new(raw: &str) -> Self {
            let table = parse_table(raw).unwrap();
            let classification = KeywordClassifier::new().classify(&table.headers);
            let eligibility = check_eligibility(&table);
            let integrity = validate_integrity(&table).unwrap();
            let summary = summarize_table(&table, &classification.roles);
            let settings = AnalysisConfig::default();
            let sample =
                representative_sample(&table, &classification.roles, settings.sample_target);
            let statistics = if eligibility.statistics.allowed {
                classification
                    .roles
                    .revenue
                    .map(|i| NumericSeries::new(table.numeric_column(i)).full_analysis())
            } else {
                None
            };
            Self {
                table,
                classification,
                eligibility,
                totals: integrity.totals,
                warnings: integrity.warnings,
                summary,
                sample,
                statistics,
                settings,
            }
        }

        fn context(&self) -> PromptContext<'_> {
            PromptContext {
                question: "How is revenue trending?",
                table: &self.table,
                classification: &self.classification,
                eligibility: &self.eligibility,
                totals: &self.totals,
                warnings: &self.warnings,
                summary: &self.summary,
                sample: &self.sample,
                statistics: self.statistics.as_ref(),
                settings: &self.settings,
            }
        }
    }

    fn small_fixture() -> Fixture {
        Fixture::new("Month,Revenue\nJan,50000\nFeb,60000\nMar,70000\nApr,65000\nMay,80000\n")
    }

    fn large_fixture() -> Fixture {
        let mut raw = String::from("Month,Revenue\n");
        for i in 0..150 {
            raw.push_str(&format!("P{:03},{}\n", i, 1000 + i * 10));
        }
        Fixture::new(&raw)
    }

    #[test]
    fn test_system_prompt_carries_verified_totals_and_industry() {
        let fixture = small_fixture();
        let prompt = assemble(&fixture.context());
        assert!(prompt.system.contains("business industry"));
        assert!(prompt.system.contains("Total Revenue: 325000.00 (VERIFIED)"));
        assert!(prompt.system.contains("Average Revenue: 65000.00 (VERIFIED)"));
    }

    #[test]
    fn test_denial_reasons_surface_verbatim() {
        let fixture = small_fixture();
        let prompt = assemble(&fixture.context());
        // 5 rows: statistics and forecasting denied, growth allowed.
        assert!(prompt.user.contains("Sample size too small (5 rows)"));
        assert!(prompt.user.contains("Need >=12 time periods for forecasting"));
        assert!(prompt.system.contains("Growth analysis is allowed"));
    }

    #[test]
    fn test_small_table_renders_complete_dataset() {
        let fixture = small_fixture();
        let prompt = assemble(&fixture.context());
        assert!(prompt.user.contains("COMPLETE DATASET (5 rows)"));
        assert!(prompt.user.contains("Jan | 50000"));
        assert!(!prompt.user.contains("STAGE 2"));
    }

    #[test]
    fn test_large_table_uses_two_stage_rendering() {
        let fixture = large_fixture();
        let prompt = assemble(&fixture.context());
        assert!(prompt.user.contains("STAGE 1: COMPLETE STATISTICAL OVERVIEW"));
        assert!(prompt.user.contains("STAGE 2: REPRESENTATIVE SAMPLES"));
        assert!(!prompt.user.contains("COMPLETE DATASET"));
    }

    #[test]
    fn test_small_sample_forbids_r_squared_language() {
        let fixture = small_fixture();
        let prompt = assemble(&fixture.context());
        assert!(prompt.user.contains("Do NOT mention R-squared"));
        assert!(prompt.user.contains("Do NOT claim statistical significance"));
    }

    #[test]
    fn test_large_sample_includes_statistical_findings() {
        let fixture = large_fixture();
        let prompt = assemble(&fixture.context());
        assert!(prompt.user.contains("STATISTICAL FINDINGS (verified)"));
        assert!(prompt.user.contains("Trend: upward"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let fixture = small_fixture();
        let first = assemble(&fixture.context());
        let second = assemble(&fixture.context());
        assert_eq!(first.system, second.system);
        assert_eq!(first.user, second.user);
        assert_eq!(first.hash(), second.hash());
        assert_eq!(first.hash().len(), 64);
    }
}
