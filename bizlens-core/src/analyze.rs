//! Analysis pipeline
//!
//! Ties the stages together for one request: integrity validation,
//! eligibility gating, classification, aggregation, sampling, prompt
//! assembly, the text-generation call, and post-processing. One linear
//! pass over in-memory data; the only suspension point is the API call.
//!
//! Aggregation always runs before sampling: the top-by-revenue sampling
//! strategy needs the classifier's resolved revenue column.

use chrono::Utc;

use crate::aggregate::{summarize_table, TableSummary};
use crate::classify::{Classification, ColumnClassifier, KeywordClassifier};
use crate::config::AnalysisConfig;
use crate::db::Database;
use crate::error::Result;
use crate::llm::ChatClient;
use crate::prompt::{assemble, AssembledPrompt, PromptContext};
use crate::report::{process_completion, AnalysisResponse, ValidationFlags};
use crate::sample::{representative_sample, SampleSet};
use crate::stats::{FullAnalysis, NumericSeries};
use crate::types::{AnalysisRecord, EligibilityReport, RecordMetrics, Table, ValidatedTotals};
use crate::validate::{check_eligibility, confidence_for, validate_integrity};

/// Everything computed before the text-generation call.
///
/// Useful on its own for offline inspection of the prompt the generator
/// would receive.
pub struct PreparedAnalysis {
    pub classification: Classification,
    pub eligibility: EligibilityReport,
    pub totals: ValidatedTotals,
    pub warnings: Vec<String>,
    pub summary: TableSummary,
    pub sample: SampleSet,
    pub statistics: Option<FullAnalysis>,
    pub prompt: AssembledPrompt,
}

/// The analysis pipeline.
///
/// All collaborators are injected: the classifier strategy, the
/// text-generation client, and the tuning knobs. No global state.
pub struct Analyzer {
    classifier: Box<dyn ColumnClassifier>,
    llm: Option<ChatClient>,
    settings: AnalysisConfig,
}

impl Analyzer {
    pub fn new(llm: ChatClient, settings: AnalysisConfig) -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new()),
            llm: Some(llm),
            settings,
        }
    }

    /// Build an analyzer without a text-generation client. Only
    /// [`Analyzer::prepare`] works; [`Analyzer::analyze`] fails.
    pub fn offline(settings: AnalysisConfig) -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new()),
            llm: None,
            settings,
        }
    }

    fn client(&self) -> Result<&ChatClient> {
        self.llm.as_ref().ok_or_else(|| {
            crate::error::Error::Config("no text-generation client configured".to_string())
        })
    }

    /// Replace the default keyword classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn ColumnClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run every local stage and assemble the prompt, without calling the
    /// text-generation service.
    pub fn prepare(&self, table: &Table, question: &str) -> Result<PreparedAnalysis> {
        let integrity = validate_integrity(table)?;
        let eligibility = check_eligibility(table);
        let classification = self.classifier.classify(&table.headers);

        tracing::info!(
            rows = table.row_count(),
            columns = table.column_count(),
            industry = %classification.industry,
            stats_allowed = eligibility.statistics.allowed,
            "Prepared analysis"
        );

        // Lossless aggregation first; sampling needs the resolved roles.
        let summary = summarize_table(table, &classification.roles);
        let sample = representative_sample(table, &classification.roles, self.settings.sample_target);

        let statistics = if eligibility.statistics.allowed {
            primary_numeric_column(table).map(|index| {
                NumericSeries::new(table.numeric_column(index)).full_analysis()
            })
        } else {
            tracing::debug!(
                reason = eligibility.statistics.reason.as_deref().unwrap_or(""),
                "Statistical analysis gated off"
            );
            None
        };

        let prompt = assemble(&PromptContext {
            question,
            table,
            classification: &classification,
            eligibility: &eligibility,
            totals: &integrity.totals,
            warnings: &integrity.warnings,
            summary: &summary,
            sample: &sample,
            statistics: statistics.as_ref(),
            settings: &self.settings,
        });

        Ok(PreparedAnalysis {
            classification,
            eligibility,
            totals: integrity.totals,
            warnings: integrity.warnings,
            summary,
            sample,
            statistics,
            prompt,
        })
    }

    /// Run the full pipeline including the text-generation call.
    ///
    /// Text-generation failures propagate as typed errors; no report is
    /// fabricated locally.
    pub async fn analyze(&self, table: &Table, question: &str) -> Result<AnalysisResponse> {
        let prepared = self.prepare(table, question)?;
        let answer = self.client()?.complete(prepared.prompt.messages()).await?;
        Ok(finish(table, prepared, &answer))
    }

    /// Run the full pipeline and persist the outcome for `user_id`.
    ///
    /// Persistence is best-effort: an insert failure is logged and the
    /// response is still returned, with `None` in place of the record.
    pub async fn analyze_and_record(
        &self,
        db: &Database,
        user_id: &str,
        dataset_id: Option<&str>,
        table: &Table,
        question: &str,
    ) -> Result<(AnalysisResponse, Option<AnalysisRecord>)> {
        let prepared = self.prepare(table, question)?;
        let prompt_hash = prepared.prompt.hash();
        let answer = self.client()?.complete(prepared.prompt.messages()).await?;
        let response = finish(table, prepared, &answer);

        let record = record_from(&response, user_id, dataset_id, question, &prompt_hash, table);
        let stored = match db.insert_analysis(&record) {
            Ok(()) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist analysis record");
                None
            }
        };

        Ok((response, stored))
    }
}

/// First column containing at least one numeric value; this is the column
/// the headline statistics describe (usually revenue or amount).
fn primary_numeric_column(table: &Table) -> Option<usize> {
    (0..table.column_count()).find(|&index| !table.numeric_column(index).is_empty())
}

fn finish(table: &Table, prepared: PreparedAnalysis, answer: &str) -> AnalysisResponse {
    let processed = process_completion(answer, table);

    AnalysisResponse {
        response_type: processed.response_type,
        content: processed.content,
        chart_data: processed.chart_data,
        confidence: confidence_for(table.row_count()).level,
        industry: prepared.classification.industry,
        statistics: prepared.statistics,
        available_columns: prepared.classification.signals,
        roles: prepared.classification.roles,
        validation_flags: ValidationFlags::from(&prepared.eligibility),
        validated_totals: prepared.totals,
        summary: prepared.summary,
        warnings: prepared.warnings,
    }
}

fn record_from(
    response: &AnalysisResponse,
    user_id: &str,
    dataset_id: Option<&str>,
    question: &str,
    prompt_hash: &str,
    table: &Table,
) -> AnalysisRecord {
    AnalysisRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        dataset_id: dataset_id.map(|s| s.to_string()),
        question: question.to_string(),
        answer: response.content.clone(),
        industry: response.industry,
        metrics: RecordMetrics {
            row_count: table.row_count(),
            column_count: table.column_count(),
            total_revenue: response.validated_totals.total_revenue,
            avg_revenue: response.validated_totals.avg_revenue,
        },
        prompt_hash: Some(prompt_hash.to_string()),
        created_at: Utc::now(),
    }
}
