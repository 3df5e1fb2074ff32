//! bizlens - schema-aware business data analyst
//!
//! Parses a tabular file, infers column roles and industry, computes
//! statistics, and asks the configured text-generation API for a business
//! report grounded in the verified numbers.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use bizlens_core::analyze::Analyzer;
use bizlens_core::ingest::parse_table;
use bizlens_core::report::ResponseType;
use bizlens_core::{ChatClient, Config, Database};

#[derive(Parser)]
#[command(name = "bizlens")]
#[command(about = "Analyze tabular business data with a generated report")]
#[command(version)]
struct Args {
    /// Tabular input file (CSV or delimiter-separated text)
    #[arg(short, long, required_unless_present = "history")]
    file: Option<PathBuf>,

    /// Question to answer about the data
    #[arg(short, long, default_value = "Give me an overview of this dataset.")]
    question: String,

    /// User identity that owns the stored analysis
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Dataset identifier to tag the stored analysis with
    #[arg(short, long)]
    dataset: Option<String>,

    /// Print the assembled prompt instead of calling the API
    #[arg(long)]
    offline: bool,

    /// List stored analyses for the user instead of running one
    #[arg(long)]
    history: bool,

    /// Output format: text (default) or json
    #[arg(long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        bizlens_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    if args.history {
        return show_history(&db, &args.user);
    }

    let Some(file) = args.file.as_ref() else {
        bail!("--file is required unless --history is given");
    };
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let table = parse_table(&raw).context("failed to parse tabular input")?;

    tracing::info!(
        file = %file.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Parsed input file"
    );

    if table.skipped_rows > 0 {
        eprintln!(
            "note: skipped {} malformed row(s) during parsing",
            table.skipped_rows
        );
    }

    if args.offline {
        let analyzer = Analyzer::offline(config.analysis);
        let prepared = analyzer
            .prepare(&table, &args.question)
            .context("failed to prepare analysis")?;

        println!("=== SYSTEM ===\n{}", prepared.prompt.system);
        println!("=== USER ===\n{}", prepared.prompt.user);
        return Ok(());
    }

    let Some(llm_config) = config.llm else {
        bail!(
            "no [llm] section in {}; configure the text-generation API or run with --offline",
            Config::config_path().display()
        );
    };

    let llm = ChatClient::new(llm_config).context("failed to create text-generation client")?;
    let analyzer = Analyzer::new(llm, config.analysis);

    let (response, record) = analyzer
        .analyze_and_record(&db, &args.user, args.dataset.as_deref(), &table, &args.question)
        .await
        .context("analysis failed")?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.content);
    println!();
    println!(
        "[industry: {} | confidence: {} | rows: {}]",
        response.industry,
        response.confidence.as_str(),
        response.validated_totals.row_count
    );

    if response.response_type == ResponseType::Chart {
        if let Some(chart) = &response.chart_data {
            println!("\nChart series:");
            for point in chart {
                println!("  {:<30} {}", point.label, point.value);
            }
        }
    }

    if record.is_none() {
        eprintln!("note: analysis was not persisted (storage unavailable)");
    }

    Ok(())
}

fn show_history(db: &Database, user: &str) -> Result<()> {
    let records = db.list_analyses(user, 20)?;

    if records.is_empty() {
        println!("No stored analyses for '{}'.", user);
        return Ok(());
    }

    for record in records {
        println!(
            "{}  [{}] {} rows  {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.industry,
            record.metrics.row_count,
            record.question
        );
    }

    Ok(())
}
