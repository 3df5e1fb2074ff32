//! # bizlens-core
//!
//! Core library for bizlens - a schema-aware business data analyst.
//!
//! This library provides:
//! - Tabular input parsing with per-cell type inference
//! - Column role and industry classification
//! - A descriptive/inferential statistics engine
//! - Eligibility gating that keeps unsupported metrics out of reports
//! - Lossless aggregation plus representative row sampling
//! - Prompt assembly for an external text-generation service
//! - Append-only SQLite persistence of analysis records
//!
//! ## Architecture
//!
//! One analysis request flows linearly:
//! validate -> gate -> classify -> aggregate -> sample -> prompt -> generate -> post-process
//!
//! The aggregation carries the lossless numeric truth; samples only
//! illustrate. The eligibility gate decides which metric families the
//! generated report may present at all.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bizlens_core::{Analyzer, ChatClient, Config};
//! use bizlens_core::ingest::parse_table;
//!
//! # async fn run() -> bizlens_core::Result<()> {
//! let config = Config::load()?;
//! let llm = ChatClient::new(config.llm.expect("llm configured"))?;
//! let analyzer = Analyzer::new(llm, config.analysis);
//!
//! let table = parse_table("Month,Revenue\nJan,50000\nFeb,60000\n")?;
//! let response = analyzer.analyze(&table, "How is revenue trending?").await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analyze::{Analyzer, PreparedAnalysis};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use llm::ChatClient;
pub use report::AnalysisResponse;
pub use types::*;

// Public modules
pub mod aggregate;
pub mod analyze;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod limit;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod report;
pub mod sample;
pub mod stats;
pub mod types;
pub mod validate;
