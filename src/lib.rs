//! # forecourt-report
//!
//! Extract structured financial data from monthly fuel-station PDF reports.
//!
//! ## Why this crate?
//!
//! Station reports arrive as PDFs with hand-entered figures: misspelled
//! field names, categories the dashboard must not show, and fuel products
//! missing entirely in slow months. A single LLM extraction step turns the
//! document into a schema-conformant JSON record; everything after that is
//! deterministic — typo correction, category rules, fuel-key completeness,
//! margin/profit derivation, and aggregate KPIs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Extract    pdf text (capped) or base64, CPU-bound
//!  ├─ 2. Invoke     one schema-constrained LLM completion (temperature 0.1)
//!  ├─ 3. Normalize  typo table, category exclusion/rename, key completeness
//!  ├─ 4. Metrics    margin/profit from caller prices + aggregate KPIs
//!  └─ 5. Output     ExtractedReport with ui_metrics and summary
//! ```
//!
//! The contract is all-or-nothing: a failed stage aborts the invocation
//! with a tagged [`ReportError`]; partial records are never returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecourt_report::{analyze_bytes, AnalysisConfig, FuelPriceMap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = AnalysisConfig::default();
//!     let bytes = std::fs::read("march_report.pdf")?;
//!     let report = analyze_bytes("march_report.pdf", bytes, &FuelPriceMap::new(), &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `reportd` binary and the axum HTTP adapter |
//!
//! Disable `server` when using only the library:
//! ```toml
//! forecourt-report = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod report;
pub mod storage;

#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_bytes, analyze_content, analyze_stored, ReportSource, StoredAnalysis};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::ReportError;
pub use provider::{CompletionRequest, DocumentContent, LlmError, LlmProvider};
pub use report::{
    ExtractedReport, ForecastBlock, FuelKey, FuelLine, FuelPriceInput, FuelPriceMap, RawReport,
    ReportPeriod, ShopLine, UiMetrics,
};
pub use storage::ReportStore;
