//! Pipeline orchestrator: the single consolidated analysis entry point.
//!
//! Every adapter (HTTP multipart, storage trigger, CLI) funnels into
//! [`analyze_bytes`]; there is exactly one implementation of each stage.
//! An invocation walks `Fetching → Extracting → Normalizing →
//! ComputingMetrics → Done`, aborting to a tagged failure from any stage —
//! no retries, no partial results.
//!
//! Invocations are independent and stateless: the only shared objects are
//! the provider and store handles, both read-only, so any number of reports
//! may be analyzed concurrently with no coordination.

use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::pipeline::{extract, invoke, metrics, normalize};
use crate::provider::LlmProvider;
use crate::providers;
use crate::report::{ExtractedReport, FuelPriceMap};
use crate::storage::ReportStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where a storage-triggered report came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSource {
    pub bucket: String,
    pub path: String,
}

/// Result of a storage-triggered analysis: the report plus its origin.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAnalysis {
    pub source: ReportSource,
    #[serde(flatten)]
    pub report: ExtractedReport,
}

/// Analyze raw PDF bytes into a normalized, metrics-annotated report.
///
/// This is the primary entry point. `name` is used only for logs and error
/// messages; `prices` may be empty, in which case per-fuel margin/profit
/// stay null.
pub async fn analyze_bytes(
    name: &str,
    bytes: Vec<u8>,
    prices: &FuelPriceMap,
    config: &AnalysisConfig,
) -> Result<ExtractedReport, ReportError> {
    let total_start = Instant::now();
    info!("Analyzing report '{}' ({} bytes)", name, bytes.len());

    // ── Extracting ───────────────────────────────────────────────────────
    // PDF parsing is CPU-bound; keep it off the async executor.
    let extract_start = Instant::now();
    let owned_name = name.to_string();
    let binary_mode = config.binary_mode;
    let max_chars = config.max_text_chars;
    let content = tokio::task::spawn_blocking(move || {
        extract::extract_content(&owned_name, &bytes, binary_mode, max_chars)
    })
    .await
    .map_err(|e| ReportError::Internal(format!("extraction task failed: {e}")))??;
    debug!(
        "Extracted {} chars in {:?}",
        content.len(),
        extract_start.elapsed()
    );

    let report = analyze_content(content, prices, config).await?;

    info!(
        "Analysis of '{}' complete in {:?}",
        name,
        total_start.elapsed()
    );
    Ok(report)
}

/// Analyze pre-extracted document content.
///
/// Split out from [`analyze_bytes`] so adapters and tests that already hold
/// text (or base64) skip the PDF stage without duplicating the rest.
pub async fn analyze_content(
    content: crate::provider::DocumentContent,
    prices: &FuelPriceMap,
    config: &AnalysisConfig,
) -> Result<ExtractedReport, ReportError> {
    let provider = resolve_provider(config)?;

    // ── Invoking model ───────────────────────────────────────────────────
    let invoke_start = Instant::now();
    let candidate = invoke::invoke_extraction(&provider, content, prices, config).await?;
    info!("Model extraction took {:?}", invoke_start.elapsed());

    // ── Normalizing ──────────────────────────────────────────────────────
    let normalized = normalize::normalize(candidate);

    // ── Computing metrics ────────────────────────────────────────────────
    let report = metrics::compute_metrics(normalized, prices);

    Ok(report)
}

/// Storage-triggered analysis: fetch from the report bucket, then run the
/// same pipeline.
///
/// When `path` is `None` the most-recently-updated object under the
/// configured prefix is selected. The response carries the resolved
/// `source` so callers know which file was analyzed.
pub async fn analyze_stored(
    store: &ReportStore,
    path: Option<&str>,
    prices: &FuelPriceMap,
    config: &AnalysisConfig,
) -> Result<StoredAnalysis, ReportError> {
    // ── Fetching ─────────────────────────────────────────────────────────
    let path = match path {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => store.latest(&config.bucket_prefix).await?,
    };
    let bytes = store.download(&path).await?;

    let report = analyze_bytes(&path, bytes, prices, config).await?;

    Ok(StoredAnalysis {
        source: ReportSource {
            bucket: store.bucket().to_string(),
            path,
        },
        report,
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — constructed by the
///    caller; used as-is. The injection point for tests and middleware.
/// 2. **Named provider** (`config.provider_name`) — credentials read from
///    the environment for that vendor.
/// 3. **Auto-detection** — first vendor with an API key in the environment.
fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LlmProvider>, ReportError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let result = if let Some(ref name) = config.provider_name {
        providers::create_provider(name, config.model.as_deref(), config.api_timeout_secs)
    } else {
        providers::provider_from_env(config.model.as_deref(), config.api_timeout_secs)
    };

    result.map_err(|e| ReportError::ProviderNotConfigured {
        provider: config
            .provider_name
            .clone()
            .unwrap_or_else(|| "auto".to_string()),
        hint: e.to_string(),
    })
}
