//! Error types for the forecourt-report library.
//!
//! The pipeline is all-or-nothing: every stage either advances the record or
//! returns one of these tagged failures, and the orchestrator aborts the
//! remaining stages on the first one. Partial results are never surfaced.
//!
//! Each variant maps to a stable machine-readable kind string (see
//! [`ReportError::kind`]) so adapters can build a structured JSON error body
//! without matching on display text. HTTP status mapping is deliberately
//! *not* here — it belongs to the server adapter, the only place that speaks
//! HTTP.

use thiserror::Error;

/// All errors returned by the forecourt-report pipeline.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No file or storage path was supplied. Rejected before any external call.
    #[error("No report file supplied.\nAttach a PDF file or provide a storage path.")]
    MissingInput,

    /// Bytes were present but could not be parsed as a PDF
    /// (corrupted, encrypted, zero-length).
    #[error("Could not read PDF '{name}': {detail}")]
    UnreadablePdf { name: String, detail: String },

    /// The request body could not be decoded (malformed multipart stream,
    /// unparseable `fuel_prices` field). A client error, not a server one.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Storage errors ────────────────────────────────────────────────────
    /// Listing or downloading from the report bucket failed.
    /// The underlying storage message is kept for diagnosis.
    #[error("Storage operation failed: {detail}")]
    StorageUnavailable { detail: String },

    /// The bucket contains no report files to select from.
    #[error("No report files found under '{prefix}' in the report bucket")]
    EmptyBucket { prefix: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The completion endpoint could not be reached or returned a
    /// non-success transport status. Retryable by the caller; the pipeline
    /// itself never retries.
    #[error("LLM endpoint unavailable: {detail}")]
    ModelUnavailable { detail: String },

    /// The completion succeeded transport-wise but the body is not
    /// parseable JSON, or lacks one of the three mandatory fuel keys.
    ///
    /// Carries the raw model text so the failure can be diagnosed.
    /// Completeness defaults are never substituted at this level — zero
    /// synthesis for a *missing per-key line* belongs to the normalizer,
    /// not to papering over a malformed response.
    #[error("Model returned invalid output: {detail}")]
    InvalidModelOutput { detail: String, raw: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. Full detail is logged server-side; the
    /// adapter surfaces only a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Stable kind string for the structured JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::MissingInput => "missing_input",
            ReportError::UnreadablePdf { .. } => "unreadable_pdf",
            ReportError::InvalidRequest(_) => "invalid_request",
            ReportError::StorageUnavailable { .. } => "storage_unavailable",
            ReportError::EmptyBucket { .. } => "storage_unavailable",
            ReportError::ModelUnavailable { .. } => "model_unavailable",
            ReportError::InvalidModelOutput { .. } => "invalid_model_output",
            ReportError::InvalidConfig(_) => "invalid_config",
            ReportError::ProviderNotConfigured { .. } => "provider_not_configured",
            ReportError::Internal(_) => "internal_error",
        }
    }

    /// Raw model text attached to the error, when there is any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            ReportError::InvalidModelOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
