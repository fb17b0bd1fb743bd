//! Pipeline stages for report extraction and normalization.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and guarantees there
//! is exactly one implementation of each — the single consolidated pipeline
//! every entry point adapts to, rather than per-handler copies that drift.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ invoke ──▶ normalize ──▶ metrics
//! (pdf→text)  (LLM call)  (pure fixups)  (pure KPIs)
//! ```
//!
//! 1. [`extract`]   — PDF bytes to capped text (or base64), the only
//!    CPU-bound stage
//! 2. [`invoke`]    — the single LLM completion; the only network stage
//! 3. [`normalize`] — deterministic cleanup: typo table, category rules,
//!    fuel-key completeness
//! 4. [`metrics`]   — margin/profit and aggregate KPI derivation

pub mod extract;
pub mod invoke;
pub mod metrics;
pub mod normalize;
