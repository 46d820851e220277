//! Tracing setup.
//!
//! The teacher repo carries a hand-rolled `ProductionLogger` with pluggable
//! `LogOutput` backends, but the code that actually calls into it across the
//! rest of that tree is plain `tracing::info!`/`warn!`/`error!`. This crate
//! follows the call-site idiom instead of the unused framework: one
//! `tracing_subscriber` init, `tracing` macros everywhere else.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber reading filter directives from
/// `RUST_LOG`, defaulting to `info` if unset. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
