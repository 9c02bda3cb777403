// crates/test-ledger-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber installation for the CLI process.
// Purpose: Route library `tracing` events to stderr as text or JSON.
// Dependencies: clap, tracing-subscriber
// ============================================================================

//! ## Overview
//! Installs one global `fmt` subscriber filtered by `RUST_LOG` (default
//! `info`). Output goes to stderr so command results on stdout stay clean.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns a message when a global subscriber is already installed.
pub fn init(format: LogFormat) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| format!("logging init failed: {err}"))
}
