// crates/clientbook-cli/src/telemetry.rs
// ============================================================================
// Module: CLI Telemetry
// Description: Installs the tracing subscriber for CLI runs.
// Purpose: Route runtime diagnostics to stderr at the configured level.
// Dependencies: clientbook-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! Diagnostics go to stderr so stdout stays reserved for command output.
//! The level comes from `[logging] level` unless [`LOG_ENV_VAR`] holds an
//! `EnvFilter` directive, which then wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clientbook_config::LogFormat;
use clientbook_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the configured log filter.
pub const LOG_ENV_VAR: &str = "CLIENTBOOK_LOG";

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the filter from the override or the configured level.
///
/// # Errors
///
/// Returns the parse error when the override is not a valid directive.
pub fn build_filter(
    config: &LoggingConfig,
    env_override: Option<&str>,
) -> Result<EnvFilter, String> {
    match env_override.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|err| format!("{LOG_ENV_VAR}: {err}"))
        }
        None => EnvFilter::try_new(config.level.as_str()).map_err(|err| err.to_string()),
    }
}

/// Installs the global subscriber on stderr.
///
/// # Errors
///
/// Returns a message when the filter is invalid or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), String> {
    let env_override = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(config, env_override.as_deref())?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| err.to_string())
}
