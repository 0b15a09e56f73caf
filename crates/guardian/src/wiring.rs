//! Environment-driven process wiring.
//!
//! §6 ("Process surface") leaves endpoint configuration to "environment or
//! config" and puts logging/config-loading/heartbeat out of the core scope
//! (§1) as external collaborators, but SPEC_FULL.md §1 carries the ambient
//! stack regardless: this module is the one place that reads environment
//! variables and turns them into the typed values the rest of the crate
//! needs, the same way the teacher's examples read `RUST_LOG` and
//! endpoint URLs before constructing a service.

use std::env;

/// Process-level configuration read once at startup. Distinct from
/// [`guardian_core::Config`], which is the per-tick tunables loaded from
/// the `services/guardian` document (§4.8 `LoadConfig`) -- this is the
/// static wiring needed before the first tick can even run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Base URL of the DocStore's JSON REST endpoint, e.g.
    /// `http://localhost:5984`.
    pub docstore_url: String,
    /// Base URL of the MetricsClient's query endpoint.
    pub metrics_url: String,
}

/// Raised when a required environment variable is absent or malformed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

const DOCSTORE_URL_VAR: &str = "GUARDIAN_DOCSTORE_URL";
const METRICS_URL_VAR: &str = "GUARDIAN_METRICS_URL";

/// Reads [`EnvConfig`] from the process environment. Both variables are
/// required: there is no sane default for where the store or metrics
/// backend live.
pub fn env_config() -> Result<EnvConfig, EnvConfigError> {
    Ok(EnvConfig {
        docstore_url: env::var(DOCSTORE_URL_VAR).map_err(|_| EnvConfigError::Missing(DOCSTORE_URL_VAR))?,
        metrics_url: env::var(METRICS_URL_VAR).map_err(|_| EnvConfigError::Missing(METRICS_URL_VAR))?,
    })
}

/// Initializes the global `tracing` subscriber from `RUST_LOG` (default
/// `info`), matching the teacher's examples' unconditional subscriber
/// init in binaries (library crates stay feature-gated on `tracing`
/// instead).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
