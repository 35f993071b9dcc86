// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Invalid (non-uranium) isotope: {0}")]
    InvalidIsotope(u32),

    #[error("Invalid target assays: {0}")]
    InvalidTarget(String),

    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Value function domain error: {0}")]
    Domain(String),

    #[error("Stage optimisation did not converge after {iterations} iterations: {message}")]
    NonConvergence { iterations: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("External backend error: {0}")]
    ExternalBackend(String),

    #[error("Internal consistency violated: {0}")]
    InternalConsistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnrichmentError {
    /// True for failures caused by the request itself (bad input, unreachable
    /// targets, a failing backend). Internal consistency violations are
    /// defects and return false.
    pub fn is_infeasible_request(&self) -> bool {
        !matches!(self, EnrichmentError::InternalConsistency(_))
    }

    /// Prefix `ctx` onto the message while keeping the error kind.
    /// Variants without a free-form message are returned unchanged.
    pub fn context(self, ctx: &str) -> Self {
        use EnrichmentError::*;
        match self {
            InvalidTarget(m) => InvalidTarget(format!("{ctx}: {m}")),
            InvalidComposition(m) => InvalidComposition(format!("{ctx}: {m}")),
            InvalidQuantity(m) => InvalidQuantity(format!("{ctx}: {m}")),
            Domain(m) => Domain(format!("{ctx}: {m}")),
            NonConvergence {
                iterations,
                message,
            } => NonConvergence {
                iterations,
                message: format!("{ctx}: {message}"),
            },
            ConfigError(m) => ConfigError(format!("{ctx}: {m}")),
            ExternalBackend(m) => ExternalBackend(format!("{ctx}: {m}")),
            InternalConsistency(m) => InternalConsistency(format!("{ctx}: {m}")),
            other => other,
        }
    }
}

pub type EnrichmentResult<T> = Result<T, EnrichmentError>;
