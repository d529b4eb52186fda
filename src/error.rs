//! Error types for resource loading.
//!
//! Storage and bootstrap code propagate `anyhow::Error`; only resource loading
//! has a typed taxonomy because callers degrade differently per variant.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read resource {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed resource {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid keyword weight {weight} for '{keyword}' in category '{category}'")]
    InvalidWeight {
        category: String,
        keyword: String,
        weight: f64,
    },
}

/// Whether the adult-content veto can fire. Losing it removes the primary
/// safety behavior, so it is reported separately from ordinary coverage loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyStatus {
    Protected,
    VetoUnavailable,
}

impl SafetyStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SafetyStatus::VetoUnavailable)
    }
}
