//! Error types for the extraction engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the engine's `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Extraction engine error types, grouped by the taxonomy in the spec's
/// error-handling design: input errors, parse errors, limit hits,
/// cancellation, and internal invariant violations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("target path not found: {path}")]
    TargetNotFound { path: PathBuf },

    #[error("target path is not a directory: {path}")]
    TargetNotADirectory { path: PathBuf },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("schema version {found} is incompatible with required range {required}")]
    SchemaMismatch { found: String, required: String },

    #[error("extraction was cancelled")]
    Cancelled,

    #[error("internal invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// A one-line human message plus remediation text, per the spec's
    /// "structured error code, a one-line human message, and remediation
    /// text" requirement for fatal errors.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::TargetNotFound { .. } => "check that the target path exists and is accessible",
            Error::TargetNotADirectory { .. } => {
                "pass a directory, not a file, as the target path"
            }
            Error::InvalidConfig { .. } => {
                "check the configuration value against the documented options"
            }
            Error::SchemaMismatch { .. } => {
                "upgrade or pin the consumer to a compatible castellan version"
            }
            Error::Cancelled => "the run was cancelled before an artifact was produced; retry",
            Error::InvariantViolation { .. } => {
                "this indicates a bug in castellan; please file an issue"
            }
            Error::Io(_) => "check file permissions and disk space",
            Error::Json(_) => "the artifact or config JSON is malformed",
            Error::TomlParse(_) => "the configuration TOML is malformed",
            Error::Glob(_) => "check the include/exclude glob syntax",
        }
    }

    /// A short machine-stable error code for the structured fatal-error surface.
    pub fn code(&self) -> &'static str {
        match self {
            Error::TargetNotFound { .. } => "E_TARGET_NOT_FOUND",
            Error::TargetNotADirectory { .. } => "E_TARGET_NOT_DIR",
            Error::InvalidConfig { .. } => "E_INVALID_CONFIG",
            Error::SchemaMismatch { .. } => "E_SCHEMA_MISMATCH",
            Error::Cancelled => "E_CANCELLED",
            Error::InvariantViolation { .. } => "E_INVARIANT",
            Error::Io(_) => "E_IO",
            Error::Json(_) => "E_JSON",
            Error::TomlParse(_) => "E_TOML",
            Error::Glob(_) => "E_GLOB",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_is_non_empty_for_every_variant() {
        let errs: Vec<Error> = vec![
            Error::TargetNotFound { path: "x".into() },
            Error::TargetNotADirectory { path: "x".into() },
            Error::InvalidConfig {
                message: "x".into(),
            },
            Error::SchemaMismatch {
                found: "2.0.0".into(),
                required: "(1,0,1)".into(),
            },
            Error::Cancelled,
            Error::InvariantViolation {
                message: "x".into(),
            },
        ];
        for e in errs {
            assert!(!e.remediation().is_empty());
            assert!(e.code().starts_with("E_"));
        }
    }
}
