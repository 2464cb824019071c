//! Rich diagnostic error types for canon-kg.
//!
//! Each fallible subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes, help text, and source chains so users know
//! exactly what went wrong and how to fix it.
//!
//! Resolution, inference, and tension detection have no error types: their
//! failure modes are degraded results, not errors.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for canon-kg.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CanonError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] crate::paths::PathError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(canon::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(canon::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Check that no other process holds the database open."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(canon::store::serde),
        help(
            "Failed to serialize or deserialize data. \
             This usually means the stored data format has changed between versions."
        )
    )]
    Serialization { message: String },

    #[error("corrupt store snapshot: {message}")]
    #[diagnostic(
        code(canon::store::corrupt),
        help(
            "The persisted knowledge graph could not be loaded. The data has NOT been \
             reset. Restore the database file from a backup, or move it aside and \
             re-run extraction to rebuild the graph."
        )
    )]
    CorruptSnapshot { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(canon::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(canon::config::parse),
        help("Check the TOML syntax and field names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(canon::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(canon::config::invalid), help("{message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning canon-kg results.
pub type CanonResult<T> = std::result::Result<T, CanonError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_canon_error() {
        let err = StoreError::CorruptSnapshot {
            message: "truncated".into(),
        };
        let canon: CanonError = err.into();
        assert!(matches!(
            canon,
            CanonError::Store(StoreError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn config_error_converts_to_canon_error() {
        let err = ConfigError::Invalid {
            message: "fuzzy_threshold must be <= 100".into(),
        };
        let canon: CanonError = err.into();
        assert!(matches!(canon, CanonError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = StoreError::Redb {
            message: "commit failed".into(),
        };
        assert!(format!("{err}").contains("commit failed"));
    }
}
