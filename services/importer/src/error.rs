//! Error taxonomy for an import run
//!
//! - `ImportError`: fatal to the whole run (nothing else is attempted)
//! - `RowError`: confined to a single source row (the run continues)
//!
//! Blank or malformed dates are not errors at all, see `dates`.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort the import before or while streaming the source
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to connect to database: {source}")]
    Connect {
        #[source]
        source: sqlx::Error,
    },

    #[error("source file not found: {path:?}")]
    SourceNotFound { path: PathBuf },

    #[error("failed to open source file {path:?}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read source header: {0}")]
    Header(String),

    #[error("failed to read source at line {line:?}: {source}")]
    SourceRead {
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },
}

/// Failures that skip one row and let the run continue
#[derive(Debug, Error)]
pub enum RowError {
    #[error("missing required field '{column}'")]
    MissingField { column: &'static str },

    #[error("invalid amount: '{value}'")]
    InvalidAmount { value: String },

    #[error("field '{column}' is not valid {encoding}")]
    Encoding {
        column: String,
        encoding: &'static str,
    },

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl ImportError {
    /// True for outcomes caused by the input file rather than the environment
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            ImportError::SourceNotFound { .. }
                | ImportError::SourceOpen { .. }
                | ImportError::Header(_)
                | ImportError::SourceRead { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_messages_name_the_column() {
        let err = RowError::MissingField { column: "DEVEDOR" };
        assert_eq!(err.to_string(), "missing required field 'DEVEDOR'");

        let err = RowError::InvalidAmount {
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid amount: 'abc'");
    }

    #[test]
    fn test_source_errors_are_classified() {
        let missing = ImportError::SourceNotFound {
            path: PathBuf::from("protesto2.csv"),
        };
        assert!(missing.is_source_error());
        assert!(missing.to_string().contains("protesto2.csv"));

        assert!(!ImportError::Config("bad port".to_string()).is_source_error());
    }
}
