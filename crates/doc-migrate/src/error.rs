//! Error types for doc-migrate.
//!
//! Each category matches the granularity at which the orchestrator catches it:
//! record-level and attribute-level failures are logged and swallowed,
//! mapping-level fetch failures skip one mapping, and validation failures end
//! the run.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a migration.
#[derive(Error, Debug)]
pub enum Error {
    /// Incomplete or malformed run input (MIGRATE-001). Fatal to the run.
    #[error("[MIGRATE-001] Validation error: {0}")]
    Validation(String),

    /// Source table read failed (MIGRATE-002). Fatal to one mapping.
    #[error("[MIGRATE-002] Source fetch failed for '{table}': {message}")]
    SourceFetch {
        /// Source table name.
        table: String,
        /// Transport status line or decode failure.
        message: String,
    },

    /// Destination schema could not be read (MIGRATE-003). Fatal to one record.
    #[error("[MIGRATE-003] Failed to get collection schema: {0}")]
    SchemaFetch(String),

    /// One attribute-creation call failed (MIGRATE-004). Fatal to that attribute.
    #[error("[MIGRATE-004] Failed to create attribute '{key}': {message}")]
    AttributeCreate {
        /// Attribute key.
        key: String,
        /// Destination API error message.
        message: String,
    },

    /// One document write failed (MIGRATE-005). Fatal to that record.
    #[error("[MIGRATE-005] Document creation failed: {0}")]
    DocumentWrite(String),

    /// Configuration file error (MIGRATE-006).
    #[error("[MIGRATE-006] Configuration error: {0}")]
    Config(String),

    /// IO error (MIGRATE-007).
    #[error("[MIGRATE-007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error (MIGRATE-008).
    #[error("[MIGRATE-008] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns the error code (e.g., "MIGRATE-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "MIGRATE-001",
            Self::SourceFetch { .. } => "MIGRATE-002",
            Self::SchemaFetch(_) => "MIGRATE-003",
            Self::AttributeCreate { .. } => "MIGRATE-004",
            Self::DocumentWrite(_) => "MIGRATE-005",
            Self::Config(_) => "MIGRATE-006",
            Self::Io(_) => "MIGRATE-007",
            Self::Yaml(_) => "MIGRATE-008",
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        // Arrange
        let errors: Vec<Error> = vec![
            Error::Validation("x".into()),
            Error::SourceFetch {
                table: "t".into(),
                message: "x".into(),
            },
            Error::SchemaFetch("x".into()),
            Error::AttributeCreate {
                key: "k".into(),
                message: "x".into(),
            },
            Error::DocumentWrite("x".into()),
            Error::Config("x".into()),
            Error::Io(std::io::Error::other("x")),
        ];

        // Act
        let mut codes: Vec<&str> = errors.iter().map(Error::code).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();

        // Assert
        assert_eq!(codes.len(), total, "Error codes must be unique");
        assert!(codes.iter().all(|c| c.starts_with("MIGRATE-")));
    }

    #[test]
    fn test_error_display_includes_code_and_context() {
        let err = Error::SourceFetch {
            table: "users".into(),
            message: "404 Not Found".into(),
        };

        let display = err.to_string();

        assert!(display.starts_with("[MIGRATE-002]"));
        assert!(display.contains("users"));
        assert!(display.contains("404 Not Found"));
    }
}
