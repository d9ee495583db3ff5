//! Error types for DCAT-AP_IT operations.
//!
//! This module provides the [`DcatError`] type for all fallible operations of
//! the crate and the [`Result`] convenience type.
//!
//! Only fatal preconditions surface as errors. Expected misses (an absent
//! field, an unknown license title, a label in a language nobody offers) are
//! modeled as `Option` returns and handled at the call site.

use thiserror::Error;

/// Error type for all DCAT-AP_IT library operations.
#[derive(Error, Debug)]
pub enum DcatError {
    /// RDF input could not be parsed, or a graph could not be serialized.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No concept scheme of a known controlled vocabulary was found in a
    /// graph handed to the loader.
    #[error("Unrecognized concept scheme: {0}")]
    UnrecognizedScheme(String),

    /// A required configuration value is absent.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    /// A structured field failed validation.
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An insert collided with an existing unique key.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DcatError {
    /// Builds an [`DcatError::InvalidField`] from a field name and a reason.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`DcatError`].
pub type Result<T> = std::result::Result<T, DcatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field_display() {
        let err = DcatError::invalid_field("conforms_to", "missing identifier");
        assert_eq!(
            err.to_string(),
            "Invalid field conforms_to: missing identifier"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("input is malformed");
        let err: DcatError = json_err.into();
        assert!(matches!(err, DcatError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "eurovoc.rdf");
        let err: DcatError = io.into();
        assert!(err.to_string().contains("eurovoc.rdf"));
    }
}
