//! Error types for reading and writing spreadsheet packages

use std::fmt::Display;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = XlsxError> = std::result::Result<T, E>;

/// Every failure the codec can produce below the public entry points
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A part the package must contain is absent
    #[error("missing package part: {0}")]
    MissingPart(String),

    /// The bytes of a part are not well-formed XML
    #[error("malformed xml in {part}: {message}")]
    Xml { part: String, message: String },

    /// Well-formed XML that violates the expected structure
    #[error("invalid content in {part}: {message}")]
    Format { part: String, message: String },

    /// An index or id that was never populated was requested
    #[error("no {kind} registered at index {index}")]
    Lookup { kind: &'static str, index: i64 },

    /// A value rejected at construction or mutation time
    #[error("validation failed: {0}")]
    Validation(String),
}

impl XlsxError {
    pub(crate) fn xml(part: impl Into<String>, err: impl Display) -> Self {
        XlsxError::Xml {
            part: part.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn format(part: impl Into<String>, message: impl Into<String>) -> Self {
        XlsxError::Format {
            part: part.into(),
            message: message.into(),
        }
    }

    pub(crate) fn lookup(kind: &'static str, index: impl TryInto<i64>) -> Self {
        XlsxError::Lookup {
            kind,
            index: index.try_into().unwrap_or(i64::MAX),
        }
    }
}

/// The two outcomes a caller of the public API can observe
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("could not load package: {0}")]
    Load(#[source] XlsxError),

    #[error("could not save package: {0}")]
    Save(#[source] XlsxError),
}

impl PackageError {
    /// The underlying cause, whichever direction failed
    pub fn cause(&self) -> &XlsxError {
        match self {
            PackageError::Load(e) | PackageError::Save(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_package_error_wraps_cause() {
        let err = PackageError::Load(XlsxError::MissingPart("xl/workbook.xml".to_string()));
        assert!(err.to_string().starts_with("could not load package"));
        assert!(err.to_string().contains("xl/workbook.xml"));
        assert!(err.source().is_some());
        assert!(matches!(err.cause(), XlsxError::MissingPart(_)));
    }

    #[test]
    fn test_lookup_message() {
        let err = XlsxError::lookup("border", 7usize);
        assert_eq!(err.to_string(), "no border registered at index 7");
    }
}
