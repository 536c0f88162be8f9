//! Module containing the definition of error types.

use thiserror::Error;

/// Enumeration of the different error kinds.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Configuration error.
    #[error("there was an error in the configuration: {message}")]
    Config {
        /// Error message.
        message: String,
    },
    /// Parsing error.
    #[error("there was an error in the parsing process: {message}")]
    Parse {
        /// Error message.
        message: String,
    },
    /// A required entry is missing from the package archive.
    #[error("the `{name}` entry was not found in the package")]
    MissingEntry {
        /// Name of the missing entry.
        name: String,
    },
    /// The package identifier can not be used to name a report.
    #[error("`{package}` is not a valid package identifier")]
    InvalidPackage {
        /// Offending package identifier.
        package: String,
    },
    /// The uploaded file was rejected before analysis.
    #[error("invalid upload: {message}")]
    InvalidUpload {
        /// Error message.
        message: String,
    },
    /// Template name error.
    #[error("invalid template name: {message}")]
    TemplateName {
        /// Error message.
        message: String,
    },
}

impl From<failure::Error> for ErrorKind {
    fn from(error: failure::Error) -> Self {
        let message = error
            .iter_chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ");
        Self::Parse { message }
    }
}

impl ErrorKind {
    /// Creates a parsing error with the given message.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
