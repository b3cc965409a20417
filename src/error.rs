//! Error types for the conversion workflow.
//!
//! Only two failures are expected from user input: a file whose extension is
//! not recognised ([`ConvertError::UnsupportedFormat`]) and a file whose bytes
//! are not well-formed for the claimed format ([`ConvertError::Parse`]). Both
//! are scoped to a single file; a batch keeps going after either one.

use thiserror::Error;

/// All errors returned by the conversion workflow.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The file extension is neither `.csv` nor `.xlsx`.
    #[error("Invalid file format: '{name}' (expected a .csv or .xlsx file)")]
    UnsupportedFormat { name: String },

    /// The bytes could not be decoded for the detected format.
    #[error("Failed to parse '{name}': {detail}")]
    Parse { name: String, detail: String },

    /// The serializer rejected the table (e.g. more columns than a sheet holds).
    #[error("Failed to write {format} output: {detail}")]
    Export { format: String, detail: String },

    /// The chart backend failed to draw.
    #[error("Failed to render chart: {detail}")]
    Chart { detail: String },

    /// An HTTP request was missing a field or carried unreadable options.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ConvertError {
    /// Stable machine-readable name, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedFormat { .. } => "unsupported_format",
            ConvertError::Parse { .. } => "parse_error",
            ConvertError::Export { .. } => "export_error",
            ConvertError::Chart { .. } => "chart_error",
            ConvertError::InvalidRequest(_) => "invalid_request",
        }
    }

    pub(crate) fn parse(name: &str, detail: impl ToString) -> Self {
        ConvertError::Parse {
            name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}
