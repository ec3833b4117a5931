//! `TimetableError` - failures surfaced by the timetable client.

use thiserror::Error;

/// Errors returned while fetching, parsing, or querying a timetable.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum TimetableError {
    /// Request parameters were rejected before any network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The HTTP request failed (network error, timeout, or unexpected status).
    #[error("transport error: {message}")]
    Transport {
        /// What went wrong.
        message: String,
        /// Underlying HTTP client error, if any.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The service reported that no plan exists for the request.
    #[error("timetable data not found: {0}")]
    DataNotFound(String),

    /// The response body is not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The XML parsed but a required tag is missing.
    #[error("unexpected document shape: {0}")]
    UnexpectedDocumentShape(String),

    /// No class with the requested code exists in the document.
    #[error("class '{0}' does not exist")]
    UnknownClass(String),
}

impl TimetableError {
    /// Builds a `Transport` error wrapping a `reqwest::Error`.
    pub(crate) fn transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }
}
