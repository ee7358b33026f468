use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// The error taxonomy of the explorer core (see spec §7).
///
/// Every fallible operation in this crate returns `Result<_, ExplorerError>`
/// rather than panicking; there is no catch-all exception channel.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    /// A stored value ended before the decoder expected it to.
    #[error("truncated record at key {key}")]
    Truncated { key: String },

    /// A stored value contained a value the decoder cannot interpret
    /// (invalid role/square index, unknown pack tag, bad magic byte).
    #[error("malformed record at key {key}: {reason}")]
    Malformed { key: String, reason: String },

    /// A business-rule rejection during import. Never fatal to the batch.
    #[error("import rejected: {0}")]
    ImportReject(String),

    #[error("store I/O error: {0}")]
    StoreIo(String),
}

impl ExplorerError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ExplorerError::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn truncated(key: impl Into<String>) -> Self {
        ExplorerError::Truncated { key: key.into() }
    }

    fn status(&self) -> StatusCode {
        match self {
            ExplorerError::Validation(_) => StatusCode::BAD_REQUEST,
            ExplorerError::NotFound => StatusCode::NOT_FOUND,
            ExplorerError::Truncated { .. } | ExplorerError::Malformed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ExplorerError::ImportReject(_) => StatusCode::BAD_REQUEST,
            ExplorerError::StoreIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ExplorerError {
    pub fn from_decode(err: DecodeError, key: impl Into<String>) -> Self {
        match err {
            DecodeError::Truncated => ExplorerError::truncated(key),
            DecodeError::Malformed(reason) => ExplorerError::malformed(key, reason),
        }
    }
}

impl From<rocksdb::Error> for ExplorerError {
    fn from(err: rocksdb::Error) -> Self {
        ExplorerError::StoreIo(err.to_string())
    }
}

impl IntoResponse for ExplorerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(
            self,
            ExplorerError::Truncated { .. } | ExplorerError::Malformed { .. }
        ) {
            tracing::error!(error = %self, "decode failure surfaced to caller");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Codec-level decode error, kept separate from [`ExplorerError`] so that
/// `codec`/`entry`/`subentry` stay free of any HTTP concern. Call sites
/// attach the offending key via [`ExplorerError::malformed`] /
/// [`ExplorerError::truncated`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated")]
    Truncated,
    #[error("malformed: {0}")]
    Malformed(&'static str),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
