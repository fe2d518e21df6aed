use crate::model::RecordId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: RecordId },

    #[error("{op} failed: {message}")]
    OperationFailed { op: &'static str, message: String },
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: RecordId) -> Self {
        StoreError::NotFound { kind, id }
    }

    pub fn failed(op: &'static str, message: impl Into<String>) -> Self {
        StoreError::OperationFailed {
            op,
            message: message.into(),
        }
    }

    /// Protocol error code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::OperationFailed { .. } => "operation_failed",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::failed("sqlite", e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::failed("remote", e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::failed("decode", e.to_string())
    }
}
