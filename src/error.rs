use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-specific failure codes, mapped to user-facing strings by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreErrorCode {
    NotFound,
    PermissionDenied,
    Conflict,
    Unavailable,
    Internal,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::NotFound => "not-found",
            StoreErrorCode::PermissionDenied => "permission-denied",
            StoreErrorCode::Conflict => "conflict",
            StoreErrorCode::Unavailable => "unavailable",
            StoreErrorCode::Internal => "internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Store error: {message}")]
    Store {
        code: Option<StoreErrorCode>,
        message: String,
    },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Invalid data: {0}")]
    Parse(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Feature disabled: {0}")]
    Disabled(String),
}

pub type JournalResult<T> = Result<T, JournalError>;

impl JournalError {
    pub fn store(code: StoreErrorCode, message: impl Into<String>) -> Self {
        JournalError::Store {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        JournalError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<StoreErrorCode> {
        match self {
            JournalError::Store { code, .. } => *code,
            JournalError::NotFound(_) => Some(StoreErrorCode::NotFound),
            _ => None,
        }
    }

    /// Input the user can correct in place; shown inline rather than as a notification
    pub fn is_user_input(&self) -> bool {
        matches!(self, JournalError::Validation { .. })
    }

    /// Short message suitable for a toast notification
    pub fn user_message(&self) -> String {
        match self {
            JournalError::Store { code, message } => match code {
                Some(StoreErrorCode::NotFound) => "The requested record no longer exists.".to_string(),
                Some(StoreErrorCode::PermissionDenied) => {
                    "You don't have permission to access this data.".to_string()
                }
                Some(StoreErrorCode::Conflict) => {
                    "The record was changed elsewhere. Refresh and try again.".to_string()
                }
                Some(StoreErrorCode::Unavailable) => {
                    "The journal database is busy. Please try again in a moment.".to_string()
                }
                Some(StoreErrorCode::Internal) | None => format!("Something went wrong: {}", message),
            },
            JournalError::Validation { field, message } => format!("{}: {}", field, message),
            JournalError::NotFound(what) => format!("{} not found.", what),
            JournalError::Network(_) => {
                "Could not reach the coaching service. Check your connection.".to_string()
            }
            JournalError::Encryption(_) => "Stored credentials could not be read.".to_string(),
            JournalError::Parse(message) => format!("Invalid data: {}", message),
            JournalError::Export(_) => "The export file could not be created.".to_string(),
            JournalError::Disabled(feature) => format!("{} is disabled in settings.", feature),
        }
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreErrorCode::NotFound,
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    StoreErrorCode::Unavailable
                }
                rusqlite::ErrorCode::ConstraintViolation => StoreErrorCode::Conflict,
                rusqlite::ErrorCode::PermissionDenied | rusqlite::ErrorCode::ReadOnly => {
                    StoreErrorCode::PermissionDenied
                }
                _ => StoreErrorCode::Internal,
            },
            _ => StoreErrorCode::Internal,
        };

        JournalError::Store {
            code: Some(code),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Parse(err.to_string())
    }
}

impl From<csv::Error> for JournalError {
    fn from(err: csv::Error) -> Self {
        JournalError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for JournalError {
    fn from(err: reqwest::Error) -> Self {
        JournalError::Network(err.to_string())
    }
}

impl From<aes_gcm::Error> for JournalError {
    fn from(err: aes_gcm::Error) -> Self {
        JournalError::Encryption(err.to_string())
    }
}
