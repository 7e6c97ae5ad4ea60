//! Error types for the timetable engine.

use thiserror::Error;

/// Message shown when a save fails and the server gave no reason.
pub const GENERIC_SAVE_ERROR: &str = "An error occurred while saving the schedule";

/// Errors that can occur while fetching, indexing or editing schedules.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimetableError {
    /// Network/HTTP transport failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The bearer token expired; the session has been cleared
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Missing or rejected credentials
    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    /// Response body did not have the expected shape
    #[error("Could not decode response: {message}")]
    Decode { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// A slot identity could not be decoded into (day, start, end)
    #[error("Invalid time slot {input:?}: {reason}")]
    InvalidSlot { input: String, reason: String },

    /// Save attempted while required draft fields are unset
    #[error("Schedule is incomplete, missing: {}", missing.join(", "))]
    IncompleteDraft { missing: Vec<&'static str> },

    /// The active view does not allow editing
    #[error("Schedules cannot be edited in the {context} view")]
    NotEditable { context: String },

    /// Editor action not allowed in the current state
    #[error("Cannot {action} while the editor is {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl TimetableError {
    /// Returns true if the user has to log in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            TimetableError::SessionExpired | TimetableError::Unauthorized { .. }
        )
    }

    /// Text shown to the user when a save fails.
    ///
    /// Server-supplied messages are passed through verbatim; anything that
    /// did not come from the server falls back to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            TimetableError::Api { message, .. } | TimetableError::Unauthorized { message }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            TimetableError::SessionExpired
            | TimetableError::IncompleteDraft { .. }
            | TimetableError::NotEditable { .. } => self.to_string(),
            _ => GENERIC_SAVE_ERROR.to_string(),
        }
    }
}

impl From<reqwest::Error> for TimetableError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TimetableError::Decode {
                message: err.to_string(),
            }
        } else {
            TimetableError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for TimetableError {
    fn from(err: url::ParseError) -> Self {
        TimetableError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TimetableError {
    fn from(err: serde_json::Error) -> Self {
        TimetableError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TimetableError {
    fn from(err: std::io::Error) -> Self {
        TimetableError::Config {
            message: err.to_string(),
        }
    }
}

pub type TimetableResult<T> = Result<T, TimetableError>;
