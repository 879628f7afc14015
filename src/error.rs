use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::session::SessionError;

/// Every failure a screen operation can report.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    /// The backend answered `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("no session token, log in first")]
    Unauthenticated,
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("unexpected response from {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Failures of a screen load that runs several requests together.
#[derive(Debug)]
pub struct LoadError {
    pub failures: Vec<(&'static str, ApiError)>,
}

impl LoadError {
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|(what, err)| format!("{what}: {}", err.user_message()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for LoadError {}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }

    pub fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed { path: path.into(), reason: reason.to_string() }
    }

    /// Text shown to the user through the notifier.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Rejected(message) | Self::Status { message, .. } => {
                message.clone()
            }
            Self::Unauthenticated => "Please log in to continue".into(),
            Self::Malformed { .. } => "Received an unexpected response from the server".into(),
            Self::Transport(_) => "Something went wrong. Please try again.".into(),
            Self::Session(_) => "Could not save your session".into(),
            Self::Load(e) => e.summary(),
        }
    }
}
