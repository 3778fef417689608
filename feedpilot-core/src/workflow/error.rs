use thiserror::Error;

use crate::browser::{AuthFailure, BrowserError, SessionError};
use crate::llm::GenerationError;
use crate::store::StoreError;

/// How far a failure reaches: the whole run, or just the item at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    RecoveredSkip,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    Authentication(AuthFailure),
    #[error("extraction error: {0}")]
    Extraction(String),
    #[error("action error: {0}")]
    Action(String),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("failed to persist log entry: {0}")]
    Persistence(#[from] StoreError),
    #[error("browser error: {0}")]
    Browser(BrowserError),
    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    pub fn severity(&self) -> Severity {
        match self {
            RunError::Extraction(_) | RunError::Action(_) => Severity::RecoveredSkip,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl From<BrowserError> for RunError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Cancelled => RunError::Cancelled,
            other => RunError::Browser(other),
        }
    }
}

impl From<SessionError> for RunError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Configuration(reason) => RunError::Configuration(reason),
            SessionError::Authentication(failure) => RunError::Authentication(failure),
            SessionError::Browser(err) => RunError::from(err),
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;
