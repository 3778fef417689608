use thiserror::Error;

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium launch failed: {0}")]
    Launch(String),
    #[error("cdp error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("element not found: {0}")]
    ElementMissing(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}
