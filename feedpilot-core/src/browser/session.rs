use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::FeedSection;

use super::cookies::{normalize_same_site, parse_cookies};
use super::error::{BrowserError, BrowserResult};
use super::guard::bounded;
use super::human::HumanPacer;
use super::selectors::{SelectorMap, SelectorSource};
use super::surface::{FeedSurface, SurfaceLauncher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    LoginRequired,
    SecurityCheckpoint,
    UnexpectedLocation(String),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::LoginRequired => f.write_str(
                "login failed: cookies are invalid or expired, please re-export new cookies",
            ),
            AuthFailure::SecurityCheckpoint => f.write_str(
                "login failed: a security check was requested, please re-export new cookies",
            ),
            AuthFailure::UnexpectedLocation(url) => write!(
                f,
                "login failed: redirected to unknown page {url}, please re-export cookies"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    Authentication(AuthFailure),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub fn classify_location(url: &str, expected: &str) -> Result<(), AuthFailure> {
    if url.contains(expected) {
        return Ok(());
    }
    if url.contains("login") {
        Err(AuthFailure::LoginRequired)
    } else if url.contains("checkpoint") || url.contains("challenge") {
        Err(AuthFailure::SecurityCheckpoint)
    } else {
        Err(AuthFailure::UnexpectedLocation(url.to_string()))
    }
}

/// One authenticated browser session plus the selectors fetched for it.
/// Must be handed back to [`SessionManager::close`].
pub struct Session {
    surface: Box<dyn FeedSurface>,
    selectors: SelectorMap,
    closed: bool,
}

impl Session {
    pub fn selectors(&self) -> &SelectorMap {
        &self.selectors
    }

    pub fn surface(&self) -> &dyn FeedSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn FeedSurface {
        self.surface.as_mut()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("selectors", &self.selectors)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Session dropped without being closed");
        }
    }
}

pub struct SessionManager {
    launcher: Box<dyn SurfaceLauncher>,
    selectors: Arc<dyn SelectorSource>,
    feed: FeedSection,
    pacer: HumanPacer,
}

impl SessionManager {
    pub fn new(
        launcher: Box<dyn SurfaceLauncher>,
        selectors: Arc<dyn SelectorSource>,
        feed: FeedSection,
    ) -> Self {
        Self {
            launcher,
            selectors,
            feed,
            pacer: HumanPacer::new(),
        }
    }

    pub fn feed(&self) -> &FeedSection {
        &self.feed
    }

    pub async fn open(
        &self,
        cookie_payload: &str,
        cancel: &CancellationToken,
    ) -> Result<Session, SessionError> {
        let mut cookies = parse_cookies(cookie_payload)
            .map_err(|err| SessionError::Configuration(err.to_string()))?;
        let fixed = normalize_same_site(&mut cookies);
        if fixed > 0 {
            info!(fixed, "Automatically fixed cookie sameSite entries");
        }

        let mut surface = bounded(
            "browser launch",
            self.feed.navigation_timeout(),
            cancel,
            self.launcher.launch(&cookies),
        )
        .await?;

        match self.prepare(surface.as_mut(), cancel).await {
            Ok(selectors) => Ok(Session {
                surface,
                selectors,
                closed: false,
            }),
            Err(err) => {
                if let Err(close_err) = surface.close().await {
                    warn!(error = %close_err, "Failed to release browser after open failure");
                }
                Err(err)
            }
        }
    }

    async fn prepare(
        &self,
        surface: &mut dyn FeedSurface,
        cancel: &CancellationToken,
    ) -> Result<SelectorMap, SessionError> {
        info!(url = %self.feed.url, "Navigating to feed");
        bounded(
            "feed navigation",
            self.feed.navigation_timeout(),
            cancel,
            surface.goto(&self.feed.url),
        )
        .await
        .map_err(|err| match err {
            BrowserError::Cancelled => BrowserError::Cancelled,
            other => BrowserError::Navigation(format!(
                "failed to load the feed, the server may be slow or the page timed out: {other}"
            )),
        })?;
        self.pacer
            .wait(self.feed.navigation_settle(), cancel)
            .await?;

        let current = surface.current_url().await?;
        info!(url = %current, "Feed navigation settled");
        classify_location(&current, &self.feed.expected_location)
            .map_err(SessionError::Authentication)?;

        match self.selectors.fetch().await {
            Ok(Some(map)) => {
                info!("Using configured selectors");
                Ok(map)
            }
            Ok(None) => {
                info!("No selector configuration found, using defaults");
                Ok(SelectorMap::default())
            }
            Err(err) => Err(SessionError::Configuration(err.to_string())),
        }
    }

    pub async fn close(&self, mut session: Session) -> BrowserResult<()> {
        session.closed = true;
        let result = session.surface.close().await;
        info!("Browser session closed");
        result
    }
}
