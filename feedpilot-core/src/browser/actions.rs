use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ActionsSection;

use super::error::{BrowserError, BrowserResult};
use super::guard::bounded;
use super::human::HumanPacer;
use super::metrics::AutomationMetrics;
use super::scraper::Post;
use super::session::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub liked: bool,
    pub commented: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

pub struct ActionExecutor {
    config: ActionsSection,
    pacer: HumanPacer,
    metrics: Arc<Mutex<AutomationMetrics>>,
}

impl ActionExecutor {
    pub fn new(config: ActionsSection, metrics: Arc<Mutex<AutomationMetrics>>) -> Self {
        Self {
            config,
            pacer: HumanPacer::new(),
            metrics,
        }
    }

    /// Likes and/or comments on `post`. The two branches never affect each
    /// other: a failure in one is recorded as `false` and the other still runs.
    /// Only cancellation escapes as an error.
    pub async fn perform(
        &self,
        session: &Session,
        post: &Post,
        comment_text: &str,
        like_enabled: bool,
        comment_enabled: bool,
        cancel: &CancellationToken,
    ) -> BrowserResult<ActionResult> {
        let mut result = ActionResult::default();

        if like_enabled {
            result.liked = match self.like(session, post, cancel).await {
                Ok(()) => {
                    info!(post = %post.identifier, "Liked post");
                    true
                }
                Err(BrowserError::Cancelled) => return Err(BrowserError::Cancelled),
                Err(err) => {
                    warn!(post = %post.identifier, error = %err, "Could not like post");
                    result
                        .failures
                        .push(format!("like on {} failed: {err}", post.identifier));
                    false
                }
            };
            self.record(|metrics| metrics.record_like(result.liked));
        }

        if comment_enabled && !comment_text.is_empty() {
            result.commented = match self.comment(session, post, comment_text, cancel).await {
                Ok(()) => {
                    info!(post = %post.identifier, "Posted comment");
                    true
                }
                Err(BrowserError::Cancelled) => return Err(BrowserError::Cancelled),
                Err(err) => {
                    warn!(post = %post.identifier, error = %err, "Could not comment on post");
                    result
                        .failures
                        .push(format!("comment on {} failed: {err}", post.identifier));
                    false
                }
            };
            self.record(|metrics| metrics.record_comment(result.commented));
        }

        Ok(result)
    }

    async fn like(
        &self,
        session: &Session,
        post: &Post,
        cancel: &CancellationToken,
    ) -> BrowserResult<()> {
        let selectors = session.selectors();
        bounded(
            "like control",
            self.config.action_timeout(),
            cancel,
            post.handle().click(&selectors.like_button),
        )
        .await?;
        self.pacer.pause(self.config.like_pause_ms, cancel).await?;
        Ok(())
    }

    async fn comment(
        &self,
        session: &Session,
        post: &Post,
        text: &str,
        cancel: &CancellationToken,
    ) -> BrowserResult<()> {
        let selectors = session.selectors();
        let limit = self.config.action_timeout();
        let handle = post.handle();

        bounded(
            "comment composer",
            limit,
            cancel,
            handle.click(&selectors.comment_button),
        )
        .await?;
        self.pacer.pause(self.config.composer_pause_ms, cancel).await?;

        bounded(
            "comment input",
            limit,
            cancel,
            handle.fill(&selectors.comment_textbox, text),
        )
        .await?;
        self.pacer.pause(self.config.fill_pause_ms, cancel).await?;

        bounded(
            "comment submit",
            limit,
            cancel,
            handle.click(&selectors.comment_post_button),
        )
        .await?;
        self.pacer.pause(self.config.submit_pause_ms, cancel).await?;
        Ok(())
    }

    fn record<F>(&self, f: F)
    where
        F: FnOnce(&mut AutomationMetrics),
    {
        if let Ok(mut metrics) = self.metrics.lock() {
            f(&mut metrics);
        }
    }
}
