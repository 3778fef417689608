use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::FeedSection;

use super::error::{BrowserError, BrowserResult};
use super::guard::bounded;
use super::human::HumanPacer;
use super::metrics::AutomationMetrics;
use super::selectors::SelectorMap;
use super::session::Session;
use super::surface::PostElement;

/// A feed post extracted from the live page. The element handle is only
/// meaningful while the session that produced it is open.
#[derive(Clone)]
pub struct Post {
    pub identifier: String,
    pub author: String,
    pub content: String,
    handle: Rc<dyn PostElement>,
}

impl Post {
    pub fn new(
        identifier: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
        handle: Rc<dyn PostElement>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            author: author.into(),
            content: content.into(),
            handle,
        }
    }

    pub fn handle(&self) -> &dyn PostElement {
        self.handle.as_ref()
    }

    pub fn record(&self) -> PostRecord {
        PostRecord {
            identifier: self.identifier.clone(),
            author: self.author.clone(),
            content: self.content.clone(),
        }
    }
}

impl fmt::Debug for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Post")
            .field("identifier", &self.identifier)
            .field("author", &self.author)
            .field("content", &self.content)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub identifier: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub posts: Vec<Post>,
    pub rounds: usize,
    pub skipped: Vec<String>,
    pub exhausted: bool,
}

enum Extraction {
    Post(Post),
    Skipped(String),
}

pub struct FeedScraper {
    feed: FeedSection,
    pacer: HumanPacer,
    metrics: Arc<Mutex<AutomationMetrics>>,
}

impl FeedScraper {
    pub fn new(feed: FeedSection, metrics: Arc<Mutex<AutomationMetrics>>) -> Self {
        Self {
            feed,
            pacer: HumanPacer::new(),
            metrics,
        }
    }

    /// Scrolls the feed until `max_posts` distinct posts are collected, a round
    /// reveals no container that was not already seen, or the round cap is hit.
    pub async fn scrape(
        &self,
        session: &mut Session,
        max_posts: usize,
        cancel: &CancellationToken,
    ) -> BrowserResult<ScrapeReport> {
        let mut report = ScrapeReport::default();
        if max_posts == 0 {
            return Ok(report);
        }
        let selectors = session.selectors().clone();
        let mut seen = HashSet::new();

        while report.posts.len() < max_posts {
            if report.rounds >= self.feed.max_scroll_rounds {
                warn!(
                    rounds = report.rounds,
                    collected = report.posts.len(),
                    "Scroll round limit reached"
                );
                break;
            }
            report.rounds += 1;
            self.record(|metrics| metrics.record_scroll_round());

            bounded(
                "feed scroll",
                self.feed.extraction_timeout(),
                cancel,
                session.surface_mut().scroll_viewport(self.feed.scroll_fraction),
            )
            .await?;
            self.pacer.wait(self.feed.settle(), cancel).await?;

            let containers = bounded(
                "post containers",
                self.feed.extraction_timeout(),
                cancel,
                session.surface().post_containers(&selectors.post_container),
            )
            .await?;

            let mut fresh = 0usize;
            for container in containers {
                let identifier = match self.identifier_of(container.as_ref(), cancel).await? {
                    Some(identifier) => identifier,
                    None => continue,
                };
                if !seen.insert(identifier.clone()) {
                    continue;
                }
                fresh += 1;

                match self
                    .extract(identifier, container, &selectors, cancel)
                    .await?
                {
                    Extraction::Post(post) => {
                        debug!(post = %post.identifier, author = %post.author, "Scraped post");
                        self.record(|metrics| metrics.record_extraction(true));
                        report.posts.push(post);
                        if report.posts.len() >= max_posts {
                            break;
                        }
                    }
                    Extraction::Skipped(reason) => {
                        self.record(|metrics| metrics.record_extraction(false));
                        warn!(reason = %reason, "Skipping post container");
                        report.skipped.push(reason);
                    }
                }
            }

            trace!(
                round = report.rounds,
                fresh,
                collected = report.posts.len(),
                "Scroll round finished"
            );
            if fresh == 0 && report.posts.len() < max_posts {
                info!(rounds = report.rounds, "No new posts found, feed exhausted");
                report.exhausted = true;
                break;
            }
        }

        report.posts.truncate(max_posts);
        info!(
            posts = report.posts.len(),
            rounds = report.rounds,
            skipped = report.skipped.len(),
            "Feed scrape finished"
        );
        Ok(report)
    }

    async fn identifier_of(
        &self,
        container: &dyn PostElement,
        cancel: &CancellationToken,
    ) -> BrowserResult<Option<String>> {
        let attribute = &self.feed.identifier_attribute;
        match bounded(
            "post identifier",
            self.feed.extraction_timeout(),
            cancel,
            container.attribute(attribute),
        )
        .await
        {
            Ok(Some(value)) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
            Ok(_) => Ok(None),
            Err(BrowserError::Cancelled) => Err(BrowserError::Cancelled),
            Err(err) => {
                debug!(error = %err, "Could not read post identifier");
                Ok(None)
            }
        }
    }

    async fn extract(
        &self,
        identifier: String,
        container: Rc<dyn PostElement>,
        selectors: &SelectorMap,
        cancel: &CancellationToken,
    ) -> BrowserResult<Extraction> {
        let limit = self.feed.extraction_timeout();
        let author = match bounded(
            "post author",
            limit,
            cancel,
            container.text(&selectors.author_selector),
        )
        .await
        {
            Ok(Some(author)) => author,
            Ok(None) => {
                return Ok(Extraction::Skipped(format!("{identifier}: author has no text")))
            }
            Err(BrowserError::Cancelled) => return Err(BrowserError::Cancelled),
            Err(err) => return Ok(Extraction::Skipped(format!("{identifier}: {err}"))),
        };
        let content = match bounded(
            "post content",
            limit,
            cancel,
            container.text(&selectors.content_selector),
        )
        .await
        {
            Ok(content) => content.unwrap_or_default(),
            Err(BrowserError::Cancelled) => return Err(BrowserError::Cancelled),
            Err(err) => return Ok(Extraction::Skipped(format!("{identifier}: {err}"))),
        };

        let content = content.trim();
        if content.is_empty() {
            return Ok(Extraction::Skipped(format!("{identifier}: empty content")));
        }
        Ok(Extraction::Post(Post::new(
            identifier,
            author.trim(),
            content,
            container,
        )))
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
