//! One engagement run, from session open to summary.

mod error;
mod types;

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::{
    ActionExecutor, AutomationMetrics, FeedScraper, HumanPacer, SelectorSource, Session,
    SessionManager, SurfaceLauncher,
};
use crate::config::{ActionsSection, AgentConfig, PacingSection};
use crate::llm::{CommentDecision, CommentGenerator, CommentRequest, GenerationError};
use crate::progress::{ProgressBroadcaster, ProgressEvent};
use crate::store::{LogEntry, LogWriter};

pub use error::{RunError, RunResult, Severity};
pub use types::{
    RunConfig, RunOutcome, RunReport, RunState, Stage, NOTHING_TO_SUMMARIZE, NO_SUMMARY,
};

/// Joins post contents handed to the summarizer.
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

const COMMENT_PREVIEW_CHARS: usize = 50;

pub struct RunOrchestrator {
    sessions: SessionManager,
    scraper: FeedScraper,
    executor: ActionExecutor,
    generator: Arc<dyn CommentGenerator>,
    logs: Arc<dyn LogWriter>,
    progress: Arc<ProgressBroadcaster>,
    pacing: PacingSection,
    pacer: HumanPacer,
    default_voice: String,
    metrics: Arc<Mutex<AutomationMetrics>>,
}

impl RunOrchestrator {
    pub fn new(
        sessions: SessionManager,
        actions: ActionsSection,
        pacing: PacingSection,
        generator: Arc<dyn CommentGenerator>,
        logs: Arc<dyn LogWriter>,
        progress: Arc<ProgressBroadcaster>,
    ) -> Self {
        let metrics = Arc::new(Mutex::new(AutomationMetrics::default()));
        let scraper = FeedScraper::new(sessions.feed().clone(), Arc::clone(&metrics));
        let executor = ActionExecutor::new(actions, Arc::clone(&metrics));
        Self {
            sessions,
            scraper,
            executor,
            generator,
            logs,
            progress,
            pacing,
            pacer: HumanPacer::new(),
            default_voice: String::new(),
            metrics,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        launcher: Box<dyn SurfaceLauncher>,
        selectors: Arc<dyn SelectorSource>,
        generator: Arc<dyn CommentGenerator>,
        logs: Arc<dyn LogWriter>,
        progress: Arc<ProgressBroadcaster>,
    ) -> Self {
        let sessions = SessionManager::new(launcher, selectors, config.feed.clone());
        Self::new(
            sessions,
            config.actions.clone(),
            config.pacing.clone(),
            generator,
            logs,
            progress,
        )
        .with_default_voice(config.generation.voice_directive.clone())
    }

    /// Directive used when a run does not bring its own.
    pub fn with_default_voice(mut self, directive: impl Into<String>) -> Self {
        self.default_voice = directive.into();
        self
    }

    pub fn progress(&self) -> &Arc<ProgressBroadcaster> {
        &self.progress
    }

    pub fn metrics(&self) -> AutomationMetrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    pub async fn run(&self, config: RunConfig, cancel: &CancellationToken) -> RunReport {
        let mut state = RunState::new(config);
        info!(
            max_posts = state.config.max_posts,
            like = state.config.auto_like,
            comment = state.config.auto_comment,
            "Starting run"
        );

        self.setup(&mut state);
        if !state.has_error() {
            self.process_feed(&mut state, cancel).await;
        }
        if state.has_error() {
            self.handle_error(&mut state);
        } else {
            self.summarize(&mut state, cancel).await;
        }
        state.enter(Stage::Done);

        let outcome = if state.has_error() {
            RunOutcome::Failed
        } else {
            RunOutcome::Completed
        };
        info!(
            ?outcome,
            posts = state.scraped_posts.len(),
            logs = state.final_logs.len(),
            "Run finished"
        );
        RunReport {
            outcome,
            state,
            metrics: self.metrics(),
        }
    }

    /// Resolves the voice directive and resets the accumulators. Touches no
    /// external system.
    pub fn setup(&self, state: &mut RunState) {
        state.enter(Stage::Setup);
        self.status("Task initialized. Setting up...");

        state.voice_directive = if state.config.voice_directive.trim().is_empty() {
            self.default_voice.clone()
        } else {
            state.config.voice_directive.clone()
        };
        state.scraped_posts.clear();
        state.final_logs.clear();
        state.summary = NO_SUMMARY.to_string();
        if let Ok(mut metrics) = self.metrics.lock() {
            *metrics = AutomationMetrics::default();
        }

        if state.config.max_posts == 0 {
            self.escalate(
                state,
                RunError::Configuration("max_posts must be greater than zero".into()),
            );
        }
    }

    pub async fn process_feed(&self, state: &mut RunState, cancel: &CancellationToken) {
        state.enter(Stage::ProcessFeed);
        if state.has_error() {
            return;
        }

        self.status("Initializing browser automation...");
        self.status("Navigating to feed...");
        let mut session = match self.sessions.open(&state.config.auth_cookies, cancel).await {
            Ok(session) => session,
            Err(err) => {
                self.escalate(state, RunError::from(err));
                return;
            }
        };

        let outcome = self.process_session(&mut session, state, cancel).await;
        if let Err(err) = self.sessions.close(session).await {
            warn!(error = %err, "Failed to close browser session");
        }
        if let Err(err) = outcome {
            self.escalate(state, err);
        }
    }

    async fn process_session(
        &self,
        session: &mut Session,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> RunResult<()> {
        let max_posts = state.config.max_posts;
        self.status(format!("Scrolling to find {max_posts} posts..."));
        let report = self.scraper.scrape(session, max_posts, cancel).await?;
        state
            .scraped_posts
            .extend(report.posts.iter().map(|post| post.record()));
        for reason in &report.skipped {
            self.escalate(state, RunError::Extraction(reason.clone()));
        }

        if report.posts.is_empty() {
            self.status("No posts found on the feed. Ending run.");
            return Ok(());
        }
        let total = report.posts.len();
        self.status(format!("Found {total} posts. Starting processing..."));

        for (index, post) in report.posts.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            self.status(format!(
                "Processing post {}/{} from {}...",
                index + 1,
                total,
                post.author
            ));

            let request = CommentRequest {
                author: &post.author,
                content: &post.content,
                voice_directive: &state.voice_directive,
            };
            let comment = match cancellable(cancel, self.generator.comment(request)).await? {
                CommentDecision::Skip => {
                    info!(post = %post.identifier, author = %post.author, "Skipping post");
                    self.log(format!("Skipping post by {} (not insightful).", post.author));
                    continue;
                }
                CommentDecision::Comment(text) => text,
            };
            let preview: String = comment.chars().take(COMMENT_PREVIEW_CHARS).collect();
            self.log(format!("Generated comment: '{preview}...'"));

            let actions = self
                .executor
                .perform(
                    session,
                    post,
                    &comment,
                    state.config.auto_like,
                    state.config.auto_comment,
                    cancel,
                )
                .await?;
            for failure in &actions.failures {
                self.escalate(state, RunError::Action(failure.clone()));
            }

            let entry = LogEntry::new(
                post.author.clone(),
                post.content.clone(),
                comment,
                actions.commented,
                actions.liked,
            );
            self.logs.append(&entry).await?;
            self.progress.publish(ProgressEvent::result(&entry));
            state.final_logs.push(entry);

            if index + 1 < total {
                let delay = self.pacer.random_duration(self.pacing.between_posts_ms);
                self.status(format!("Pausing for {:.1}s...", delay.as_secs_f64()));
                self.pacer.wait(delay, cancel).await?;
            }
        }
        Ok(())
    }

    pub async fn summarize(&self, state: &mut RunState, cancel: &CancellationToken) {
        state.enter(Stage::Summarize);
        if state.has_error() {
            return;
        }

        self.status("Generating final summary...");
        let contents = state
            .scraped_posts
            .iter()
            .map(|post| post.content.as_str())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join(SUMMARY_SEPARATOR);

        if contents.is_empty() {
            state.summary = NOTHING_TO_SUMMARIZE.to_string();
        } else {
            match cancellable(cancel, self.generator.summarize(&contents)).await {
                Ok(summary) => state.summary = summary,
                Err(err) => {
                    self.escalate(state, err);
                    return;
                }
            }
        }

        self.progress
            .publish(ProgressEvent::summary(state.summary.clone()));
        self.status("Agent run finished.");
    }

    /// Terminal branch for failed runs. Leaves the state as it is.
    pub fn handle_error(&self, state: &mut RunState) {
        state.enter(Stage::HandleError);
        warn!(error = state.error().unwrap_or_default(), "Run ended with error");
    }

    /// Fatal errors stick to the state; recoverable ones become `log` events.
    fn escalate(&self, state: &mut RunState, err: RunError) {
        match err.severity() {
            Severity::Fatal => {
                error!(error = %err, "Run aborted");
                let message = err.to_string();
                state.fail(message.clone());
                self.progress.publish(ProgressEvent::error(message));
            }
            Severity::RecoveredSkip => self.log(err.to_string()),
        }
    }

    fn status(&self, message: impl Into<String>) {
        self.progress.publish(ProgressEvent::status(message));
    }

    fn log(&self, message: impl Into<String>) {
        self.progress.publish(ProgressEvent::log(message));
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> RunResult<T>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RunError::Cancelled),
        result = operation => Ok(result?),
    }
}
