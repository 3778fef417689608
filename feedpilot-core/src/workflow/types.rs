use std::fmt;

use serde::Serialize;

use crate::browser::{AutomationMetrics, PostRecord};
use crate::store::LogEntry;

pub const NO_SUMMARY: &str = "No summary generated.";
pub const NOTHING_TO_SUMMARIZE: &str = "No insightful posts were found to summarize.";

/// Input to a single run. Immutable once the run starts.
#[derive(Clone, Serialize)]
pub struct RunConfig {
    pub auto_comment: bool,
    pub auto_like: bool,
    pub max_posts: usize,
    #[serde(skip)]
    pub auth_cookies: String,
    pub voice_directive: String,
}

impl RunConfig {
    pub fn new(auth_cookies: impl Into<String>, max_posts: usize) -> Self {
        Self {
            auto_comment: false,
            auto_like: false,
            max_posts,
            auth_cookies: auth_cookies.into(),
            voice_directive: String::new(),
        }
    }

    pub fn with_like(mut self, enabled: bool) -> Self {
        self.auto_like = enabled;
        self
    }

    pub fn with_comment(mut self, enabled: bool) -> Self {
        self.auto_comment = enabled;
        self
    }

    pub fn with_voice(mut self, directive: impl Into<String>) -> Self {
        self.voice_directive = directive.into();
        self
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("auto_comment", &self.auto_comment)
            .field("auto_like", &self.auto_like)
            .field("max_posts", &self.max_posts)
            .field("auth_cookies", &format_args!("<{} bytes>", self.auth_cookies.len()))
            .field("voice_directive", &self.voice_directive)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    ProcessFeed,
    Summarize,
    HandleError,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Setup => "setup",
            Stage::ProcessFeed => "process_feed",
            Stage::Summarize => "summarize",
            Stage::HandleError => "handle_error",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Working record threaded through the stages of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub config: RunConfig,
    pub voice_directive: String,
    pub scraped_posts: Vec<PostRecord>,
    pub final_logs: Vec<LogEntry>,
    pub summary: String,
    error: Option<String>,
    stages: Vec<Stage>,
}

impl RunState {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            voice_directive: String::new(),
            scraped_posts: Vec::new(),
            final_logs: Vec::new(),
            summary: NO_SUMMARY.to_string(),
            error: None,
            stages: Vec::new(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Records a failure. The first one wins; later calls are ignored.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub state: RunState,
    pub metrics: AutomationMetrics,
}

impl RunReport {
    pub fn stages(&self) -> &[Stage] {
        self.state.stages()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }
}
