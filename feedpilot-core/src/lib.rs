pub mod browser;
pub mod config;
pub mod error;
pub mod llm;
pub mod progress;
mod sqlite;
pub mod store;
pub mod workflow;

pub use browser::{
    ActionExecutor, ActionResult, AuthFailure, AutomationMetrics, BrowserError, BrowserLauncher,
    BrowserResult, CookieRecord, FeedScraper, FeedSurface, FileSelectorSource, Post, PostElement,
    PostRecord, ScrapeReport, SelectorMap, SelectorSource, Session, SessionError,
    SessionManager, StaticSelectorSource, SurfaceLauncher,
};
pub use config::{
    load_agent_config, ActionsSection, AgentConfig, BrowserSection, FeedSection,
    GenerationSection, PacingSection, StorageSection,
};
pub use error::{ConfigError, Result};
pub use llm::{
    CommentDecision, CommentGenerator, CommentRequest, GeminiModel, GenerationError,
    PromptedGenerator, TextModel, SKIP_SENTINEL,
};
pub use progress::{
    ChannelListener, DeliveryError, ListenerId, LogPreview, ProgressBroadcaster, ProgressEvent,
    ProgressListener,
};
pub use store::{LogEntry, LogWriter, SqliteLogStore, SqliteLogStoreBuilder, StoreError, StoredLogEntry};
pub use workflow::{
    RunConfig, RunError, RunOrchestrator, RunOutcome, RunReport, RunState, Severity, Stage,
};
