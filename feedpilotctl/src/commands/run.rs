use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use feedpilot_core::{
    AutomationMetrics, BrowserLauncher, FileSelectorSource, GeminiModel, LogEntry,
    ProgressBroadcaster, ProgressEvent, PromptedGenerator, RunConfig, RunOrchestrator,
    RunOutcome, RunReport, SqliteLogStore, Stage,
};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{AppContext, AppError, DisplayFallback, OutputFormat, Result};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Cookie export (JSON list) used to authenticate
    #[arg(long)]
    pub cookies: PathBuf,
    /// Maximum number of posts to process
    #[arg(long, default_value_t = 5)]
    pub max_posts: usize,
    /// Like processed posts
    #[arg(long, default_value_t = false)]
    pub like: bool,
    /// Post generated comments
    #[arg(long, default_value_t = false)]
    pub comment: bool,
    /// Voice directive for this run (defaults to the configured one)
    #[arg(long)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub stages: Vec<Stage>,
    pub posts_scraped: usize,
    pub logs: Vec<LogEntry>,
    pub summary: String,
    pub error: Option<String>,
    pub metrics: AutomationMetrics,
}

impl From<RunReport> for RunSummary {
    fn from(report: RunReport) -> Self {
        Self {
            outcome: report.outcome,
            stages: report.stages().to_vec(),
            posts_scraped: report.state.scraped_posts.len(),
            error: report.error().map(str::to_string),
            logs: report.state.final_logs,
            summary: report.state.summary,
            metrics: report.metrics,
        }
    }
}

impl DisplayFallback for RunSummary {
    fn display(&self) -> String {
        let stages = self
            .stages
            .iter()
            .map(Stage::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        let mut lines = vec![
            format!("Outcome: {:?} ({stages})", self.outcome),
            format!(
                "Posts: {} scraped, {} logged",
                self.posts_scraped,
                self.logs.len()
            ),
        ];
        for entry in &self.logs {
            lines.push(format!(
                "  - {} | liked={} | posted={} | {}",
                entry.author, entry.liked, entry.posted, entry.generated_comment
            ));
        }
        lines.push(format!(
            "Actions: likes={} (failed {}), comments={} (failed {})",
            self.metrics.likes,
            self.metrics.like_failures,
            self.metrics.comments,
            self.metrics.comment_failures
        ));
        match &self.error {
            Some(error) => lines.push(format!("Error: {error}")),
            None => {
                lines.push("Summary:".to_string());
                lines.push(self.summary.clone());
            }
        }
        lines.join("\n")
    }
}

pub(crate) fn execute(
    context: &AppContext,
    args: &RunArgs,
    format: OutputFormat,
) -> Result<RunSummary> {
    let cookies =
        std::fs::read_to_string(&args.cookies).map_err(|err| AppError::io(&args.cookies, err))?;
    let config = &context.config;

    let store = SqliteLogStore::builder()
        .path(&context.log_db)
        .create_if_missing(true)
        .busy_timeout(config.storage.busy_timeout())
        .build()?;
    store.initialize()?;

    let model = GeminiModel::from_config(&config.generation)?;
    let generator = PromptedGenerator::new(Arc::new(model), config.generation.deadline());
    let progress = Arc::new(ProgressBroadcaster::new());
    let (_, receiver) = progress.subscribe_channel();

    let orchestrator = RunOrchestrator::from_config(
        config,
        Box::new(BrowserLauncher::new(config.browser.clone())),
        Arc::new(FileSelectorSource::new(&context.selectors_path)),
        Arc::new(generator),
        Arc::new(store),
        progress,
    );
    let run_config = RunConfig::new(cookies, args.max_posts)
        .with_like(args.like)
        .with_comment(args.comment)
        .with_voice(args.voice.clone().unwrap_or_default());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    let report = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
        let printer = tokio::spawn(print_progress(receiver, format));

        let report = orchestrator.run(run_config, &cancel).await;
        drop(orchestrator);
        interrupt.abort();
        if let Err(err) = printer.await {
            warn!(error = %err, "Progress printer stopped unexpectedly");
        }
        report
    });
    Ok(RunSummary::from(report))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Interrupt received, cancelling run");
        cancel.cancel();
    }
}

async fn print_progress(mut receiver: UnboundedReceiver<ProgressEvent>, format: OutputFormat) {
    while let Some(event) = receiver.recv().await {
        match format {
            OutputFormat::Text => println!("{event}"),
            OutputFormat::Json => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "Failed to encode progress event"),
            },
        }
    }
}
