use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use feedpilot_core::{load_agent_config, AgentConfig};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod commands;

pub use commands::cookies::{CookieCommands, CookieFixArgs, CookieFixReport};
pub use commands::logs::{LogCommands, LogList, LogListArgs};
pub use commands::run::{RunArgs, RunSummary};
pub use commands::selectors::{SelectorCommands, SelectorReport};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] feedpilot_core::ConfigError),
    #[error("io error on {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("runtime error: {0}")]
    Runtime(std::io::Error),
    #[error("log store error: {0}")]
    Store(#[from] feedpilot_core::StoreError),
    #[error("cookie error: {0}")]
    Cookies(#[from] feedpilot_core::browser::CookieError),
    #[error("generation error: {0}")]
    Generation(#[from] feedpilot_core::GenerationError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("run failed: {0}")]
    RunFailed(String),
}

impl AppError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AppError::Io {
            source,
            path: path.to_path_buf(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Feed engagement agent control interface", long_about = None)]
pub struct Cli {
    /// Path to feedpilot.toml
    #[arg(long, default_value = "configs/feedpilot.toml")]
    pub config: PathBuf,
    /// Alternate path for the comment log database
    #[arg(long)]
    pub log_db: Option<PathBuf>,
    /// Alternate path for the selector overrides file
    #[arg(long)]
    pub selectors: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the agent once against the live feed
    Run(RunArgs),
    /// Persisted comment log
    #[command(subcommand)]
    Logs(LogCommands),
    /// Cookie export maintenance
    #[command(subcommand)]
    Cookies(CookieCommands),
    /// Selector configuration
    #[command(subcommand)]
    Selectors(SelectorCommands),
    /// Prints shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "feedpilotctl",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let context = AppContext::new(&cli)?;
    match &cli.command {
        Commands::Run(args) => {
            let summary = commands::run::execute(&context, args, cli.format)?;
            render(&summary, cli.format)?;
            if let Some(error) = summary.error {
                return Err(AppError::RunFailed(error));
            }
        }
        Commands::Logs(LogCommands::List(args)) => {
            let list = commands::logs::list(&context, args)?;
            render(&list, cli.format)?;
        }
        Commands::Cookies(CookieCommands::Fix(args)) => {
            let report = commands::cookies::fix(args)?;
            render(&report, cli.format)?;
        }
        Commands::Selectors(SelectorCommands::Show) => {
            let report = commands::selectors::show(&context)?;
            render(&report, cli.format)?;
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

pub(crate) fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

pub(crate) trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug)]
pub(crate) struct AppContext {
    pub config: AgentConfig,
    pub log_db: PathBuf,
    pub selectors_path: PathBuf,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = load_agent_config(&cli.config)?;
        let config_dir = cli
            .config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let log_db = cli
            .log_db
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.storage.log_db));
        let selectors_path = cli.selectors.clone().unwrap_or_else(|| {
            let file = config
                .storage
                .selectors_file
                .clone()
                .unwrap_or_else(|| "selectors.toml".to_string());
            config.resolve_path(&config_dir, file)
        });

        Ok(Self {
            config,
            log_db,
            selectors_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_config() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../configs/feedpilot.toml")
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "feedpilotctl",
            "--format",
            "json",
            "run",
            "--cookies",
            "cookies.json",
            "--max-posts",
            "3",
            "--like",
            "--comment",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.max_posts, 3);
                assert!(args.like && args.comment);
                assert_eq!(args.cookies, PathBuf::from("cookies.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn context_resolves_selectors_next_to_config() {
        let cli = Cli {
            config: fixture_config(),
            log_db: None,
            selectors: None,
            format: OutputFormat::Text,
            command: Commands::Selectors(SelectorCommands::Show),
        };
        let context = AppContext::new(&cli).unwrap();
        assert_eq!(context.log_db, PathBuf::from("data/comment_logs.sqlite"));
        assert!(context.selectors_path.ends_with("configs/selectors.toml"));
    }

    #[test]
    fn flags_override_storage_paths() {
        let cli = Cli {
            config: fixture_config(),
            log_db: Some(PathBuf::from("/tmp/other.sqlite")),
            selectors: Some(PathBuf::from("/tmp/selectors.toml")),
            format: OutputFormat::Text,
            command: Commands::Selectors(SelectorCommands::Show),
        };
        let context = AppContext::new(&cli).unwrap();
        assert_eq!(context.log_db, PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(context.selectors_path, PathBuf::from("/tmp/selectors.toml"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
