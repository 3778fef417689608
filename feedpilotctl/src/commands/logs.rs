use clap::{Args, Subcommand};
use feedpilot_core::{SqliteLogStore, StoredLogEntry};
use serde::Serialize;

use crate::{AppContext, DisplayFallback, Result};

#[derive(Subcommand, Debug, Clone)]
pub enum LogCommands {
    /// Lists the most recent comment log entries
    List(LogListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LogListArgs {
    /// Maximum number of entries
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct LogList {
    pub rows: Vec<StoredLogEntry>,
}

impl DisplayFallback for LogList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No log entries".to_string();
        }
        let mut lines = Vec::new();
        for row in &self.rows {
            let entry = &row.entry;
            lines.push(format!(
                "#{id} {at} | {author} | liked={liked} posted={posted} | {comment}",
                id = row.id,
                at = entry.created_at.format("%Y-%m-%d %H:%M"),
                author = entry.author,
                liked = entry.liked,
                posted = entry.posted,
                comment = entry.generated_comment,
            ));
        }
        lines.join("\n")
    }
}

pub(crate) fn list(context: &AppContext, args: &LogListArgs) -> Result<LogList> {
    if !context.log_db.exists() {
        return Ok(LogList { rows: Vec::new() });
    }
    let store = SqliteLogStore::builder()
        .path(&context.log_db)
        .read_only(true)
        .busy_timeout(context.config.storage.busy_timeout())
        .build()?;
    Ok(LogList {
        rows: store.recent(args.limit)?,
    })
}
