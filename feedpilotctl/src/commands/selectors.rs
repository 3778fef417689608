use std::path::PathBuf;

use clap::Subcommand;
use feedpilot_core::{FileSelectorSource, SelectorMap, SelectorSource};
use serde::Serialize;

use crate::{AppContext, AppError, DisplayFallback, Result};

#[derive(Subcommand, Debug, Clone)]
pub enum SelectorCommands {
    /// Prints the selector map a run would use
    Show,
}

#[derive(Debug, Serialize)]
pub struct SelectorReport {
    pub source: Option<PathBuf>,
    pub selectors: SelectorMap,
}

impl DisplayFallback for SelectorReport {
    fn display(&self) -> String {
        let origin = match &self.source {
            Some(path) => format!("Selectors from {}", path.display()),
            None => "Built-in default selectors".to_string(),
        };
        let map = &self.selectors;
        [
            origin,
            format!("  post_container      = {}", map.post_container),
            format!("  author_selector     = {}", map.author_selector),
            format!("  content_selector    = {}", map.content_selector),
            format!("  like_button         = {}", map.like_button),
            format!("  comment_button      = {}", map.comment_button),
            format!("  comment_textbox     = {}", map.comment_textbox),
            format!("  comment_post_button = {}", map.comment_post_button),
        ]
        .join("\n")
    }
}

pub(crate) fn show(context: &AppContext) -> Result<SelectorReport> {
    let source = FileSelectorSource::new(&context.selectors_path);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(AppError::Runtime)?;
    let report = match runtime.block_on(source.fetch())? {
        Some(selectors) => SelectorReport {
            source: Some(context.selectors_path.clone()),
            selectors,
        },
        None => SelectorReport {
            source: None,
            selectors: SelectorMap::default(),
        },
    };
    Ok(report)
}
