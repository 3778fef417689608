use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use feedpilot_core::browser::{normalize_same_site, parse_cookies};
use serde::Serialize;

use crate::{AppError, DisplayFallback, Result};

#[derive(Subcommand, Debug, Clone)]
pub enum CookieCommands {
    /// Repairs missing or invalid sameSite values in a cookie export
    Fix(CookieFixArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CookieFixArgs {
    /// Cookie export to repair
    pub file: PathBuf,
    /// Write the repaired export here instead of in place
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Report what would change without writing
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct CookieFixReport {
    pub path: PathBuf,
    pub total: usize,
    pub fixed: usize,
    pub written: bool,
}

impl DisplayFallback for CookieFixReport {
    fn display(&self) -> String {
        if self.fixed == 0 {
            format!(
                "{}: {} cookies already valid, no changes made",
                self.path.display(),
                self.total
            )
        } else if self.written {
            format!(
                "{}: fixed {} of {} cookie entries",
                self.path.display(),
                self.fixed,
                self.total
            )
        } else {
            format!(
                "{}: {} of {} cookie entries need fixing (dry run)",
                self.path.display(),
                self.fixed,
                self.total
            )
        }
    }
}

pub(crate) fn fix(args: &CookieFixArgs) -> Result<CookieFixReport> {
    let raw = fs::read_to_string(&args.file).map_err(|err| AppError::io(&args.file, err))?;
    let mut cookies = parse_cookies(&raw)?;
    let fixed = normalize_same_site(&mut cookies);

    let target = args.output.clone().unwrap_or_else(|| args.file.clone());
    let write = !args.dry_run && (fixed > 0 || args.output.is_some());
    if write {
        let json = serde_json::to_string_pretty(&cookies)?;
        fs::write(&target, json).map_err(|err| AppError::io(&target, err))?;
    }

    Ok(CookieFixReport {
        path: target,
        total: cookies.len(),
        fixed,
        written: write,
    })
}
