//! du command - Summarize local trees
//!
//! Counts files, directories and bytes below local paths the same way an
//! upload walks them: symbolic links and excluded names are left out.

use std::path::PathBuf;

use clap::Args;
use mtx_core::{LocalSummary, walk_local};
use serde::Serialize;

use super::{Context, report};
use crate::exit_code::ExitCode;

/// Summarize local trees as an upload would see them
#[derive(Args, Debug)]
pub struct DuArgs {
    /// Local files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Print one line per entry as well as the totals
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct DuOutput {
    #[serde(flatten)]
    summary: LocalSummary,
    size_human: String,
}

/// Execute the du command
pub fn execute(args: DuArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let verbose = args.verbose && !formatter.is_json();

    let summary = walk_local(&args.paths, &ctx.settings, |entry| {
        if verbose {
            let size = if entry.is_dir {
                "-".to_string()
            } else {
                humansize::format_size(entry.size, humansize::BINARY)
            };
            formatter.println(&format!("{size:>10} {}", entry.path.display()));
        }
        Ok(())
    });
    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => return report(&formatter, "Failed to walk local paths", &e.source),
    };

    let size_human = humansize::format_size(summary.bytes, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&DuOutput {
            summary,
            size_human,
        });
    } else {
        formatter.println(&format!(
            "{} files, {} directories, {size_human}",
            summary.files, summary.dirs
        ));
    }

    ExitCode::Success
}
