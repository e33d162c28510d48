//! put command - Upload local files and directories
//!
//! Mirrors local trees into a device directory. Directories are created on
//! the device as they are met; files stream in chunks with a progress bar
//! sized from a first counting pass over the sources.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;
use mtx_core::{
    DeviceStore, Error, LocalSummary, ObjectHandle, ObjectTemplate, Storage, walk_local,
};
use serde::Serialize;

use super::{Context, Session, report};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Upload local files and directories to the device
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local files or directories to upload
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Device directory to upload into
    pub target: String,

    /// Replace objects that already exist on the device
    #[arg(long)]
    pub overwrite: bool,

    /// Create the target directory and its parents if missing
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    target: String,
    files: u64,
    dirs: u64,
    size_bytes: u64,
    size_human: String,
}

/// Execute the put command
pub fn execute(args: PutArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let session = match Session::open(ctx, &formatter) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let storage = session.storage();

    let target = if args.parents {
        storage
            .make_directory_all(&args.target)
            .and_then(|_| storage.resolve_path(&args.target))
    } else {
        storage.resolve_path(&args.target)
    };
    let target = match target {
        Ok(target) if target.is_dir => target,
        Ok(target) => {
            formatter.error(&format!("Target is not a directory: {}", target.full_path));
            return ExitCode::UsageError;
        }
        Err(e) => return report(&formatter, "Failed to resolve target", &e),
    };

    // counting pass, sizes the progress bar
    let totals = match walk_local(&args.sources, &ctx.settings, |_| Ok(())) {
        Ok(totals) => totals,
        Err(e) => return report(&formatter, "Failed to read sources", &e.source),
    };

    let bar = ProgressBar::new(formatter.config(), totals.bytes);
    let mut remote_dirs: HashMap<PathBuf, ObjectHandle> = HashMap::new();
    let mut sent_before = 0u64;

    let uploaded = walk_local(&args.sources, &ctx.settings, |entry| {
        let name = entry.name();
        let parent = if entry.depth == 0 {
            target.handle
        } else {
            entry
                .path
                .parent()
                .and_then(|p| remote_dirs.get(p))
                .copied()
                .ok_or_else(|| {
                    Error::InvalidPath(format!(
                        "no device directory for {}",
                        entry.path.display()
                    ))
                })?
        };

        if entry.is_dir {
            // a source like "." uploads its contents straight into the target
            let handle = if name.is_empty() {
                parent
            } else {
                ensure_directory(&storage, parent, &name)?
            };
            remote_dirs.insert(entry.path.clone(), handle);
            return Ok(());
        }

        bar.set_message(&name);
        let file = File::open(&entry.path).map_err(|e| Error::local(&entry.path, e))?;
        let template = ObjectTemplate {
            parent,
            name,
            size: entry.size,
            modified: entry.modified,
        };
        storage.make_file(&template, BufReader::new(file), args.overwrite, |_, sent| {
            bar.set_position(sent_before + sent)
        })?;
        sent_before += entry.size;
        bar.set_position(sent_before);
        Ok(())
    });
    bar.finish_and_clear();

    let uploaded: LocalSummary = match uploaded {
        Ok(summary) => summary,
        Err(e) => {
            if e.summary.files > 0 {
                formatter.warning(&format!(
                    "{} files were uploaded before the failure",
                    e.summary.files
                ));
            }
            return report(&formatter, "Upload failed", &e.source);
        }
    };

    let size_human = humansize::format_size(uploaded.bytes, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&PutOutput {
            status: "success",
            target: target.full_path,
            files: uploaded.files,
            dirs: uploaded.dirs,
            size_bytes: uploaded.bytes,
            size_human,
        });
    } else {
        formatter.success(&format!(
            "Uploaded {} files ({size_human}) to {}",
            uploaded.files, target.full_path
        ));
    }

    ExitCode::Success
}

/// Reuse the directory `name` under `parent`, creating it when missing
fn ensure_directory<S: DeviceStore + ?Sized>(
    storage: &Storage<'_, S>,
    parent: ObjectHandle,
    name: &str,
) -> mtx_core::Result<ObjectHandle> {
    match storage.lookup_by_name(parent, "", name) {
        Ok(existing) if existing.is_dir => Ok(existing.handle),
        Ok(existing) => Err(Error::InvalidPath(format!(
            "{} exists on the device and is not a directory",
            existing.name
        ))),
        Err(Error::FileNotFound(_)) => storage.make_directory(parent, name),
        Err(e) => Err(e),
    }
}
