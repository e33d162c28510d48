//! get command - Download from the device
//!
//! Copies a single object into a local file, or a directory tree into a
//! local directory, recreating the tree below it.

use std::path::{Path, PathBuf};

use clap::Args;
use mtx_core::{
    Descriptor, DeviceStore, Error, Settings, Storage, WalkOptions, make_local_directory, path,
};
use serde::Serialize;

use super::{Context, Session, handle_arg, report};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, ProgressBar};

/// Download an object or directory tree from the device
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Device path of the object or directory
    pub source: String,

    /// Local destination; an existing directory receives the object by name
    #[arg(default_value = ".")]
    pub destination: PathBuf,

    /// Known object handle; the source path then only locates the parent
    #[arg(long)]
    pub handle: Option<u32>,

    /// Replace local files that already exist
    #[arg(short, long)]
    pub force: bool,

    /// Include names that are normally excluded (.DS_Store, Thumbs.db, ...)
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    source: String,
    destination: String,
    files: u64,
    size_bytes: u64,
    size_human: String,
}

#[derive(Debug, Default)]
struct Downloaded {
    files: u64,
    bytes: u64,
}

/// Execute the get command
pub fn execute(args: GetArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let session = match Session::open(ctx, &formatter) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let storage = session.storage();

    let source = match storage.resolve_handle_or_path(handle_arg(args.handle), &args.source)
    {
        Ok(source) => source,
        Err(e) => return report(&formatter, "Failed to resolve source", &e),
    };
    let destination = local_target(&args.destination, &source.name);

    let result = if source.is_dir {
        download_tree(&storage, &source, &destination, &args, &formatter, &ctx.settings)
    } else {
        download_file(&storage, &source, &destination, args.force, &formatter)
            .map(|bytes| Downloaded { files: 1, bytes })
    };

    let downloaded = match result {
        Ok(downloaded) => downloaded,
        Err(Failure::Exists(path)) => {
            formatter.error(&format!(
                "Destination exists: {} (use --force to replace)",
                path.display()
            ));
            return ExitCode::Conflict;
        }
        Err(Failure::Engine(e)) => return report(&formatter, "Download failed", &e),
    };

    let size_human = humansize::format_size(downloaded.bytes, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&GetOutput {
            status: "success",
            source: source.full_path,
            destination: destination.display().to_string(),
            files: downloaded.files,
            size_bytes: downloaded.bytes,
            size_human,
        });
    } else {
        formatter.success(&format!(
            "Downloaded {} files ({size_human}) to {}",
            downloaded.files,
            destination.display()
        ));
    }

    ExitCode::Success
}

enum Failure {
    Exists(PathBuf),
    Engine(Error),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Engine(err)
    }
}

/// Where an object named `name` lands given the user's destination
fn local_target(destination: &Path, name: &str) -> PathBuf {
    if destination.is_dir() && !name.is_empty() {
        destination.join(name)
    } else {
        destination.to_path_buf()
    }
}

fn download_file<S: DeviceStore + ?Sized>(
    storage: &Storage<'_, S>,
    source: &Descriptor,
    destination: &Path,
    force: bool,
    formatter: &Formatter,
) -> Result<u64, Failure> {
    if destination.exists() && !force {
        return Err(Failure::Exists(destination.to_path_buf()));
    }

    let bar = ProgressBar::new(formatter.config(), source.size);
    bar.set_message(&source.name);
    let written = storage.materialize_local(source, destination, |_, received| {
        bar.set_position(received)
    });
    bar.finish_and_clear();
    Ok(written?)
}

fn download_tree<S: DeviceStore + ?Sized>(
    storage: &Storage<'_, S>,
    source: &Descriptor,
    destination: &Path,
    args: &GetArgs,
    formatter: &Formatter,
    settings: &Settings,
) -> Result<Downloaded, Failure> {
    make_local_directory(destination, settings)?;

    let options = WalkOptions {
        recursive: true,
        skip_excluded: settings.skip_excluded && !args.all,
    };
    let bar = ProgressBar::spinner(formatter.config(), &source.full_path);
    let mut downloaded = Downloaded::default();
    let mut conflict = None;

    let walked = storage.walk(Some(source.handle), &source.full_path, options, |entry| {
        let local = destination.join(relative_to(&source.full_path, &entry.full_path));
        if entry.is_dir {
            return make_local_directory(&local, settings);
        }

        if local.exists() && !args.force {
            conflict = Some(local.clone());
            return Err(Error::InvalidPath(format!("{} exists", local.display())));
        }
        bar.set_message(&entry.full_path);
        let written = storage.materialize_local(&entry, &local, |_, received| {
            bar.set_position(downloaded.bytes + received)
        })?;
        downloaded.files += 1;
        downloaded.bytes += written;
        Ok(())
    });
    bar.finish_and_clear();

    match (walked, conflict) {
        (Ok(_), _) => Ok(downloaded),
        (Err(_), Some(path)) => Err(Failure::Exists(path)),
        (Err(e), None) => Err(Failure::Engine(e.source)),
    }
}

/// Path of `full_path` below `anchor`, as a relative local path
fn relative_to(anchor: &str, full_path: &str) -> PathBuf {
    let skip = path::segments(anchor).len();
    path::segments(full_path).into_iter().skip(skip).collect()
}
