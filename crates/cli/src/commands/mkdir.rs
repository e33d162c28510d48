//! mkdir command - Create directories on the device

use clap::Args;
use mtx_core::{DeviceStore, Error, ObjectHandle, Storage, path};
use serde::Serialize;

use super::{Context, Session, report};
use crate::exit_code::ExitCode;

/// Create directories on the device
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Device paths of the directories to create
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Create missing parents; existing directories are not an error
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    status: &'static str,
    path: String,
    handle: ObjectHandle,
}

/// Execute the mkdir command
pub fn execute(args: MkdirArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let session = match Session::open(ctx, &formatter) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let storage = session.storage();

    for raw in &args.paths {
        let full_path = path::normalize(raw);
        if path::is_root(&full_path) {
            formatter.error("Cannot create the storage root");
            return ExitCode::UsageError;
        }

        let created = if args.parents {
            storage.make_directory_all(&full_path)
        } else {
            match make_single(&storage, &full_path) {
                Ok(Some(handle)) => Ok(handle),
                Ok(None) => {
                    formatter.error(&format!("Already exists: {full_path}"));
                    return ExitCode::Conflict;
                }
                Err(e) => Err(e),
            }
        };

        match created {
            Ok(handle) => {
                if formatter.is_json() {
                    formatter.json(&MkdirOutput {
                        status: "success",
                        path: full_path,
                        handle,
                    });
                } else {
                    formatter.success(&format!("Created {full_path}"));
                }
            }
            Err(e) => return report(&formatter, &format!("Failed to create {full_path}"), &e),
        }
    }

    ExitCode::Success
}

/// Create the last segment of `full_path` under its existing parent
///
/// Returns `None` when something with that name already exists.
fn make_single<S: DeviceStore + ?Sized>(
    storage: &Storage<'_, S>,
    full_path: &str,
) -> mtx_core::Result<Option<ObjectHandle>> {
    let parent_path = path::parent(full_path);
    let parent = storage.resolve_path(&parent_path)?;
    if !parent.is_dir {
        return Err(Error::InvalidPath(format!(
            "{parent_path} is not a directory"
        )));
    }

    let name = path::file_name(full_path);
    match storage.lookup_by_name(parent.handle, &parent.full_path, name) {
        Ok(_) => Ok(None),
        Err(Error::FileNotFound(_)) => storage.make_directory(parent.handle, name).map(Some),
        Err(e) => Err(e),
    }
}
