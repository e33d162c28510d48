//! ls command - List objects
//!
//! Lists the children of a device directory, optionally the whole subtree.

use clap::Args;
use mtx_core::{Descriptor, WalkOptions};
use serde::Serialize;

use super::{Context, Session, handle_arg, report};
use crate::exit_code::ExitCode;
use crate::output::format_row;

/// List objects under a device path
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Device path to list
    #[arg(default_value = "/")]
    pub path: String,

    /// Start from a known object handle instead of resolving the path
    #[arg(long)]
    pub handle: Option<u32>,

    /// List recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Include names that are normally excluded (.DS_Store, Thumbs.db, ...)
    #[arg(short, long)]
    pub all: bool,

    /// Summarize output (show totals only)
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<Descriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_dirs: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

impl Summary {
    fn of(items: &[Descriptor]) -> Self {
        let total_size_bytes = items.iter().filter(|d| !d.is_dir).map(|d| d.size).sum();
        Self {
            total_objects: items.iter().filter(|d| !d.is_dir).count(),
            total_dirs: items.iter().filter(|d| d.is_dir).count(),
            total_size_bytes,
            total_size_human: humansize::format_size(total_size_bytes, humansize::BINARY),
        }
    }
}

/// Execute the ls command
pub fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let session = match Session::open(ctx, &formatter) {
        Ok(session) => session,
        Err(code) => return code,
    };
    let storage = session.storage();

    let options = WalkOptions {
        recursive: args.recursive,
        skip_excluded: ctx.settings.skip_excluded && !args.all,
    };

    let mut items = Vec::new();
    let walked = storage.walk(handle_arg(args.handle), &args.path, options, |entry| {
        items.push(entry);
        Ok(())
    });
    if let Err(e) = walked {
        if e.visited > 0 {
            formatter.warning(&format!("Listing stopped after {} entries", e.visited));
        }
        return report(&formatter, &format!("Failed to list {}", args.path), &e.source);
    }

    let summary = args.summarize.then(|| Summary::of(&items));

    if formatter.is_json() {
        formatter.json(&LsOutput { items, summary });
        return ExitCode::Success;
    }

    for item in &items {
        let name = if args.recursive {
            item.full_path.as_str()
        } else {
            item.name.as_str()
        };
        formatter.println(&format_row(item.modified, item.size, item.is_dir, name));
    }
    if let Some(summary) = summary {
        formatter.println(&format!(
            "\nTotal: {} objects, {} directories, {}",
            summary.total_objects, summary.total_dirs, summary.total_size_human
        ));
    }

    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_core::{ObjectHandle, path};

    fn descriptor(name: &str, size: u64, is_dir: bool) -> Descriptor {
        Descriptor {
            handle: ObjectHandle(1),
            parent_handle: ObjectHandle::ROOT,
            name: name.into(),
            extension: path::extension(name, is_dir),
            full_path: path::join("/", name),
            parent_path: "/".into(),
            size,
            is_dir,
            modified: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let items = vec![
            descriptor("DCIM", 0, true),
            descriptor("a.jpg", 1024, false),
            descriptor("b.jpg", 2048, false),
        ];
        let summary = Summary::of(&items);
        assert_eq!(summary.total_objects, 2);
        assert_eq!(summary.total_dirs, 1);
        assert_eq!(summary.total_size_bytes, 3072);
        assert_eq!(summary.total_size_human, "3 KiB");
    }
}
