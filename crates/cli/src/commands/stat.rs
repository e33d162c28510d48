//! stat command - Show object metadata
//!
//! Displays the resolved descriptor of an object given by path or handle.

use clap::Args;
use mtx_core::Descriptor;
use serde::Serialize;

use super::{Context, Session, handle_arg, report};
use crate::exit_code::ExitCode;
use crate::output::format_date;

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Device path of the object
    #[arg(default_value = "")]
    pub path: String,

    /// Known object handle; the path then only locates the parent
    #[arg(long)]
    pub handle: Option<u32>,
}

#[derive(Debug, Serialize)]
struct StatOutput<'a> {
    #[serde(flatten)]
    descriptor: &'a Descriptor,
    size_human: String,
}

/// Execute the stat command
pub fn execute(args: StatArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let session = match Session::open(ctx, &formatter) {
        Ok(session) => session,
        Err(code) => return code,
    };

    let descriptor = match session
        .storage()
        .resolve_handle_or_path(handle_arg(args.handle), &args.path)
    {
        Ok(descriptor) => descriptor,
        Err(e) => return report(&formatter, "Failed to stat object", &e),
    };

    if formatter.is_json() {
        formatter.json(&StatOutput {
            descriptor: &descriptor,
            size_human: humansize::format_size(descriptor.size, humansize::BINARY),
        });
    } else {
        for line in render(&descriptor) {
            formatter.println(&line);
        }
    }

    ExitCode::Success
}

fn render(descriptor: &Descriptor) -> Vec<String> {
    let kind = if descriptor.is_dir { "directory" } else { "file" };
    let mut lines = vec![
        format!("Name      : {}", descriptor.name),
        format!("Path      : {}", descriptor.full_path),
        format!("Handle    : {}", descriptor.handle),
        format!("Parent    : {}", descriptor.parent_handle),
        format!("Type      : {kind}"),
        format!(
            "Size      : {} ({} bytes)",
            humansize::format_size(descriptor.size, humansize::BINARY),
            descriptor.size
        ),
    ];
    if !descriptor.extension.is_empty() {
        lines.push(format!("Extension : {}", descriptor.extension));
    }
    if descriptor.modified.is_some() {
        lines.push(format!("Date      : {} UTC", format_date(descriptor.modified)));
    }
    lines
}
