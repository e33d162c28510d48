//! Local filesystem side of transfers
//!
//! Walks local trees the way the device walker walks remote ones: pre-order,
//! skipping excluded names, and never following or reporting symbolic links.

use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{Error, Result};

/// One entry met during a local walk
#[derive(Debug, Clone)]
pub struct LocalEntry {
    /// Path of the entry
    pub path: PathBuf,
    /// Source root the entry was found under
    pub root: PathBuf,
    /// Depth below `root`; the root itself has depth zero
    pub depth: usize,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<Timestamp>,
}

impl LocalEntry {
    /// File name of the entry
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Totals accumulated by a local walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalSummary {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

impl LocalSummary {
    fn add(&mut self, entry: &LocalEntry) {
        if entry.is_dir {
            self.dirs += 1;
        } else {
            self.files += 1;
            self.bytes += entry.size;
        }
    }
}

/// A local walk that stopped early, with the totals gathered before it did
#[derive(Debug, Error)]
#[error("local walk stopped after {} files and {} directories: {source}", .summary.files, .summary.dirs)]
pub struct LocalWalkError {
    pub summary: LocalSummary,
    #[source]
    pub source: Error,
}

/// Walk every source root in order, visiting each entry
///
/// Symbolic links are never followed, visited or counted. Names in the
/// exclusion set are skipped together with everything below them. A visitor
/// failure ends the walk across all roots.
pub fn walk_local<P, F>(
    sources: &[P],
    settings: &Settings,
    mut visit: F,
) -> std::result::Result<LocalSummary, LocalWalkError>
where
    P: AsRef<Path>,
    F: FnMut(&LocalEntry) -> Result<()>,
{
    let mut summary = LocalSummary::default();

    for source in sources {
        let root = source.as_ref();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !entry.path_is_symlink()
                    && !settings
                        .excluded
                        .is_excluded(&entry.file_name().to_string_lossy())
            });

        for item in walker {
            let item = item.map_err(|e| LocalWalkError {
                summary,
                source: classify_walk_error(e, root),
            })?;

            let metadata = item.metadata().map_err(|e| LocalWalkError {
                summary,
                source: classify_walk_error(e, item.path()),
            })?;

            let entry = LocalEntry {
                path: item.path().to_path_buf(),
                root: root.to_path_buf(),
                depth: item.depth(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified: metadata
                    .modified()
                    .ok()
                    .and_then(|time| Timestamp::try_from(time).ok()),
            };

            visit(&entry).map_err(|source| LocalWalkError { summary, source })?;
            summary.add(&entry);
        }
    }

    debug!(
        files = summary.files,
        dirs = summary.dirs,
        bytes = summary.bytes,
        "local walk finished"
    );
    Ok(summary)
}

fn classify_walk_error(err: walkdir::Error, fallback: &Path) -> Error {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    Error::local(path, std::io::Error::from(err))
}

/// Create a local directory and all of its parents
///
/// New directories get the configured permission mode.
pub fn make_local_directory(path: &Path, settings: &Settings) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(settings.dir_mode);
    }
    #[cfg(not(unix))]
    let _ = settings;

    builder.create(path).map_err(|e| Error::local(path, e))
}
