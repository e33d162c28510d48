//! Remote tree walking
//!
//! Walks are depth-first and pre-order, following the order in which the
//! device enumerates children. A child whose metadata cannot be read is
//! skipped so one bad entry does not end a large traversal; every other
//! failure, including one returned by the visitor, stops the whole walk.

use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::traits::{DeviceStore, HandleScope, ObjectHandle};

/// Options for remote walks
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Skip names in the exclusion set without visiting or counting them
    pub skip_excluded: bool,
}

/// A walk that stopped early, with the number of entries visited before it did
#[derive(Debug, Error)]
#[error("walk stopped after {visited} entries: {source}")]
pub struct WalkError {
    pub visited: usize,
    #[source]
    pub source: Error,
}

impl WalkError {
    fn new(visited: usize, source: Error) -> Self {
        Self { visited, source }
    }
}

impl<S: DeviceStore + ?Sized> Storage<'_, S> {
    /// Visit the children of a handle or path
    ///
    /// Returns the number of entries visited. The anchor itself is not
    /// visited. Descendants of a directory are visited right after it.
    pub fn walk<F>(
        &self,
        handle: Option<ObjectHandle>,
        full_path: &str,
        options: WalkOptions,
        mut visit: F,
    ) -> std::result::Result<usize, WalkError>
    where
        F: FnMut(Descriptor) -> Result<()>,
    {
        let anchor = self
            .resolve_handle_or_path(handle, full_path)
            .map_err(|source| WalkError::new(0, source))?;

        self.walk_children(anchor.handle, &anchor.full_path, options, &mut visit)
    }

    fn walk_children<F>(
        &self,
        parent: ObjectHandle,
        parent_path: &str,
        options: WalkOptions,
        visit: &mut F,
    ) -> std::result::Result<usize, WalkError>
    where
        F: FnMut(Descriptor) -> Result<()>,
    {
        let handles = self
            .store()
            .object_handles(self.id(), HandleScope::All, parent)
            .map_err(|source| {
                WalkError::new(
                    0,
                    Error::ListDirectory {
                        handle: parent,
                        source,
                    },
                )
            })?;

        let mut visited = 0usize;

        for handle in handles {
            let entry = match self.describe(handle, parent_path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(%handle, parent = parent_path, error = %e, "skipping unreadable object");
                    continue;
                }
            };

            if options.skip_excluded && self.settings().excluded.is_excluded(&entry.name) {
                debug!(path = %entry.full_path, "skipping excluded name");
                continue;
            }

            let descend = options.recursive && entry.is_dir;
            let child_path = descend.then(|| entry.full_path.clone());

            visit(entry).map_err(|source| WalkError::new(visited, source))?;
            visited += 1;

            if let Some(child_path) = child_path {
                match self.walk_children(handle, &child_path, options, visit) {
                    Ok(count) => visited += count,
                    Err(mut e) => {
                        e.visited += visited;
                        return Err(e);
                    }
                }
            }
        }

        Ok(visited)
    }
}
