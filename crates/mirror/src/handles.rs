//! Handle allocation for mirrored objects
//!
//! Handles are handed out the first time an object is seen and stay stable
//! for the lifetime of the device, like handles within one device session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mtx_core::ObjectHandle;

/// Bidirectional map between handles and paths relative to the device root
#[derive(Debug)]
pub(crate) struct HandleTable {
    next: u32,
    by_handle: HashMap<ObjectHandle, PathBuf>,
    by_path: HashMap<PathBuf, ObjectHandle>,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self {
            next: 1,
            by_handle: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// Handle of `relative`, allocating one on first sight
    pub(crate) fn handle_for(&mut self, relative: &Path) -> ObjectHandle {
        if relative.as_os_str().is_empty() {
            return ObjectHandle::ROOT;
        }
        if let Some(handle) = self.by_path.get(relative) {
            return *handle;
        }

        let handle = ObjectHandle(self.next);
        self.next += 1;
        self.by_handle.insert(handle, relative.to_path_buf());
        self.by_path.insert(relative.to_path_buf(), handle);
        tracing::debug!(%handle, path = %relative.display(), "allocated handle");
        handle
    }

    /// Relative path of a known handle; the root maps to the empty path
    pub(crate) fn path_of(&self, handle: ObjectHandle) -> Option<PathBuf> {
        if handle == ObjectHandle::ROOT {
            return Some(PathBuf::new());
        }
        self.by_handle.get(&handle).cloned()
    }

    /// Drop `relative` and everything below it
    pub(crate) fn forget(&mut self, relative: &Path) {
        let stale: Vec<PathBuf> = self
            .by_path
            .keys()
            .filter(|path| path.starts_with(relative))
            .cloned()
            .collect();
        for path in stale {
            if let Some(handle) = self.by_path.remove(&path) {
                self.by_handle.remove(&handle);
            }
        }
    }
}
