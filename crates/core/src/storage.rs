//! Path and handle resolution
//!
//! The device has no notion of paths: every segment costs a scan of the
//! parent's children. [`Storage`] ties a store, the engine settings and a
//! storage id together and turns paths into descriptors one segment at a time.

use tracing::debug;

use crate::config::Settings;
use crate::descriptor::{self, Descriptor};
use crate::error::{Error, Result};
use crate::path;
use crate::traits::{DeviceStore, HandleScope, ObjectHandle, ObjectProperty, PropertyValue, StorageId};

/// A storage on a device, the scope in which handles are resolved
pub struct Storage<'a, S: DeviceStore + ?Sized> {
    store: &'a S,
    settings: &'a Settings,
    id: StorageId,
}

impl<S: DeviceStore + ?Sized> Clone for Storage<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: DeviceStore + ?Sized> Copy for Storage<'_, S> {}

impl<'a, S: DeviceStore + ?Sized> Storage<'a, S> {
    /// Create a view of storage `id` on `store`
    pub fn new(store: &'a S, settings: &'a Settings, id: StorageId) -> Self {
        Self {
            store,
            settings,
            id,
        }
    }

    /// The underlying device store
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Engine settings in effect
    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// Storage id
    pub fn id(&self) -> StorageId {
        self.id
    }

    /// Fetch the descriptor of a handle (see [`descriptor::describe`])
    pub fn describe(&self, handle: ObjectHandle, parent_path_hint: &str) -> Result<Descriptor> {
        descriptor::describe(self.store, self.settings, handle, parent_path_hint)
    }

    /// Find the child of `parent` named exactly `name`
    ///
    /// Only the name property is fetched for children that do not match; the
    /// full descriptor is fetched for a match and checked again. Fails with
    /// [`Error::FileNotFound`] when no child matches.
    pub fn lookup_by_name(
        &self,
        parent: ObjectHandle,
        parent_path: &str,
        name: &str,
    ) -> Result<Descriptor> {
        let handles = self
            .store
            .object_handles(self.id, HandleScope::All, parent)
            .map_err(|source| Error::ObjectAccess {
                handle: parent,
                source,
            })?;

        for handle in handles {
            let value = self
                .store
                .object_property(handle, ObjectProperty::FileName)
                .map_err(|source| Error::ObjectAccess { handle, source })?;

            if !matches!(&value, PropertyValue::Text(candidate) if candidate == name) {
                continue;
            }

            let found = self.describe(handle, parent_path)?;
            if found.name == name {
                return Ok(found);
            }
            debug!(%handle, name, "name property disagrees with object info, skipping");
        }

        Err(Error::FileNotFound(path::join(parent_path, name)))
    }

    /// Resolve a full path to a descriptor
    ///
    /// The returned descriptor's `full_path` is the normalized input, which
    /// makes this the only resolution that yields a canonical path.
    pub fn resolve_path(&self, full_path: &str) -> Result<Descriptor> {
        if full_path.is_empty() {
            return Err(Error::InvalidPath("path cannot be empty".into()));
        }

        let normalized = path::normalize(full_path);
        if normalized == path::ROOT {
            return Ok(Descriptor::root(self.settings));
        }

        let segments = path::segments(&normalized);
        let mut current = Descriptor::root(self.settings);
        let mut resolved = 0usize;

        for (index, segment) in segments.iter().enumerate() {
            let child = match self.lookup_by_name(current.handle, &current.full_path, segment) {
                Ok(child) => child,
                Err(Error::FileNotFound(reason)) => {
                    return Err(Error::InvalidPath(format!(
                        "path not found: {normalized} ({reason} does not exist)"
                    )));
                }
                Err(other) => return Err(other),
            };

            // a file cannot have children
            if !child.is_dir && index + 1 < segments.len() {
                return Err(Error::InvalidPath(format!(
                    "path not found: {normalized} ({} is not a directory)",
                    child.full_path
                )));
            }

            current = child;
            resolved += 1;
        }

        if resolved == 0 {
            return Err(Error::InvalidPath(format!("file not found: {full_path}")));
        }

        debug!(path = %normalized, handle = %current.handle, "resolved path");
        current.full_path = normalized;
        Ok(current)
    }

    /// Resolve either a known handle or, failing that, a path
    ///
    /// A supplied handle is trusted without checking it against `full_path`;
    /// the path then only serves as a hint for the descriptor's location.
    pub fn resolve_handle_or_path(
        &self,
        handle: Option<ObjectHandle>,
        full_path: &str,
    ) -> Result<Descriptor> {
        match handle {
            None if full_path.is_empty() => Err(Error::InvalidPath(
                "both handle and path cannot be empty".into(),
            )),
            None => self.resolve_path(full_path),
            Some(handle) if full_path.is_empty() => self.describe(handle, ""),
            Some(handle) => self.describe(handle, &path::parent(full_path)),
        }
    }

    /// Descriptor of the object if it resolves, `None` otherwise
    pub fn exists(&self, handle: Option<ObjectHandle>, full_path: &str) -> Option<Descriptor> {
        match self.resolve_handle_or_path(handle, full_path) {
            Ok(found) => Some(found),
            Err(e) => {
                debug!(path = full_path, error = %e, "object does not resolve");
                None
            }
        }
    }
}
