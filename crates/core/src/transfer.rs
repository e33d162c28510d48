//! Object creation and data transfer
//!
//! Helpers that create directories and files on the device and copy object
//! data to local files. Transfers are chunked by the engine, which reports
//! progress after every chunk on the calling thread.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::SystemTime;

use jiff::Timestamp;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;
use crate::error::{CreateFailure, Error, Result};
use crate::path;
use crate::storage::Storage;
use crate::traits::{DeviceStore, ObjectFormat, ObjectHandle, ObjectRecord};

/// Describes a file to be created on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTemplate {
    /// Directory that receives the file
    pub parent: ObjectHandle,
    pub name: String,
    /// Number of bytes that will be streamed
    pub size: u64,
    pub modified: Option<Timestamp>,
}

impl<S: DeviceStore + ?Sized> Storage<'_, S> {
    /// Create a directory named `name` under `parent`
    pub fn make_directory(&self, parent: ObjectHandle, name: &str) -> Result<ObjectHandle> {
        let record = ObjectRecord {
            storage: self.id(),
            format: ObjectFormat::ASSOCIATION,
            parent,
            filename: name.to_string(),
            compressed_size: 0,
            modified: Some(Timestamp::now()),
        };

        let handle = self
            .store()
            .send_object_info(self.id(), parent, &record)
            .map_err(|e| Error::ObjectCreate {
                name: name.to_string(),
                source: e.into(),
            })?;

        debug!(%parent, name, %handle, "created directory");
        Ok(handle)
    }

    /// Create every missing directory along `full_path`
    ///
    /// Existing directories are reused. Returns the handle of the last one.
    pub fn make_directory_all(&self, full_path: &str) -> Result<ObjectHandle> {
        if full_path.is_empty() {
            return Err(Error::InvalidPath("path cannot be empty".into()));
        }

        let mut current = self.settings().root_handle;
        let mut current_path = path::ROOT.to_string();

        for segment in path::segments(full_path) {
            current = match self.lookup_by_name(current, &current_path, segment) {
                Ok(existing) if existing.is_dir => existing.handle,
                Ok(existing) => {
                    return Err(Error::InvalidPath(format!(
                        "{} exists and is not a directory",
                        existing.full_path
                    )));
                }
                Err(Error::FileNotFound(_)) => self.make_directory(current, segment)?,
                Err(other) => return Err(other),
            };
            current_path = path::join(&current_path, segment);
        }

        Ok(current)
    }

    /// Create a file from `source`, streaming `template.size` bytes
    ///
    /// An existing object with the same name under the same parent is kept
    /// (and its handle returned) unless `overwrite` is set, in which case it
    /// is deleted first. `on_progress` receives `(total, sent)` per chunk.
    pub fn make_file<R, P>(
        &self,
        template: &ObjectTemplate,
        source: R,
        overwrite: bool,
        mut on_progress: P,
    ) -> Result<ObjectHandle>
    where
        R: Read,
        P: FnMut(u64, u64),
    {
        match self.lookup_by_name(template.parent, "", &template.name) {
            Ok(existing) if !overwrite => {
                debug!(name = %template.name, handle = %existing.handle, "object exists, keeping it");
                return Ok(existing.handle);
            }
            Ok(existing) => {
                self.store()
                    .delete_object(existing.handle)
                    .map_err(|source| Error::ObjectDelete {
                        handle: existing.handle,
                        source,
                    })?;
                debug!(name = %template.name, handle = %existing.handle, "deleted object before overwrite");
            }
            Err(Error::FileNotFound(_)) => {}
            Err(other) => return Err(other),
        }

        let record = ObjectRecord {
            storage: self.id(),
            format: ObjectFormat::UNDEFINED,
            parent: template.parent,
            filename: template.name.clone(),
            compressed_size: ObjectRecord::compact_size(
                template.size,
                self.settings().size_overflow,
            ),
            modified: template.modified,
        };

        let handle = self
            .store()
            .send_object_info(self.id(), template.parent, &record)
            .map_err(|e| Error::ObjectCreate {
                name: template.name.clone(),
                source: e.into(),
            })?;

        match self.stream_object(handle, template.size, source, &mut on_progress) {
            Ok(sent) => {
                debug!(name = %template.name, %handle, bytes = sent, "created file");
                Ok(handle)
            }
            Err(failure) => {
                // best effort; the streaming failure is what gets reported
                if let Err(e) = self.store().delete_object(handle) {
                    warn!(name = %template.name, %handle, error = %e, "failed to remove partial object");
                }
                Err(Error::ObjectCreate {
                    name: template.name.clone(),
                    source: failure,
                })
            }
        }
    }

    /// Send exactly `size` bytes of `source` to a freshly created object
    fn stream_object<R, P>(
        &self,
        handle: ObjectHandle,
        size: u64,
        source: R,
        on_progress: &mut P,
    ) -> std::result::Result<u64, CreateFailure>
    where
        R: Read,
        P: FnMut(u64, u64),
    {
        let mut reader = source.take(size);
        let mut buffer = vec![0u8; self.settings().chunk_size as usize];
        let mut sent = 0u64;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CreateFailure::Source(e)),
            };

            self.store().send_object_chunk(handle, sent, &buffer[..read])?;
            sent += read as u64;
            on_progress(size, sent);
        }

        if sent != size {
            return Err(CreateFailure::ShortSource {
                sent,
                expected: size,
            });
        }
        Ok(sent)
    }

    /// Copy a remote object into a new local file at `destination`
    ///
    /// The file is closed on every exit path. `on_progress` receives
    /// `(total, received)` per chunk. Returns the number of bytes written.
    pub fn materialize_local<P>(
        &self,
        descriptor: &Descriptor,
        destination: &Path,
        mut on_progress: P,
    ) -> Result<u64>
    where
        P: FnMut(u64, u64),
    {
        if descriptor.is_dir {
            return Err(Error::InvalidPath(format!(
                "{} is a directory",
                descriptor.full_path
            )));
        }

        let mut file = File::create(destination).map_err(|e| Error::local(destination, e))?;
        let mut received = 0u64;

        loop {
            let chunk = self
                .store()
                .object_chunk(descriptor.handle, received, self.settings().chunk_size)
                .map_err(|source| Error::ObjectAccess {
                    handle: descriptor.handle,
                    source,
                })?;
            if chunk.is_empty() {
                break;
            }

            file.write_all(&chunk)
                .map_err(|e| Error::local(destination, e))?;
            received += chunk.len() as u64;
            on_progress(descriptor.size, received);
        }

        file.flush().map_err(|e| Error::local(destination, e))?;

        if let Some(modified) = descriptor.modified {
            if let Err(e) = file.set_modified(SystemTime::from(modified)) {
                warn!(path = %destination.display(), error = %e, "could not set modification time");
            }
        }

        debug!(handle = %descriptor.handle, path = %destination.display(), bytes = received, "materialized object");
        Ok(received)
    }
}
