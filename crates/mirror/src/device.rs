//! Directory-backed device store
//!
//! Presents a local directory tree as a single-storage device: every file and
//! directory below the root becomes an object addressed by a handle, and the
//! directory itself is the storage root.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use mtx_core::traits::SIZE_OVERFLOW;
use mtx_core::{
    DeviceStore, Error, HandleScope, ObjectFormat, ObjectHandle, ObjectProperty, ObjectRecord,
    PropertyValue, Result, StorageId, TransportError, TransportResult,
};
use parking_lot::Mutex;

use crate::handles::HandleTable;

/// Storage id reported by every mirror device
pub const MIRROR_STORAGE: StorageId = StorageId(0x0001_0001);

/// A device store backed by a local directory
#[derive(Debug)]
pub struct MirrorDevice {
    root: PathBuf,
    handles: Mutex<HandleTable>,
}

impl MirrorDevice {
    /// Open a directory as a device; the directory must already exist
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|e| Error::local(&root, e))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidPath(format!(
                "Device root is not a directory: {}",
                root.display()
            )));
        }

        tracing::debug!(root = %root.display(), "opened mirror device");
        Ok(Self {
            root,
            handles: Mutex::new(HandleTable::new()),
        })
    }

    /// Directory backing this device
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The only storage this device exposes
    pub const fn default_storage(&self) -> StorageId {
        MIRROR_STORAGE
    }

    fn relative(&self, handle: ObjectHandle) -> TransportResult<PathBuf> {
        self.handles
            .lock()
            .path_of(handle)
            .ok_or_else(|| TransportError::new(format!("invalid object handle {handle}")))
    }

    fn object_path(&self, handle: ObjectHandle) -> TransportResult<PathBuf> {
        if handle == ObjectHandle::ROOT {
            return Err(TransportError::new("the storage root has no object"));
        }
        Ok(self.root.join(self.relative(handle)?))
    }

    fn check_storage(storage: StorageId) -> TransportResult<()> {
        if storage == MIRROR_STORAGE {
            Ok(())
        } else {
            Err(TransportError::new(format!("invalid storage id {storage}")))
        }
    }
}

fn transport(context: &str, path: &Path, err: io::Error) -> TransportError {
    TransportError::new(format!("{context} {}: {err}", path.display()))
}

fn format_of(metadata: &fs::Metadata) -> ObjectFormat {
    if metadata.is_dir() {
        ObjectFormat::ASSOCIATION
    } else {
        ObjectFormat::UNDEFINED
    }
}

fn valid_object_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl DeviceStore for MirrorDevice {
    fn object_info(&self, handle: ObjectHandle) -> TransportResult<ObjectRecord> {
        if handle == ObjectHandle::ROOT {
            return Err(TransportError::new("the storage root has no object"));
        }
        let relative = self.relative(handle)?;
        let path = self.root.join(&relative);
        let metadata = fs::symlink_metadata(&path).map_err(|e| transport("stat", &path, e))?;

        let parent = relative
            .parent()
            .map(|p| self.handles.lock().handle_for(p))
            .unwrap_or(ObjectHandle::ROOT);
        let filename = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = if metadata.is_dir() { 0 } else { metadata.len() };

        Ok(ObjectRecord {
            storage: MIRROR_STORAGE,
            format: format_of(&metadata),
            parent,
            filename,
            compressed_size: ObjectRecord::compact_size(size, SIZE_OVERFLOW),
            modified: metadata
                .modified()
                .ok()
                .and_then(|t| Timestamp::try_from(t).ok()),
        })
    }

    fn object_property(
        &self,
        handle: ObjectHandle,
        property: ObjectProperty,
    ) -> TransportResult<PropertyValue> {
        let path = self.object_path(handle)?;
        match property {
            ObjectProperty::FileName => Ok(PropertyValue::Text(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
            ObjectProperty::ObjectSize => {
                let metadata =
                    fs::symlink_metadata(&path).map_err(|e| transport("stat", &path, e))?;
                Ok(PropertyValue::U64(if metadata.is_dir() {
                    0
                } else {
                    metadata.len()
                }))
            }
        }
    }

    fn object_handles(
        &self,
        storage: StorageId,
        scope: HandleScope,
        parent: ObjectHandle,
    ) -> TransportResult<Vec<ObjectHandle>> {
        Self::check_storage(storage)?;
        let relative = self.relative(parent)?;
        let dir = self.root.join(&relative);

        let mut children = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| transport("list", &dir, e))? {
            let entry = entry.map_err(|e| transport("list", &dir, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| transport("stat", &entry.path(), e))?;
            if metadata.file_type().is_symlink() {
                continue;
            }
            if let HandleScope::Format(format) = scope
                && format_of(&metadata) != format
            {
                continue;
            }
            children.push(entry.file_name());
        }
        children.sort();

        let mut handles = self.handles.lock();
        Ok(children
            .into_iter()
            .map(|name| handles.handle_for(&relative.join(name)))
            .collect())
    }

    fn send_object_info(
        &self,
        storage: StorageId,
        parent: ObjectHandle,
        record: &ObjectRecord,
    ) -> TransportResult<ObjectHandle> {
        Self::check_storage(storage)?;
        if !valid_object_name(&record.filename) {
            return Err(TransportError::new(format!(
                "invalid object name '{}'",
                record.filename
            )));
        }

        let relative = self.relative(parent)?.join(&record.filename);
        let path = self.root.join(&relative);
        if fs::symlink_metadata(&path).is_ok() {
            return Err(TransportError::new(format!(
                "object already exists: {}",
                path.display()
            )));
        }

        if record.is_association() {
            fs::create_dir(&path).map_err(|e| transport("create directory", &path, e))?;
        } else {
            File::create(&path).map_err(|e| transport("create file", &path, e))?;
        }

        let handle = self.handles.lock().handle_for(&relative);
        tracing::debug!(%handle, path = %path.display(), "created object");
        Ok(handle)
    }

    fn send_object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        data: &[u8],
    ) -> TransportResult<()> {
        let path = self.object_path(handle)?;
        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| transport("open", &path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| transport("seek", &path, e))?;
        file.write_all(data)
            .map_err(|e| transport("write", &path, e))
    }

    fn object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        max_len: u32,
    ) -> TransportResult<Vec<u8>> {
        let path = self.object_path(handle)?;
        let mut file = File::open(&path).map_err(|e| transport("open", &path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| transport("seek", &path, e))?;

        let mut chunk = Vec::new();
        file.take(u64::from(max_len))
            .read_to_end(&mut chunk)
            .map_err(|e| transport("read", &path, e))?;
        Ok(chunk)
    }

    fn delete_object(&self, handle: ObjectHandle) -> TransportResult<()> {
        if handle == ObjectHandle::ROOT {
            return Err(TransportError::new("the storage root cannot be deleted"));
        }
        let relative = self.relative(handle)?;
        let path = self.root.join(&relative);
        let metadata = fs::symlink_metadata(&path).map_err(|e| transport("stat", &path, e))?;

        if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .map_err(|e| transport("delete", &path, e))?;

        self.handles.lock().forget(&relative);
        tracing::debug!(%handle, path = %path.display(), "deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_core::{Settings, Storage, WalkOptions};
    use tempfile::TempDir;

    fn device() -> (TempDir, MirrorDevice) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("DCIM/Camera")).unwrap();
        fs::write(dir.path().join("DCIM/Camera/IMG_0001.jpg"), b"jpeg bytes").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let device = MirrorDevice::open(dir.path()).unwrap();
        (dir, device)
    }

    #[test]
    fn test_open_requires_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(
            MirrorDevice::open(&file),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            MirrorDevice::open(dir.path().join("missing")),
            Err(Error::LocalFile { .. })
        ));
    }

    #[test]
    fn test_enumeration_is_sorted_and_scoped() {
        let (_dir, device) = device();
        let all = device
            .object_handles(MIRROR_STORAGE, HandleScope::All, ObjectHandle::ROOT)
            .unwrap();
        let names: Vec<String> = all
            .iter()
            .map(|h| device.object_info(*h).unwrap().filename)
            .collect();
        assert_eq!(names, vec!["DCIM", "notes.txt"]);

        let dirs = device
            .object_handles(
                MIRROR_STORAGE,
                HandleScope::Format(ObjectFormat::ASSOCIATION),
                ObjectHandle::ROOT,
            )
            .unwrap();
        assert_eq!(dirs, vec![all[0]]);

        assert!(
            device
                .object_handles(StorageId(7), HandleScope::All, ObjectHandle::ROOT)
                .is_err()
        );
    }

    #[test]
    fn test_object_info_and_properties() {
        let (_dir, device) = device();
        let settings = Settings::default();
        let storage = Storage::new(&device, &settings, MIRROR_STORAGE);

        let image = storage.resolve_path("/DCIM/Camera/IMG_0001.jpg").unwrap();
        assert_eq!(image.size, 10);
        assert!(!image.is_dir);
        assert_eq!(image.parent_path, "/DCIM/Camera");

        let record = device.object_info(image.handle).unwrap();
        assert_eq!(record.parent, image.parent_handle);
        assert_eq!(
            device
                .object_property(image.handle, ObjectProperty::FileName)
                .unwrap(),
            PropertyValue::Text("IMG_0001.jpg".into())
        );
    }

    #[test]
    fn test_large_file_reports_overflow() {
        let (dir, device) = device();
        let big = File::create(dir.path().join("movie.mkv")).unwrap();
        big.set_len(5 * 1024 * 1024 * 1024).unwrap();

        let settings = Settings::default();
        let storage = Storage::new(&device, &settings, MIRROR_STORAGE);
        let movie = storage.resolve_path("/movie.mkv").unwrap();
        assert_eq!(
            device.object_info(movie.handle).unwrap().compressed_size,
            SIZE_OVERFLOW
        );
        assert_eq!(movie.size, 5 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_symlinks_are_invisible() {
        let (dir, device) = device();
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.path().join("notes.txt"), dir.path().join("link")).unwrap();

        let settings = Settings::default();
        let storage = Storage::new(&device, &settings, MIRROR_STORAGE);
        let visited = storage
            .walk(
                None,
                "/",
                WalkOptions {
                    recursive: true,
                    skip_excluded: false,
                },
                |_| Ok(()),
            )
            .unwrap();
        // DCIM, Camera, IMG_0001.jpg, notes.txt
        assert_eq!(visited, 4);
    }

    #[test]
    fn test_create_write_read_delete() {
        let (dir, device) = device();
        let record = ObjectRecord {
            storage: MIRROR_STORAGE,
            format: ObjectFormat::UNDEFINED,
            parent: ObjectHandle::ROOT,
            filename: "song.mp3".into(),
            compressed_size: 6,
            modified: None,
        };
        let handle = device
            .send_object_info(MIRROR_STORAGE, ObjectHandle::ROOT, &record)
            .unwrap();
        device.send_object_chunk(handle, 0, b"abc").unwrap();
        device.send_object_chunk(handle, 3, b"def").unwrap();
        assert_eq!(fs::read(dir.path().join("song.mp3")).unwrap(), b"abcdef");

        assert_eq!(device.object_chunk(handle, 2, 3).unwrap(), b"cde");
        assert!(device.object_chunk(handle, 6, 3).unwrap().is_empty());

        // a second object with the same name is refused
        assert!(
            device
                .send_object_info(MIRROR_STORAGE, ObjectHandle::ROOT, &record)
                .is_err()
        );

        device.delete_object(handle).unwrap();
        assert!(!dir.path().join("song.mp3").exists());
        assert!(device.object_info(handle).is_err());
    }

    #[test]
    fn test_rejects_bad_names() {
        let (_dir, device) = device();
        for name in ["", ".", "..", "a/b", "a\\b"] {
            let record = ObjectRecord {
                storage: MIRROR_STORAGE,
                format: ObjectFormat::ASSOCIATION,
                parent: ObjectHandle::ROOT,
                filename: name.into(),
                compressed_size: 0,
                modified: None,
            };
            assert!(
                device
                    .send_object_info(MIRROR_STORAGE, ObjectHandle::ROOT, &record)
                    .is_err(),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_delete_directory_forgets_children() {
        let (dir, device) = device();
        let settings = Settings::default();
        let storage = Storage::new(&device, &settings, MIRROR_STORAGE);
        let dcim = storage.resolve_path("/DCIM").unwrap();
        let image = storage.resolve_path("/DCIM/Camera/IMG_0001.jpg").unwrap();

        device.delete_object(dcim.handle).unwrap();
        assert!(!dir.path().join("DCIM").exists());
        assert!(device.object_info(image.handle).is_err());
        assert!(device.delete_object(ObjectHandle::ROOT).is_err());
    }

    #[test]
    fn test_engine_round_trip() {
        let (_dir, device) = device();
        let settings = Settings::default();
        let storage = Storage::new(&device, &settings, MIRROR_STORAGE);

        let dir = storage.make_directory_all("/Music/Albums").unwrap();
        let template = mtx_core::ObjectTemplate {
            parent: dir,
            name: "track.flac".into(),
            size: 11,
            modified: None,
        };
        storage
            .make_file(&template, &b"flac stream"[..], false, |_, _| {})
            .unwrap();

        let track = storage.resolve_path("/Music/Albums/track.flac").unwrap();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("track.flac");
        let written = storage.materialize_local(&track, &dest, |_, _| {}).unwrap();
        assert_eq!(written, 11);
        assert_eq!(fs::read(dest).unwrap(), b"flac stream");
    }
}
