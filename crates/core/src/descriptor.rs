//! Object descriptors
//!
//! A [`Descriptor`] is the resolved view of one remote object. Descriptors are
//! built fresh for every query and never cached: two lookups of the same
//! handle may disagree if the device changes underneath.

use jiff::Timestamp;
use serde::Serialize;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::path;
use crate::traits::{DeviceStore, ObjectHandle, ObjectProperty, ObjectRecord, PropertyValue};

/// Resolved metadata of a remote object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub handle: ObjectHandle,
    pub parent_handle: ObjectHandle,
    pub name: String,
    /// Text after the last `.` of the name; always empty for directories
    pub extension: String,
    /// `parent_path` joined with `name`; canonical only when resolved by path
    pub full_path: String,
    pub parent_path: String,
    pub size: u64,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,
}

impl Descriptor {
    /// Synthesized descriptor of the storage root
    ///
    /// The root has no backing object; its size is reported as zero.
    pub fn root(settings: &Settings) -> Self {
        Self {
            handle: settings.root_handle,
            parent_handle: settings.root_handle,
            name: String::new(),
            extension: String::new(),
            full_path: path::ROOT.to_string(),
            parent_path: String::new(),
            size: 0,
            is_dir: true,
            modified: None,
        }
    }

    /// Whether this descriptor is the synthesized root
    pub fn is_root(&self, settings: &Settings) -> bool {
        self.handle == settings.root_handle
    }

    fn from_record(
        handle: ObjectHandle,
        record: ObjectRecord,
        size: u64,
        parent_path_hint: &str,
    ) -> Self {
        let is_dir = record.is_association();
        let parent_path = if parent_path_hint.is_empty() {
            String::new()
        } else {
            path::normalize(parent_path_hint)
        };
        Self {
            handle,
            parent_handle: record.parent,
            extension: path::extension(&record.filename, is_dir),
            full_path: path::join(&parent_path, &record.filename),
            parent_path,
            name: record.filename,
            size,
            is_dir,
            modified: record.modified,
        }
    }
}

/// Authoritative size of an object
///
/// When the compact size field holds the overflow sentinel, the precise size
/// property is queried instead.
pub fn object_size<S: DeviceStore + ?Sized>(
    store: &S,
    settings: &Settings,
    handle: ObjectHandle,
    record: &ObjectRecord,
) -> Result<u64> {
    if record.compressed_size != settings.size_overflow {
        return Ok(u64::from(record.compressed_size));
    }

    let value = store
        .object_property(handle, ObjectProperty::ObjectSize)
        .map_err(|source| Error::ObjectAccess { handle, source })?;

    match value {
        PropertyValue::U64(size) => Ok(size),
        PropertyValue::Text(text) => Err(Error::ObjectAccess {
            handle,
            source: crate::traits::TransportError::new(format!(
                "unexpected object size value: {text:?}"
            )),
        }),
    }
}

/// Fetch the descriptor of `handle`
///
/// `parent_path_hint` is the path of the containing directory if known; it
/// only feeds `full_path` and `parent_path`.
pub fn describe<S: DeviceStore + ?Sized>(
    store: &S,
    settings: &Settings,
    handle: ObjectHandle,
    parent_path_hint: &str,
) -> Result<Descriptor> {
    if handle == settings.root_handle {
        return Ok(Descriptor::root(settings));
    }

    let record = store
        .object_info(handle)
        .map_err(|source| Error::ObjectAccess { handle, source })?;
    let size = object_size(store, settings, handle, &record)?;

    Ok(Descriptor::from_record(
        handle,
        record,
        size,
        parent_path_hint,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{
        MockDeviceStore, ObjectFormat, SIZE_OVERFLOW, StorageId, TransportError,
    };
    use mockall::predicate::eq;

    fn record(name: &str, format: ObjectFormat, size: u32) -> ObjectRecord {
        ObjectRecord {
            storage: StorageId(1),
            format,
            parent: ObjectHandle(3),
            filename: name.to_string(),
            compressed_size: size,
            modified: None,
        }
    }

    #[test]
    fn test_root_needs_no_store_call() {
        let store = MockDeviceStore::new();
        let settings = Settings::default();

        let root = describe(&store, &settings, ObjectHandle::ROOT, "ignored").unwrap();
        assert!(root.is_dir);
        assert_eq!(root.full_path, "/");
        assert_eq!(root.size, 0);
        assert!(root.is_root(&settings));
    }

    #[test]
    fn test_describe_file() {
        let mut store = MockDeviceStore::new();
        store
            .expect_object_info()
            .with(eq(ObjectHandle(10)))
            .returning(|_| Ok(record("IMG_0001.JPG", ObjectFormat(0x3801), 2048)));
        let settings = Settings::default();

        let desc = describe(&store, &settings, ObjectHandle(10), "/DCIM/Camera/").unwrap();
        assert_eq!(desc.name, "IMG_0001.JPG");
        assert_eq!(desc.extension, "JPG");
        assert_eq!(desc.size, 2048);
        assert!(!desc.is_dir);
        assert_eq!(desc.parent_path, "/DCIM/Camera");
        assert_eq!(desc.full_path, "/DCIM/Camera/IMG_0001.JPG");
        assert_eq!(desc.parent_handle, ObjectHandle(3));
    }

    #[test]
    fn test_describe_directory_has_no_extension() {
        let mut store = MockDeviceStore::new();
        store
            .expect_object_info()
            .returning(|_| Ok(record("backup.d", ObjectFormat::ASSOCIATION, 0)));
        let settings = Settings::default();

        let desc = describe(&store, &settings, ObjectHandle(11), "").unwrap();
        assert!(desc.is_dir);
        assert_eq!(desc.extension, "");
        assert_eq!(desc.parent_path, "");
        assert_eq!(desc.full_path, "/backup.d");
    }

    #[test]
    fn test_size_overflow_uses_precise_query() {
        let mut store = MockDeviceStore::new();
        store
            .expect_object_info()
            .returning(|_| Ok(record("movie.mp4", ObjectFormat::UNDEFINED, SIZE_OVERFLOW)));
        store
            .expect_object_property()
            .with(eq(ObjectHandle(12)), eq(ObjectProperty::ObjectSize))
            .times(1)
            .returning(|_, _| Ok(PropertyValue::U64(6_000_000_000)));
        let settings = Settings::default();

        let desc = describe(&store, &settings, ObjectHandle(12), "/").unwrap();
        assert_eq!(desc.size, 6_000_000_000);
    }

    #[test]
    fn test_size_query_failure_embeds_handle() {
        let mut store = MockDeviceStore::new();
        store
            .expect_object_info()
            .returning(|_| Ok(record("movie.mp4", ObjectFormat::UNDEFINED, SIZE_OVERFLOW)));
        store
            .expect_object_property()
            .returning(|_, _| Err(TransportError::new("stall")));
        let settings = Settings::default();

        let err = describe(&store, &settings, ObjectHandle(12), "/").unwrap_err();
        match err {
            Error::ObjectAccess { handle, .. } => assert_eq!(handle, ObjectHandle(12)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_info_failure_is_object_access() {
        let mut store = MockDeviceStore::new();
        store
            .expect_object_info()
            .returning(|_| Err(TransportError::new("gone")));
        let settings = Settings::default();

        let err = describe(&store, &settings, ObjectHandle(5), "/").unwrap_err();
        assert!(matches!(err, Error::ObjectAccess { .. }));
    }
}
