//! DeviceStore trait definition
//!
//! This trait defines the capability set consumed from a handle-addressed
//! device object store. The engine never talks to a transport directly, which
//! keeps it testable against mocks and in-memory stores.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of a remote object, stable within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    /// Reserved handle of the storage root; it has no backing object
    pub const ROOT: ObjectHandle = ObjectHandle(0xFFFF_FFFF);

    /// Raw handle value
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a storage (logical volume) on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(pub u32);

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Object format code as declared by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectFormat(pub u16);

impl ObjectFormat {
    /// Format of an object whose type the store does not know
    pub const UNDEFINED: ObjectFormat = ObjectFormat(0x3000);
    /// Container (directory) objects
    pub const ASSOCIATION: ObjectFormat = ObjectFormat(0x3001);
}

/// Compact size field value meaning "query the precise size property"
pub const SIZE_OVERFLOW: u32 = 0xFFFF_FFFF;

/// Object info record as exchanged with the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub storage: StorageId,
    pub format: ObjectFormat,
    pub parent: ObjectHandle,
    pub filename: String,
    /// 32-bit size; [`SIZE_OVERFLOW`] when the real size does not fit
    pub compressed_size: u32,
    pub modified: Option<Timestamp>,
}

impl ObjectRecord {
    /// Whether the record declares a container object
    pub fn is_association(&self) -> bool {
        self.format == ObjectFormat::ASSOCIATION
    }

    /// Encode a byte count into the compact size field
    pub fn compact_size(size: u64, overflow: u32) -> u32 {
        u32::try_from(size)
            .ok()
            .filter(|s| *s < overflow)
            .unwrap_or(overflow)
    }
}

/// Object properties the engine queries individually
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectProperty {
    /// The object's file name (text)
    FileName,
    /// The precise 64-bit object size
    ObjectSize,
}

/// Value returned by a property query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    U64(u64),
}

/// Which children an enumeration returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleScope {
    /// Directories and files, one level
    All,
    /// Only objects of the given format
    Format(ObjectFormat),
}

/// Failure reported by the transport collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a single transport call
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Trait for handle-addressed device object stores
///
/// Calls block until the device answers. Implementations are shared by
/// reference, so any session state lives behind interior mutability.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceStore: Send + Sync {
    /// Fetch the info record of an object
    fn object_info(&self, handle: ObjectHandle) -> TransportResult<ObjectRecord>;

    /// Fetch a single property of an object
    fn object_property(
        &self,
        handle: ObjectHandle,
        property: ObjectProperty,
    ) -> TransportResult<PropertyValue>;

    /// Enumerate the direct children of `parent` within `storage`
    fn object_handles(
        &self,
        storage: StorageId,
        scope: HandleScope,
        parent: ObjectHandle,
    ) -> TransportResult<Vec<ObjectHandle>>;

    /// Submit a new object under `parent`; returns the allocated handle
    fn send_object_info(
        &self,
        storage: StorageId,
        parent: ObjectHandle,
        record: &ObjectRecord,
    ) -> TransportResult<ObjectHandle>;

    /// Write one chunk of object data at `offset`
    fn send_object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        data: &[u8],
    ) -> TransportResult<()>;

    /// Read up to `max_len` bytes at `offset`; an empty chunk marks the end
    fn object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        max_len: u32,
    ) -> TransportResult<Vec<u8>>;

    /// Delete an object (directories with their contents)
    fn delete_object(&self, handle: ObjectHandle) -> TransportResult<()>;
}
