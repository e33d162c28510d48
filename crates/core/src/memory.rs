//! In-memory device store used by the unit tests
//!
//! Objects live in a flat table keyed by handle; children are enumerated in
//! insertion order, mirroring how devices report them.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::traits::{
    DeviceStore, HandleScope, ObjectFormat, ObjectHandle, ObjectProperty, ObjectRecord,
    PropertyValue, SIZE_OVERFLOW, StorageId, TransportError, TransportResult,
};

pub const STORAGE: StorageId = StorageId(0x0001_0001);

#[derive(Debug, Clone)]
struct Object {
    record: ObjectRecord,
    data: Vec<u8>,
    /// Size reported through the precise size property
    precise_size: u64,
}

#[derive(Debug, Default)]
struct State {
    next: u32,
    objects: BTreeMap<ObjectHandle, Object>,
    order: Vec<ObjectHandle>,
    deleted: Vec<ObjectHandle>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, parent: ObjectHandle, record: ObjectRecord, data: Vec<u8>) -> ObjectHandle {
        let mut state = self.state.lock();
        state.next += 1;
        let handle = ObjectHandle(state.next);
        let precise_size = data.len() as u64;
        let record = ObjectRecord { parent, ..record };
        state.objects.insert(
            handle,
            Object {
                record,
                data,
                precise_size,
            },
        );
        state.order.push(handle);
        handle
    }

    pub fn add_dir(&self, parent: ObjectHandle, name: &str) -> ObjectHandle {
        self.insert(parent, record(name, ObjectFormat::ASSOCIATION, 0), Vec::new())
    }

    pub fn add_file(&self, parent: ObjectHandle, name: &str, data: &[u8]) -> ObjectHandle {
        let size = ObjectRecord::compact_size(data.len() as u64, SIZE_OVERFLOW);
        self.insert(
            parent,
            record(name, ObjectFormat::UNDEFINED, size),
            data.to_vec(),
        )
    }

    /// A file whose compact size overflowed and must be queried precisely
    pub fn add_large_file(&self, parent: ObjectHandle, name: &str, size: u64) -> ObjectHandle {
        let handle = self.insert(
            parent,
            record(name, ObjectFormat::UNDEFINED, SIZE_OVERFLOW),
            Vec::new(),
        );
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.precise_size = size;
        }
        handle
    }

    pub fn data(&self, handle: ObjectHandle) -> Option<Vec<u8>> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|object| object.data.clone())
    }

    pub fn deleted(&self) -> Vec<ObjectHandle> {
        self.state.lock().deleted.clone()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }
}

fn record(name: &str, format: ObjectFormat, compressed_size: u32) -> ObjectRecord {
    ObjectRecord {
        storage: STORAGE,
        format,
        parent: ObjectHandle::ROOT,
        filename: name.to_string(),
        compressed_size,
        modified: None,
    }
}

fn missing(handle: ObjectHandle) -> TransportError {
    TransportError::new(format!("invalid object handle {handle}"))
}

impl DeviceStore for MemoryStore {
    fn object_info(&self, handle: ObjectHandle) -> TransportResult<ObjectRecord> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|object| object.record.clone())
            .ok_or_else(|| missing(handle))
    }

    fn object_property(
        &self,
        handle: ObjectHandle,
        property: ObjectProperty,
    ) -> TransportResult<PropertyValue> {
        let state = self.state.lock();
        let object = state.objects.get(&handle).ok_or_else(|| missing(handle))?;
        Ok(match property {
            ObjectProperty::FileName => PropertyValue::Text(object.record.filename.clone()),
            ObjectProperty::ObjectSize => PropertyValue::U64(object.precise_size),
        })
    }

    fn object_handles(
        &self,
        storage: StorageId,
        scope: HandleScope,
        parent: ObjectHandle,
    ) -> TransportResult<Vec<ObjectHandle>> {
        if storage != STORAGE {
            return Err(TransportError::new("invalid storage id"));
        }
        let state = self.state.lock();
        if parent != ObjectHandle::ROOT && !state.objects.contains_key(&parent) {
            return Err(missing(parent));
        }
        Ok(state
            .order
            .iter()
            .filter(|handle| {
                state.objects.get(*handle).is_some_and(|object| {
                    object.record.parent == parent
                        && match scope {
                            HandleScope::All => true,
                            HandleScope::Format(format) => object.record.format == format,
                        }
                })
            })
            .copied()
            .collect())
    }

    fn send_object_info(
        &self,
        storage: StorageId,
        parent: ObjectHandle,
        record: &ObjectRecord,
    ) -> TransportResult<ObjectHandle> {
        if storage != STORAGE {
            return Err(TransportError::new("invalid storage id"));
        }
        Ok(self.insert(parent, record.clone(), Vec::new()))
    }

    fn send_object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        data: &[u8],
    ) -> TransportResult<()> {
        let mut state = self.state.lock();
        let object = state
            .objects
            .get_mut(&handle)
            .ok_or_else(|| missing(handle))?;
        let offset = offset as usize;
        if object.data.len() < offset + data.len() {
            object.data.resize(offset + data.len(), 0);
        }
        object.data[offset..offset + data.len()].copy_from_slice(data);
        object.precise_size = object.data.len() as u64;
        Ok(())
    }

    fn object_chunk(
        &self,
        handle: ObjectHandle,
        offset: u64,
        max_len: u32,
    ) -> TransportResult<Vec<u8>> {
        let state = self.state.lock();
        let object = state.objects.get(&handle).ok_or_else(|| missing(handle))?;
        let start = (offset as usize).min(object.data.len());
        let end = (start + max_len as usize).min(object.data.len());
        Ok(object.data[start..end].to_vec())
    }

    fn delete_object(&self, handle: ObjectHandle) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.objects.remove(&handle).is_none() {
            return Err(missing(handle));
        }
        state.order.retain(|h| *h != handle);
        state.deleted.push(handle);
        Ok(())
    }
}
