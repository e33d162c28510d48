//! mtx-core: Core library for the mtx device transfer tool
//!
//! This crate provides the engine behind the mtx CLI, including:
//! - Path normalization for device paths
//! - Resolution of paths to object handles on stores that only know handles
//! - Remote and local tree walks with exclusion filtering
//! - Directory creation and file transfer helpers
//! - Configuration management
//!
//! The engine talks to devices only through the [`DeviceStore`] trait, so it
//! is independent of any specific transport.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod exclude;
pub mod local;
pub mod path;
pub mod storage;
pub mod traits;
pub mod transfer;
pub mod walk;

#[cfg(test)]
mod memory;

pub use config::{Config, ConfigManager, Settings};
pub use descriptor::Descriptor;
pub use error::{CreateFailure, Error, Result};
pub use exclude::ExcludedNames;
pub use local::{LocalEntry, LocalSummary, LocalWalkError, make_local_directory, walk_local};
pub use storage::Storage;
pub use traits::{
    DeviceStore, HandleScope, ObjectFormat, ObjectHandle, ObjectProperty, ObjectRecord,
    PropertyValue, StorageId, TransportError, TransportResult,
};
pub use transfer::ObjectTemplate;
pub use walk::{WalkError, WalkOptions};
