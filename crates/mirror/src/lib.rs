//! mtx-mirror: Directory-backed device store
//!
//! This crate implements the [`mtx_core::DeviceStore`] trait over a plain
//! local directory. It stands in for a real device in the CLI and in tests:
//! objects are files and directories, handles are allocated as objects are
//! enumerated or created, and byte transfer happens in offset-addressed
//! chunks just like on the wire.

mod device;
mod handles;

pub use device::{MIRROR_STORAGE, MirrorDevice};
