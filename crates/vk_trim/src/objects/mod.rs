//! Tracked Vulkan objects
//!
//! The [`ObjectRegistry`] maps every live handle to an entry owning a deep
//! copy of its creation metadata. Owned descriptor types live in [`desc`],
//! per-category payloads in [`info`].

pub mod desc;
mod entry;
mod handle;
// Payload fields are named after the Vulkan state they hold.
#[allow(missing_docs)]
pub mod info;
mod registry;

pub use entry::{ObjectEntry, ObjectMap};
pub use handle::{ObjectHandle, ObjectType};
pub use info::{DeviceChild, MappedRange, MemoryBinding, WindowConnection};
pub use registry::ObjectRegistry;
