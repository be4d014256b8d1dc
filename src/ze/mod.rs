//! Level Zero vendor layer: raw C records, the dynamically loaded loader, and the
//! safe capability trait the discovery pass is written against.

pub mod api;
pub mod ffi;
pub mod loader;

pub use api::{
    DeviceHandle, DeviceMemoryProperties, DeviceProperties, DeviceType, DriverHandle, LevelZero,
    MemoryHandle, MemoryKind, MemoryModuleProperties, MemoryModuleState, PciAddress,
    PciProperties, QueueGroupProperties, SysmanProperties,
};
pub use ffi::ZeResultCode;
pub use loader::ZeLoader;
