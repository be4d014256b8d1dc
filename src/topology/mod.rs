//! Host topology the Level Zero devices are attached to.

pub mod pci;
pub mod tree;

pub use pci::{scan_sysfs, scan_sysfs_at};
pub use tree::{ObjId, ObjType, Object, OsDevType, Topology, TypeFilter};
