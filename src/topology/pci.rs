//! Seeds a [`Topology`] with the PCI devices and bridges found in sysfs.
//!
//! This is a minimal stand-in for a full PCI discovery pass: it records bus ids,
//! class and ids, and bridge secondary buses so devices can be attached by bus id.

use crate::error::ZeResult;
use crate::topology::tree::{BridgeRange, ObjId, ObjType, Object, PciAttributes, Topology};
use crate::ze::api::PciAddress;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const PCI_SYSFS_PATH: &str = "/sys/bus/pci/devices";

const PCI_CLASS_BRIDGE_PCI: u16 = 0x0604;

/// Parses `dddd:bb:dd.f` (domain optional, hex fields).
#[must_use]
pub fn parse_pci_address(s: &str) -> Option<PciAddress> {
    let (rest, function) = s.rsplit_once('.')?;
    let mut parts: Vec<&str> = rest.split(':').collect();
    let device = parts.pop()?;
    let bus = parts.pop()?;
    let domain = parts.pop().unwrap_or("0");
    if !parts.is_empty() {
        return None;
    }

    Some(PciAddress {
        domain: u32::from_str_radix(domain, 16).ok()?,
        bus: u32::from_str_radix(bus, 16).ok()?,
        device: u32::from_str_radix(device, 16).ok()?,
        function: u32::from_str_radix(function, 16).ok()?,
    })
}

fn read_hex(dir: &Path, attr: &str) -> Option<u32> {
    let content = fs::read_to_string(dir.join(attr)).ok()?;
    let content = content.trim();
    let clean = content.strip_prefix("0x").unwrap_or(content);
    u32::from_str_radix(clean, 16).ok()
}

/// Secondary bus of a bridge, from its `pci_bus/dddd:bb` child directory.
fn bridge_range(dir: &Path, address: &PciAddress) -> Option<BridgeRange> {
    let bus = fs::read_dir(dir.join("pci_bus"))
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name();
            let (_, bus) = name.to_str()?.rsplit_once(':')?;
            u32::from_str_radix(bus, 16).ok()
        })
        .min()?;

    Some(BridgeRange {
        domain: address.domain,
        secondary_bus: bus,
        subordinate_bus: bus,
    })
}

struct Entry {
    address: PciAddress,
    real_path: PathBuf,
    parent: Option<PciAddress>,
}

/// Scans `/sys/bus/pci/devices` into `topology`, returning the number of objects added.
///
/// # Errors
/// Returns [`ZeError::Io`](crate::error::ZeError::Io) if the sysfs directory cannot be listed.
pub fn scan_sysfs(topology: &mut Topology) -> ZeResult<usize> {
    scan_sysfs_at(Path::new(PCI_SYSFS_PATH), topology)
}

/// Same as [`scan_sysfs`] with an explicit devices directory.
///
/// # Errors
/// Returns [`ZeError::Io`](crate::error::ZeError::Io) if `devices_dir` cannot be listed.
pub fn scan_sysfs_at(devices_dir: &Path, topology: &mut Topology) -> ZeResult<usize> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(devices_dir)? {
        let dirent = dirent?;
        let Some(address) = dirent.file_name().to_str().and_then(parse_pci_address) else {
            continue;
        };
        let Ok(real_path) = fs::canonicalize(dirent.path()) else {
            continue;
        };

        // The upstream bridge is the nearest ancestor directory named like a PCI address.
        let parent = real_path
            .ancestors()
            .skip(1)
            .filter_map(|p| p.file_name()?.to_str())
            .find_map(parse_pci_address);

        entries.push(Entry {
            address,
            real_path,
            parent,
        });
    }

    // Parents always sit higher in the sysfs hierarchy than their children.
    entries.sort_by_key(|e| (e.real_path.components().count(), e.address));

    let mut inserted: HashMap<PciAddress, ObjId> = HashMap::new();
    for entry in &entries {
        #[allow(clippy::cast_possible_truncation)]
        let attrs = PciAttributes {
            address: entry.address,
            class_id: (read_hex(&entry.real_path, "class").unwrap_or(0) >> 8) as u16,
            vendor_id: read_hex(&entry.real_path, "vendor").unwrap_or(0) as u16,
            device_id: read_hex(&entry.real_path, "device").unwrap_or(0) as u16,
            revision: read_hex(&entry.real_path, "revision").unwrap_or(0) as u8,
            link_speed: 0.0,
        };

        let mut object = if attrs.class_id == PCI_CLASS_BRIDGE_PCI {
            Object::new(ObjType::Bridge)
        } else {
            Object::new(ObjType::PciDevice)
        };
        if let Some(range) = bridge_range(&entry.real_path, &entry.address) {
            object = object.with_bridge(range);
        }

        let parent = entry
            .parent
            .and_then(|p| inserted.get(&p).copied())
            .unwrap_or_else(|| topology.root());
        let id = topology.insert_by_parent(parent, object.with_pci(attrs));
        inserted.insert(entry.address, id);
    }

    tracing::debug!("PCI: inserted {} objects from {}", inserted.len(), devices_dir.display());
    Ok(inserted.len())
}
