//! Moves a described device subtree into the host topology below its PCI location.

use crate::discovery::node::{DeviceArena, DeviceNode, NodeId};
use crate::topology::tree::{ObjId, ObjType, Object, OsDevType, Topology, TypeFilter};
use crate::ze::api::{DeviceHandle, LevelZero, PciAddress};
use tracing::debug;

/// What discovery needs from the topology it extends.
pub trait HostTopology {
    fn os_device_filter(&self) -> TypeFilter;

    fn root(&self) -> ObjId;

    /// Object a device at `address` should be attached to, if the topology knows it.
    fn find_pci_parent_by_busid(&self, address: &PciAddress) -> Option<ObjId>;

    /// Records the link speed (GB/s) of a PCI device object; other objects are left alone.
    fn set_pci_link_speed(&mut self, id: ObjId, gbps: f32) -> bool;

    fn insert_os_device(&mut self, parent: ObjId, node: DeviceNode) -> ObjId;
}

impl HostTopology for Topology {
    fn os_device_filter(&self) -> TypeFilter {
        self.type_filter(ObjType::OsDevice)
    }

    fn root(&self) -> ObjId {
        Self::root(self)
    }

    fn find_pci_parent_by_busid(&self, address: &PciAddress) -> Option<ObjId> {
        Self::find_pci_parent_by_busid(self, address)
    }

    fn set_pci_link_speed(&mut self, id: ObjId, gbps: f32) -> bool {
        let obj = self.get_mut(id);
        if obj.obj_type != ObjType::PciDevice {
            return false;
        }
        match &mut obj.pci {
            Some(pci) => {
                pci.link_speed = gbps;
                true
            }
            None => false,
        }
    }

    fn insert_os_device(&mut self, parent: ObjId, node: DeviceNode) -> ObjId {
        let mut object = Object::os_device(OsDevType::Coproc, node.name);
        object.subtype = node.subtype;
        object.infos = node.infos;
        self.insert_by_parent(parent, object)
    }
}

/// A device inserted into the host topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDevice {
    pub object: ObjId,
    pub subdevices: Vec<ObjId>,
}

/// Inserts the subtree rooted at `root` below the device's PCI object, or the topology root.
pub fn attach_device<Z: LevelZero + ?Sized, T: HostTopology + ?Sized>(
    api: &Z,
    topology: &mut T,
    device: DeviceHandle,
    mut arena: DeviceArena,
    root: NodeId,
) -> AttachedDevice {
    let parent = match api.pci_properties(device) {
        Ok(pci) => {
            let parent = topology.find_pci_parent_by_busid(&pci.address);
            if let Some(id) = parent
                && pci.max_bandwidth > 0
            {
                #[allow(clippy::cast_precision_loss)]
                let gbps = pci.max_bandwidth as f32 / 1e9;
                topology.set_pci_link_speed(id, gbps);
            }
            if parent.is_none() {
                debug!("no PCI object at {} for {}", pci.address, arena.get(root).name);
            }
            parent
        }
        Err(err) => {
            debug!("{}: {err}", arena.get(root).name);
            None
        }
    };
    let parent = parent.unwrap_or_else(|| topology.root());

    let children = arena.get(root).children().to_vec();
    let object = topology.insert_os_device(parent, arena.take(root));
    let subdevices = children
        .into_iter()
        .map(|child| topology.insert_os_device(object, arena.take(child)))
        .collect();

    AttachedDevice { object, subdevices }
}
