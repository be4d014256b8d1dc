use crate::ze::api::PciAddress;
use std::collections::HashMap;
use std::fmt;

// ===============================================================================================
// Object Model
// ===============================================================================================

/// Index of an object inside a [`Topology`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjType {
    Machine,
    Bridge,
    PciDevice,
    OsDevice,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OsDevType {
    Gpu,
    Coproc,
}

/// Which objects of a type a discovery pass should keep.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    KeepAll,
    KeepNone,
    KeepImportant,
    KeepStructure,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PciAttributes {
    pub address: PciAddress,
    pub class_id: u16,
    pub vendor_id: u16,
    pub device_id: u16,
    pub revision: u8,
    /// Link speed in GB/s, zero when unknown.
    pub link_speed: f32,
}

/// Downstream bus range of a PCI bridge.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BridgeRange {
    pub domain: u32,
    pub secondary_bus: u32,
    pub subordinate_bus: u32,
}

impl BridgeRange {
    #[must_use]
    pub const fn contains(&self, address: &PciAddress) -> bool {
        self.domain == address.domain
            && address.bus >= self.secondary_bus
            && address.bus <= self.subordinate_bus
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub obj_type: ObjType,
    pub osdev_type: Option<OsDevType>,
    pub name: Option<String>,
    pub subtype: Option<String>,
    pub infos: Vec<(String, String)>,
    pub pci: Option<PciAttributes>,
    pub bridge: Option<BridgeRange>,
    parent: Option<ObjId>,
    children: Vec<ObjId>,
}

impl Object {
    #[must_use]
    pub const fn new(obj_type: ObjType) -> Self {
        Self {
            obj_type,
            osdev_type: None,
            name: None,
            subtype: None,
            infos: Vec::new(),
            pci: None,
            bridge: None,
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn os_device(osdev_type: OsDevType, name: impl Into<String>) -> Self {
        Self {
            osdev_type: Some(osdev_type),
            name: Some(name.into()),
            ..Self::new(ObjType::OsDevice)
        }
    }

    #[must_use]
    pub fn with_pci(mut self, pci: PciAttributes) -> Self {
        self.pci = Some(pci);
        self
    }

    #[must_use]
    pub fn with_bridge(mut self, bridge: BridgeRange) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn add_info(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.infos.push((name.into(), value.into()));
    }

    /// First value recorded under `name`.
    #[must_use]
    pub fn info(&self, name: &str) -> Option<&str> {
        self.infos
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub const fn parent(&self) -> Option<ObjId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ObjId] {
        &self.children
    }
}

// ===============================================================================================
// Topology
// ===============================================================================================

/// An arena-backed hardware topology rooted at a `Machine` object.
#[derive(Debug, Clone)]
pub struct Topology {
    objects: Vec<Object>,
    filters: HashMap<ObjType, TypeFilter>,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: vec![Object::new(ObjType::Machine)],
            filters: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> ObjId {
        ObjId(0)
    }

    /// # Panics
    /// Panics if `id` does not belong to this topology.
    #[must_use]
    pub fn get(&self, id: ObjId) -> &Object {
        &self.objects[id.0]
    }

    /// # Panics
    /// Panics if `id` does not belong to this topology.
    pub fn get_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objects[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_type_filter(&mut self, obj_type: ObjType, filter: TypeFilter) {
        self.filters.insert(obj_type, filter);
    }

    #[must_use]
    pub fn type_filter(&self, obj_type: ObjType) -> TypeFilter {
        self.filters.get(&obj_type).copied().unwrap_or_default()
    }

    /// Moves `object` into the topology as the last child of `parent`.
    pub fn insert_by_parent(&mut self, parent: ObjId, mut object: Object) -> ObjId {
        let id = ObjId(self.objects.len());
        object.parent = Some(parent);
        object.children.clear();
        self.objects.push(object);
        self.objects[parent.0].children.push(id);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &Object)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjId(i), o))
    }

    /// Finds the object a device at `address` should hang below.
    ///
    /// An exact PCI device or bridge match wins; otherwise the deepest bridge whose
    /// downstream range covers the bus is returned.
    #[must_use]
    pub fn find_pci_parent_by_busid(&self, address: &PciAddress) -> Option<ObjId> {
        if let Some((id, _)) = self
            .iter()
            .find(|(_, o)| o.pci.as_ref().is_some_and(|p| p.address == *address))
        {
            return Some(id);
        }

        self.iter()
            .filter(|(_, o)| o.bridge.as_ref().is_some_and(|r| r.contains(address)))
            .max_by_key(|(id, _)| self.depth(*id))
            .map(|(id, _)| id)
    }

    fn depth(&self, id: ObjId) -> usize {
        let mut depth = 0;
        let mut cur = self.objects[id.0].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.objects[p.0].parent;
        }
        depth
    }

    fn fmt_subtree(&self, f: &mut fmt::Formatter<'_>, id: ObjId, indent: usize) -> fmt::Result {
        let obj = &self.objects[id.0];
        write!(f, "{:indent$}", "", indent = indent * 2)?;
        match obj.obj_type {
            ObjType::Machine => write!(f, "Machine")?,
            ObjType::Bridge | ObjType::PciDevice => {
                let label = if obj.obj_type == ObjType::Bridge {
                    "PCIBridge"
                } else {
                    "PCI"
                };
                write!(f, "{label}")?;
                if let Some(pci) = &obj.pci {
                    write!(f, " {}", pci.address)?;
                    if pci.link_speed > 0.0 {
                        write!(f, " (link={:.2}GB/s)", pci.link_speed)?;
                    }
                }
            }
            ObjType::OsDevice => {
                let kind = match obj.osdev_type {
                    Some(OsDevType::Gpu) => "GPU",
                    Some(OsDevType::Coproc) | None => "CoProc",
                };
                write!(f, "{kind}")?;
                if let Some(subtype) = &obj.subtype {
                    write!(f, "({subtype})")?;
                }
                if let Some(name) = &obj.name {
                    write!(f, " \"{name}\"")?;
                }
            }
        }
        writeln!(f)?;
        for (k, v) in &obj.infos {
            writeln!(f, "{:indent$}  {k} = {v}", "", indent = indent * 2)?;
        }
        for child in &obj.children {
            self.fmt_subtree(f, *child, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_subtree(f, self.root(), 0)
    }
}
