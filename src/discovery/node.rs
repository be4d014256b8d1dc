use crate::ze::api::DeviceHandle;

/// Index of a node inside a [`DeviceArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A device or subdevice being described, before it is moved into the host topology.
#[derive(Debug, Clone, Default)]
pub struct DeviceNode {
    pub name: String,
    pub subtype: Option<String>,
    pub infos: Vec<(String, String)>,
    children: Vec<NodeId>,
}

impl DeviceNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_info(&mut self, name: impl Into<String>, value: impl ToString) {
        self.infos.push((name.into(), value.to_string()));
    }

    #[must_use]
    pub fn info(&self, name: &str) -> Option<&str> {
        self.infos
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A subdevice handle paired with the node describing it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Subdevice {
    pub handle: DeviceHandle,
    pub node: NodeId,
}

#[derive(Debug, Default)]
pub struct DeviceArena {
    nodes: Vec<DeviceNode>,
}

impl DeviceArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DeviceNode::new(name));
        id
    }

    /// # Panics
    /// Panics if `id` was not allocated by this arena.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &DeviceNode {
        &self.nodes[id.0]
    }

    /// # Panics
    /// Panics if `id` was not allocated by this arena.
    pub fn get_mut(&mut self, id: NodeId) -> &mut DeviceNode {
        &mut self.nodes[id.0]
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Moves a node out, leaving an empty placeholder behind.
    pub fn take(&mut self, id: NodeId) -> DeviceNode {
        std::mem::take(&mut self.nodes[id.0])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
