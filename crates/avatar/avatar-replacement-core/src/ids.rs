//! Identifiers and simple allocators for scene entities.

use serde::{Deserialize, Serialize};

/// Handle to a node in the [`Scene`](crate::scene::Scene) arena.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Handle to a material registered in the scene.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Identity of a replacement controller, used as a back-reference by hit volumes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ControllerId(pub u32);

/// Identity of a host character (owned by the host simulation).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct CharacterId(pub u64);

/// Monotonic allocator for NodeId, MaterialId and ControllerId.
/// Ids are never reused within one scene, so a destroyed node's handle stays dead.
#[derive(Default, Debug, Clone)]
pub struct IdAllocator {
    next_node: u32,
    next_material: u32,
    next_controller: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node = self.next_node.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_material(&mut self) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material = self.next_material.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_controller(&mut self) -> ControllerId {
        let id = ControllerId(self.next_controller);
        self.next_controller = self.next_controller.wrapping_add(1);
        id
    }
}
