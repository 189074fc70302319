//! In-memory scene arena.
//!
//! The controller never talks to an engine directly. It manipulates this arena
//! (nodes, transforms, renderers, materials, colliders) and adapters mirror the
//! arena into whatever engine hosts it. Nodes are addressed by [`NodeId`];
//! destroyed ids are never reused, so stale handles simply stop resolving.

pub mod prefab;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::error::ReplacementError;
use crate::ids::{CharacterId, ControllerId, IdAllocator, MaterialId, NodeId};
use crate::material::Material;

pub use prefab::{PrefabDocument, PrefabNode, PrefabRenderer};

/// Local transform. Rotation is a quaternion (x, y, z, w).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowCasting {
    #[default]
    Off,
    On,
    ShadowsOnly,
}

/// Skinning data attached to a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SkinnedMesh {
    /// Bounds in the renderer node's local space.
    pub local_bounds: Bounds,
    pub update_when_offscreen: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Renderer {
    /// Shared material slots.
    pub materials: Vec<MaterialId>,
    pub enabled: bool,
    pub shadow_casting: ShadowCasting,
    pub skinned: Option<SkinnedMesh>,
}

impl Renderer {
    pub fn new(materials: Vec<MaterialId>) -> Self {
        Self {
            materials,
            enabled: true,
            shadow_casting: ShadowCasting::Off,
            skinned: None,
        }
    }

    pub fn skinned(materials: Vec<MaterialId>, local_bounds: Bounds) -> Self {
        Self {
            skinned: Some(SkinnedMesh {
                local_bounds,
                update_when_offscreen: false,
            }),
            ..Self::new(materials)
        }
    }
}

/// Box-shaped collision/interaction volume in the owning node's local space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub center: [f32; 3],
    pub size: [f32; 3],
    pub is_trigger: bool,
}

/// Back-references carried by a name-tag hit volume for raycast resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaycastTarget {
    pub controller: ControllerId,
    pub character: CharacterId,
    pub model: NodeId,
}

/// Settings authored on a replacement model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub use_no_post_processing: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub active: bool,
    pub layer: u32,
    pub renderer: Option<Renderer>,
    pub collider: Option<BoxCollider>,
    pub raycast_target: Option<RaycastTarget>,
    pub settings: Option<ModelSettings>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            transform: Transform::default(),
            active: true,
            layer: 0,
            renderer: None,
            collider: None,
            raycast_target: None,
            settings: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    materials: HashMap<MaterialId, Material>,
    ids: IdAllocator,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty node. A parent that does not exist is ignored.
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = self.ids.alloc_node();
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        self.nodes.insert(id, Node::new(name.into(), parent));
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        id
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    fn expect_node_mut(&mut self, id: NodeId) -> Result<&mut Node, ReplacementError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ReplacementError::NodeNotFound { node: id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Re-parent `child`. The new parent must not be a descendant of `child`.
    pub fn set_parent(
        &mut self,
        child: NodeId,
        parent: Option<NodeId>,
    ) -> Result<(), ReplacementError> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(ReplacementError::NodeNotFound { node: p });
            }
        }
        let old = self.expect_node_mut(child)?.parent.take();
        if let Some(old) = old.and_then(|o| self.nodes.get_mut(&o)) {
            old.children.retain(|c| *c != child);
        }
        self.expect_node_mut(child)?.parent = parent;
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(child);
        }
        Ok(())
    }

    /// Nodes without a parent, in id order.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| *id)
            .collect();
        roots.sort();
        roots
    }

    /// Pre-order listing of `root` and everything below it. Empty if `root` is gone.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// First node named `name` in the subtree of `root` (pre-order).
    pub fn find_descendant(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.name(*id) == Some(name))
    }

    /// Remove `root` and its whole subtree. Returns false if it was already gone.
    pub fn destroy(&mut self, root: NodeId) -> bool {
        if !self.contains(root) {
            return false;
        }
        if let Some(parent) = self.parent(root).and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != root);
        }
        for id in self.descendants(root) {
            self.nodes.remove(&id);
        }
        true
    }

    /// Deep-clone the subtree at `source` under `parent`. Renderer material slots are
    /// shared with the source, not copied.
    pub fn instantiate(
        &mut self,
        source: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ReplacementError> {
        if !self.contains(source) {
            return Err(ReplacementError::NodeNotFound { node: source });
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(ReplacementError::NodeNotFound { node: p });
            }
        }
        Ok(self.clone_subtree(source, parent))
    }

    fn clone_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> NodeId {
        let mut copy = self.nodes[&source].clone();
        let children = std::mem::take(&mut copy.children);
        let id = self.ids.alloc_node();
        copy.parent = parent;
        self.nodes.insert(id, copy);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        for child in children {
            self.clone_subtree(child, Some(id));
        }
        id
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) -> Result<(), ReplacementError> {
        self.expect_node_mut(id)?.active = active;
        Ok(())
    }

    /// True when the node and all of its ancestors are active.
    pub fn is_active_in_hierarchy(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        let mut seen = false;
        while let Some(node) = cur.and_then(|c| self.nodes.get(&c)) {
            if !node.active {
                return false;
            }
            seen = true;
            cur = node.parent;
        }
        seen
    }

    pub fn set_layer(&mut self, id: NodeId, layer: u32) -> Result<(), ReplacementError> {
        self.expect_node_mut(id)?.layer = layer;
        Ok(())
    }

    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(&id).map(|n| &n.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(&id).map(|n| &mut n.transform)
    }

    /// Accumulated scale from the root down to `id`.
    pub fn world_scale(&self, id: NodeId) -> [f32; 3] {
        let mut scale = [1.0; 3];
        let mut cur = Some(id);
        while let Some(node) = cur.and_then(|c| self.nodes.get(&c)) {
            for (s, n) in scale.iter_mut().zip(node.transform.scale) {
                *s *= n;
            }
            cur = node.parent;
        }
        scale
    }

    /// World position of the node origin. Ancestor rotations are not applied.
    pub fn world_position(&self, id: NodeId) -> [f32; 3] {
        let Some(node) = self.nodes.get(&id) else {
            return [0.0; 3];
        };
        let mut pos = node.transform.translation;
        let mut cur = node.parent;
        while let Some(ancestor) = cur.and_then(|c| self.nodes.get(&c)) {
            for i in 0..3 {
                pos[i] = pos[i] * ancestor.transform.scale[i] + ancestor.transform.translation[i];
            }
            cur = ancestor.parent;
        }
        pos
    }

    pub fn renderer(&self, id: NodeId) -> Option<&Renderer> {
        self.nodes.get(&id).and_then(|n| n.renderer.as_ref())
    }

    pub fn renderer_mut(&mut self, id: NodeId) -> Option<&mut Renderer> {
        self.nodes.get_mut(&id).and_then(|n| n.renderer.as_mut())
    }

    pub fn set_renderer(&mut self, id: NodeId, renderer: Renderer) -> Result<(), ReplacementError> {
        self.expect_node_mut(id)?.renderer = Some(renderer);
        Ok(())
    }

    /// Every node under `root` (inclusive) that carries a renderer.
    pub fn renderers(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.renderer(*id).is_some())
            .collect()
    }

    /// Every node under `root` (inclusive) that carries a skinned renderer.
    pub fn skinned_renderers(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.renderer(*id).is_some_and(|r| r.skinned.is_some()))
            .collect()
    }

    /// World-space bounds of one skinned renderer.
    pub fn renderer_bounds(&self, id: NodeId) -> Option<Bounds> {
        let local = self.renderer(id)?.skinned?.local_bounds;
        let pos = self.world_position(id);
        let scale = self.world_scale(id);
        let mut center = [0.0; 3];
        let mut extents = [0.0; 3];
        for i in 0..3 {
            center[i] = pos[i] + local.center[i] * scale[i];
            extents[i] = local.extents[i] * scale[i].abs();
        }
        Some(Bounds::new(center, extents))
    }

    /// Union of the world bounds of all skinned renderers under `root`.
    pub fn skinned_bounds(&self, root: NodeId) -> Option<Bounds> {
        Bounds::union_all(
            self.skinned_renderers(root)
                .into_iter()
                .filter_map(|id| self.renderer_bounds(id)),
        )
    }

    /// Express world-space bounds in the local space of `id`.
    pub fn world_to_local_bounds(&self, id: NodeId, world: Bounds) -> Bounds {
        let pos = self.world_position(id);
        let scale = self.world_scale(id);
        let mut center = [0.0; 3];
        let mut extents = [0.0; 3];
        for i in 0..3 {
            let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
            center[i] = (world.center[i] - pos[i]) / s;
            extents[i] = world.extents[i] / s.abs();
        }
        Bounds::new(center, extents)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = self.ids.alloc_material();
        self.materials.insert(id, material);
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    /// Register an independent copy of an existing material.
    pub fn duplicate_material(&mut self, id: MaterialId) -> Result<MaterialId, ReplacementError> {
        let copy = self
            .materials
            .get(&id)
            .cloned()
            .ok_or(ReplacementError::MaterialNotFound { material: id })?;
        Ok(self.add_material(copy))
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn alloc_controller_id(&mut self) -> ControllerId {
        self.ids.alloc_controller()
    }

    pub fn set_collider(&mut self, id: NodeId, collider: BoxCollider) -> Result<(), ReplacementError> {
        self.expect_node_mut(id)?.collider = Some(collider);
        Ok(())
    }

    pub fn collider(&self, id: NodeId) -> Option<&BoxCollider> {
        self.nodes.get(&id).and_then(|n| n.collider.as_ref())
    }

    pub fn set_raycast_target(
        &mut self,
        id: NodeId,
        target: RaycastTarget,
    ) -> Result<(), ReplacementError> {
        self.expect_node_mut(id)?.raycast_target = Some(target);
        Ok(())
    }

    /// Resolve what a hit on `hit` refers to, walking up the hierarchy.
    pub fn resolve_raycast_target(&self, hit: NodeId) -> Option<RaycastTarget> {
        let mut cur = Some(hit);
        while let Some(node) = cur.and_then(|c| self.nodes.get(&c)) {
            if let Some(target) = node.raycast_target {
                return Some(target);
            }
            cur = node.parent;
        }
        None
    }

    /// All nodes carrying a raycast target.
    pub fn raycast_targets(&self) -> Vec<(NodeId, RaycastTarget)> {
        let mut out: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|(id, n)| n.raycast_target.map(|t| (*id, t)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Settings from the first node under `root` that carries them.
    pub fn model_settings(&self, root: NodeId) -> Option<ModelSettings> {
        self.descendants(root)
            .into_iter()
            .find_map(|id| self.nodes.get(&id).and_then(|n| n.settings))
    }
}
