//! Replacement ragdoll lifecycle.
//!
//! While the host character is dead, a second copy of the replacement model is
//! bound to the dead-body skeleton through its own binding. The copy is created
//! the tick the dead body appears and destroyed the tick it disappears.

use log::{debug, info};

use crate::binding::{BoneNameBinding, SkeletonBinding};
use crate::error::ReplacementError;
use crate::host::DeadBody;
use crate::ids::NodeId;
use crate::scene::{Scene, ShadowCasting};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ragdoll {
    pub root: NodeId,
    pub dead_body: NodeId,
}

#[derive(Debug)]
pub struct RagdollManager {
    binding: Box<dyn SkeletonBinding>,
    ragdoll: Option<Ragdoll>,
}

impl Default for RagdollManager {
    fn default() -> Self {
        Self::new(Box::new(BoneNameBinding::new()))
    }
}

impl RagdollManager {
    pub fn new(binding: Box<dyn SkeletonBinding>) -> Self {
        Self {
            binding,
            ragdoll: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ragdoll.is_some()
    }

    pub fn ragdoll(&self) -> Option<Ragdoll> {
        self.ragdoll
    }

    pub fn binding(&self) -> &dyn SkeletonBinding {
        self.binding.as_ref()
    }

    /// Clone `live_model` into a ragdoll bound to `dead`.
    ///
    /// Every clone renderer is enabled, casts shadows and moves to `visible_layer`;
    /// the host's own dead-body mesh is disabled. Nodes carrying a raycast target
    /// are stripped from the clone. Blood decals are copied onto the matching
    /// ragdoll bone when one exists.
    pub fn create(
        &mut self,
        scene: &mut Scene,
        dead: &DeadBody,
        live_model: NodeId,
        visible_layer: u32,
    ) -> Result<NodeId, ReplacementError> {
        if let Some(existing) = self.ragdoll {
            return Ok(existing.root);
        }
        let root = scene.instantiate(live_model, None)?;
        if let Some(node) = scene.node_mut(root) {
            node.name.push_str("(Ragdoll)");
            node.active = true;
        }
        let targets: Vec<NodeId> = scene
            .descendants(root)
            .into_iter()
            .skip(1)
            .filter(|id| scene.node(*id).is_some_and(|n| n.raycast_target.is_some()))
            .collect();
        for id in targets {
            scene.destroy(id);
        }

        self.binding.assign_model(scene, dead.root, root);

        for id in scene.renderers(root) {
            if let Some(r) = scene.renderer_mut(id) {
                r.enabled = true;
                r.shadow_casting = ShadowCasting::On;
            }
            scene.set_layer(id, visible_layer)?;
        }
        if let Some(r) = dead.renderer.and_then(|id| scene.renderer_mut(id)) {
            r.enabled = false;
        }

        let mut decals = 0;
        for decal in &dead.blood_decals {
            let Some(bone) = scene
                .parent(*decal)
                .and_then(|p| scene.name(p))
                .and_then(|name| self.binding.bone_for_name(name))
            else {
                continue;
            };
            if scene.instantiate(*decal, Some(bone)).is_ok() {
                decals += 1;
            }
        }
        debug!(
            "ragdoll {:?} mapped {decals}/{} blood decals",
            root,
            dead.blood_decals.len()
        );

        self.ragdoll = Some(Ragdoll {
            root,
            dead_body: dead.root,
        });
        info!("created replacement ragdoll {:?}", root);
        Ok(root)
    }

    /// Destroy the ragdoll subtree. Returns false when there was none.
    pub fn destroy(&mut self, scene: &mut Scene) -> bool {
        let Some(ragdoll) = self.ragdoll.take() else {
            return false;
        };
        scene.destroy(ragdoll.root);
        self.binding.clear();
        true
    }

    /// Match the ragdoll's visibility to the dead body's.
    pub fn sync_visibility(&mut self, scene: &mut Scene, visible: bool) {
        if let Some(ragdoll) = self.ragdoll {
            if scene.set_active(ragdoll.root, visible).is_err() {
                // Destroyed from outside; forget it so the next death recreates it.
                self.ragdoll = None;
                self.binding.clear();
            }
        }
    }

    pub fn update(&mut self, scene: &mut Scene) {
        self.binding.update(scene);
    }
}
