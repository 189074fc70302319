//! Host character contract.
//!
//! The host simulation owns the character; the controller only reads it. Adapters
//! either implement [`HostCharacter`] over their own types or fill a
//! [`HostSnapshot`] each frame.

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::ids::{CharacterId, MaterialId, NodeId};

/// The host's physics-driven dead-body representation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadBody {
    /// Root of the dead-body skeleton.
    pub root: NodeId,
    /// The host's own dead-body mesh, hidden while a replacement ragdoll shows.
    pub renderer: Option<NodeId>,
    /// Blood decals parented somewhere in the dead-body bone hierarchy.
    #[serde(default)]
    pub blood_decals: Vec<NodeId>,
}

pub trait HostCharacter {
    fn character_id(&self) -> CharacterId;

    fn username(&self) -> &str;

    /// True when this character is the one the local viewer controls.
    fn is_local_viewer(&self) -> bool;

    /// Root of the live skeleton that drives the replacement.
    fn skeleton_root(&self) -> NodeId;

    /// Material of the default body mesh, used as the remapping reference.
    fn body_material(&self) -> Option<MaterialId>;

    /// World bounds of the default body mesh.
    fn body_bounds(&self) -> Bounds;

    /// The dead body, if the character currently has one.
    fn dead_body(&self) -> Option<DeadBody>;

    /// Full-path hash of the state playing on the gesture animator layer.
    fn gesture_layer_hash(&self) -> i32;

    /// Host flag: the character is performing a gesture.
    fn performing_gesture(&self) -> bool;
}

/// Plain-data host state, refreshed by the adapter every frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub character: CharacterId,
    pub username: String,
    pub local_viewer: bool,
    pub skeleton_root: NodeId,
    pub body_material: Option<MaterialId>,
    pub body_bounds: Bounds,
    pub dead_body: Option<DeadBody>,
    pub gesture_layer_hash: i32,
    pub performing_gesture: bool,
}

impl HostCharacter for HostSnapshot {
    fn character_id(&self) -> CharacterId {
        self.character
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn is_local_viewer(&self) -> bool {
        self.local_viewer
    }

    fn skeleton_root(&self) -> NodeId {
        self.skeleton_root
    }

    fn body_material(&self) -> Option<MaterialId> {
        self.body_material
    }

    fn body_bounds(&self) -> Bounds {
        self.body_bounds
    }

    fn dead_body(&self) -> Option<DeadBody> {
        self.dead_body.clone()
    }

    fn gesture_layer_hash(&self) -> i32 {
        self.gesture_layer_hash
    }

    fn performing_gesture(&self) -> bool {
        self.performing_gesture
    }
}
