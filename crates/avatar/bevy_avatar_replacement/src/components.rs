//! Components tying mirrored entities back to scene nodes and their owners.

use bevy::prelude::*;
use avatar_replacement_core::{CharacterId, NodeId};

/// Mirrors one node of the replacement scene arena.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneNodeLink(pub NodeId);

/// Tags mirrored entities with the character whose controller owns the node.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementOwner(pub CharacterId);
