//! Bevy adapter for the avatar replacement core.
//!
//! Controllers live in [`ReplacementRoster`] and edit the shared
//! [`ReplacementScene`] arena. Each `Update` runs retire -> initialize -> tick ->
//! mirror, so a controller registered this frame is initialized and ticked
//! before its nodes are mirrored into entities.

use bevy::prelude::*;

use avatar_replacement_core::ViewStateRegistry;

pub mod components;
pub mod resources;
pub mod systems;

pub use components::{ReplacementOwner, SceneNodeLink};
pub use resources::{
    PendingReplacementEvents, ReplacementRoster, ReplacementScene, ReplacementViewState,
    RosterEntry,
};

pub struct AvatarReplacementPlugin {
    /// Layer on which replacement surfaces are visible to other players.
    pub visible_layer: u32,
}

impl Default for AvatarReplacementPlugin {
    fn default() -> Self {
        Self { visible_layer: 0 }
    }
}

impl Plugin for AvatarReplacementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReplacementScene>()
            .init_resource::<ReplacementRoster>()
            .init_resource::<PendingReplacementEvents>()
            .insert_resource(ReplacementViewState(ViewStateRegistry::new(
                self.visible_layer,
            )))
            .add_systems(
                Update,
                (
                    systems::retire_replacements_system,
                    systems::initialize_replacements_system,
                    systems::tick_replacements_system,
                    systems::sync_scene_entities_system,
                )
                    .chain(),
            );
    }
}
