//! Systems that drive controllers and mirror the scene arena into entities.

use bevy::prelude::*;
use bevy::utils::HashSet;

use avatar_replacement_core::{ControllerState, NodeId, Scene};

use crate::components::{ReplacementOwner, SceneNodeLink};
use crate::resources::{
    PendingReplacementEvents, ReplacementRoster, ReplacementScene, ReplacementViewState,
};

/// Tear down retired controllers and forward their final events.
pub fn retire_replacements_system(
    mut scene: ResMut<ReplacementScene>,
    mut roster: ResMut<ReplacementRoster>,
    mut view: ResMut<ReplacementViewState>,
    mut pending: ResMut<PendingReplacementEvents>,
) {
    pending.events.clear();
    for mut entry in roster.drain_retired() {
        log::debug!("retiring body replacement for {}", entry.host.username);
        let events = entry.controller.teardown(&mut scene.0, &mut view.0);
        pending.events.extend(events);
    }
}

/// Initialize controllers registered since the last frame.
pub fn initialize_replacements_system(
    mut scene: ResMut<ReplacementScene>,
    mut roster: ResMut<ReplacementRoster>,
    mut view: ResMut<ReplacementViewState>,
) {
    for entry in roster.iter_mut() {
        if entry.controller.state() == ControllerState::Uninitialized {
            entry
                .controller
                .initialize(&entry.host, &mut scene.0, &mut view.0);
        }
    }
}

/// Advance every controller by one tick and stage the events it produced.
pub fn tick_replacements_system(
    mut scene: ResMut<ReplacementScene>,
    mut roster: ResMut<ReplacementRoster>,
    mut pending: ResMut<PendingReplacementEvents>,
) {
    for entry in roster.iter_mut() {
        let report = entry.controller.update(&entry.host, &mut scene.0);
        pending.events.extend(report.events.iter().cloned());
    }
}

fn to_bevy_transform(scene: &Scene, id: NodeId) -> Transform {
    let rotation = scene
        .transform(id)
        .map(|t| Quat::from_array(t.rotation))
        .unwrap_or_default();
    Transform {
        translation: Vec3::from_array(scene.world_position(id)),
        rotation,
        scale: Vec3::from_array(scene.world_scale(id)),
    }
}

fn to_bevy_visibility(scene: &Scene, id: NodeId) -> Visibility {
    if scene.is_active_in_hierarchy(id) {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

/// Mirror controller-owned scene nodes into flat entities with world-space transforms.
/// Entities whose node was destroyed are despawned.
pub fn sync_scene_entities_system(
    mut commands: Commands,
    scene: Res<ReplacementScene>,
    roster: Res<ReplacementRoster>,
    mut links: Query<(Entity, &SceneNodeLink, &mut Transform, &mut Visibility)>,
) {
    let scene = &scene.0;
    let mut linked: HashSet<NodeId> = HashSet::default();
    for (entity, link, mut transform, mut visibility) in links.iter_mut() {
        if !scene.contains(link.0) {
            commands.entity(entity).despawn();
            continue;
        }
        *transform = to_bevy_transform(scene, link.0);
        *visibility = to_bevy_visibility(scene, link.0);
        linked.insert(link.0);
    }

    for (owner, root) in roster.owned_roots() {
        for id in scene.descendants(root) {
            if !linked.insert(id) {
                continue;
            }
            let name = scene.name(id).unwrap_or_default().to_string();
            commands.spawn((
                SceneNodeLink(id),
                ReplacementOwner(owner),
                Name::new(name),
                SpatialBundle {
                    transform: to_bevy_transform(scene, id),
                    visibility: to_bevy_visibility(scene, id),
                    ..default()
                },
            ));
        }
    }
}
