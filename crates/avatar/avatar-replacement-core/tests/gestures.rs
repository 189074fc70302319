use avatar_replacement_core::{
    GestureHashes, GestureId, HostSnapshot, Integrations, ReplacementConfig, ReplacementController,
    ReplacementEvent, Scene, ViewStateRegistry,
};
use avatar_test_fixtures::{
    configs, host_snapshot, spawn_host_rig, FixedGestureResolver, FixtureModelSource, HookCall,
    RecordingHooks,
};

struct Rig {
    scene: Scene,
    host: HostSnapshot,
    ctl: ReplacementController,
    hooks: RecordingHooks,
}

fn rig_with(config: ReplacementConfig, integrations: Integrations) -> Rig {
    let mut scene = Scene::new();
    let host_rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &host_rig, 8, "nico", false);
    let mut view = ViewStateRegistry::default();
    let hooks = RecordingHooks::default();
    let mut ctl = ReplacementController::new(Box::new(FixtureModelSource::replacement()), config)
        .with_hooks(Box::new(hooks.clone()))
        .with_integrations(integrations);
    ctl.initialize(&host, &mut scene, &mut view);
    // settle one idle tick
    ctl.update(&host, &mut scene);
    Rig {
        scene,
        host,
        ctl,
        hooks,
    }
}

fn rig() -> Rig {
    rig_with(ReplacementConfig::default(), Integrations::none())
}

/// Tick once with the given gesture flag and layer hash; returns the gesture events fired.
fn tick(rig: &mut Rig, performing: bool, hash: i32) -> Vec<ReplacementEvent> {
    rig.host.performing_gesture = performing;
    rig.host.gesture_layer_hash = hash;
    rig.ctl
        .update(&rig.host, &mut rig.scene)
        .events
        .iter()
        .filter(|e| {
            matches!(
                e,
                ReplacementEvent::GestureStarted { .. } | ReplacementEvent::GestureEnded { .. }
            )
        })
        .cloned()
        .collect()
}

#[test]
fn sustained_gesture_starts_once_after_settling() {
    let mut rig = rig();
    let primary = GestureHashes::default().primary;
    let mut fired_at = Vec::new();
    for frame in 0..25 {
        if !tick(&mut rig, true, primary).is_empty() {
            fired_at.push(frame);
        }
    }
    assert_eq!(fired_at.len(), 1);
    assert!(fired_at[0] >= 20, "fired too early at frame {}", fired_at[0]);
    assert_eq!(rig.hooks.gesture_starts(), vec![GestureId::PRIMARY]);
    assert_eq!(rig.ctl.gesture(), GestureId::PRIMARY);
}

#[test]
fn short_gesture_ends_without_starting() {
    let mut rig = rig();
    let secondary = GestureHashes::default().secondary;
    for _ in 0..5 {
        tick(&mut rig, true, secondary);
    }
    assert!(rig.ctl.is_gesture_settling());
    let events = tick(&mut rig, false, 0);
    assert_eq!(
        events,
        vec![ReplacementEvent::GestureEnded {
            character: rig.host.character
        }]
    );
    for _ in 0..30 {
        assert!(tick(&mut rig, false, 0).is_empty());
    }
    assert!(rig.hooks.gesture_starts().is_empty());
    assert_eq!(rig.hooks.calls(), vec![HookCall::GestureEnd]);
    assert!(!rig.ctl.is_gesture_settling());
}

#[test]
fn gesture_end_fires_on_return_to_idle() {
    let mut rig = rig_with(configs::load("fast_gestures").unwrap(), Integrations::none());
    for _ in 0..10 {
        tick(&mut rig, true, 555);
    }
    let events = tick(&mut rig, false, 555);
    assert_eq!(
        events,
        vec![ReplacementEvent::GestureEnded {
            character: rig.host.character
        }]
    );
    assert_eq!(
        rig.hooks.calls(),
        vec![HookCall::GestureStart(GestureId::OTHER), HookCall::GestureEnd]
    );
}

#[test]
fn switching_gestures_starts_the_new_one_without_ending() {
    let mut rig = rig_with(configs::load("fast_gestures").unwrap(), Integrations::none());
    let hashes = GestureHashes::default();
    for _ in 0..10 {
        tick(&mut rig, true, hashes.primary);
    }
    let events = tick(&mut rig, true, hashes.secondary);
    assert_eq!(
        events,
        vec![ReplacementEvent::GestureStarted {
            character: rig.host.character,
            gesture: GestureId::SECONDARY
        }]
    );
    assert_eq!(rig.hooks.count(&HookCall::GestureEnd), 0);
}

#[test]
fn resolver_overrides_hash_classification() {
    let integrations =
        Integrations::none().with_gesture_resolver(Box::new(FixedGestureResolver(GestureId(9))));
    let mut rig = rig_with(configs::load("fast_gestures").unwrap(), integrations);
    for _ in 0..10 {
        tick(&mut rig, true, GestureHashes::default().primary);
    }
    assert_eq!(rig.hooks.gesture_starts(), vec![GestureId(9)]);
}

#[test]
fn custom_hashes_from_config() {
    let config = ReplacementConfig::from_json(
        r#"{ "gesture_settle_frames": 2, "gesture_hashes": { "primary": 11, "secondary": 22 } }"#,
    )
    .unwrap();
    let mut rig = rig_with(config, Integrations::none());
    for _ in 0..5 {
        tick(&mut rig, true, 22);
    }
    assert_eq!(rig.hooks.gesture_starts(), vec![GestureId::SECONDARY]);
}
