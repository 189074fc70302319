use avatar_replacement_core::{
    ActiveAvatar, CharacterId, ControllerState, Integrations, ReplacementConfig,
    ReplacementController, ReplacementError, ReplacementEvent, Scene, ShaderFamily,
    ViewStateRegistry,
};
use avatar_test_fixtures::{
    configs, host_snapshot, spawn_host_rig, CosmeticCall, FixtureModelSource, HookCall,
    RecordingCosmetics, RecordingHooks,
};

fn approx3(a: [f32; 3], b: [f32; 3]) {
    for i in 0..3 {
        assert!((a[i] - b[i]).abs() <= 1e-4, "left={a:?} right={b:?}");
    }
}

#[test]
fn initialize_builds_scaled_named_model_with_hit_volume() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 7, "alice", false);
    let mut view = ViewStateRegistry::new(4);
    let config = configs::load("default").unwrap();

    let mut ctl = ReplacementController::new(Box::new(FixtureModelSource::replacement()), config);
    assert_eq!(
        ctl.initialize(&host, &mut scene, &mut view),
        ControllerState::Active
    );

    let model = ctl.model().unwrap();
    assert_eq!(scene.name(model), Some("ReplacementModel(alice)"));
    assert!(scene.is_active_in_hierarchy(model));
    // host body is 2.0 tall, replacement 1.0
    approx3(scene.transform(model).unwrap().scale, [2.0, 2.0, 2.0]);
    // remote characters get no view model
    assert!(ctl.view_model().is_none());

    let volume = ctl.hit_volume().unwrap();
    let node = scene.node(volume).unwrap();
    assert_eq!(node.name, "NameTagCollider");
    assert_eq!(node.layer, 23);
    assert_eq!(node.parent, Some(model));
    let collider = node.collider.unwrap();
    assert!(collider.is_trigger);
    approx3(collider.center, [0.0, 0.5, 0.0]);
    approx3(collider.size, [0.6, 1.0, 0.4]);

    let target = scene.resolve_raycast_target(volume).unwrap();
    assert_eq!(target.model, model);
    assert_eq!(Some(target.controller), ctl.id());

    let reg = view.get(host.character).unwrap();
    assert_eq!(reg.model, model);
    for r in scene.renderers(model) {
        assert!(scene.renderer(r).unwrap().enabled);
    }
}

#[test]
fn local_viewer_gets_a_bound_view_model() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 1, "me", true);
    let mut view = ViewStateRegistry::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);
    let view_model = ctl.view_model().unwrap();
    assert_eq!(scene.name(view_model), Some("ViewArms(me)"));
    assert_eq!(view.get(host.character).unwrap().view_model, Some(view_model));
    // view-model materials are tracked separately from the body's
    assert_eq!(ctl.view_materials().len(), 1);
    assert_eq!(ctl.body_materials().len(), 3);
}

#[test]
fn view_model_follows_host_skeleton() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 2, "vee", true);
    let mut view = ViewStateRegistry::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);
    let view_model = ctl.view_model().unwrap();
    assert!(scene.is_active_in_hierarchy(view_model));

    let host_arm = scene.find_descendant(rig.skeleton_root, "upper_arm.L").unwrap();
    let raised = [0.0, 0.0, 0.3826834, 0.9238795];
    scene.transform_mut(host_arm).unwrap().rotation = raised;
    ctl.update(&host, &mut scene);

    let arm = scene.find_descendant(view_model, "upper_arm.L").unwrap();
    assert_eq!(scene.transform(arm).unwrap().rotation, raised);
}

#[test]
fn first_tick_binds_model_to_host_skeleton() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 3, "bob", false);
    let mut view = ViewStateRegistry::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);
    let report = ctl.update(&host, &mut scene);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, ReplacementEvent::Initialized { .. })));
    assert_eq!(report.active, ActiveAvatar::Live);
    let local = report.hit_volume.unwrap();
    approx3(local.extents, [0.3, 0.5, 0.2]);

    let model = ctl.model().unwrap();
    approx3(scene.transform(model).unwrap().translation, [3.0, 0.0, -2.0]);
    let host_bone = scene.find_descendant(rig.skeleton_root, "spine.001").unwrap();
    let bone = scene.find_descendant(model, "spine.001").unwrap();
    assert_eq!(
        scene.transform(bone).unwrap().rotation,
        scene.transform(host_bone).unwrap().rotation
    );
}

#[test]
fn missing_model_leaves_controller_degraded() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 9, "carol", false);
    let mut view = ViewStateRegistry::default();
    let hooks = RecordingHooks::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::missing()),
        ReplacementConfig::default(),
    )
    .with_hooks(Box::new(hooks.clone()));
    let nodes_before = scene.len();
    assert_eq!(
        ctl.initialize(&host, &mut scene, &mut view),
        ControllerState::Degraded
    );
    assert!(ctl.model().is_none());
    assert!(ctl.hit_volume().is_none());
    assert!(view.is_empty());
    assert_eq!(scene.len(), nodes_before);

    let mut gesturing = host.clone();
    gesturing.performing_gesture = true;
    for _ in 0..30 {
        let report = ctl.update(&gesturing, &mut scene);
        assert!(report.hit_volume.is_none());
    }
    assert!(hooks.calls().is_empty());
}

#[test]
fn degraded_event_carries_reason() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 9, "carol", false);
    let mut view = ViewStateRegistry::default();
    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::missing()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);
    let report = ctl.update(&host, &mut scene);
    assert_eq!(
        report.events,
        vec![ReplacementEvent::Degraded {
            character: host.character,
            reason: ReplacementError::MissingModel.to_string(),
        }]
    );
}

#[test]
fn script_attach_failure_does_not_abort_initialize() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 2, "dave", false);
    let mut view = ViewStateRegistry::default();
    let source = FixtureModelSource::new("replacement").failing_scripts("missing behaviour");

    let mut ctl = ReplacementController::new(Box::new(source), ReplacementConfig::default());
    assert_eq!(
        ctl.initialize(&host, &mut scene, &mut view),
        ControllerState::Active
    );
    assert!(ctl.model().is_some());
}

#[test]
fn second_initialize_is_ignored() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 2, "erin", false);
    let mut view = ViewStateRegistry::default();
    let source = FixtureModelSource::new("replacement");
    let loads = source.clone();

    let mut ctl = ReplacementController::new(Box::new(source), ReplacementConfig::default());
    ctl.initialize(&host, &mut scene, &mut view);
    let model = ctl.model();
    assert_eq!(
        ctl.initialize(&host, &mut scene, &mut view),
        ControllerState::Active
    );
    assert_eq!(ctl.model(), model);
    assert_eq!(loads.load_count(), 1);
}

#[test]
fn invalid_config_is_fatal() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 2, "frank", false);
    let mut view = ViewStateRegistry::default();
    let config = ReplacementConfig {
        gesture_settle_frames: 0,
        ..ReplacementConfig::default()
    };
    let source = FixtureModelSource::new("replacement");
    let loads = source.clone();
    let mut ctl = ReplacementController::new(Box::new(source), config);
    assert_eq!(
        ctl.initialize(&host, &mut scene, &mut view),
        ControllerState::Degraded
    );
    assert_eq!(loads.load_count(), 0);
}

#[test]
fn teardown_removes_everything_it_created() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let mut host = host_snapshot(&scene, &rig, 5, "gwen", true);
    let mut view = ViewStateRegistry::default();
    let cosmetics = RecordingCosmetics::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    )
    .with_integrations(Integrations::none().with_cosmetics(Box::new(cosmetics.clone())));
    ctl.initialize(&host, &mut scene, &mut view);
    host.dead_body = Some(avatar_test_fixtures::spawn_dead_body(&mut scene).unwrap());
    ctl.update(&host, &mut scene);

    let model = ctl.model().unwrap();
    let view_model = ctl.view_model().unwrap();
    let ragdoll = ctl.ragdoll().unwrap();
    let volume = ctl.hit_volume().unwrap();

    let events = ctl.teardown(&mut scene, &mut view);
    assert_eq!(
        events,
        vec![ReplacementEvent::TornDown {
            character: host.character
        }]
    );
    for id in [model, view_model, ragdoll, volume] {
        assert!(!scene.contains(id), "{id:?} survived teardown");
    }
    assert!(!view.has_replacement(host.character));
    assert_eq!(ctl.state(), ControllerState::TornDown);
    assert!(matches!(
        cosmetics.last_update(),
        Some(CosmeticCall::Update { active: false, .. })
    ));

    // a torn-down controller ignores further ticks and teardowns
    assert!(ctl.update(&host, &mut scene).is_empty());
    assert!(ctl.teardown(&mut scene, &mut view).is_empty());
}

#[test]
fn cosmetics_registered_once_and_follow_live_model() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 5, "hana", false);
    let mut view = ViewStateRegistry::default();
    let cosmetics = RecordingCosmetics::default();

    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    )
    .with_integrations(Integrations::none().with_cosmetics(Box::new(cosmetics.clone())));
    ctl.initialize(&host, &mut scene, &mut view);
    ctl.update(&host, &mut scene);
    ctl.update(&host, &mut scene);

    let calls = cosmetics.calls();
    let registrations = calls
        .iter()
        .filter(|c| matches!(c, CosmeticCall::Register(_)))
        .count();
    assert_eq!(registrations, 1);
    assert_eq!(
        cosmetics.last_update(),
        Some(CosmeticCall::Update {
            model_root: ctl.model(),
            active: true
        })
    );
}

#[test]
fn set_avatar_renderers_toggles_model_and_view() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 5, "ivy", true);
    let mut view = ViewStateRegistry::default();
    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);

    ctl.set_avatar_renderers(&mut scene, false);
    for root in [ctl.model().unwrap(), ctl.view_model().unwrap()] {
        for r in scene.renderers(root) {
            assert!(!scene.renderer(r).unwrap().enabled);
        }
    }
    // the host's own body is untouched
    assert!(scene.renderer(rig.body_mesh).unwrap().enabled);
}

#[test]
fn hit_reports_reach_hooks() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 5, "jack", false);
    let mut view = ViewStateRegistry::default();
    let hooks = RecordingHooks::default();
    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    )
    .with_hooks(Box::new(hooks.clone()));
    ctl.initialize(&host, &mut scene, &mut view);

    let ally = CharacterId(11);
    ctl.report_hit_enemy(true);
    ctl.report_hit_ally(ally, false);
    ctl.report_damage_taken(false);
    ctl.report_damage_taken_by_ally(ally, true);
    assert_eq!(
        hooks.calls(),
        vec![
            HookCall::HitEnemy { dead: true },
            HookCall::HitAlly { ally, dead: false },
            HookCall::DamageTaken { dead: false },
            HookCall::DamageTakenByAlly { ally, dead: true },
        ]
    );

    ctl.teardown(&mut scene, &mut view);
    ctl.report_hit_enemy(false);
    assert_eq!(hooks.calls().len(), 4);
}

#[test]
fn model_destroyed_externally_degrades() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 5, "kim", false);
    let mut view = ViewStateRegistry::default();
    let mut ctl = ReplacementController::new(
        Box::new(FixtureModelSource::replacement()),
        ReplacementConfig::default(),
    );
    ctl.initialize(&host, &mut scene, &mut view);
    ctl.update(&host, &mut scene);

    scene.destroy(ctl.model().unwrap());
    let report = ctl.update(&host, &mut scene);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, ReplacementEvent::Degraded { .. })));
    assert_eq!(ctl.state(), ControllerState::Degraded);
}

#[test]
fn keep_unsupported_config_passes_toon_material_through() {
    let mut scene = Scene::new();
    let rig = spawn_host_rig(&mut scene).unwrap();
    let host = host_snapshot(&scene, &rig, 5, "lee", false);
    let mut view = ViewStateRegistry::default();
    let config = configs::load("keep_unsupported").unwrap();
    let mut ctl =
        ReplacementController::new(Box::new(FixtureModelSource::new("replacement")), config);
    ctl.initialize(&host, &mut scene, &mut view);

    let face = scene.find_descendant(ctl.model().unwrap(), "Face").unwrap();
    let slots = scene.renderer(face).unwrap().materials.clone();
    let toon = scene.material(slots[1]).unwrap();
    assert_eq!(toon.shader, ShaderFamily::Unsupported("Toon/Outline".into()));
    // post-processing skipped: the skin keeps its own settings
    let skin = scene.material(slots[0]).unwrap();
    assert_eq!(skin.post_processing.stencil_ref, 0);
}
