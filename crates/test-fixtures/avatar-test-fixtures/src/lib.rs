use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

use avatar_replacement_core::{
    AvatarRegistration, CharacterId, CosmeticIntegration, DeadBody, GestureId, GestureResolver,
    HookContext, HostSnapshot, MaterialId, ModelSource, NodeId, PrefabDocument,
    ReplacementConfig, ReplacementHooks, Scene, SkeletonBinding,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    models: HashMap<String, String>,
    configs: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = fixtures_root().join(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod models {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.models.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.models, "model", name)?)
    }

    pub fn document(name: &str) -> Result<PrefabDocument> {
        let text = json(name)?;
        PrefabDocument::from_json(&text)
            .with_context(|| format!("failed to parse model fixture {name}"))
    }

    /// Spawn the named model as a new root in `scene`.
    pub fn spawn(scene: &mut Scene, name: &str) -> Result<NodeId> {
        let doc = document(name)?;
        scene
            .spawn_prefab(&doc, None)
            .with_context(|| format!("failed to spawn model fixture {name}"))
    }
}

pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.configs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.configs, "config", name)?)
    }

    pub fn load(name: &str) -> Result<ReplacementConfig> {
        let text = json(name)?;
        ReplacementConfig::from_json(&text)
            .with_context(|| format!("failed to parse config fixture {name}"))
    }
}

/// Host character rig spawned from the `host_rig` fixture.
#[derive(Clone, Copy, Debug)]
pub struct HostRig {
    pub root: NodeId,
    pub skeleton_root: NodeId,
    pub body_mesh: NodeId,
    pub body_material: MaterialId,
}

pub fn spawn_host_rig(scene: &mut Scene) -> Result<HostRig> {
    let root = models::spawn(scene, "host_rig")?;
    let skeleton_root = scene
        .find_descendant(root, "Skeleton")
        .ok_or_else(|| anyhow!("host rig has no Skeleton"))?;
    let body_mesh = scene
        .find_descendant(root, "BodyMesh")
        .ok_or_else(|| anyhow!("host rig has no BodyMesh"))?;
    let body_material = scene
        .renderer(body_mesh)
        .and_then(|r| r.materials.first().copied())
        .ok_or_else(|| anyhow!("host body mesh has no material"))?;
    Ok(HostRig {
        root,
        skeleton_root,
        body_mesh,
        body_material,
    })
}

/// Snapshot of a living, idle host character standing on `rig`.
pub fn host_snapshot(
    scene: &Scene,
    rig: &HostRig,
    character: u64,
    username: &str,
    local_viewer: bool,
) -> HostSnapshot {
    HostSnapshot {
        character: CharacterId(character),
        username: username.to_string(),
        local_viewer,
        skeleton_root: rig.skeleton_root,
        body_material: Some(rig.body_material),
        body_bounds: scene.renderer_bounds(rig.body_mesh).unwrap_or_default(),
        dead_body: None,
        gesture_layer_hash: 0,
        performing_gesture: false,
    }
}

pub fn spawn_dead_body(scene: &mut Scene) -> Result<DeadBody> {
    let root = models::spawn(scene, "dead_body")?;
    let renderer = scene.find_descendant(root, "LOD1");
    let blood_decals = scene
        .descendants(root)
        .into_iter()
        .filter(|id| scene.name(*id) == Some("BloodDecal"))
        .collect();
    Ok(DeadBody {
        root,
        renderer,
        blood_decals,
    })
}

#[derive(Clone, Debug)]
pub enum ModelAsset {
    /// Spawned from a model fixture on load.
    Fixture(String),
    /// Already in the scene; every load returns the same node.
    Loaded(NodeId),
}

impl ModelAsset {
    fn load(&self, scene: &mut Scene) -> Option<NodeId> {
        match self {
            ModelAsset::Fixture(name) => models::spawn(scene, name).ok(),
            ModelAsset::Loaded(id) => Some(*id),
        }
    }
}

/// [`ModelSource`] backed by the model fixtures.
#[derive(Clone, Debug, Default)]
pub struct FixtureModelSource {
    pub model: Option<ModelAsset>,
    pub view_model: Option<ModelAsset>,
    pub script_error: Option<String>,
    pub loads: Arc<Mutex<usize>>,
}

impl FixtureModelSource {
    pub fn new(model: &str) -> Self {
        Self {
            model: Some(ModelAsset::Fixture(model.to_string())),
            ..Self::default()
        }
    }

    /// The stock replacement model plus its first-person arms.
    pub fn replacement() -> Self {
        Self::new("replacement").with_view_model("view_model")
    }

    /// Source whose asset bundle holds no model.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn preloaded(model: NodeId) -> Self {
        Self {
            model: Some(ModelAsset::Loaded(model)),
            ..Self::default()
        }
    }

    pub fn with_view_model(mut self, name: &str) -> Self {
        self.view_model = Some(ModelAsset::Fixture(name.to_string()));
        self
    }

    pub fn failing_scripts(mut self, message: &str) -> Self {
        self.script_error = Some(message.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        *self.loads.lock().unwrap()
    }
}

impl ModelSource for FixtureModelSource {
    fn load_model(&mut self, scene: &mut Scene) -> Option<NodeId> {
        *self.loads.lock().unwrap() += 1;
        self.model.as_ref()?.load(scene)
    }

    fn load_view_model(&mut self, scene: &mut Scene) -> Option<NodeId> {
        self.view_model.as_ref()?.load(scene)
    }

    fn attach_scripts(&mut self, _scene: &mut Scene, _model: NodeId) -> anyhow::Result<()> {
        match &self.script_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HookCall {
    HitEnemy { dead: bool },
    HitAlly { ally: CharacterId, dead: bool },
    DamageTaken { dead: bool },
    DamageTakenByAlly { ally: CharacterId, dead: bool },
    Death,
    GestureStart(GestureId),
    GestureEnd,
}

/// Hooks that record every call; clones share one log.
#[derive(Clone, Debug, Default)]
pub struct RecordingHooks {
    calls: Arc<Mutex<Vec<HookCall>>>,
}

impl RecordingHooks {
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &HookCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn gesture_starts(&self) -> Vec<GestureId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                HookCall::GestureStart(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: HookCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ReplacementHooks for RecordingHooks {
    fn on_hit_enemy(&mut self, _ctx: &HookContext<'_>, dead: bool) {
        self.push(HookCall::HitEnemy { dead });
    }

    fn on_hit_ally(&mut self, _ctx: &HookContext<'_>, ally: CharacterId, dead: bool) {
        self.push(HookCall::HitAlly { ally, dead });
    }

    fn on_damage_taken(&mut self, _ctx: &HookContext<'_>, dead: bool) {
        self.push(HookCall::DamageTaken { dead });
    }

    fn on_damage_taken_by_ally(&mut self, _ctx: &HookContext<'_>, ally: CharacterId, dead: bool) {
        self.push(HookCall::DamageTakenByAlly { ally, dead });
    }

    fn on_death(&mut self, _ctx: &HookContext<'_>) {
        self.push(HookCall::Death);
    }

    fn on_gesture_start(&mut self, _ctx: &HookContext<'_>, gesture: GestureId) {
        self.push(HookCall::GestureStart(gesture));
    }

    fn on_gesture_end(&mut self, _ctx: &HookContext<'_>) {
        self.push(HookCall::GestureEnd);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CosmeticCall {
    Register(AvatarRegistration),
    Update {
        model_root: Option<NodeId>,
        active: bool,
    },
}

/// Cosmetic integration that records registrations and updates.
#[derive(Clone, Debug, Default)]
pub struct RecordingCosmetics {
    calls: Arc<Mutex<Vec<CosmeticCall>>>,
}

impl RecordingCosmetics {
    pub fn calls(&self) -> Vec<CosmeticCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_update(&self) -> Option<CosmeticCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| matches!(c, CosmeticCall::Update { .. }))
            .cloned()
    }
}

impl CosmeticIntegration for RecordingCosmetics {
    fn register(&mut self, _scene: &mut Scene, registration: &AvatarRegistration) {
        self.calls
            .lock()
            .unwrap()
            .push(CosmeticCall::Register(*registration));
    }

    fn update(&mut self, _scene: &mut Scene, avatar: &dyn SkeletonBinding, active: bool) {
        self.calls.lock().unwrap().push(CosmeticCall::Update {
            model_root: avatar.model_root(),
            active,
        });
    }
}

/// Gesture resolver that replaces every non-idle gesture with a fixed id.
#[derive(Clone, Copy, Debug)]
pub struct FixedGestureResolver(pub GestureId);

impl GestureResolver for FixedGestureResolver {
    fn resolve(&self, _character: CharacterId, resolved: GestureId) -> GestureId {
        if resolved.is_idle() {
            resolved
        } else {
            self.0
        }
    }
}
