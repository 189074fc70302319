//! Replacement lifecycle controller.
//!
//! One controller per host character. `initialize` runs once at activation and
//! builds the replacement (load, remap materials, instantiate, fit height, bind,
//! register). `update` runs once per simulation tick and, in this order:
//! resolves death/revival, refreshes both skeleton bindings, refreshes cosmetic
//! integration, resizes the name-tag hit volume and infers gestures.
//! `teardown` releases every scene node the controller owns.
//!
//! No error leaves these three entry points. Failures are logged; a fatal one
//! leaves the controller `Degraded`, where ticks are no-ops.

use log::{debug, error, info, warn};
use std::fmt;

use crate::binding::{BoneNameBinding, SkeletonBinding};
use crate::bounds::Bounds;
use crate::config::ReplacementConfig;
use crate::error::ReplacementError;
use crate::gesture::{classify, GestureEvent, GestureId, GestureTracker};
use crate::hooks::{HookContext, LoggingHooks, ReplacementHooks};
use crate::host::HostCharacter;
use crate::ids::{CharacterId, ControllerId, MaterialId, NodeId};
use crate::integrations::{AvatarRegistration, Integrations, ViewState};
use crate::material::{remap_subtree, Material, MaterialMap, MaterialRemapper, PipelineRemapper};
use crate::outputs::{ActiveAvatar, ReplacementEvent, TickReport};
use crate::ragdoll::RagdollManager;
use crate::scene::{BoxCollider, RaycastTarget, Scene};

/// Author-supplied capabilities for one kind of replacement body.
pub trait ModelSource: Send + Sync {
    /// Load the full-body replacement. `None` leaves the controller degraded.
    fn load_model(&mut self, scene: &mut Scene) -> Option<NodeId>;

    /// Load a first-person view model. Only asked for the local viewer.
    fn load_view_model(&mut self, _scene: &mut Scene) -> Option<NodeId> {
        None
    }

    fn create_skeleton_binding(&self) -> Box<dyn SkeletonBinding> {
        Box::new(BoneNameBinding::new())
    }

    fn material_remapper(&self) -> &dyn MaterialRemapper {
        &PipelineRemapper
    }

    /// Post-load hook for behaviour the asset could not carry. Failures are
    /// logged and initialization continues.
    fn attach_scripts(&mut self, _scene: &mut Scene, _model: NodeId) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Active,
    /// Initialization failed or the model vanished; ticks do nothing.
    Degraded,
    TornDown,
}

pub struct ReplacementController {
    id: Option<ControllerId>,
    character: CharacterId,
    username: String,
    suit_name: String,
    config: ReplacementConfig,
    source: Box<dyn ModelSource>,
    hooks: Box<dyn ReplacementHooks>,
    integrations: Integrations,
    state: ControllerState,

    model: Option<NodeId>,
    view_model: Option<NodeId>,
    hit_volume: Option<NodeId>,
    avatar: Option<Box<dyn SkeletonBinding>>,
    ragdoll: RagdollManager,
    active: ActiveAvatar,
    visible_layer: u32,

    body_materials: MaterialMap,
    view_materials: MaterialMap,
    reference_material: Option<MaterialId>,

    gestures: GestureTracker,
    pending: Vec<ReplacementEvent>,
    report: TickReport,
}

impl fmt::Debug for ReplacementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplacementController")
            .field("id", &self.id)
            .field("character", &self.character)
            .field("username", &self.username)
            .field("state", &self.state)
            .field("model", &self.model)
            .field("view_model", &self.view_model)
            .field("ragdoll", &self.ragdoll.ragdoll())
            .field("active", &self.active)
            .field("integrations", &self.integrations)
            .finish()
    }
}

impl ReplacementController {
    pub fn new(source: Box<dyn ModelSource>, config: ReplacementConfig) -> Self {
        let gestures = GestureTracker::new(config.gesture_settle_frames);
        Self {
            id: None,
            character: CharacterId::default(),
            username: String::new(),
            suit_name: String::new(),
            config,
            source,
            hooks: Box::new(LoggingHooks),
            integrations: Integrations::none(),
            state: ControllerState::Uninitialized,
            model: None,
            view_model: None,
            hit_volume: None,
            avatar: None,
            ragdoll: RagdollManager::default(),
            active: ActiveAvatar::Live,
            visible_layer: 0,
            body_materials: MaterialMap::new(),
            view_materials: MaterialMap::new(),
            reference_material: None,
            gestures,
            pending: Vec::new(),
            report: TickReport::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ReplacementHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    /// Build the replacement for `host`. Must be called exactly once.
    pub fn initialize(
        &mut self,
        host: &dyn HostCharacter,
        scene: &mut Scene,
        view_state: &mut dyn ViewState,
    ) -> ControllerState {
        if self.state != ControllerState::Uninitialized {
            let err = ReplacementError::AlreadyInitialized {
                username: self.username.clone(),
            };
            warn!("{err}");
            return self.state;
        }
        self.character = host.character_id();
        self.username = host.username().to_string();
        info!("initializing body replacement for {}", self.username);

        match self.try_initialize(host, scene, view_state) {
            Ok(()) => {
                self.state = ControllerState::Active;
                self.pending.push(ReplacementEvent::Initialized {
                    character: self.character,
                });
                info!("body replacement ready for {}", self.username);
            }
            Err(err) => {
                if err.is_fatal() {
                    error!("fatal: {err} ({})", self.username);
                } else {
                    error!("body replacement for {} failed: {err}", self.username);
                }
                self.release(scene);
                view_state.report_removal(self.character);
                self.state = ControllerState::Degraded;
                self.pending.push(ReplacementEvent::Degraded {
                    character: self.character,
                    reason: err.to_string(),
                });
            }
        }
        self.state
    }

    fn try_initialize(
        &mut self,
        host: &dyn HostCharacter,
        scene: &mut Scene,
        view_state: &mut dyn ViewState,
    ) -> Result<(), ReplacementError> {
        self.config.validate()?;
        let id = scene.alloc_controller_id();
        self.id = Some(id);
        self.visible_layer = view_state.visible_layer();

        // Private copy so remappers can't touch a material other characters share.
        let reference_id = match host.body_material() {
            Some(shared) => scene.duplicate_material(shared)?,
            None => {
                warn!(
                    "{} has no body material; remapping against defaults",
                    self.username
                );
                scene.add_material(Material::default())
            }
        };
        self.reference_material = Some(reference_id);
        let reference = scene
            .material(reference_id)
            .cloned()
            .ok_or(ReplacementError::MaterialNotFound {
                material: reference_id,
            })?;

        let prefab = self
            .source
            .load_model(scene)
            .ok_or(ReplacementError::MissingModel)?;
        if !scene.contains(prefab) {
            return Err(ReplacementError::NodeNotFound { node: prefab });
        }
        let view_prefab = if host.is_local_viewer() {
            self.source
                .load_view_model(scene)
                .filter(|v| scene.contains(*v))
        } else {
            None
        };
        if view_prefab.is_some() {
            info!("loading custom view model for {}", self.username);
        }

        let authored = scene
            .model_settings(prefab)
            .is_some_and(|s| s.use_no_post_processing);
        let opts = self.config.remap_options(authored);

        // Remap our own hidden copies; the loaded assets may be shared with
        // other controllers and must keep their original materials.
        let model = self.instantiate_hidden(scene, prefab)?;
        self.model = Some(model);
        if let Some(view) = view_prefab {
            self.view_model = Some(self.instantiate_hidden(scene, view)?);
        }

        let remapper = self.source.material_remapper();
        remap_subtree(
            scene,
            model,
            &mut self.body_materials,
            remapper,
            &reference,
            opts,
        )?;
        if let Some(view) = self.view_model {
            remap_subtree(
                scene,
                view,
                &mut self.view_materials,
                remapper,
                &reference,
                opts,
            )?;
        }

        if let Err(err) = self.source.attach_scripts(scene, model) {
            error!(
                "could not attach all model scripts for {}: {err:#}",
                self.username
            );
        }

        for root in self.model.into_iter().chain(self.view_model) {
            scene.set_active(root, true)?;
        }

        self.fit_height(scene, host.body_bounds(), model);

        let mut avatar = self.source.create_skeleton_binding();
        avatar.assign_model(scene, host.skeleton_root(), model);
        if let Some(view) = self.view_model {
            avatar.assign_view_model(scene, host.skeleton_root(), view);
        }
        self.avatar = Some(avatar);
        self.active = ActiveAvatar::Live;

        let registration = AvatarRegistration {
            controller: id,
            character: self.character,
            model,
            view_model: self.view_model,
        };
        if let Some(cosmetics) = self.integrations.cosmetics.as_mut() {
            cosmetics.register(scene, &registration);
        }
        self.set_avatar_renderers(scene, true);
        view_state.report_replacement(registration);

        self.hit_volume = Some(self.create_hit_volume(scene, id, model)?);
        self.refresh_hit_volume(scene, model);
        Ok(())
    }

    /// Clone `prefab` into the scene at the local origin, inactive until remapped.
    fn instantiate_hidden(
        &self,
        scene: &mut Scene,
        prefab: NodeId,
    ) -> Result<NodeId, ReplacementError> {
        let id = scene.instantiate(prefab, None)?;
        if let Some(node) = scene.node_mut(id) {
            node.name.push_str(&format!("({})", self.username));
            node.transform.translation = [0.0; 3];
            node.active = false;
        }
        Ok(id)
    }

    /// Scale the model uniformly so its height matches the host body's.
    fn fit_height(&self, scene: &mut Scene, host_bounds: Bounds, model: NodeId) {
        let Some(bounds) = scene.skinned_bounds(model) else {
            warn!(
                "replacement for {} has no skinned geometry; skipping height fit",
                self.username
            );
            return;
        };
        if bounds.extents[1] <= f32::EPSILON {
            warn!(
                "replacement for {} has zero height; skipping height fit",
                self.username
            );
            return;
        }
        let factor = host_bounds.extents[1] / bounds.extents[1];
        if let Some(t) = scene.transform_mut(model) {
            t.scale = t.scale.map(|s| s * factor);
        }
        debug!("scaled replacement for {} by {factor}", self.username);
    }

    fn create_hit_volume(
        &self,
        scene: &mut Scene,
        controller: ControllerId,
        model: NodeId,
    ) -> Result<NodeId, ReplacementError> {
        let volume = scene.spawn(self.config.name_tag_node.clone(), Some(model));
        scene.set_layer(volume, self.config.name_tag_layer)?;
        scene.set_collider(
            volume,
            BoxCollider {
                is_trigger: true,
                ..BoxCollider::default()
            },
        )?;
        scene.set_raycast_target(
            volume,
            RaycastTarget {
                controller,
                character: self.character,
                model,
            },
        )?;
        Ok(volume)
    }

    /// Advance one simulation tick.
    pub fn update(&mut self, host: &dyn HostCharacter, scene: &mut Scene) -> &TickReport {
        self.report.clear();
        self.report.events.extend(self.pending.drain(..));
        if self.state != ControllerState::Active {
            return &self.report;
        }
        let Some(model) = self.model.filter(|m| scene.contains(*m)) else {
            warn!(
                "replacement model for {} was destroyed externally",
                self.username
            );
            self.release(scene);
            self.state = ControllerState::Degraded;
            self.report.push_event(ReplacementEvent::Degraded {
                character: self.character,
                reason: "replacement model destroyed".into(),
            });
            return &self.report;
        };

        self.track_dead_body(host, scene);

        if let Some(avatar) = self.avatar.as_mut() {
            avatar.update(scene);
        }
        self.ragdoll.update(scene);
        self.update_cosmetics(scene, true);

        self.refresh_hit_volume(scene, model);
        self.track_gestures(host);

        self.report.active = self.active;
        &self.report
    }

    fn track_dead_body(&mut self, host: &dyn HostCharacter, scene: &mut Scene) {
        let dead = host.dead_body().filter(|d| scene.contains(d.root));
        match (dead, self.active) {
            (Some(dead), ActiveAvatar::Live) => {
                self.active = ActiveAvatar::Ragdoll;
                if let Some(model) = self.model {
                    if let Err(err) = self.ragdoll.create(scene, &dead, model, self.visible_layer) {
                        warn!(
                            "could not build replacement ragdoll for {}: {err}",
                            self.username
                        );
                    }
                }
                // The dead body may already be hidden on the tick it appears.
                let visible = scene.is_active_in_hierarchy(dead.root);
                self.ragdoll.sync_visibility(scene, visible);
                let ctx = HookContext {
                    character: self.character,
                    username: &self.username,
                };
                self.hooks.on_death(&ctx);
                self.report.push_event(ReplacementEvent::Died {
                    character: self.character,
                });
            }
            (None, ActiveAvatar::Ragdoll) => {
                self.active = ActiveAvatar::Live;
                self.ragdoll.destroy(scene);
                info!("{} revived; ragdoll released", self.username);
                self.report.push_event(ReplacementEvent::Revived {
                    character: self.character,
                });
            }
            (Some(dead), ActiveAvatar::Ragdoll) => {
                let visible = scene.is_active_in_hierarchy(dead.root);
                self.ragdoll.sync_visibility(scene, visible);
            }
            (None, ActiveAvatar::Live) => {}
        }
    }

    fn update_cosmetics(&mut self, scene: &mut Scene, active: bool) {
        let Some(cosmetics) = self.integrations.cosmetics.as_mut() else {
            return;
        };
        let avatar: &dyn SkeletonBinding = match self.active {
            ActiveAvatar::Ragdoll => self.ragdoll.binding(),
            ActiveAvatar::Live => match self.avatar.as_deref() {
                Some(avatar) => avatar,
                None => return,
            },
        };
        cosmetics.update(scene, avatar, active);
    }

    fn refresh_hit_volume(&mut self, scene: &mut Scene, model: NodeId) {
        let Some(volume) = self.hit_volume else {
            return;
        };
        let Some(world) = scene.skinned_bounds(model) else {
            return;
        };
        let local = scene.world_to_local_bounds(volume, world);
        if let Some(collider) = scene.node_mut(volume).and_then(|n| n.collider.as_mut()) {
            collider.center = local.center;
            collider.size = local.size();
        }
        self.report.hit_volume = Some(local);
    }

    fn track_gestures(&mut self, host: &dyn HostCharacter) {
        let mut gesture = classify(
            host.performing_gesture(),
            host.gesture_layer_hash(),
            &self.config.gesture_hashes,
        );
        if let Some(resolver) = &self.integrations.gesture_resolver {
            gesture = resolver.resolve(self.character, gesture);
        }
        let Some(event) = self.gestures.step(gesture) else {
            return;
        };
        let ctx = HookContext {
            character: self.character,
            username: &self.username,
        };
        match event {
            GestureEvent::Started(id) => {
                debug!("{} gesture {} started", self.username, id.0);
                self.hooks.on_gesture_start(&ctx, id);
                self.report.push_event(ReplacementEvent::GestureStarted {
                    character: self.character,
                    gesture: id,
                });
            }
            GestureEvent::Ended => {
                debug!("{} gesture ended", self.username);
                self.hooks.on_gesture_end(&ctx);
                self.report.push_event(ReplacementEvent::GestureEnded {
                    character: self.character,
                });
            }
        }
    }

    /// Destroy every owned node and release the character's registration.
    /// Returns the events not yet delivered by a tick, ending with `TornDown`.
    pub fn teardown(
        &mut self,
        scene: &mut Scene,
        view_state: &mut dyn ViewState,
    ) -> Vec<ReplacementEvent> {
        if self.state == ControllerState::TornDown {
            return Vec::new();
        }
        info!("destroying body replacement for {}", self.username);
        if self.state == ControllerState::Active {
            self.update_cosmetics(scene, false);
        }
        self.release(scene);
        if self.state != ControllerState::Uninitialized {
            view_state.report_removal(self.character);
        }
        self.state = ControllerState::TornDown;
        let mut events: Vec<_> = self.pending.drain(..).collect();
        events.push(ReplacementEvent::TornDown {
            character: self.character,
        });
        events
    }

    fn release(&mut self, scene: &mut Scene) {
        if let Some(model) = self.model.take() {
            scene.destroy(model);
        }
        if let Some(view) = self.view_model.take() {
            scene.destroy(view);
        }
        self.hit_volume = None;
        self.ragdoll.destroy(scene);
        if let Some(avatar) = self.avatar.as_mut() {
            avatar.clear();
        }
        self.active = ActiveAvatar::Live;
    }

    /// Enable or disable every renderer of the model and view model.
    pub fn set_avatar_renderers(&self, scene: &mut Scene, enabled: bool) {
        for root in self.model.into_iter().chain(self.view_model) {
            for id in scene.renderers(root) {
                if let Some(r) = scene.renderer_mut(id) {
                    r.enabled = enabled;
                }
            }
        }
    }

    /// Hit and damage reports only reach hooks while the controller is active.
    fn accepts_reports(&self) -> bool {
        if self.state == ControllerState::Active {
            return true;
        }
        debug!(
            "dropping hit report for {}: {}",
            self.username,
            ReplacementError::NotActive
        );
        false
    }

    pub fn report_hit_enemy(&mut self, dead: bool) {
        if !self.accepts_reports() {
            return;
        }
        let ctx = HookContext {
            character: self.character,
            username: &self.username,
        };
        self.hooks.on_hit_enemy(&ctx, dead);
    }

    pub fn report_hit_ally(&mut self, ally: CharacterId, dead: bool) {
        if !self.accepts_reports() {
            return;
        }
        let ctx = HookContext {
            character: self.character,
            username: &self.username,
        };
        self.hooks.on_hit_ally(&ctx, ally, dead);
    }

    pub fn report_damage_taken(&mut self, dead: bool) {
        if !self.accepts_reports() {
            return;
        }
        let ctx = HookContext {
            character: self.character,
            username: &self.username,
        };
        self.hooks.on_damage_taken(&ctx, dead);
    }

    pub fn report_damage_taken_by_ally(&mut self, ally: CharacterId, dead: bool) {
        if !self.accepts_reports() {
            return;
        }
        let ctx = HookContext {
            character: self.character,
            username: &self.username,
        };
        self.hooks.on_damage_taken_by_ally(&ctx, ally, dead);
    }

    pub fn id(&self) -> Option<ControllerId> {
        self.id
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn config(&self) -> &ReplacementConfig {
        &self.config
    }

    pub fn suit_name(&self) -> &str {
        &self.suit_name
    }

    pub fn set_suit_name(&mut self, name: impl Into<String>) {
        self.suit_name = name.into();
    }

    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    pub fn view_model(&self) -> Option<NodeId> {
        self.view_model
    }

    pub fn ragdoll(&self) -> Option<NodeId> {
        self.ragdoll.ragdoll().map(|r| r.root)
    }

    pub fn hit_volume(&self) -> Option<NodeId> {
        self.hit_volume
    }

    pub fn active_avatar(&self) -> ActiveAvatar {
        self.active
    }

    /// The binding cosmetics currently follow.
    pub fn active_binding(&self) -> Option<&dyn SkeletonBinding> {
        match self.active {
            ActiveAvatar::Ragdoll => Some(self.ragdoll.binding()),
            ActiveAvatar::Live => self.avatar.as_deref(),
        }
    }

    pub fn live_binding(&self) -> Option<&dyn SkeletonBinding> {
        self.avatar.as_deref()
    }

    pub fn ragdoll_binding(&self) -> &dyn SkeletonBinding {
        self.ragdoll.binding()
    }

    pub fn body_materials(&self) -> &MaterialMap {
        &self.body_materials
    }

    pub fn view_materials(&self) -> &MaterialMap {
        &self.view_materials
    }

    pub fn reference_material(&self) -> Option<MaterialId> {
        self.reference_material
    }

    pub fn gesture(&self) -> GestureId {
        self.gestures.current()
    }

    pub fn is_gesture_settling(&self) -> bool {
        self.gestures.is_settling()
    }
}
