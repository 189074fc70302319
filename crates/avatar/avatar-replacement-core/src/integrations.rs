//! Optional third-party integrations and the external view-state registry.
//!
//! Integrations are resolved once at startup by whoever builds the controller
//! and handed in as `Option`s; the controller never probes for them.

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::binding::SkeletonBinding;
use crate::gesture::GestureId;
use crate::ids::{CharacterId, ControllerId, NodeId};
use crate::scene::Scene;

/// "This character now has a replaced body."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRegistration {
    pub controller: ControllerId,
    pub character: CharacterId,
    pub model: NodeId,
    pub view_model: Option<NodeId>,
}

/// Cosmetic-attachment system that follows whichever avatar is active.
pub trait CosmeticIntegration: Send + Sync {
    /// Called once when the controller finishes initializing.
    fn register(&mut self, scene: &mut Scene, registration: &AvatarRegistration);

    /// Called every tick with the active avatar; `active` is false on teardown.
    fn update(&mut self, scene: &mut Scene, avatar: &dyn SkeletonBinding, active: bool);
}

/// Alternate gesture system that may supersede the hash-based gesture id.
pub trait GestureResolver: Send + Sync {
    fn resolve(&self, character: CharacterId, resolved: GestureId) -> GestureId;
}

#[derive(Default)]
pub struct Integrations {
    pub cosmetics: Option<Box<dyn CosmeticIntegration>>,
    pub gesture_resolver: Option<Box<dyn GestureResolver>>,
}

impl Integrations {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_cosmetics(mut self, cosmetics: Box<dyn CosmeticIntegration>) -> Self {
        self.cosmetics = Some(cosmetics);
        self
    }

    pub fn with_gesture_resolver(mut self, resolver: Box<dyn GestureResolver>) -> Self {
        self.gesture_resolver = Some(resolver);
        self
    }
}

impl std::fmt::Debug for Integrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrations")
            .field("cosmetics", &self.cosmetics.is_some())
            .field("gesture_resolver", &self.gesture_resolver.is_some())
            .finish()
    }
}

/// Externally-owned registry of replaced bodies.
pub trait ViewState {
    /// Layer on which surfaces are visible to other players.
    fn visible_layer(&self) -> u32;

    fn report_replacement(&mut self, registration: AvatarRegistration);

    fn report_removal(&mut self, character: CharacterId);
}

/// In-memory [`ViewState`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewStateRegistry {
    pub visible_layer: u32,
    entries: HashMap<CharacterId, AvatarRegistration>,
}

impl Default for ViewStateRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ViewStateRegistry {
    pub fn new(visible_layer: u32) -> Self {
        Self {
            visible_layer,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, character: CharacterId) -> Option<&AvatarRegistration> {
        self.entries.get(&character)
    }

    pub fn has_replacement(&self, character: CharacterId) -> bool {
        self.entries.contains_key(&character)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ViewState for ViewStateRegistry {
    fn visible_layer(&self) -> u32 {
        self.visible_layer
    }

    fn report_replacement(&mut self, registration: AvatarRegistration) {
        debug!("body replacement registered for {:?}", registration.character);
        self.entries.insert(registration.character, registration);
    }

    fn report_removal(&mut self, character: CharacterId) {
        self.entries.remove(&character);
    }
}
