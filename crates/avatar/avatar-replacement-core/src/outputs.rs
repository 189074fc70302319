//! Output contracts from the controller.
//!
//! Hooks are the primary extension point; the report duplicates what fired this
//! tick as plain data so adapters can forward it (for example as engine events).

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::gesture::GestureId;
use crate::ids::CharacterId;

/// Which binding cosmetic attachments currently follow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveAvatar {
    #[default]
    Live,
    Ragdoll,
}

/// Discrete lifecycle signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ReplacementEvent {
    Initialized {
        character: CharacterId,
    },
    Degraded {
        character: CharacterId,
        reason: String,
    },
    Died {
        character: CharacterId,
    },
    Revived {
        character: CharacterId,
    },
    GestureStarted {
        character: CharacterId,
        gesture: GestureId,
    },
    GestureEnded {
        character: CharacterId,
    },
    TornDown {
        character: CharacterId,
    },
}

/// Returned by every controller tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickReport {
    #[serde(default)]
    pub events: Vec<ReplacementEvent>,
    pub active: ActiveAvatar,
    /// Hit-volume bounds in model-local space, when the model has skinned geometry.
    pub hit_volume: Option<Bounds>,
}

impl TickReport {
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
        self.hit_volume = None;
    }

    #[inline]
    pub fn push_event(&mut self, event: ReplacementEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
