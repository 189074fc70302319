//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::error::ReplacementError;
use crate::material::RemapOptions;

/// Animator state hashes that map to the two recognized gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureHashes {
    /// Full-path hash resolved to gesture 1.
    pub primary: i32,
    /// Full-path hash resolved to gesture 2.
    pub secondary: i32,
}

impl Default for GestureHashes {
    fn default() -> Self {
        Self {
            primary: -462_656_950,
            secondary: 2_103_786_480,
        }
    }
}

/// Per-controller settings. Every field has a default, so partial JSON is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
    /// Skip post-processing adaptation when remapping materials.
    pub use_no_post_processing: bool,
    /// Keep materials whose shader the host pipeline does not support.
    pub dont_convert_unsupported_shaders: bool,
    /// Frames the gesture watchdog waits before firing "started".
    pub gesture_settle_frames: u32,
    pub gesture_hashes: GestureHashes,
    /// Render/physics layer of the name-tag hit volume.
    pub name_tag_layer: u32,
    /// Node name of the name-tag hit volume.
    pub name_tag_node: String,
}

impl Default for ReplacementConfig {
    fn default() -> Self {
        Self {
            use_no_post_processing: false,
            dont_convert_unsupported_shaders: false,
            gesture_settle_frames: 20,
            gesture_hashes: GestureHashes::default(),
            name_tag_layer: 23,
            name_tag_node: "NameTagCollider".to_string(),
        }
    }
}

impl ReplacementConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ReplacementError> {
        let cfg: ReplacementConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ReplacementError> {
        if self.gesture_settle_frames == 0 {
            return Err(ReplacementError::InvalidConfig {
                reason: "gesture_settle_frames must be at least 1".into(),
            });
        }
        if self.gesture_hashes.primary == self.gesture_hashes.secondary {
            return Err(ReplacementError::InvalidConfig {
                reason: "gesture hashes must be distinct".into(),
            });
        }
        Ok(())
    }

    /// Remap toggles, with the model's authored post-processing flag folded in.
    pub fn remap_options(&self, authored_no_post_processing: bool) -> RemapOptions {
        RemapOptions {
            skip_post_processing: self.use_no_post_processing || authored_no_post_processing,
            keep_unsupported_shaders: self.dont_convert_unsupported_shaders,
        }
    }
}
