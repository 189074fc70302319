//! Error types for the replacement controller

use crate::ids::{MaterialId, NodeId};

/// Failures raised by scene operations and controller steps.
///
/// None of these cross out of the controller's public tick/initialize/teardown
/// entry points; the controller logs them and degrades instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ReplacementError {
    /// The model source produced nothing to render
    #[error("model source returned no replacement model; verify the asset exists and its name is correct")]
    MissingModel,

    /// A scene node handle no longer resolves
    #[error("scene node not found: {node:?}")]
    NodeNotFound { node: NodeId },

    /// A material handle no longer resolves
    #[error("material not found: {material:?}")]
    MaterialNotFound { material: MaterialId },

    /// A prefab renderer names a material the document does not define
    #[error("prefab references unknown material '{name}'")]
    UnknownPrefabMaterial { name: String },

    /// `initialize` was called on a controller that already ran it
    #[error("controller for {username} is already initialized")]
    AlreadyInitialized { username: String },

    /// Operation requires an active controller
    #[error("controller is not active")]
    NotActive,

    /// Configuration rejected by validation
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON (de)serialization failure
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl ReplacementError {
    /// Fatal errors leave the controller degraded; everything else is a skipped step.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingModel | Self::InvalidConfig { .. })
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingModel | Self::UnknownPrefabMaterial { .. } => "asset",
            Self::NodeNotFound { .. } | Self::MaterialNotFound { .. } => "scene",
            Self::AlreadyInitialized { .. } | Self::NotActive => "lifecycle",
            Self::InvalidConfig { .. } => "config",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for ReplacementError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
