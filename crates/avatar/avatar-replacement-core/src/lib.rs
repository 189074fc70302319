//! Avatar replacement core (engine-agnostic)
//!
//! Swaps a host character's stock body for an authored replacement model and
//! keeps it in sync for the character's lifetime: material remapping, skeleton
//! binding, ragdoll on death, gesture inference and a name-tag hit volume.
//! The [`scene::Scene`] arena stands in for the engine; adapters mirror it.

pub mod binding;
pub mod bounds;
pub mod config;
pub mod controller;
pub mod error;
pub mod gesture;
pub mod hooks;
pub mod host;
pub mod ids;
pub mod integrations;
pub mod material;
pub mod outputs;
pub mod ragdoll;
pub mod scene;

// Re-exports for consumers (adapters)
pub use binding::{BoneNameBinding, BoneRow, BoneTable, SkeletonBinding};
pub use bounds::Bounds;
pub use config::{GestureHashes, ReplacementConfig};
pub use controller::{ControllerState, ModelSource, ReplacementController};
pub use error::ReplacementError;
pub use gesture::{classify, GestureEvent, GestureId, GestureTracker};
pub use hooks::{HookContext, LoggingHooks, ReplacementHooks};
pub use host::{DeadBody, HostCharacter, HostSnapshot};
pub use ids::{CharacterId, ControllerId, IdAllocator, MaterialId, NodeId};
pub use integrations::{
    AvatarRegistration, CosmeticIntegration, GestureResolver, Integrations, ViewState,
    ViewStateRegistry,
};
pub use material::{
    remap_subtree, Material, MaterialMap, MaterialRemapper, PipelineRemapper, PostProcessing,
    RemapOptions, ShaderFamily,
};
pub use outputs::{ActiveAvatar, ReplacementEvent, TickReport};
pub use ragdoll::{Ragdoll, RagdollManager};
pub use scene::prefab::{PrefabDocument, PrefabNode, PrefabRenderer};
pub use scene::{
    BoxCollider, ModelSettings, Node, RaycastTarget, Renderer, Scene, ShadowCasting, SkinnedMesh,
    Transform,
};
