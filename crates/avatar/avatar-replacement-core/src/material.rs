//! Material remapping.
//!
//! Replacement models arrive with materials authored for an arbitrary shader
//! family. Before a model is instantiated, every material slot is rewritten to a
//! material compatible with the host pipeline. Rewrites are memoized per model in
//! a [`MaterialMap`] so renderers that shared a material keep sharing one.

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ReplacementError;
use crate::ids::{MaterialId, NodeId};
use crate::scene::Scene;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderFamily {
    /// The host pipeline's own lit shader.
    #[default]
    HostLit,
    Standard,
    Unlit,
    /// A shader the host pipeline cannot render as-is.
    Unsupported(String),
}

/// Pipeline-specific settings layered on top of the shading model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessing {
    pub stencil_ref: u32,
    pub receive_decals: bool,
    pub exposure_weight: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    pub shader: ShaderFamily,
    pub base_color: [f32; 4],
    pub main_texture: Option<String>,
    pub normal_map: Option<String>,
    pub emission: [f32; 3],
    pub post_processing: PostProcessing,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            shader: ShaderFamily::HostLit,
            base_color: [1.0; 4],
            main_texture: None,
            normal_map: None,
            emission: [0.0; 3],
            post_processing: PostProcessing::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemapOptions {
    /// Keep the original post-processing settings instead of the host body's.
    pub skip_post_processing: bool,
    /// Leave materials with unsupported shaders untouched.
    pub keep_unsupported_shaders: bool,
}

/// Produces a pipeline-compatible material from an original one.
///
/// `reference` is a private copy of the host body material; implementations may
/// read it freely but the controller never shares it with other characters.
pub trait MaterialRemapper: Send + Sync {
    fn remap(&self, reference: &Material, original: &Material, opts: RemapOptions) -> Material;
}

/// Default remapper: adopt the host's shading model, keep the original's look.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineRemapper;

impl MaterialRemapper for PipelineRemapper {
    fn remap(&self, reference: &Material, original: &Material, opts: RemapOptions) -> Material {
        if opts.keep_unsupported_shaders && matches!(original.shader, ShaderFamily::Unsupported(_))
        {
            return original.clone();
        }
        let post_processing = if opts.skip_post_processing {
            original.post_processing.clone()
        } else {
            reference.post_processing.clone()
        };
        // Unlit surfaces stay unlit; the host shader would relight them.
        let shader = match original.shader {
            ShaderFamily::Unlit => ShaderFamily::Unlit,
            _ => reference.shader.clone(),
        };
        Material {
            name: original.name.clone(),
            shader,
            base_color: original.base_color,
            main_texture: original.main_texture.clone(),
            normal_map: original.normal_map.clone(),
            emission: original.emission,
            post_processing,
        }
    }
}

/// Original material -> replacement material, scoped to one model of one controller.
#[derive(Clone, Debug, Default)]
pub struct MaterialMap {
    entries: HashMap<MaterialId, MaterialId>,
}

impl MaterialMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: MaterialId) -> Option<MaterialId> {
        self.entries.get(&original).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replacement for `original`, invoking the remapper only on first sight.
    pub fn resolve(
        &mut self,
        scene: &mut Scene,
        remapper: &dyn MaterialRemapper,
        reference: &Material,
        original: MaterialId,
        opts: RemapOptions,
    ) -> Result<MaterialId, ReplacementError> {
        if let Some(hit) = self.entries.get(&original) {
            return Ok(*hit);
        }
        let source = scene
            .material(original)
            .ok_or(ReplacementError::MaterialNotFound { material: original })?;
        let remapped = remapper.remap(reference, source, opts);
        let id = scene.add_material(remapped);
        self.entries.insert(original, id);
        Ok(id)
    }
}

/// Rewrite every material slot under `root` through `map`, and mark every skinned
/// renderer to keep updating while off-screen. Returns the number of slots rewritten.
pub fn remap_subtree(
    scene: &mut Scene,
    root: NodeId,
    map: &mut MaterialMap,
    remapper: &dyn MaterialRemapper,
    reference: &Material,
    opts: RemapOptions,
) -> Result<usize, ReplacementError> {
    let mut rewritten = 0;
    for id in scene.renderers(root) {
        let slots = match scene.renderer(id) {
            Some(r) => r.materials.clone(),
            None => continue,
        };
        let mut remapped = Vec::with_capacity(slots.len());
        for original in slots {
            remapped.push(map.resolve(scene, remapper, reference, original, opts)?);
        }
        rewritten += remapped.len();
        if let Some(r) = scene.renderer_mut(id) {
            r.materials = remapped;
            if let Some(skinned) = r.skinned.as_mut() {
                skinned.update_when_offscreen = true;
            }
        }
    }
    debug!(
        "remapped {} material slots onto {} distinct materials",
        rewritten,
        map.len()
    );
    Ok(rewritten)
}
