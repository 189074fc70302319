//! Prefab documents: a serializable description of a node subtree plus the
//! materials its renderers reference by name.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{ModelSettings, Renderer, Scene, Transform};
use crate::bounds::Bounds;
use crate::error::ReplacementError;
use crate::ids::{MaterialId, NodeId};
use crate::material::Material;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrefabDocument {
    #[serde(default)]
    pub materials: Vec<Material>,
    pub root: PrefabNode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrefabNode {
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub renderer: Option<PrefabRenderer>,
    #[serde(default)]
    pub settings: Option<ModelSettings>,
    #[serde(default)]
    pub children: Vec<PrefabNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrefabRenderer {
    /// Material names, resolved against [`PrefabDocument::materials`].
    pub materials: Vec<String>,
    /// Present for skinned renderers.
    #[serde(default)]
    pub skinned_bounds: Option<Bounds>,
}

fn default_active() -> bool {
    true
}

impl PrefabDocument {
    pub fn from_json(raw: &str) -> Result<Self, ReplacementError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Scene {
    /// Spawn a prefab under `parent`, registering its materials once per call.
    pub fn spawn_prefab(
        &mut self,
        doc: &PrefabDocument,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ReplacementError> {
        let mut by_name: HashMap<&str, MaterialId> = HashMap::new();
        for mat in &doc.materials {
            let id = self.add_material(mat.clone());
            by_name.insert(mat.name.as_str(), id);
        }
        self.spawn_prefab_node(&doc.root, parent, &by_name)
    }

    fn spawn_prefab_node(
        &mut self,
        src: &PrefabNode,
        parent: Option<NodeId>,
        materials: &HashMap<&str, MaterialId>,
    ) -> Result<NodeId, ReplacementError> {
        let id = self.spawn(src.name.clone(), parent);
        if let Some(r) = &src.renderer {
            let slots = r
                .materials
                .iter()
                .map(|name| {
                    materials.get(name.as_str()).copied().ok_or_else(|| {
                        ReplacementError::UnknownPrefabMaterial { name: name.clone() }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let renderer = match r.skinned_bounds {
                Some(b) => Renderer::skinned(slots, b),
                None => Renderer::new(slots),
            };
            self.set_renderer(id, renderer)?;
        }
        if let Some(node) = self.node_mut(id) {
            node.transform = src.transform;
            node.active = src.active;
            node.layer = src.layer;
            node.settings = src.settings;
        }
        for child in &src.children {
            self.spawn_prefab_node(child, Some(id), materials)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "materials": [{ "name": "Skin", "shader": "standard" }],
        "root": {
            "name": "Model",
            "settings": { "use_no_post_processing": true },
            "children": [
                { "name": "Body", "renderer": { "materials": ["Skin", "Skin"],
                  "skinned_bounds": { "center": [0, 0.5, 0], "extents": [0.2, 0.5, 0.2] } } },
                { "name": "Armature", "active": false }
            ]
        }
    }"#;

    #[test]
    fn spawns_nodes_renderers_and_settings() {
        let doc = PrefabDocument::from_json(DOC).unwrap();
        let mut scene = Scene::new();
        let root = scene.spawn_prefab(&doc, None).unwrap();

        assert_eq!(scene.descendants(root).len(), 3);
        assert_eq!(scene.material_count(), 1);
        let body = scene.find_descendant(root, "Body").unwrap();
        let r = scene.renderer(body).unwrap();
        assert_eq!(r.materials.len(), 2);
        assert_eq!(r.materials[0], r.materials[1]);
        assert!(r.skinned.is_some());
        let armature = scene.find_descendant(root, "Armature").unwrap();
        assert!(!scene.is_active_in_hierarchy(armature));
        assert_eq!(
            scene.model_settings(root),
            Some(ModelSettings {
                use_no_post_processing: true
            })
        );
    }

    #[test]
    fn unknown_material_is_an_error() {
        let raw = r#"{ "root": { "name": "M", "renderer": { "materials": ["Nope"] } } }"#;
        let doc = PrefabDocument::from_json(raw).unwrap();
        let err = Scene::new().spawn_prefab(&doc, None).unwrap_err();
        assert_eq!(
            err,
            ReplacementError::UnknownPrefabMaterial {
                name: "Nope".into()
            }
        );
    }
}
