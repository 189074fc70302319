//! Skeleton binding: drive a target skeleton from a source skeleton.
//!
//! The default binder matches bones by name. Each bound pair is a row in a
//! [`BoneTable`]; every update copies source local rotations onto the target and
//! moves the target root to the source root.

use hashbrown::HashMap;
use std::fmt;

use crate::ids::NodeId;
use crate::scene::Scene;

/// One bound bone pair, keyed by the source bone name.
#[derive(Clone, Debug, PartialEq)]
pub struct BoneRow {
    pub bone: String,
    pub source: NodeId,
    pub target: NodeId,
}

/// Bound bone pairs for one source/target skeleton.
#[derive(Default, Debug, Clone)]
pub struct BoneTable {
    pub rows: Vec<BoneRow>,
}

impl BoneTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Look up an existing row by source bone name.
    pub fn get(&self, bone: &str) -> Option<&BoneRow> {
        self.rows.iter().find(|r| r.bone == bone)
    }

    /// Insert or update a row for a bone.
    pub fn upsert(&mut self, bone: &str, source: NodeId, target: NodeId) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.bone == bone) {
            row.source = source;
            row.target = target;
        } else {
            self.rows.push(BoneRow {
                bone: bone.to_string(),
                source,
                target,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Live association between a source skeleton and a replacement skeleton.
///
/// Implementations must only write to the targets they were assigned, and
/// `update` must be a harmless no-op when nothing is assigned or the assigned
/// nodes have been destroyed.
pub trait SkeletonBinding: Send + Sync + fmt::Debug {
    /// Bind the full-body replacement rooted at `target_root` to `source_root`.
    fn assign_model(&mut self, scene: &Scene, source_root: NodeId, target_root: NodeId);

    /// Bind a first-person view model to `source_root`.
    fn assign_view_model(&mut self, scene: &Scene, source_root: NodeId, target_root: NodeId);

    /// Copy the current source pose onto the bound targets.
    fn update(&mut self, scene: &mut Scene);

    /// Target bone bound to the source bone named `bone`.
    fn bone_for_name(&self, bone: &str) -> Option<NodeId>;

    /// Root of the bound full-body model, if any.
    fn model_root(&self) -> Option<NodeId>;

    /// Drop all assignments.
    fn clear(&mut self);
}

#[derive(Clone, Debug)]
struct BoundSkeleton {
    source_root: NodeId,
    target_root: NodeId,
    table: BoneTable,
}

impl BoundSkeleton {
    fn build(
        scene: &Scene,
        source_root: NodeId,
        target_root: NodeId,
        aliases: &HashMap<String, String>,
    ) -> Self {
        let mut by_name: HashMap<&str, NodeId> = HashMap::new();
        for id in scene.descendants(source_root).into_iter().skip(1) {
            if let Some(name) = scene.name(id) {
                by_name.entry(name).or_insert(id);
            }
        }
        let mut table = BoneTable::new();
        for target in scene.descendants(target_root).into_iter().skip(1) {
            let Some(name) = scene.name(target) else {
                continue;
            };
            let source_name = aliases.get(name).map(String::as_str).unwrap_or(name);
            if let Some(source) = by_name.get(source_name) {
                if table.get(source_name).is_none() {
                    table.upsert(source_name, *source, target);
                }
            }
        }
        Self {
            source_root,
            target_root,
            table,
        }
    }

    fn is_alive(&self, scene: &Scene) -> bool {
        scene.contains(self.source_root) && scene.contains(self.target_root)
    }

    fn apply(&self, scene: &mut Scene) {
        let root_pos = scene.world_position(self.source_root);
        let root_rot = scene.transform(self.source_root).map(|t| t.rotation);
        if let Some(t) = scene.transform_mut(self.target_root) {
            t.translation = root_pos;
            if let Some(rot) = root_rot {
                t.rotation = rot;
            }
        }
        for row in &self.table.rows {
            let Some(rot) = scene.transform(row.source).map(|t| t.rotation) else {
                continue;
            };
            if let Some(t) = scene.transform_mut(row.target) {
                t.rotation = rot;
            }
        }
    }
}

/// Default binder: matches bones by name, with optional aliases
/// (target bone name -> source bone name).
#[derive(Clone, Debug, Default)]
pub struct BoneNameBinding {
    aliases: HashMap<String, String>,
    model: Option<BoundSkeleton>,
    view: Option<BoundSkeleton>,
}

impl BoneNameBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aliases<I, K, V>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Bone pairs bound for the full-body model.
    pub fn model_table(&self) -> Option<&BoneTable> {
        self.model.as_ref().map(|m| &m.table)
    }

    /// Bone pairs bound for the view model.
    pub fn view_table(&self) -> Option<&BoneTable> {
        self.view.as_ref().map(|m| &m.table)
    }
}

impl SkeletonBinding for BoneNameBinding {
    fn assign_model(&mut self, scene: &Scene, source_root: NodeId, target_root: NodeId) {
        self.model = Some(BoundSkeleton::build(
            scene,
            source_root,
            target_root,
            &self.aliases,
        ));
    }

    fn assign_view_model(&mut self, scene: &Scene, source_root: NodeId, target_root: NodeId) {
        self.view = Some(BoundSkeleton::build(
            scene,
            source_root,
            target_root,
            &self.aliases,
        ));
    }

    fn update(&mut self, scene: &mut Scene) {
        if self.model.as_ref().is_some_and(|m| !m.is_alive(scene)) {
            self.model = None;
        }
        if self.view.as_ref().is_some_and(|v| !v.is_alive(scene)) {
            self.view = None;
        }
        if let Some(model) = &self.model {
            model.apply(scene);
        }
        if let Some(view) = &self.view {
            view.apply(scene);
        }
    }

    fn bone_for_name(&self, bone: &str) -> Option<NodeId> {
        self.model
            .as_ref()
            .and_then(|m| m.table.get(bone))
            .map(|row| row.target)
    }

    fn model_root(&self) -> Option<NodeId> {
        self.model.as_ref().map(|m| m.target_root)
    }

    fn clear(&mut self) {
        self.model = None;
        self.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig(scene: &mut Scene, root: &str, bones: &[&str]) -> NodeId {
        let r = scene.spawn(root, None);
        let mut parent = r;
        for b in bones {
            parent = scene.spawn(*b, Some(parent));
        }
        r
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let mut table = BoneTable::new();
        table.upsert("spine", NodeId(1), NodeId(2));
        table.upsert("spine", NodeId(3), NodeId(4));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("spine").unwrap().target, NodeId(4));
    }

    #[test]
    fn binds_by_name_and_copies_pose() {
        let mut scene = Scene::new();
        let src = rig(&mut scene, "Player", &["spine", "chest", "head"]);
        let dst = rig(&mut scene, "Model", &["spine", "head", "tail"]);
        let mut binding = BoneNameBinding::new();
        binding.assign_model(&scene, src, dst);
        assert_eq!(binding.model_table().unwrap().len(), 2);

        let src_head = scene.find_descendant(src, "head").unwrap();
        let dst_head = scene.find_descendant(dst, "head").unwrap();
        assert_eq!(binding.bone_for_name("head"), Some(dst_head));
        assert_eq!(binding.bone_for_name("tail"), None);

        scene.transform_mut(src_head).unwrap().rotation = [0.0, 0.7071, 0.0, 0.7071];
        scene.transform_mut(src).unwrap().translation = [4.0, 0.0, -2.0];
        binding.update(&mut scene);
        assert_eq!(
            scene.transform(dst_head).unwrap().rotation,
            [0.0, 0.7071, 0.0, 0.7071]
        );
        assert_eq!(scene.transform(dst).unwrap().translation, [4.0, 0.0, -2.0]);
    }

    #[test]
    fn aliases_map_target_names_to_source_names() {
        let mut scene = Scene::new();
        let src = rig(&mut scene, "Player", &["spine.004"]);
        let dst = rig(&mut scene, "Model", &["Head"]);
        let mut binding = BoneNameBinding::with_aliases([("Head", "spine.004")]);
        binding.assign_model(&scene, src, dst);
        let dst_head = scene.find_descendant(dst, "Head").unwrap();
        assert_eq!(binding.bone_for_name("spine.004"), Some(dst_head));
    }

    #[test]
    fn update_after_target_destroyed_is_a_noop() {
        let mut scene = Scene::new();
        let src = rig(&mut scene, "Player", &["spine"]);
        let dst = rig(&mut scene, "Model", &["spine"]);
        let mut binding = BoneNameBinding::new();
        binding.assign_model(&scene, src, dst);
        scene.destroy(dst);
        binding.update(&mut scene);
        assert_eq!(binding.model_root(), None);
    }
}
