use ahash::{AHashMap, AHashSet};

use crate::duplicates::{Duplicate, DuplicateIndex};
use crate::options::Options;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use crate::utils::property_access;

/// Element a node is written as, e.g. `mesh`, `group` or `PerspectiveCamera`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementKind(String);

impl ElementKind {
  ///
  /// Lower-case the first letter of the runtime type.
  ///
  /// `Object3D` becomes `group`, cameras keep their component name.
  ///
  pub fn from_type_name(type_name: &str) -> Self {
    let tag = match type_name {
      "Object3D" => "group".to_string(),
      "PerspectiveCamera" | "OrthographicCamera" => type_name.to_string(),
      _ => {
        let mut chars = type_name.chars();
        match chars.next() {
          Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
          None => String::new(),
        }
      }
    };
    ElementKind(tag)
  }

  pub fn tag(&self) -> &str {
    &self.0
  }

  /// Groups and scenes are the only elements the pruner may remove.
  pub fn is_group(&self) -> bool {
    self.0 == "group" || self.0 == "scene"
  }

  pub fn is_bone(&self) -> bool {
    self.0 == "bone"
  }
}

/// What the emitter and pruner need to know about one node.
#[derive(Clone, Debug)]
pub struct NodeInfo<'a> {
  pub kind: ElementKind,
  /// Name written to markup. Synthesized for unnamed animation targets.
  pub name: &'a str,
  /// Expression reaching the node in the loaded node table.
  pub node: String,
  /// Instance entry to render through, when instanced.
  pub instance: Option<&'a Duplicate>,
  /// The scene has at least one animation clip.
  pub animated: bool,
  /// Driven by an animation or carrying morph targets. Never pruned, always named.
  pub animation_relevant: bool,
}

impl NodeInfo<'_> {
  pub fn instanced(&self) -> bool {
    self.instance.is_some()
  }
}

///
/// Maps scene nodes to elements. Holds the names synthesized for unnamed
/// animation targets, so every lookup of a node agrees on its name.
///
pub struct Classifier<'a> {
  graph: &'a SceneGraph,
  duplicates: &'a DuplicateIndex,
  options: &'a Options,
  targets: AHashSet<NodeId>,
  names: AHashMap<NodeId, String>,
}

impl<'a> Classifier<'a> {
  pub fn new(graph: &'a SceneGraph, duplicates: &'a DuplicateIndex, options: &'a Options) -> Self {
    let targets: AHashSet<NodeId> = graph
      .animations
      .iter()
      .flat_map(|clip| clip.targets.iter().copied())
      .collect();

    let mut used: AHashSet<String> = graph
      .node_ids()
      .map(|id| graph.node(id).name.clone())
      .filter(|name| !name.is_empty())
      .collect();
    let mut names = AHashMap::new();
    let mut unnamed: Vec<NodeId> = targets
      .iter()
      .copied()
      .filter(|id| graph.node(*id).name.is_empty())
      .collect();
    unnamed.sort();
    for id in unnamed {
      let base = format!("{}_{}", graph.node(id).kind.type_name(), id.0);
      let mut name = base.clone();
      let mut i = 1;
      while used.contains(&name) {
        name = format!("{}_{}", base, i);
        i += 1;
      }
      used.insert(name.clone());
      names.insert(id, name);
    }

    Classifier {
      graph,
      duplicates,
      options,
      targets,
      names,
    }
  }

  pub fn graph(&self) -> &'a SceneGraph {
    self.graph
  }

  pub fn name(&self, id: NodeId) -> &str {
    match self.names.get(&id) {
      Some(name) => name,
      None => &self.graph.node(id).name,
    }
  }

  pub fn is_animation_target(&self, id: NodeId) -> bool {
    self.targets.contains(&id)
  }

  /// Animation targets and nodes with morph targets.
  pub fn is_animation_relevant(&self, id: NodeId) -> bool {
    self.is_animation_target(id) || self.graph.node(id).morph_targets.is_some()
  }

  pub fn kind(&self, id: NodeId) -> ElementKind {
    ElementKind::from_type_name(self.graph.node(id).kind.type_name())
  }

  ///
  /// The instance entry of a node, if the active policy instances it.
  ///
  pub fn instance(&self, id: NodeId) -> Option<&'a Duplicate> {
    if !self.options.instancing() {
      return None;
    }
    let node = self.graph.node(id);
    if node.kind != NodeKind::Mesh {
      return None;
    }
    let duplicate = self.duplicates.get(node.geometry?, node.material?)?;
    let threshold = if self.options.instanceall { 0 } else { 1 };
    (duplicate.count > threshold).then_some(duplicate)
  }

  pub fn info(&self, id: NodeId) -> NodeInfo<'_> {
    let name = self.name(id);
    NodeInfo {
      kind: self.kind(id),
      name,
      node: format!("nodes{}", property_access(name)),
      instance: self.instance(id),
      animated: !self.graph.animations.is_empty(),
      animation_relevant: self.is_animation_relevant(id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scene::{Animation, Camera, Geometry, Light, LightKind, Material, SceneNode};

  #[test]
  fn element_kinds_follow_runtime_types() {
    let cases = [
      (NodeKind::Object3D, "group"),
      (NodeKind::Group, "group"),
      (NodeKind::Mesh, "mesh"),
      (NodeKind::SkinnedMesh, "skinnedMesh"),
      (NodeKind::Bone, "bone"),
      (NodeKind::Camera(Camera::perspective(50.0)), "PerspectiveCamera"),
      (NodeKind::Light(Light::new(LightKind::Spot)), "spotLight"),
      (NodeKind::Points, "points"),
    ];
    for (kind, tag) in cases {
      assert_eq!(ElementKind::from_type_name(kind.type_name()).tag(), tag);
    }
  }

  fn two_rocks() -> SceneGraph {
    let mut graph = SceneGraph::new("Scene");
    let geometry = graph.add_geometry(Geometry::default());
    let material = graph.add_material(Material::default());
    let root = graph.root();
    for name in ["Rock", "Rock_1"] {
      graph.add(root, SceneNode::new(name, NodeKind::Mesh).with_mesh(geometry, material));
    }
    graph
  }

  #[test]
  fn instancing_requires_a_policy() {
    let graph = two_rocks();
    let options = Options::default();
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    assert!(graph.node_ids().all(|id| !classifier.info(id).instanced()));
  }

  #[test]
  fn single_use_pairs_are_never_instanced() {
    let mut graph = SceneGraph::new("Scene");
    let geometry = graph.add_geometry(Geometry::default());
    let material = graph.add_material(Material::default());
    let root = graph.root();
    let lone = graph.add(root, SceneNode::new("Lone", NodeKind::Mesh).with_mesh(geometry, material));

    let options = Options {
      instance: true,
      ..Default::default()
    };
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    assert!(!classifier.info(lone).instanced());

    let options = Options {
      instanceall: true,
      ..Default::default()
    };
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    assert!(classifier.info(lone).instanced());
  }

  #[test]
  fn unnamed_animation_targets_get_unique_names() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let taken = graph.add(root, SceneNode::new("Object3D_2", NodeKind::Object3D));
    let unnamed = graph.add(root, SceneNode::new("", NodeKind::Object3D));
    let mut clip = Animation::new("Spin");
    clip.add_target(unnamed);
    graph.animations.push(clip);

    let options = Options::default();
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    assert_eq!(unnamed, NodeId(2));
    assert_eq!(classifier.name(unnamed), "Object3D_2_1");
    assert_eq!(classifier.name(taken), "Object3D_2");

    let info = classifier.info(unnamed);
    assert!(info.animated);
    assert!(info.animation_relevant);
    assert_eq!(info.node, "nodes.Object3D_2_1");
    assert!(!classifier.info(taken).animation_relevant);
  }
}
