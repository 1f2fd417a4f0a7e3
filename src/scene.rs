/// Animation clips and the nodes they drive.
pub mod animation;
/// Perspective and orthographic cameras.
pub mod camera;
/// Punctual lights.
pub mod light;

use glam::DVec3;
use serde_json::{Map, Value};

pub use animation::Animation;
pub use camera::{Camera, Projection};
pub use light::{Light, LightKind};

/// Index of a node inside its [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a shared geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub usize);

/// Index of a shared material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

/// Which flavour of line a primitive draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
  Strip,
  Segments,
  Loop,
}

/// Runtime object type of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
  Group,
  Object3D,
  Mesh,
  SkinnedMesh,
  /// A mesh that already draws `count` copies of itself.
  InstancedMesh {
    count: usize,
  },
  Bone,
  Camera(Camera),
  Light(Light),
  Line(LineKind),
  Points,
}

impl NodeKind {
  /// The three.js type string the runtime reports for this node.
  pub fn type_name(&self) -> &'static str {
    match self {
      NodeKind::Group => "Group",
      NodeKind::Object3D => "Object3D",
      NodeKind::Mesh => "Mesh",
      NodeKind::SkinnedMesh => "SkinnedMesh",
      NodeKind::InstancedMesh { .. } => "InstancedMesh",
      NodeKind::Bone => "Bone",
      NodeKind::Camera(camera) => camera.type_name(),
      NodeKind::Light(light) => light.kind.type_name(),
      NodeKind::Line(LineKind::Strip) => "Line",
      NodeKind::Line(LineKind::Segments) => "LineSegments",
      NodeKind::Line(LineKind::Loop) => "LineLoop",
      NodeKind::Points => "Points",
    }
  }

  /// Mesh in the three.js sense (`isMesh`).
  pub fn is_mesh(&self) -> bool {
    matches!(
      self,
      NodeKind::Mesh | NodeKind::SkinnedMesh | NodeKind::InstancedMesh { .. }
    )
  }
}

/// Local transform. Rotation is an XYZ Euler triple in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
  pub position: DVec3,
  pub rotation: DVec3,
  pub scale: DVec3,
}

impl Default for Transform {
  fn default() -> Self {
    Transform {
      position: DVec3::ZERO,
      rotation: DVec3::ZERO,
      scale: DVec3::ONE,
    }
  }
}

/// Morph target names and their current weights.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MorphTargets {
  pub names: Vec<String>,
  pub influences: Vec<f64>,
}

/// Vertex data shared between nodes.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
  /// Hash of the accessor contents, when the loader computed one.
  pub fingerprint: Option<u64>,
}

/// Material family, as the runtime names it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaterialKind {
  #[default]
  Standard,
  Basic,
  Points,
  Line,
}

impl MaterialKind {
  pub fn type_name(self) -> &'static str {
    match self {
      MaterialKind::Standard => "MeshStandardMaterial",
      MaterialKind::Basic => "MeshBasicMaterial",
      MaterialKind::Points => "PointsMaterial",
      MaterialKind::Line => "LineBasicMaterial",
    }
  }
}

/// Surface description shared between nodes.
#[derive(Clone, Debug, Default)]
pub struct Material {
  /// May be empty or shared by several materials.
  pub name: String,
  pub kind: MaterialKind,
  /// Hash of the definition without its name, when the loader computed one.
  pub fingerprint: Option<u64>,
}

/// One object of the scene tree.
#[derive(Clone, Debug)]
pub struct SceneNode {
  pub name: String,
  pub kind: NodeKind,
  pub transform: Transform,
  pub up: DVec3,
  pub geometry: Option<GeometryId>,
  pub material: Option<MaterialId>,
  pub children: Vec<NodeId>,
  pub parent: Option<NodeId>,
  pub visible: bool,
  pub cast_shadow: bool,
  pub receive_shadow: bool,
  pub morph_targets: Option<MorphTargets>,
  pub user_data: Map<String, Value>,
}

impl SceneNode {
  pub fn new<S: Into<String>>(name: S, kind: NodeKind) -> Self {
    SceneNode {
      name: name.into(),
      kind,
      transform: Transform::default(),
      up: DVec3::Y,
      geometry: None,
      material: None,
      children: vec![],
      parent: None,
      visible: true,
      cast_shadow: false,
      receive_shadow: false,
      morph_targets: None,
      user_data: Map::new(),
    }
  }

  pub fn with_transform(mut self, transform: Transform) -> Self {
    self.transform = transform;
    self
  }

  pub fn with_mesh(mut self, geometry: GeometryId, material: MaterialId) -> Self {
    self.geometry = Some(geometry);
    self.material = Some(material);
    self
  }
}

/// The loaded scene: an arena of nodes rooted at [`SceneGraph::root`].
///
/// Nodes are never deleted from the arena. Pruning marks them in a side
/// table and detaches them from their parent.
#[derive(Clone, Debug)]
pub struct SceneGraph {
  nodes: Vec<SceneNode>,
  removed: Vec<bool>,
  pub geometries: Vec<Geometry>,
  pub materials: Vec<Material>,
  pub animations: Vec<Animation>,
  /// `asset.extras` of the source file.
  pub extras: Option<Map<String, Value>>,
}

impl SceneGraph {
  /// A graph holding only the scene root group.
  pub fn new<S: Into<String>>(root_name: S) -> Self {
    SceneGraph {
      nodes: vec![SceneNode::new(root_name, NodeKind::Group)],
      removed: vec![false],
      geometries: vec![],
      materials: vec![],
      animations: vec![],
      extras: None,
    }
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.len() <= 1
  }

  /// Append `node` as the last child of `parent`.
  pub fn add(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
    let id = NodeId(self.nodes.len());
    node.parent = Some(parent);
    node.children.clear();
    self.nodes.push(node);
    self.removed.push(false);
    self.nodes[parent.0].children.push(id);
    id
  }

  pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
    self.geometries.push(geometry);
    GeometryId(self.geometries.len() - 1)
  }

  pub fn add_material(&mut self, material: Material) -> MaterialId {
    self.materials.push(material);
    MaterialId(self.materials.len() - 1)
  }

  pub fn node(&self, id: NodeId) -> &SceneNode {
    &self.nodes[id.0]
  }

  pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
    &mut self.nodes[id.0]
  }

  pub fn material(&self, id: MaterialId) -> &Material {
    &self.materials[id.0]
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.nodes[id.0].children
  }

  pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
    (0..self.nodes.len()).map(NodeId)
  }

  /// Every node reachable from `id`, `id` first, depth first.
  pub fn traverse(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = vec![];
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
      out.push(next);
      stack.extend(self.children(next).iter().rev());
    }
    out
  }

  pub fn is_removed(&self, id: NodeId) -> bool {
    self.removed[id.0]
  }

  pub(crate) fn mark_removed(&mut self, id: NodeId) {
    self.removed[id.0] = true;
  }

  pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
    for child in &children {
      self.nodes[child.0].parent = Some(id);
    }
    self.nodes[id.0].children = children;
  }

  pub(crate) fn detach(&mut self, id: NodeId) {
    let node = &mut self.nodes[id.0];
    node.parent = None;
    node.children.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn traverse_is_depth_first_in_sibling_order() {
    let mut graph = SceneGraph::new("Scene");
    let a = graph.add(graph.root(), SceneNode::new("a", NodeKind::Group));
    let b = graph.add(a, SceneNode::new("b", NodeKind::Mesh));
    let c = graph.add(graph.root(), SceneNode::new("c", NodeKind::Mesh));
    assert_eq!(graph.traverse(graph.root()), vec![graph.root(), a, b, c]);
    assert_eq!(graph.node(b).parent, Some(a));
  }

  #[test]
  fn type_names_follow_the_runtime() {
    assert_eq!(NodeKind::Line(LineKind::Segments).type_name(), "LineSegments");
    assert_eq!(
      NodeKind::Camera(Camera::perspective(50.0)).type_name(),
      "PerspectiveCamera"
    );
    assert!(NodeKind::SkinnedMesh.is_mesh());
    assert!(!NodeKind::Points.is_mesh());
  }
}
