use std::path::Path;

use ahash::AHashMap;
use gltf::mesh::Mode;
use log::warn;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::scene::{
  Animation, Camera, LineKind, Light, MorphTargets, NodeId, NodeKind, SceneGraph, SceneNode,
};
use crate::utils::{decompose_transform, GltfData};

/// A node and its subtree before they are placed in the arena.
struct Blueprint {
  node: SceneNode,
  /// Index of the glTF node this object stands for.
  source: Option<usize>,
  children: Vec<Blueprint>,
}

impl Blueprint {
  fn leaf(node: SceneNode) -> Self {
    Blueprint {
      node,
      source: None,
      children: vec![],
    }
  }
}

///
/// Build the scene graph of the default scene, mirroring how the three.js
/// loader turns glTF nodes into runtime objects.
///
pub(crate) fn build_graph(
  document: &gltf::Document,
  data: &mut GltfData,
  path: &Path,
) -> Result<SceneGraph> {
  let scene = match document.default_scene().or_else(|| document.scenes().next()) {
    Some(scene) => scene,
    None => return Err(Error::NoScene(path.to_path_buf())),
  };

  for skin in document.skins() {
    for joint in skin.joints() {
      data.joints.insert(joint.index());
    }
  }
  for node in document.nodes() {
    if let Some(mesh) = node.mesh() {
      *data.mesh_refs.entry(mesh.index()).or_default() += 1;
    }
  }

  let root_name = match scene.name() {
    Some(name) => data.unique_name(name),
    None => String::new(),
  };
  let mut graph = SceneGraph::new(root_name);
  let root = graph.root();
  graph.node_mut(root).user_data = extras_map(scene.extras());

  let mut node_ids: AHashMap<usize, NodeId> = AHashMap::new();
  for node in scene.nodes() {
    let blueprint = read_node(&node, document, data, &mut graph);
    insert(&mut graph, root, blueprint, &mut node_ids);
  }

  for (index, animation) in document.animations().enumerate() {
    let name = match animation.name() {
      Some(name) => name.to_string(),
      None => format!("animation_{}", index),
    };
    let mut clip = Animation::new(name);
    for channel in animation.channels() {
      let target = channel.target().node().index();
      match node_ids.get(&target) {
        Some(id) => clip.add_target(*id),
        None => warn!(
          "gltfjsx: animation [{}] targets node [{}] outside of the scene. Channel ignored.",
          clip.name, target
        ),
      }
    }
    graph.animations.push(clip);
  }

  let asset_extras = extras_map(&document.as_json().asset.extras);
  if !asset_extras.is_empty() {
    graph.extras = Some(asset_extras);
  }

  Ok(graph)
}

fn insert(
  graph: &mut SceneGraph,
  parent: NodeId,
  blueprint: Blueprint,
  node_ids: &mut AHashMap<usize, NodeId>,
) {
  let id = graph.add(parent, blueprint.node);
  if let Some(source) = blueprint.source {
    node_ids.insert(source, id);
  }
  for child in blueprint.children {
    insert(graph, id, child, node_ids);
  }
}

fn read_node(
  node: &gltf::Node<'_>,
  document: &gltf::Document,
  data: &mut GltfData,
  graph: &mut SceneGraph,
) -> Blueprint {
  // Reserve the node's name before its attachments so it keeps the intended one.
  let name = node.name().map(|name| data.unique_name(name));

  let mut objects = vec![];
  if let Some(mesh) = node.mesh() {
    objects.push(read_mesh(node, &mesh, document, data, graph));
  }
  if let Some(camera) = node.camera() {
    let camera_name = match camera.name() {
      Some(name) => data.unique_name(name),
      None => String::new(),
    };
    let mut object = SceneNode::new(camera_name, NodeKind::Camera(Camera::load(camera.clone())));
    object.user_data = extras_map(camera.extras());
    objects.push(Blueprint::leaf(object));
  }
  if let Some(light) = node.light() {
    let light_name = match light.name() {
      Some(name) => data.unique_name(name),
      None => data.unique_name(&format!("light_{}", light.index())),
    };
    let object = SceneNode::new(light_name, NodeKind::Light(Light::load(light)));
    objects.push(Blueprint::leaf(object));
  }

  let mut blueprint = if data.joints.contains(&node.index()) {
    Blueprint {
      node: SceneNode::new("", NodeKind::Bone),
      source: None,
      children: objects,
    }
  } else if objects.len() > 1 {
    Blueprint {
      node: SceneNode::new("", NodeKind::Group),
      source: None,
      children: objects,
    }
  } else if let Some(object) = objects.pop() {
    object
  } else {
    Blueprint::leaf(SceneNode::new("", NodeKind::Object3D))
  };

  if let (Some(name), Some(original)) = (name, node.name()) {
    blueprint.node.name = name;
    blueprint
      .node
      .user_data
      .insert("name".to_string(), Value::String(original.to_string()));
  }
  for (key, value) in extras_map(node.extras()) {
    blueprint.node.user_data.insert(key, value);
  }
  blueprint.node.transform = decompose_transform(node.transform());
  blueprint.source = Some(node.index());

  for child in node.children() {
    blueprint
      .children
      .push(read_node(&child, document, data, graph));
  }
  blueprint
}

fn read_mesh(
  node: &gltf::Node<'_>,
  mesh: &gltf::Mesh<'_>,
  document: &gltf::Document,
  data: &mut GltfData,
  graph: &mut SceneGraph,
) -> Blueprint {
  let mut primitives = match data.meshes.get(&mesh.index()) {
    Some(cached) => cached.clone(),
    None => {
      let built = load_primitives(mesh, data, graph);
      data.meshes.insert(mesh.index(), built.clone());
      built
    }
  };

  let skinned = node.skin().is_some();
  let instances = gpu_instance_count(node, document);
  let weights = node.weights().or_else(|| mesh.weights());
  for object in &mut primitives {
    if object.kind == NodeKind::Mesh {
      if let Some(count) = instances {
        object.kind = NodeKind::InstancedMesh { count };
      } else if skinned {
        object.kind = NodeKind::SkinnedMesh;
      }
    }
    if let (Some(morph), Some(weights)) = (object.morph_targets.as_mut(), weights) {
      for (influence, weight) in morph.influences.iter_mut().zip(weights) {
        *influence = *weight as f64;
      }
    }
  }

  // Several nodes sharing one mesh each get a distinct copy.
  if data.mesh_refs.get(&mesh.index()).copied().unwrap_or(0) > 1 {
    let uses = data.mesh_uses.entry(mesh.index()).or_default();
    for object in &mut primitives {
      object.name = format!("{}_instance_{}", object.name, uses);
    }
    *uses += 1;
  }

  if primitives.len() == 1 {
    if let Some(object) = primitives.pop() {
      return Blueprint::leaf(object);
    }
  }
  Blueprint {
    node: SceneNode::new("", NodeKind::Group),
    source: None,
    children: primitives.into_iter().map(Blueprint::leaf).collect(),
  }
}

fn load_primitives(
  mesh: &gltf::Mesh<'_>,
  data: &mut GltfData,
  graph: &mut SceneGraph,
) -> Vec<SceneNode> {
  let base_name = match mesh.name() {
    Some(name) => name.to_string(),
    None => format!("mesh_{}", mesh.index()),
  };
  let extras = extras_map(mesh.extras());
  let target_names: Option<Vec<String>> = extras
    .get("targetNames")
    .and_then(Value::as_array)
    .map(|names| {
      names
        .iter()
        .map(|name| match name {
          Value::String(name) => name.clone(),
          other => other.to_string(),
        })
        .collect()
    });

  let mut objects = vec![];
  for primitive in mesh.primitives() {
    let mode = primitive.mode();
    let kind = match mode {
      Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan => NodeKind::Mesh,
      Mode::Lines => NodeKind::Line(LineKind::Segments),
      Mode::LineStrip => NodeKind::Line(LineKind::Strip),
      Mode::LineLoop => NodeKind::Line(LineKind::Loop),
      Mode::Points => NodeKind::Points,
    };

    let mut object = SceneNode::new(data.unique_name(&base_name), kind);
    object.geometry = Some(data.load_geometry(&primitive, graph));
    object.material = Some(data.load_material(&primitive.material(), mode, graph));
    object.user_data = extras.clone();

    let targets = primitive.morph_targets().count();
    if targets > 0 {
      let names = match &target_names {
        Some(names) if names.len() == targets => names.clone(),
        _ => (0..targets).map(|i| i.to_string()).collect(),
      };
      object.morph_targets = Some(MorphTargets {
        names,
        influences: vec![0.0; targets],
      });
    }
    objects.push(object);
  }
  objects
}

///
/// Instance count of a node carrying `EXT_mesh_gpu_instancing`.
///
fn gpu_instance_count(node: &gltf::Node<'_>, document: &gltf::Document) -> Option<usize> {
  let extension = node.extensions()?.get("EXT_mesh_gpu_instancing")?;
  let attributes = extension.get("attributes")?.as_object()?;
  let accessor = attributes.values().find_map(Value::as_u64)?;
  document
    .accessors()
    .nth(accessor as usize)
    .map(|accessor| accessor.count())
}

fn extras_map(extras: &gltf::json::extras::Extras) -> Map<String, Value> {
  extras
    .as_ref()
    .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw.get()).ok())
    .unwrap_or_default()
}
