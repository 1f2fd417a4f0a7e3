use std::f64::consts::{FRAC_PI_3, PI};
use std::fmt;

use glam::DVec3;
use serde_json::Value;

use crate::classify::NodeInfo;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::scene::{NodeId, NodeKind, Projection, SceneGraph, Transform};
use crate::utils::{into_precision, property_access, round_to};

/// Attribute names, in no particular order. Emission order is decided by [`serialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropKey {
  MakeDefault,
  Zoom,
  Far,
  Near,
  Fov,
  CastShadow,
  ReceiveShadow,
  Args,
  InstanceMatrix,
  Geometry,
  Material,
  Skeleton,
  Visible,
  MorphTargetDictionary,
  MorphTargetInfluences,
  Intensity,
  Angle,
  Penumbra,
  Decay,
  Distance,
  Up,
  Color,
  Position,
  Rotation,
  Scale,
  UserData,
}

impl PropKey {
  pub fn name(self) -> &'static str {
    match self {
      PropKey::MakeDefault => "makeDefault",
      PropKey::Zoom => "zoom",
      PropKey::Far => "far",
      PropKey::Near => "near",
      PropKey::Fov => "fov",
      PropKey::CastShadow => "castShadow",
      PropKey::ReceiveShadow => "receiveShadow",
      PropKey::Args => "args",
      PropKey::InstanceMatrix => "instanceMatrix",
      PropKey::Geometry => "geometry",
      PropKey::Material => "material",
      PropKey::Skeleton => "skeleton",
      PropKey::Visible => "visible",
      PropKey::MorphTargetDictionary => "morphTargetDictionary",
      PropKey::MorphTargetInfluences => "morphTargetInfluences",
      PropKey::Intensity => "intensity",
      PropKey::Angle => "angle",
      PropKey::Penumbra => "penumbra",
      PropKey::Decay => "decay",
      PropKey::Distance => "distance",
      PropKey::Up => "up",
      PropKey::Color => "color",
      PropKey::Position => "position",
      PropKey::Rotation => "rotation",
      PropKey::Scale => "scale",
      PropKey::UserData => "userData",
    }
  }

  /// Position, rotation or scale.
  pub fn is_transform(self) -> bool {
    matches!(self, PropKey::Position | PropKey::Rotation | PropKey::Scale)
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
  /// Bare boolean attribute, `castShadow`.
  Flag,
  /// JavaScript expression, `position={[1, 2, 3]}`.
  Expr(String),
  /// String literal, `color="#ff0000"`.
  Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
  pub key: PropKey,
  pub value: PropValue,
}

impl fmt::Display for Prop {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.value {
      PropValue::Flag => write!(f, "{}", self.key.name()),
      PropValue::Expr(expr) => write!(f, "{}={{{}}}", self.key.name(), expr),
      PropValue::Text(text) => write!(f, "{}=\"{}\"", self.key.name(), text),
    }
  }
}

/// Ordered attribute list of one element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props(Vec<Prop>);

impl Props {
  fn flag(&mut self, key: PropKey) {
    self.0.push(Prop {
      key,
      value: PropValue::Flag,
    });
  }

  fn expr<S: Into<String>>(&mut self, key: PropKey, expr: S) {
    self.0.push(Prop {
      key,
      value: PropValue::Expr(expr.into()),
    });
  }

  fn text<S: Into<String>>(&mut self, key: PropKey, text: S) {
    self.0.push(Prop {
      key,
      value: PropValue::Text(text.into()),
    });
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  fn keys(&self) -> impl Iterator<Item = PropKey> + '_ {
    self.0.iter().map(|prop| prop.key)
  }

  /// Exactly one attribute, and it is `key`.
  pub fn only(&self, key: PropKey) -> bool {
    self.0.len() == 1 && self.0[0].key == key
  }

  pub fn has_transform(&self) -> bool {
    self.keys().any(PropKey::is_transform)
  }

  /// At least one attribute, all of them position, rotation or scale.
  pub fn only_transform(&self) -> bool {
    !self.is_empty() && self.keys().all(PropKey::is_transform)
  }
}

impl fmt::Display for Props {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, prop) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      write!(f, "{}", prop)?;
    }
    Ok(())
  }
}

///
/// A number rounded to `precision` digits, as JavaScript prints it.
///
pub fn format_number(x: f64, precision: u32) -> String {
  round_to(x, precision).to_string()
}

///
/// An angle in radians. Multiples and fractions of π up to 10 are written
/// symbolically, e.g. `-Math.PI / 2`.
///
pub fn format_angle(x: f64, precision: u32) -> String {
  let abs = into_precision(x).abs();
  let sign = if x < 0.0 { "-" } else { "" };
  for i in 1..=10 {
    if abs == into_precision(PI / i as f64) {
      return match i {
        1 => format!("{}Math.PI", sign),
        _ => format!("{}Math.PI / {}", sign, i),
      };
    }
  }
  for i in 2..=10 {
    if abs == into_precision(PI * i as f64) {
      return format!("{}Math.PI * {}", sign, i);
    }
  }
  format_number(x, precision)
}

fn format_vector(v: DVec3, precision: u32) -> String {
  format!(
    "[{}, {}, {}]",
    format_number(v.x, precision),
    format_number(v.y, precision),
    format_number(v.z, precision)
  )
}

fn format_color(color: DVec3) -> String {
  let c = (color.clamp(DVec3::ZERO, DVec3::ONE) * 255.0).round();
  format!("{:02x}{:02x}{:02x}", c.x as u8, c.y as u8, c.z as u8)
}

///
/// Attributes of a node, in emission order.
///
/// `transform` stands in for the node's own transform, so the pruner can
/// evaluate a node as if a parent had already been folded into it.
///
pub fn serialize(
  graph: &SceneGraph,
  id: NodeId,
  info: &NodeInfo<'_>,
  transform: &Transform,
  options: &Options,
) -> Result<Props> {
  let node = graph.node(id);
  let precision = options.precision;
  let rnd = |x: f64| round_to(x, precision);
  let num = |x: f64| format_number(x, precision);
  let mut props = Props::default();

  if let NodeKind::Camera(camera) = &node.kind {
    props.expr(PropKey::MakeDefault, "false");
    if rnd(camera.zoom) != 1.0 {
      props.expr(PropKey::Zoom, num(camera.zoom));
    }
    if rnd(camera.far) != 2000.0 {
      props.expr(PropKey::Far, num(camera.far));
    }
    if rnd(camera.near) != 0.1 {
      props.expr(PropKey::Near, num(camera.near));
    }
    if let Projection::Perspective { fov, .. } = camera.projection {
      if rnd(fov) != 50.0 {
        props.expr(PropKey::Fov, num(fov));
      }
    }
  }

  let blanket_shadows = options.shadows && node.kind.is_mesh();
  if blanket_shadows {
    props.flag(PropKey::CastShadow);
    props.flag(PropKey::ReceiveShadow);
  }

  if !info.instanced() {
    if let NodeKind::InstancedMesh { count } = node.kind {
      if node.geometry.is_none() || node.material.is_none() {
        return Err(Error::MalformedNode {
          name: info.name.to_string(),
          reason: "instanced mesh without geometry or material".to_string(),
        });
      }
      props.expr(
        PropKey::Args,
        format!("[{0}.geometry, {0}.material, {1}]", info.node, count),
      );
      props.expr(PropKey::InstanceMatrix, format!("{}.instanceMatrix", info.node));
    } else {
      if node.geometry.is_some() {
        props.expr(PropKey::Geometry, format!("{}.geometry", info.node));
      }
      if let Some(material) = node.material {
        let name = &graph.material(material).name;
        if name.is_empty() {
          props.expr(PropKey::Material, format!("{}.material", info.node));
        } else {
          props.expr(PropKey::Material, format!("materials{}", property_access(name)));
        }
      }
    }

    if node.kind == NodeKind::SkinnedMesh {
      props.expr(PropKey::Skeleton, format!("{}.skeleton", info.node));
    }
    if !node.visible {
      props.expr(PropKey::Visible, "false");
    }
    if node.cast_shadow && !blanket_shadows {
      props.flag(PropKey::CastShadow);
    }
    if node.receive_shadow && !blanket_shadows {
      props.flag(PropKey::ReceiveShadow);
    }
    if node.morph_targets.is_some() {
      props.expr(
        PropKey::MorphTargetDictionary,
        format!("{}.morphTargetDictionary", info.node),
      );
      props.expr(
        PropKey::MorphTargetInfluences,
        format!("{}.morphTargetInfluences", info.node),
      );
    }

    if let NodeKind::Light(light) = &node.kind {
      if rnd(light.intensity) != 0.0 {
        props.expr(PropKey::Intensity, num(light.intensity));
      }
      if let Some(angle) = light.angle {
        if into_precision(angle) != into_precision(FRAC_PI_3) {
          props.expr(PropKey::Angle, format_angle(angle, precision));
        }
      }
      if let Some(penumbra) = light.penumbra {
        if rnd(penumbra) != 0.0 {
          props.expr(PropKey::Penumbra, num(penumbra));
        }
      }
      if let Some(decay) = light.decay {
        if rnd(decay) != 1.0 {
          props.expr(PropKey::Decay, num(decay));
        }
      }
      if let Some(distance) = light.distance {
        if rnd(distance) != 0.0 {
          props.expr(PropKey::Distance, num(distance));
        }
      }
    }

    if node.up != DVec3::Y {
      props.expr(PropKey::Up, format_vector(node.up, precision));
    }
  }

  if let NodeKind::Light(light) = &node.kind {
    let hex = format_color(light.color);
    if hex != "ffffff" {
      props.text(PropKey::Color, format!("#{}", hex));
    }
  }

  if rnd(transform.position.length()) != 0.0 {
    props.expr(PropKey::Position, format_vector(transform.position, precision));
  }

  let rotation = transform.rotation;
  if rnd(rotation.length()) != 0.0 {
    props.expr(
      PropKey::Rotation,
      format!(
        "[{}, {}, {}]",
        format_angle(rotation.x, precision),
        format_angle(rotation.y, precision),
        format_angle(rotation.z, precision)
      ),
    );
  }

  let scale = DVec3::new(rnd(transform.scale.x), rnd(transform.scale.y), rnd(transform.scale.z));
  if scale != DVec3::ONE {
    if scale.x == scale.y && scale.x == scale.z {
      props.expr(PropKey::Scale, num(scale.x));
    } else {
      props.expr(PropKey::Scale, format_vector(scale, precision));
    }
  }

  if options.meta && !node.user_data.is_empty() {
    props.expr(PropKey::UserData, Value::Object(node.user_data.clone()).to_string());
  }

  Ok(props)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classify::Classifier;
  use crate::duplicates::DuplicateIndex;
  use crate::scene::{Camera, Light, LightKind, Material, MaterialKind, SceneNode};
  use std::f64::consts::FRAC_PI_2;

  fn props_of(graph: &SceneGraph, id: NodeId, options: &Options) -> Props {
    let duplicates = DuplicateIndex::analyze(graph, options);
    let classifier = Classifier::new(graph, &duplicates, options);
    let info = classifier.info(id);
    match serialize(graph, id, &info, &graph.node(id).transform, options) {
      Ok(props) => props,
      Err(e) => panic!("props failed. {}", e),
    }
  }

  fn rotated(rotation: DVec3) -> SceneNode {
    SceneNode::new("Rotated", NodeKind::Group).with_transform(Transform {
      rotation,
      ..Default::default()
    })
  }

  #[test]
  fn angles_become_symbolic() {
    assert_eq!(format_angle(-FRAC_PI_2, 2), "-Math.PI / 2");
    assert_eq!(format_angle(PI, 2), "Math.PI");
    assert_eq!(format_angle(PI / 4.0, 2), "Math.PI / 4");
    assert_eq!(format_angle(-PI * 2.0, 2), "-Math.PI * 2");
    assert_eq!(format_angle(0.3, 2), "0.3");
    assert_eq!(format_angle(0.0, 2), "0");
  }

  #[test]
  fn rotation_is_written_with_pi() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let id = graph.add(root, rotated(DVec3::new(-FRAC_PI_2, 0.0, 0.0)));
    let props = props_of(&graph, id, &Options::default());
    assert_eq!(props.to_string(), "rotation={[-Math.PI / 2, 0, 0]}");
    assert!(props.only(PropKey::Rotation));
  }

  #[test]
  fn position_below_precision_is_dropped() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let tiny = graph.add(
      root,
      SceneNode::new("Tiny", NodeKind::Group).with_transform(Transform {
        position: DVec3::new(0.004, 0.0, 0.0),
        ..Default::default()
      }),
    );
    let small = graph.add(
      root,
      SceneNode::new("Small", NodeKind::Group).with_transform(Transform {
        position: DVec3::new(0.005, 0.0, 0.0),
        ..Default::default()
      }),
    );
    let options = Options::default();
    assert!(props_of(&graph, tiny, &options).is_empty());
    assert_eq!(
      props_of(&graph, small, &options).to_string(),
      "position={[0.01, 0, 0]}"
    );
  }

  #[test]
  fn uniform_scale_is_a_scalar() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let uniform = graph.add(
      root,
      SceneNode::new("Uniform", NodeKind::Group).with_transform(Transform {
        scale: DVec3::splat(2.0),
        ..Default::default()
      }),
    );
    let skewed = graph.add(
      root,
      SceneNode::new("Skewed", NodeKind::Group).with_transform(Transform {
        scale: DVec3::new(1.0, 2.0, 1.0),
        ..Default::default()
      }),
    );
    let options = Options::default();
    assert_eq!(props_of(&graph, uniform, &options).to_string(), "scale={2}");
    assert_eq!(
      props_of(&graph, skewed, &options).to_string(),
      "scale={[1, 2, 1]}"
    );
  }

  #[test]
  fn mesh_references_geometry_and_material() {
    let mut graph = SceneGraph::new("Scene");
    let geometry = graph.add_geometry(Default::default());
    let named = graph.add_material(Material {
      name: "Steel".to_string(),
      kind: MaterialKind::Standard,
      fingerprint: None,
    });
    let unnamed = graph.add_material(Material::default());
    let root = graph.root();
    let a = graph.add(root, SceneNode::new("Gear", NodeKind::Mesh).with_mesh(geometry, named));
    let b = graph.add(
      root,
      SceneNode::new("Gear.001", NodeKind::Mesh).with_mesh(geometry, unnamed),
    );

    let options = Options {
      shadows: true,
      ..Default::default()
    };
    assert_eq!(
      props_of(&graph, a, &options).to_string(),
      "castShadow receiveShadow geometry={nodes.Gear.geometry} material={materials.Steel}"
    );
    assert_eq!(
      props_of(&graph, b, &options).to_string(),
      "castShadow receiveShadow geometry={nodes['Gear.001'].geometry} material={nodes['Gear.001'].material}"
    );
  }

  #[test]
  fn cameras_only_write_non_default_settings() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let mut camera = Camera::perspective(35.0);
    camera.far = 2000.0001;
    camera.near = 0.5;
    let id = graph.add(root, SceneNode::new("Camera", NodeKind::Camera(camera)));
    assert_eq!(
      props_of(&graph, id, &Options::default()).to_string(),
      "makeDefault={false} near={0.5} fov={35}"
    );
  }

  #[test]
  fn lights_skip_runtime_defaults() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let mut spot = Light::new(LightKind::Spot);
    spot.color = DVec3::new(1.0, 0.0, 0.0);
    spot.intensity = 2.5;
    spot.angle = Some(PI / 4.0);
    spot.decay = Some(2.0);
    let id = graph.add(root, SceneNode::new("Spot", NodeKind::Light(spot)));
    assert_eq!(
      props_of(&graph, id, &Options::default()).to_string(),
      "intensity={2.5} angle={Math.PI / 4} decay={2} color=\"#ff0000\""
    );
  }

  #[test]
  fn user_data_needs_meta() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let mut node = SceneNode::new("Tagged", NodeKind::Group);
    node
      .user_data
      .insert("name".to_string(), Value::String("Tagged".to_string()));
    let id = graph.add(root, node);
    assert!(props_of(&graph, id, &Options::default()).is_empty());
    let options = Options {
      meta: true,
      ..Default::default()
    };
    assert_eq!(
      props_of(&graph, id, &options).to_string(),
      "userData={{\"name\":\"Tagged\"}}"
    );
  }

  #[test]
  fn native_instanced_mesh_needs_geometry() {
    let mut graph = SceneGraph::new("Scene");
    let root = graph.root();
    let id = graph.add(
      root,
      SceneNode::new("Grass", NodeKind::InstancedMesh { count: 100 }),
    );
    let options = Options::default();
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    let info = classifier.info(id);
    let result = serialize(&graph, id, &info, &Transform::default(), &options);
    assert!(matches!(result, Err(Error::MalformedNode { .. })));
  }
}
