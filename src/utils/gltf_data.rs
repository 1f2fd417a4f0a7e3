use std::hash::{Hash, Hasher};

use ahash::{AHashMap, AHashSet, AHasher};
use gltf::mesh::Mode;

use crate::scene::{
  Geometry, GeometryId, Material, MaterialId, MaterialKind, SceneGraph, SceneNode,
};
use crate::utils::sanitize_node_name;

/// Primitive identity: indices accessor plus attribute accessors sorted by semantic.
type PrimitiveKey = (Option<usize>, Vec<(String, usize)>, u32);

/// Helps to simplify the signature of import related functions.
pub struct GltfData {
  /// Only present when content fingerprints were requested.
  pub buffers: Option<Vec<gltf::buffer::Data>>,
  pub materials: AHashMap<(Option<usize>, MaterialKind), MaterialId>,
  pub geometries: AHashMap<PrimitiveKey, GeometryId>,
  /// Primitive objects built for each mesh, cloned for every node using it.
  pub meshes: AHashMap<usize, Vec<SceneNode>>,
  /// How many nodes reference each mesh.
  pub mesh_refs: AHashMap<usize, usize>,
  pub mesh_uses: AHashMap<usize, usize>,
  /// Indices of nodes used as skin joints.
  pub joints: AHashSet<usize>,
  names_used: AHashSet<String>,
}

impl GltfData {
  pub fn new(buffers: Option<Vec<gltf::buffer::Data>>) -> Self {
    GltfData {
      buffers,
      materials: Default::default(),
      geometries: Default::default(),
      meshes: Default::default(),
      mesh_refs: Default::default(),
      mesh_uses: Default::default(),
      joints: Default::default(),
      names_used: Default::default(),
    }
  }

  ///
  /// Reserve a unique node name. Repeats get `_1`, `_2`, ... appended.
  ///
  pub fn unique_name(&mut self, original: &str) -> String {
    let sanitized = sanitize_node_name(original);
    let mut name = sanitized.clone();
    let mut i = 1;
    while self.names_used.contains(&name) {
      name = format!("{}_{}", sanitized, i);
      i += 1;
    }
    self.names_used.insert(name.clone());
    name
  }

  ///
  /// Shared material for a primitive. Points and lines get their own variant
  /// of the same glTF material.
  ///
  pub fn load_material(
    &mut self,
    material: &gltf::Material<'_>,
    mode: Mode,
    graph: &mut SceneGraph,
  ) -> MaterialId {
    let kind = match mode {
      Mode::Points => MaterialKind::Points,
      Mode::Lines | Mode::LineLoop | Mode::LineStrip => MaterialKind::Line,
      _ if material.unlit() => MaterialKind::Basic,
      _ => MaterialKind::Standard,
    };
    let key = (material.index(), kind);
    if let Some(id) = self.materials.get(&key) {
      return *id;
    }

    let fingerprint = self.buffers.as_ref().map(|_| fingerprint_material(material, kind));
    let id = graph.add_material(Material {
      name: material.name().unwrap_or_default().to_string(),
      kind,
      fingerprint,
    });
    self.materials.insert(key, id);
    id
  }

  ///
  /// Shared geometry for a primitive. Primitives reading the same accessors share one.
  ///
  pub fn load_geometry(
    &mut self,
    primitive: &gltf::Primitive<'_>,
    graph: &mut SceneGraph,
  ) -> GeometryId {
    let mut attributes: Vec<(String, usize)> = primitive
      .attributes()
      .map(|(semantic, accessor)| (format!("{:?}", semantic), accessor.index()))
      .collect();
    attributes.sort();
    let key = (
      primitive.indices().map(|accessor| accessor.index()),
      attributes,
      primitive.mode().as_gl_enum(),
    );
    if let Some(id) = self.geometries.get(&key) {
      return *id;
    }

    let fingerprint = self
      .buffers
      .as_ref()
      .map(|buffers| fingerprint_primitive(primitive, buffers));
    let id = graph.add_geometry(Geometry { fingerprint });
    self.geometries.insert(key, id);
    id
  }
}

///
/// Hash of everything a primitive draws, independent of which accessors hold it.
///
fn fingerprint_primitive(primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> u64 {
  let mut hasher = AHasher::default();
  primitive.mode().as_gl_enum().hash(&mut hasher);

  let mut attributes: Vec<_> = primitive
    .attributes()
    .map(|(semantic, accessor)| (format!("{:?}", semantic), accessor))
    .collect();
  attributes.sort_by(|a, b| a.0.cmp(&b.0));
  for (semantic, accessor) in &attributes {
    semantic.hash(&mut hasher);
    hash_accessor(accessor, buffers, &mut hasher);
  }
  if let Some(indices) = primitive.indices() {
    "indices".hash(&mut hasher);
    hash_accessor(&indices, buffers, &mut hasher);
  }
  for target in primitive.morph_targets() {
    for accessor in [target.positions(), target.normals(), target.tangents()]
      .into_iter()
      .flatten()
    {
      hash_accessor(&accessor, buffers, &mut hasher);
    }
  }
  hasher.finish()
}

fn hash_accessor<H: Hasher>(
  accessor: &gltf::Accessor<'_>,
  buffers: &[gltf::buffer::Data],
  state: &mut H,
) {
  accessor.count().hash(state);
  accessor.size().hash(state);
  accessor.normalized().hash(state);

  let Some(view) = accessor.view() else {
    // Sparse-only or empty accessor, nothing stored in a buffer.
    accessor.index().hash(state);
    return;
  };
  let Some(buffer) = buffers.get(view.buffer().index()) else {
    accessor.index().hash(state);
    return;
  };

  let element = accessor.size();
  let stride = view.stride().unwrap_or(element);
  let start = view.offset() + accessor.offset();
  for i in 0..accessor.count() {
    let from = start + i * stride;
    match buffer.0.get(from..from + element) {
      Some(bytes) => bytes.hash(state),
      None => break,
    }
  }
}

///
/// Hash of a material definition with the name left out.
///
fn fingerprint_material(material: &gltf::Material<'_>, kind: MaterialKind) -> u64 {
  let mut hasher = AHasher::default();
  kind.hash(&mut hasher);

  let pbr = material.pbr_metallic_roughness();
  for value in pbr.base_color_factor() {
    value.to_bits().hash(&mut hasher);
  }
  pbr.metallic_factor().to_bits().hash(&mut hasher);
  pbr.roughness_factor().to_bits().hash(&mut hasher);
  for value in material.emissive_factor() {
    value.to_bits().hash(&mut hasher);
  }
  material.double_sided().hash(&mut hasher);
  format!("{:?}", material.alpha_mode()).hash(&mut hasher);
  material.alpha_cutoff().map(f32::to_bits).hash(&mut hasher);

  let textures = [
    pbr.base_color_texture().map(|info| info.texture().index()),
    pbr.metallic_roughness_texture().map(|info| info.texture().index()),
    material.normal_texture().map(|info| info.texture().index()),
    material.occlusion_texture().map(|info| info.texture().index()),
    material.emissive_texture().map(|info| info.texture().index()),
  ];
  textures.hash(&mut hasher);
  hasher.finish()
}
