use ahash::AHashMap;
use log::info;

use crate::scene::{GeometryId, MaterialId, MaterialKind, NodeId, SceneGraph};

/// What [`dedup`] merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupReport {
  /// Geometries redirected to an identical one.
  pub geometries: usize,
  /// Materials redirected to an identical one.
  pub materials: usize,
}

impl DedupReport {
  pub fn is_empty(&self) -> bool {
    self.geometries == 0 && self.materials == 0
  }
}

///
/// Point every node at the first geometry and material with the same content.
///
/// Only entries carrying a fingerprint take part, see [`crate::LoadOptions`].
/// Merged entries stay in the graph, nothing references them anymore.
///
pub fn dedup(graph: &mut SceneGraph) -> DedupReport {
  let mut report = DedupReport::default();

  let mut first_geometry: AHashMap<u64, GeometryId> = AHashMap::new();
  let mut geometry_map: AHashMap<GeometryId, GeometryId> = AHashMap::new();
  for (index, geometry) in graph.geometries.iter().enumerate() {
    let Some(fingerprint) = geometry.fingerprint else {
      continue;
    };
    let id = GeometryId(index);
    let keep = *first_geometry.entry(fingerprint).or_insert(id);
    if keep != id {
      geometry_map.insert(id, keep);
      report.geometries += 1;
    }
  }

  let mut first_material: AHashMap<(MaterialKind, u64), MaterialId> = AHashMap::new();
  let mut material_map: AHashMap<MaterialId, MaterialId> = AHashMap::new();
  for (index, material) in graph.materials.iter().enumerate() {
    let Some(fingerprint) = material.fingerprint else {
      continue;
    };
    let id = MaterialId(index);
    let keep = *first_material
      .entry((material.kind, fingerprint))
      .or_insert(id);
    if keep != id {
      material_map.insert(id, keep);
      report.materials += 1;
    }
  }

  for index in 0..graph.len() {
    let node = graph.node_mut(NodeId(index));
    if let Some(geometry) = node.geometry.and_then(|id| geometry_map.get(&id)) {
      node.geometry = Some(*geometry);
    }
    if let Some(material) = node.material.and_then(|id| material_map.get(&id)) {
      node.material = Some(*material);
    }
  }

  info!(
    "gltfjsx: dedup merged {} geometries and {} materials.",
    report.geometries, report.materials
  );
  report
}
