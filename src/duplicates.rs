use ahash::AHashMap;

use crate::options::Options;
use crate::scene::{GeometryId, MaterialId, NodeKind, SceneGraph};
use crate::utils::property_access;

/// Geometry and material a mesh draws. Two meshes with the same pair can share one instance.
pub type DuplicateKey = (GeometryId, MaterialId);

/// A geometry/material pair seen while scanning the scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Duplicate {
  /// Number of meshes drawing this pair.
  pub count: usize,
  /// Unique component name, used as `instances.<name>`.
  pub name: String,
  /// Expression reaching the first mesh in the loaded node table.
  pub node: String,
}

///
/// Reuse index of geometry/material pairs, built once per conversion.
///
/// Entries keep the order in which their first mesh was found, so output is stable.
///
#[derive(Clone, Debug, Default)]
pub struct DuplicateIndex {
  entries: Vec<(DuplicateKey, Duplicate)>,
  lookup: AHashMap<DuplicateKey, usize>,
}

impl DuplicateIndex {
  ///
  /// Scan every plain mesh of the scene once.
  ///
  /// Unless `instanceall` is set, pairs drawn by a single mesh are dropped.
  ///
  pub fn analyze(graph: &SceneGraph, options: &Options) -> Self {
    let mut entries: Vec<(DuplicateKey, Duplicate)> = vec![];
    let mut lookup: AHashMap<DuplicateKey, usize> = AHashMap::new();

    let mut stack = vec![graph.root()];
    while let Some(id) = stack.pop() {
      let node = graph.node(id);
      // Bones render as opaque handles, nothing attached below them is written out.
      if node.kind == NodeKind::Bone {
        continue;
      }
      stack.extend(graph.children(id).iter().rev());

      // Skinned and natively instanced meshes cannot be merged.
      if node.kind != NodeKind::Mesh {
        continue;
      }
      let (Some(geometry), Some(material)) = (node.geometry, node.material) else {
        continue;
      };
      let key = (geometry, material);
      match lookup.get(&key) {
        Some(index) => entries[*index].1.count += 1,
        None => {
          let name = unique_name(&entries, &component_name(&node.name));
          lookup.insert(key, entries.len());
          entries.push((
            key,
            Duplicate {
              count: 1,
              name,
              node: format!("nodes{}", property_access(&node.name)),
            },
          ));
        }
      }
    }

    if !options.instanceall {
      entries.retain(|(_, duplicate)| duplicate.count > 1);
    }
    let lookup = entries
      .iter()
      .enumerate()
      .map(|(index, (key, _))| (*key, index))
      .collect();
    DuplicateIndex { entries, lookup }
  }

  pub fn get(&self, geometry: GeometryId, material: MaterialId) -> Option<&Duplicate> {
    self
      .lookup
      .get(&(geometry, material))
      .map(|index| &self.entries[*index].1)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Duplicate> {
    self.entries.iter().map(|(_, duplicate)| duplicate)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

///
/// Letters of the node name, capitalized. `Part` when nothing is left.
///
fn component_name(node_name: &str) -> String {
  let letters: String = node_name.chars().filter(char::is_ascii_alphabetic).collect();
  let mut chars = letters.chars();
  match chars.next() {
    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
    None => "Part".to_string(),
  }
}

///
/// `attempt`, then `attempt1`, `attempt2`, ... until no entry uses it.
///
fn unique_name(entries: &[(DuplicateKey, Duplicate)], attempt: &str) -> String {
  let taken = |candidate: &str| entries.iter().any(|(_, duplicate)| duplicate.name == candidate);
  if !taken(attempt) {
    return attempt.to_string();
  }
  let mut index = 1;
  loop {
    let candidate = format!("{}{}", attempt, index);
    if !taken(&candidate) {
      return candidate;
    }
    index += 1;
  }
}
