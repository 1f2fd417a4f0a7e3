use itertools::Itertools;
use serde_json::Value;

use crate::classify::Classifier;
use crate::duplicates::DuplicateIndex;
use crate::options::Options;
use crate::utils::is_var_name;

///
/// Wrap emitted markup into a complete component module.
///
/// `body` is the scene markup, already indented for its place inside the
/// returned root group. `file_name` is the asset path the component loads,
/// relative to where it is served from.
///
pub fn assemble(
  file_name: &str,
  classifier: &Classifier<'_>,
  duplicates: &DuplicateIndex,
  body: &str,
  options: &Options,
) -> String {
  let graph = classifier.graph();
  let url = if file_name.to_lowercase().starts_with("http") {
    file_name.to_string()
  } else {
    format!("/{}", file_name)
  };
  let load = match &options.draco {
    Some(draco) => format!("useGLTF({}, {})", quote(&url), draco),
    None => format!("useGLTF({})", quote(&url)),
  };
  let typed = if options.types { " as GLTFResult" } else { "" };
  let has_animations = !graph.animations.is_empty();
  let has_instances = options.instancing() && !duplicates.is_empty();

  let mut out = String::new();
  out.push_str(&header(classifier, options));
  out.push('\n');

  if options.types {
    out.push_str("import * as THREE from 'three'\n");
  }
  if has_instances {
    out.push_str("import React, { useRef, useMemo } from 'react'\n");
  } else {
    out.push_str("import React, { useRef } from 'react'\n");
  }
  let mut drei = vec!["useGLTF"];
  if has_instances {
    drei.push("Merged");
  }
  for camera in ["PerspectiveCamera", "OrthographicCamera"] {
    if body.contains(camera) {
      drei.push(camera);
    }
  }
  if has_animations {
    drei.push("useAnimations");
  }
  out.push_str(&format!(
    "import {{ {} }} from '@react-three/drei'\n",
    drei.join(", ")
  ));
  if options.types {
    out.push_str("import { GLTF } from 'three-stdlib'\n");
    out.push('\n');
    out.push_str(&types(classifier));
  }

  if has_instances {
    let props = if options.types {
      "props: JSX.IntrinsicElements['group']"
    } else {
      "props"
    };
    let entries = duplicates
      .iter()
      .map(|duplicate| format!("      {}: {},\n", duplicate.name, duplicate.node))
      .join("");
    out.push_str(&format!(
      "
export default function InstancedModel({props}) {{
  const {{ nodes }} = {load}{typed}
  const instances = useMemo(
    () => ({{
{entries}    }}),
    [nodes]
  )
  return (
    <Merged meshes={{instances}} {{...props}}>
      {{(instances) => <Model instances={{instances}} />}}
    </Merged>
  )
}}
"
    ));
  }

  let export = if has_instances { "" } else { "export default " };
  let params = match (has_instances, options.types) {
    (true, true) => "{ instances, ...props }: { instances: any } & JSX.IntrinsicElements['group']",
    (true, false) => "{ instances, ...props }",
    (false, true) => "props: JSX.IntrinsicElements['group']",
    (false, false) => "props",
  };
  let group_ref = if options.types {
    "useRef<THREE.Group>()"
  } else {
    "useRef()"
  };
  let tables = if has_animations {
    "nodes, materials, animations"
  } else {
    "nodes, materials"
  };
  let actions = match (has_animations, options.types) {
    (true, true) => "\n  const { actions } = useAnimations<GLTFActions>(animations, group)",
    (true, false) => "\n  const { actions } = useAnimations(animations, group)",
    (false, _) => "",
  };
  out.push_str(&format!(
    "
{export}function Model({params}) {{
  const group = {group_ref}
  const {{ {tables} }} = {load}{typed}{actions}
  return (
    <group ref={{group}} {{...props}} dispose={{null}}>
{body}    </group>
  )
}}

useGLTF.preload({url})
",
    url = quote(&url)
  ));
  out
}

/// Leading comment: tool, user header, size report and asset extras.
fn header(classifier: &Classifier<'_>, options: &Options) -> String {
  let mut lines = vec![format!(
    "Auto-generated by: gltfjsx {}",
    env!("CARGO_PKG_VERSION")
  )];
  if let Some(header) = &options.header {
    lines.push(header.clone());
  }
  if let Some(size) = &options.size {
    lines.push(format!("Files: {}", size));
  }
  if let Some(extras) = &classifier.graph().extras {
    for (key, value) in extras {
      match value {
        Value::String(text) => lines.push(format!("{}: {}", key, text)),
        other => lines.push(format!("{}: {}", key, other)),
      }
    }
  }
  // The text must not end the comment early.
  let text = lines.join("\n").replace("*/", "* /");
  format!("/*\n{}\n*/\n", text)
}

///
/// TypeScript shape of what `useGLTF` returns for this asset.
///
fn types(classifier: &Classifier<'_>) -> String {
  let graph = classifier.graph();
  let nodes = graph.traverse(graph.root());

  let meshes = nodes
    .iter()
    .filter(|id| graph.node(**id).kind.is_mesh());
  // Nested bones are reachable through their root bone.
  let bones = nodes.iter().filter(|id| {
    let node = graph.node(**id);
    classifier.kind(**id).is_bone()
      && !node
        .parent
        .is_some_and(|parent| classifier.kind(parent).is_bone())
  });
  let node_types = meshes
    .chain(bones)
    .map(|id| (classifier.name(*id), graph.node(*id).kind.type_name()))
    .unique_by(|(name, _)| *name)
    .map(|(name, type_name)| format!("    {}: THREE.{}\n", type_key(name), type_name))
    .join("");

  let material_types = nodes
    .iter()
    .filter_map(|id| graph.node(*id).material)
    .map(|id| graph.material(id))
    .filter(|material| !material.name.is_empty())
    .unique_by(|material| material.name.as_str())
    .map(|material| {
      format!(
        "    {}: THREE.{}\n",
        type_key(&material.name),
        material.kind.type_name()
      )
    })
    .join("");

  let mut out = format!(
    "type GLTFResult = GLTF & {{\n  nodes: {{\n{}  }}\n  materials: {{\n{}  }}\n}}\n",
    node_types, material_types
  );
  if !graph.animations.is_empty() {
    let names = graph
      .animations
      .iter()
      .map(|clip| Value::String(clip.name.clone()).to_string())
      .join(" | ");
    out.push_str(&format!(
      "\ntype ActionName = {}\ntype GLTFActions = Record<ActionName, THREE.AnimationAction>\n",
      names
    ));
  }
  out
}

fn type_key(name: &str) -> String {
  if is_var_name(name) {
    name.to_string()
  } else {
    format!("['{}']", name.replace('\\', "\\\\").replace('\'', "\\'"))
  }
}

/// Single-quoted JavaScript string literal.
fn quote(text: &str) -> String {
  format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scene::{
    Animation, Camera, Geometry, Material, MaterialKind, NodeKind, SceneGraph, SceneNode,
  };
  use serde_json::json;

  fn scene() -> SceneGraph {
    let mut graph = SceneGraph::new("Scene");
    let geometry = graph.add_geometry(Geometry::default());
    let material = graph.add_material(Material {
      name: "Stone".to_string(),
      kind: MaterialKind::Standard,
      fingerprint: None,
    });
    let root = graph.root();
    graph.add(root, SceneNode::new("Rock", NodeKind::Mesh).with_mesh(geometry, material));
    graph.add(root, SceneNode::new("Rock.001", NodeKind::Mesh).with_mesh(geometry, material));
    graph
  }

  fn module(graph: &SceneGraph, body: &str, options: &Options) -> String {
    let duplicates = DuplicateIndex::analyze(graph, options);
    let classifier = Classifier::new(graph, &duplicates, options);
    assemble("models/rock.glb", &classifier, &duplicates, body, options)
  }

  #[test]
  fn plain_module_imports_only_what_it_uses() {
    let graph = scene();
    let out = module(&graph, "      <mesh />\n", &Options::default());
    assert!(out.starts_with("/*\nAuto-generated by: gltfjsx"));
    assert!(out.contains("import React, { useRef } from 'react'\n"));
    assert!(out.contains("import { useGLTF } from '@react-three/drei'\n"));
    assert!(out.contains("export default function Model(props) {"));
    assert!(out.contains("const { nodes, materials } = useGLTF('/models/rock.glb')\n"));
    assert!(out.contains("dispose={null}>\n      <mesh />\n    </group>"));
    assert!(out.ends_with("useGLTF.preload('/models/rock.glb')\n"));
    assert!(!out.contains("THREE"));
    assert!(!out.contains("useAnimations"));
  }

  #[test]
  fn cameras_are_imported_when_used() {
    let mut graph = scene();
    let root = graph.root();
    graph.add(root, SceneNode::new("Cam", NodeKind::Camera(Camera::default())));
    let out = module(
      &graph,
      "      <PerspectiveCamera makeDefault={false} />\n",
      &Options::default(),
    );
    assert!(out.contains("import { useGLTF, PerspectiveCamera } from '@react-three/drei'"));
  }

  #[test]
  fn orthographic_cameras_are_imported() {
    let graph = scene();
    let out = module(
      &graph,
      "      <OrthographicCamera makeDefault={false} />\n",
      &Options::default(),
    );
    assert!(out.contains("import { useGLTF, OrthographicCamera } from '@react-three/drei'\n"));
    assert!(!out.contains("PerspectiveCamera"));
  }

  #[test]
  fn animations_and_types() {
    let mut graph = scene();
    graph.animations.push(Animation::new("Roll"));
    graph.animations.push(Animation::new("Bounce"));
    let options = Options {
      types: true,
      ..Default::default()
    };
    let out = module(&graph, "", &options);
    assert!(out.contains("import * as THREE from 'three'\n"));
    assert!(out.contains("import { useGLTF, useAnimations } from '@react-three/drei'"));
    assert!(out.contains("import { GLTF } from 'three-stdlib'"));
    assert!(out.contains("    Rock: THREE.Mesh\n    ['Rock.001']: THREE.Mesh\n"));
    assert!(out.contains("  materials: {\n    Stone: THREE.MeshStandardMaterial\n  }"));
    assert!(out.contains("type ActionName = \"Roll\" | \"Bounce\""));
    assert!(out.contains("const group = useRef<THREE.Group>()"));
    assert!(out.contains(
      "const { nodes, materials, animations } = useGLTF('/models/rock.glb') as GLTFResult"
    ));
    assert!(out.contains("const { actions } = useAnimations<GLTFActions>(animations, group)"));
  }

  #[test]
  fn instances_get_a_merged_wrapper() {
    let graph = scene();
    let options = Options {
      instance: true,
      ..Default::default()
    };
    let out = module(&graph, "      <instances.Rock />\n      <instances.Rock />\n", &options);
    assert!(out.contains("import React, { useRef, useMemo } from 'react'"));
    assert!(out.contains("import { useGLTF, Merged } from '@react-three/drei'"));
    assert!(out.contains("export default function InstancedModel(props) {"));
    assert_eq!(out.matches("      Rock: nodes.Rock,\n").count(), 1);
    assert!(out.contains("\nfunction Model({ instances, ...props }) {"));
    assert_eq!(out.matches("<instances.Rock />").count(), 2);
  }

  #[test]
  fn header_carries_extras_draco_and_size() {
    let mut graph = scene();
    let mut extras = serde_json::Map::new();
    extras.insert("author".to_string(), json!("Jane"));
    extras.insert("license".to_string(), json!("CC-BY-4.0"));
    graph.extras = Some(extras);
    let options = Options {
      header: Some("Do not edit */".to_string()),
      size: Some("rock.glb [1.2KB]".to_string()),
      draco: Some(json!("/draco/")),
      ..Default::default()
    };
    let out = module(&graph, "", &options);
    assert!(out.contains("Do not edit * /\nFiles: rock.glb [1.2KB]\nauthor: Jane\nlicense: CC-BY-4.0\n*/"));
    assert!(out.contains("useGLTF('/models/rock.glb', \"/draco/\")"));
  }

  #[test]
  fn remote_urls_are_kept() {
    let graph = scene();
    let options = Options::default();
    let duplicates = DuplicateIndex::analyze(&graph, &options);
    let classifier = Classifier::new(&graph, &duplicates, &options);
    let out = assemble(
      "https://cdn.example.com/rock.glb",
      &classifier,
      &duplicates,
      "",
      &options,
    );
    assert!(out.contains("useGLTF.preload('https://cdn.example.com/rock.glb')"));
  }
}
