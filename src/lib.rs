//! This crate turns [glTF 2.0](https://www.khronos.org/gltf) assets into
//! declarative [react-three-fiber](https://github.com/pmndrs/react-three-fiber)
//! components.
//!
//! It's based on the [gltf](https://github.com/gltf-rs/gltf) crate. The scene is
//! loaded the way three.js loads it, pruned of redundant wrapper groups, and
//! written out as JSX that references the runtime node and material tables.
//!
//! # Example
//!
//! ```no_run
//! let mut scene = gltfjsx::load("models/robot.glb").expect("Failed to load glTF");
//! let options = gltfjsx::Options::default();
//! let source = gltfjsx::parse("robot.glb", &mut scene, &options).expect("Failed to convert");
//! println!("{}", source);
//! ```

/// Module wrapper: header comment, imports and component definitions.
pub mod assemble;
/// Batch conversion driven by a JSON config.
pub mod batch;
/// Element kinds and instancing decisions per node.
pub mod classify;
/// Reuse index of geometry/material pairs.
pub mod duplicates;
/// Markup rendering of the pruned tree.
pub mod emit;
mod error;
/// Single asset conversion: load, convert, format, write.
pub mod job;
mod loader;
mod options;
/// Node attributes and number formatting.
pub mod props;
/// Removal of redundant groups.
pub mod prune;
/// The scene graph the converter works on.
pub mod scene;
/// Content based deduplication run before conversion.
pub mod transform;
mod utils;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use gltf::Gltf;
use log::info;

pub use error::{Error, Result};
pub use options::Options;
pub use scene::{
  Animation, Camera, Geometry, GeometryId, Light, LightKind, LineKind, Material, MaterialId,
  MaterialKind, MorphTargets, NodeId, NodeKind, Projection, SceneGraph, SceneNode, Transform,
};

use classify::Classifier;
use duplicates::DuplicateIndex;
use emit::Emitter;
use utils::{round_to, GltfData};

/// Settings of the loader itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoadOptions {
  /// Hash buffer contents so [`transform::dedup`] can merge identical data.
  pub fingerprint: bool,
}

/// Load the default scene of a glTF 2.0 file.
///
/// Note: You can use this function with either a `Gltf` (standard `glTF`) or `Glb` (binary glTF).
///
/// # Example
///
/// ```no_run
/// let scene = gltfjsx::load("tests/robot.gltf").expect("Failed to load glTF");
/// println!("Nodes: #{}", scene.len());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<SceneGraph> {
  load_with(path, &LoadOptions::default())
}

/// Load the default scene of a glTF 2.0 file with loader settings.
pub fn load_with<P: AsRef<Path>>(path: P, load_options: &LoadOptions) -> Result<SceneGraph> {
  let path = path.as_ref();

  // We need the base path for the GLTF lib, external buffers are relative to it.
  let base = path.parent().unwrap_or_else(|| Path::new("./"));

  // The buffer we're going to read the model into.
  let model_reader = read_path_to_buf_read(path)?;

  // Now we need to get the "Document" from the GLTF lib.
  let gltf_data = Gltf::from_reader(model_reader).map_err(|source| Error::Gltf {
    path: path.to_path_buf(),
    source,
  })?;

  // Buffer contents only matter for fingerprints.
  let buffers = if load_options.fingerprint {
    let buffers = gltf::import_buffers(&gltf_data.document, Some(base), gltf_data.blob.clone())
      .map_err(|source| Error::Gltf {
        path: path.to_path_buf(),
        source,
      })?;
    Some(buffers)
  } else {
    None
  };

  let mut data = GltfData::new(buffers);
  let graph = loader::build_graph(&gltf_data.document, &mut data, path)?;
  info!(
    "gltfjsx: loaded [{}]. {} nodes, {} animations.",
    path.display(),
    graph.len(),
    graph.animations.len()
  );
  Ok(graph)
}

///
/// Convert a loaded scene into component source code.
///
/// `file_name` is the asset path the component will load at runtime. The
/// graph is pruned in place and should not be converted again.
///
pub fn parse(file_name: &str, graph: &mut SceneGraph, options: &Options) -> Result<String> {
  if options.debug {
    let mut tree = String::new();
    dump_tree(graph, graph.root(), 0, options.precision, &mut tree);
    info!("gltfjsx: input tree\n{}", tree);
  }

  let duplicates = DuplicateIndex::analyze(graph, options);

  // Decide every removal before touching the graph.
  let plan = {
    let classifier = Classifier::new(graph, &duplicates, options);
    prune::plan(&classifier, options)?
  };
  prune::commit(graph, &plan);

  let classifier = Classifier::new(graph, &duplicates, options);
  let body = Emitter::new(&classifier, options).emit(graph.root(), 3)?;
  Ok(assemble::assemble(
    file_name,
    &classifier,
    &duplicates,
    &body,
    options,
  ))
}

///
/// Automatically parse a file path into a BufReader<File>.
///
fn read_path_to_buf_read(path: &Path) -> Result<BufReader<File>> {
  match File::open(path) {
    Ok(file) => Ok(BufReader::new(file)),
    Err(e) => Err(Error::io(path, e)),
  }
}

///
/// One line per node: type, name and rounded transform.
///
fn dump_tree(graph: &SceneGraph, id: NodeId, depth: usize, precision: u32, out: &mut String) {
  let node = graph.node(id);
  let round = |v: glam::DVec3| v.to_array().map(|x| round_to(x, precision));
  let material = match node.material {
    Some(material) => graph.material(material).name.clone(),
    None => String::new(),
  };
  out.push_str(&format!(
    "{}{} {} pos: {:?} scale: {:?} rot: {:?} mat: {}\n",
    "  ".repeat(depth),
    node.kind.type_name(),
    node.name,
    round(node.transform.position),
    round(node.transform.scale),
    round(node.transform.rotation),
    material
  ));
  for child in graph.children(id) {
    dump_tree(graph, *child, depth + 1, precision, out);
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
