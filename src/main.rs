use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use gltfjsx::{batch, job, Options};
use log::info;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gltfjsx")]
#[command(about = "Turn glTF assets into declarative react-three-fiber components")]
#[command(version)]
struct Cli {
  /// Input model (.gltf or .glb)
  #[arg(required_unless_present = "batch")]
  model: Option<PathBuf>,

  /// Output file (defaults to the capitalised model name with .jsx or .tsx)
  output: Option<PathBuf>,

  /// Add TypeScript definitions
  #[arg(short, long)]
  types: bool,

  /// Keep original names
  #[arg(short, long)]
  keepnames: bool,

  /// Keep (empty) groups, disable pruning
  #[arg(short = 'K', long)]
  keepgroups: bool,

  /// Include metadata (as userData)
  #[arg(short, long)]
  meta: bool,

  /// Let meshes cast and receive shadows
  #[arg(short, long)]
  shadows: bool,

  /// Number of fractional digits
  #[arg(short, long, default_value_t = 2)]
  precision: u32,

  /// Draco binary path
  #[arg(short, long)]
  draco: Option<String>,

  /// Sets directory from which .gltf file is served
  #[arg(short, long)]
  root: Option<PathBuf>,

  /// Instance re-occuring geometry
  #[arg(short, long)]
  instance: bool,

  /// Instance every geometry (for cheaper re-use)
  #[arg(short = 'I', long)]
  instanceall: bool,

  /// Deduplicate geometries and materials before converting
  #[arg(short = 'T', long)]
  transform: bool,

  /// Remove redundant transforms and groups more aggressively
  #[arg(short, long)]
  aggressive: bool,

  /// Debug output
  #[arg(short = 'D', long)]
  debug: bool,

  /// Add a header comment to the generated file
  #[arg(long)]
  header: Option<String>,

  /// Pipe the generated file through this command (e.g. "prettier --parser babel")
  #[arg(long)]
  formatter: Option<String>,

  /// Convert every asset listed in a batch config instead
  #[arg(long, conflicts_with = "model")]
  batch: Option<PathBuf>,
}

impl Cli {
  fn options(&self) -> Options {
    Options {
      precision: self.precision,
      keepnames: self.keepnames,
      keepgroups: self.keepgroups,
      shadows: self.shadows,
      meta: self.meta,
      types: self.types,
      draco: self.draco.clone().map(Value::String),
      instance: self.instance,
      instanceall: self.instanceall,
      aggressive: self.aggressive,
      debug: self.debug,
      header: self.header.clone(),
      size: None,
      root: self.root.clone(),
      transform: self.transform,
      formatter: self.formatter.clone(),
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.debug { "debug" } else { "info" };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

  if let Some(config) = &cli.batch {
    let count = batch::run(config)
      .with_context(|| format!("Batch [{}] failed", config.display()))?;
    info!("gltfjsx: {} assets converted.", count);
    return Ok(());
  }

  let Some(model) = &cli.model else {
    bail!("No model given");
  };
  if !model.exists() {
    bail!("Model not found: {}", model.display());
  }

  let options = cli.options();
  let output = match &cli.output {
    Some(output) => output.clone(),
    None => default_output(model, options.types)?,
  };

  job::convert(model, &output, &options)
    .with_context(|| format!("Failed to convert [{}]", model.display()))?;
  Ok(())
}

/// `robot.glb` becomes `Robot.jsx` in the working directory.
fn default_output(model: &Path, types: bool) -> Result<PathBuf> {
  let Some(stem) = model.file_stem().and_then(|stem| stem.to_str()) else {
    bail!("Cannot derive a component name from {}", model.display());
  };
  let mut chars = stem.chars();
  let name = match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
    None => bail!("Cannot derive a component name from {}", model.display()),
  };
  let extension = if types { "tsx" } else { "jsx" };
  Ok(PathBuf::from(format!("{}.{}", name, extension)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_output_is_capitalised() {
    match default_output(Path::new("models/robot-arm.glb"), false) {
      Ok(path) => assert_eq!(path, PathBuf::from("Robot-arm.jsx")),
      Err(e) => panic!("{}", e),
    }
    match default_output(Path::new("ship.gltf"), true) {
      Ok(path) => assert_eq!(path, PathBuf::from("Ship.tsx")),
      Err(e) => panic!("{}", e),
    }
  }

  #[test]
  fn flags_map_onto_options() {
    let cli = match Cli::try_parse_from([
      "gltfjsx", "robot.glb", "-t", "-K", "-p", "4", "-d", "/draco/", "-I", "-a",
    ]) {
      Ok(cli) => cli,
      Err(e) => panic!("{}", e),
    };
    let options = cli.options();
    assert!(options.types);
    assert!(options.keepgroups);
    assert!(!options.keepnames);
    assert_eq!(options.precision, 4);
    assert_eq!(options.draco, Some(Value::String("/draco/".to_string())));
    assert!(options.instanceall);
    assert!(options.aggressive);
  }

  #[test]
  fn batch_replaces_the_model() {
    assert!(Cli::try_parse_from(["gltfjsx", "--batch", "batchgltf.json"]).is_ok());
    assert!(Cli::try_parse_from(["gltfjsx"]).is_err());
  }
}
