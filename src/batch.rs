use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::job;
use crate::options::Options;

/// Batch config file, usually `batchgltf.json`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
  /// Where components are written.
  pub src_dir: PathBuf,
  /// Where assets are copied so the app can serve them.
  pub public_dir: PathBuf,
  /// Options shared by every asset.
  #[serde(default)]
  pub default_options: Map<String, Value>,
  pub assets: Vec<BatchAsset>,
}

/// One asset of a [`BatchConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAsset {
  /// Path of the glTF/GLB file.
  pub gltf: PathBuf,
  /// Component file name, without extension.
  pub class_name: String,
  /// Options overriding the defaults for this asset.
  #[serde(default)]
  pub options: Map<String, Value>,
}

impl BatchConfig {
  pub fn load<P: AsRef<Path>>(path: P) -> Result<BatchConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
  }
}

///
/// Convert every asset listed in the config at `config_path`.
///
/// Relative paths in the config are resolved against the config's directory.
/// Assets are processed in order, the first failure stops the batch.
/// Returns how many assets were converted.
///
pub fn run<P: AsRef<Path>>(config_path: P) -> Result<usize> {
  let config_path = config_path.as_ref();
  let config = BatchConfig::load(config_path)?;
  let base = config_path.parent().unwrap_or_else(|| Path::new(""));

  let defaults = Options::default().merged(&config.default_options)?;
  let src_dir = base.join(&config.src_dir);
  let public_dir = base.join(&config.public_dir);

  info!(
    "gltfjsx: batch [{}], {} assets.",
    config_path.display(),
    config.assets.len()
  );

  for asset in &config.assets {
    if let Err(e) = run_asset(asset, base, &defaults, &src_dir, &public_dir) {
      error!("gltfjsx: batch halted at [{}]. {}", asset.gltf.display(), e);
      return Err(e);
    }
  }

  info!("gltfjsx: batch done, {} assets converted.", config.assets.len());
  Ok(config.assets.len())
}

fn run_asset(
  asset: &BatchAsset,
  base: &Path,
  defaults: &Options,
  src_dir: &Path,
  public_dir: &Path,
) -> Result<()> {
  let options = defaults.merged(&asset.options)?;
  let input = base.join(&asset.gltf);
  let extension = if options.types { "tsx" } else { "jsx" };
  let output = src_dir.join(format!("{}.{}", asset.class_name, extension));

  info!(
    "gltfjsx: converting [{}] to [{}].",
    input.display(),
    output.display()
  );
  fs::create_dir_all(src_dir).map_err(|e| Error::io(src_dir, e))?;
  job::convert(&input, &output, &options)?;

  fs::create_dir_all(public_dir).map_err(|e| Error::io(public_dir, e))?;
  copy_if_changed(&input, public_dir)?;
  Ok(())
}

///
/// Copy `source` into `dir` unless an identical file is already there.
///
/// Returns whether a copy happened.
///
fn copy_if_changed(source: &Path, dir: &Path) -> Result<bool> {
  let name = source
    .file_name()
    .ok_or_else(|| Error::io(source, std::io::ErrorKind::InvalidInput.into()))?;
  let target = dir.join(name);

  if target.exists() {
    let existing = fs::read(&target).map_err(|e| Error::io(&target, e))?;
    let incoming = fs::read(source).map_err(|e| Error::io(source, e))?;
    if existing == incoming {
      info!("gltfjsx: [{}] is up to date, skipping copy.", target.display());
      return Ok(false);
    }
  }

  fs::copy(source, &target).map_err(|e| Error::io(&target, e))?;
  info!("gltfjsx: copied [{}] to [{}].", source.display(), dir.display());
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch(name: &str) -> PathBuf {
    drop(env_logger::try_init());

    let dir = std::env::temp_dir().join(format!("gltfjsx-batch-{}-{}", name, std::process::id()));
    drop(fs::remove_dir_all(&dir));
    if let Err(e) = fs::create_dir_all(&dir) {
      panic!("scratch: could not create [{}]. {}", dir.display(), e);
    }
    dir
  }

  fn write(path: &Path, contents: &str) {
    if let Err(e) = fs::write(path, contents) {
      panic!("could not write [{}]. {}", path.display(), e);
    }
  }

  fn fixture() -> String {
    match fs::canonicalize("tests/robot.gltf") {
      Ok(path) => path.to_string_lossy().into_owned(),
      Err(e) => panic!("robot fixture missing. {}", e),
    }
  }

  #[test]
  fn config_uses_camel_case() {
    let config: BatchConfig = match serde_json::from_str(
      r#"{
        "srcDir": "src/models",
        "publicDir": "public",
        "defaultOptions": { "types": true },
        "assets": [{ "gltf": "robot.glb", "className": "Robot" }]
      }"#,
    ) {
      Ok(config) => config,
      Err(e) => panic!("config failed to parse. {}", e),
    };
    assert_eq!(config.src_dir, PathBuf::from("src/models"));
    assert_eq!(config.assets[0].class_name, "Robot");
    assert!(config.assets[0].options.is_empty());
    assert_eq!(config.default_options.get("types"), Some(&Value::Bool(true)));
  }

  #[test]
  fn batch_converts_and_copies() {
    let dir = scratch("run");
    let config = dir.join("batchgltf.json");
    let json = serde_json::json!({
      "srcDir": "src",
      "publicDir": "public",
      "defaultOptions": { "types": true },
      "assets": [
        { "gltf": fixture(), "className": "Robot" },
        { "gltf": fixture(), "className": "PlainRobot", "options": { "types": false } }
      ]
    });
    write(&config, &json.to_string());

    match run(&config) {
      Ok(count) => assert_eq!(count, 2),
      Err(e) => panic!("batch failed. {}", e),
    }
    assert!(dir.join("src/Robot.tsx").exists());
    assert!(dir.join("src/PlainRobot.jsx").exists());
    assert!(dir.join("public/robot.gltf").exists());
  }

  #[test]
  fn identical_assets_are_not_copied_again() {
    let dir = scratch("copy");
    let source = dir.join("crate.glb");
    write(&source, "glTF");
    let public = dir.join("public");
    if let Err(e) = fs::create_dir_all(&public) {
      panic!("could not create public dir. {}", e);
    }

    assert!(matches!(copy_if_changed(&source, &public), Ok(true)));
    assert!(matches!(copy_if_changed(&source, &public), Ok(false)));
    write(&source, "glTF2");
    assert!(matches!(copy_if_changed(&source, &public), Ok(true)));
  }

  #[test]
  fn first_failure_halts_the_batch() {
    let dir = scratch("halt");
    let config = dir.join("batchgltf.json");
    let json = serde_json::json!({
      "srcDir": "src",
      "publicDir": "public",
      "assets": [
        { "gltf": "missing.glb", "className": "Missing" },
        { "gltf": fixture(), "className": "Robot" }
      ]
    });
    write(&config, &json.to_string());

    assert!(matches!(run(&config), Err(Error::Io { .. })));
    assert!(!dir.join("src/Robot.jsx").exists());
  }

  #[test]
  fn missing_config_is_an_io_error() {
    let dir = scratch("config");
    assert!(matches!(
      run(dir.join("nope.json")),
      Err(Error::Io { .. })
    ));
  }
}
