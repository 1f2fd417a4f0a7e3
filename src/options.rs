use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Conversion settings. Passed by reference through every stage of a run.
///
/// Field names match the CLI flags. Batch configs may use the same names.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
  /// Number of fractional digits kept for every emitted number.
  pub precision: u32,
  /// Emit `name` on every element.
  #[serde(alias = "verbose")]
  pub keepnames: bool,
  /// Never prune groups.
  pub keepgroups: bool,
  /// Blanket `castShadow receiveShadow` on meshes.
  pub shadows: bool,
  /// Emit `userData`.
  pub meta: bool,
  /// Emit TypeScript annotations.
  pub types: bool,
  /// Extra argument handed to `useGLTF`, usually the draco decoder path.
  pub draco: Option<Value>,
  /// Instance geometry/material pairs used more than once.
  pub instance: bool,
  /// Instance every geometry/material pair.
  pub instanceall: bool,
  /// Enable the transform-collapsing pruning rules.
  pub aggressive: bool,
  /// Dump the input tree before conversion.
  pub debug: bool,
  /// Free-form text placed in the header comment.
  pub header: Option<String>,
  /// Size report placed in the header comment.
  pub size: Option<String>,
  /// Directory the asset is served from. Defaults to the asset's own directory.
  pub root: Option<PathBuf>,
  /// Deduplicate geometries and materials before generating code.
  pub transform: bool,
  /// External command the generated source is piped through.
  pub formatter: Option<String>,
}

impl Default for Options {
  fn default() -> Self {
    Options {
      precision: 2,
      keepnames: false,
      keepgroups: false,
      shadows: false,
      meta: false,
      types: false,
      draco: None,
      instance: false,
      instanceall: false,
      aggressive: false,
      debug: false,
      header: None,
      size: None,
      root: None,
      transform: false,
      formatter: None,
    }
  }
}

impl Options {
  /// Whether any instancing policy is active.
  pub fn instancing(&self) -> bool {
    self.instance || self.instanceall
  }

  /// Overlay `overrides` (a JSON object of option fields) on top of `self`.
  pub fn merged(&self, overrides: &serde_json::Map<String, Value>) -> serde_json::Result<Options> {
    let mut base = serde_json::to_value(self)?;
    if let Value::Object(map) = &mut base {
      for (key, value) in overrides {
        // `verbose` is an alias; both spellings at once is a duplicate field.
        let key = if key == "verbose" { "keepnames" } else { key.as_str() };
        map.insert(key.to_string(), value.clone());
      }
    }
    serde_json::from_value(base)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_cli() {
    let options = Options::default();
    assert_eq!(options.precision, 2);
    assert!(!options.instancing());
    assert!(options.draco.is_none());
  }

  #[test]
  fn batch_json_accepts_partial_objects() {
    let options: Options = match serde_json::from_str(r#"{ "types": true, "verbose": true }"#) {
      Ok(options) => options,
      Err(e) => panic!("options failed to parse. {}", e),
    };
    assert!(options.types);
    assert!(options.keepnames);
    assert_eq!(options.precision, 2);
  }

  #[test]
  fn overrides_win_over_defaults() {
    let defaults = Options {
      shadows: true,
      precision: 3,
      ..Default::default()
    };
    let overrides = match serde_json::json!({ "precision": 4, "instance": true, "verbose": true }) {
      Value::Object(map) => map,
      _ => panic!("not an object"),
    };
    let merged = match defaults.merged(&overrides) {
      Ok(merged) => merged,
      Err(e) => panic!("merge failed. {}", e),
    };
    assert_eq!(merged.precision, 4);
    assert!(merged.instance);
    assert!(merged.shadows);
    assert!(merged.keepnames);
  }
}
