use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a conversion.
#[derive(Debug, Error)]
pub enum Error {
  /// Reading the asset or writing the component failed.
  #[error("I/O failure on [{path}]. {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The `gltf` crate refused the asset.
  #[error("Invalid glTF [{path}]. {source}")]
  Gltf {
    path: PathBuf,
    #[source]
    source: gltf::Error,
  },

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The asset parsed but contains nothing to turn into a component.
  #[error("Model contains no scenes. [{0}]")]
  NoScene(PathBuf),

  /// The scene graph holds a node the emitter cannot express.
  #[error("Malformed node [{name}]: {reason}")]
  MalformedNode { name: String, reason: String },

  /// The external formatter could not be run or exited with an error.
  #[error("Formatter [{command}] failed. {reason}")]
  Formatter { command: String, reason: String },
}

impl Error {
  pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
    Error::Io {
      path: path.into(),
      source,
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
