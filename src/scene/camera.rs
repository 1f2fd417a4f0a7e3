use glam::DVec2;
use gltf::camera::Projection as GltfProjection;

/// Camera properties as the runtime sees them.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
  /// Projection type and specific parameters
  pub projection: Projection,

  /// Zoom factor. glTF has no notion of it, so it is always 1 after loading.
  pub zoom: f64,

  /// The distance to the near clipping plane.
  pub near: f64,

  /// The distance to the far clipping plane.
  pub far: f64,
}

/// Camera projections
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
  /// Perspective projection
  Perspective {
    /// Vertical field of view, in degrees
    fov: f64,
    /// Aspect ratio, if specified
    aspect_ratio: Option<f64>,
  },
  /// Orthographic projection
  Orthographic {
    /// Half extents of the view volume
    scale: DVec2,
  },
}

impl Default for Projection {
  fn default() -> Self {
    Self::Perspective {
      fov: 50.0,
      aspect_ratio: None,
    }
  }
}

impl Camera {
  /// A perspective camera with runtime defaults and the given fov (degrees).
  pub fn perspective(fov: f64) -> Self {
    Camera {
      projection: Projection::Perspective {
        fov,
        aspect_ratio: None,
      },
      ..Default::default()
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self.projection {
      Projection::Perspective { .. } => "PerspectiveCamera",
      Projection::Orthographic { .. } => "OrthographicCamera",
    }
  }

  pub(crate) fn load(gltf_cam: gltf::Camera) -> Self {
    let mut cam = Self::default();

    match gltf_cam.projection() {
      GltfProjection::Orthographic(ortho) => {
        cam.projection = Projection::Orthographic {
          scale: DVec2::new(ortho.xmag() as f64, ortho.ymag() as f64),
        };
        cam.far = ortho.zfar() as f64;
        cam.near = ortho.znear() as f64;
      }
      GltfProjection::Perspective(pers) => {
        cam.projection = Projection::Perspective {
          fov: (pers.yfov() as f64).to_degrees(),
          aspect_ratio: pers.aspect_ratio().map(f64::from),
        };
        // A zero near plane is invalid at runtime, the loader falls back to 1.
        cam.near = match pers.znear() as f64 {
          near if near > 0.0 => near,
          _ => 1.0,
        };
        cam.far = pers.zfar().map(f64::from).unwrap_or(2e6);
      }
    };
    cam
  }
}

impl Default for Camera {
  fn default() -> Self {
    Camera {
      projection: Projection::default(),
      zoom: 1.0,
      near: 0.1,
      far: 2000.0,
    }
  }
}
