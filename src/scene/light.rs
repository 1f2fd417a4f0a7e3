use glam::DVec3;
use gltf::khr_lights_punctual::Kind;

/// Punctual light flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
  Directional,
  Point,
  Spot,
}

impl LightKind {
  pub fn type_name(self) -> &'static str {
    match self {
      LightKind::Directional => "DirectionalLight",
      LightKind::Point => "PointLight",
      LightKind::Spot => "SpotLight",
    }
  }
}

/// A light. Properties the runtime object lacks are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
  pub kind: LightKind,
  /// Linear RGB, 0..1.
  pub color: DVec3,
  pub intensity: f64,
  pub distance: Option<f64>,
  pub decay: Option<f64>,
  /// Outer cone angle in radians.
  pub angle: Option<f64>,
  pub penumbra: Option<f64>,
}

impl Light {
  pub fn new(kind: LightKind) -> Self {
    let (distance, decay, angle, penumbra) = match kind {
      LightKind::Directional => (None, None, None, None),
      LightKind::Point => (Some(0.0), Some(1.0), None, None),
      LightKind::Spot => (
        Some(0.0),
        Some(1.0),
        Some(std::f64::consts::FRAC_PI_3),
        Some(0.0),
      ),
    };
    Light {
      kind,
      color: DVec3::ONE,
      intensity: 1.0,
      distance,
      decay,
      angle,
      penumbra,
    }
  }

  /// Translate a `KHR_lights_punctual` light.
  pub(crate) fn load(gltf_light: gltf::khr_lights_punctual::Light) -> Self {
    let range = gltf_light.range().map(f64::from).unwrap_or(0.0);
    let mut light = match gltf_light.kind() {
      Kind::Directional => Light::new(LightKind::Directional),
      Kind::Point => {
        let mut light = Light::new(LightKind::Point);
        light.distance = Some(range);
        light
      }
      Kind::Spot {
        inner_cone_angle,
        outer_cone_angle,
      } => {
        let mut light = Light::new(LightKind::Spot);
        let outer = outer_cone_angle as f64;
        light.distance = Some(range);
        light.angle = Some(outer);
        light.penumbra = Some(if outer > 0.0 {
          1.0 - inner_cone_angle as f64 / outer
        } else {
          0.0
        });
        light
      }
    };

    // Physically based falloff, as the loader configures every light.
    if light.decay.is_some() {
      light.decay = Some(2.0);
    }
    light.color = DVec3::from_array(gltf_light.color().map(f64::from));
    light.intensity = gltf_light.intensity() as f64;
    light
  }
}
