mod gltf_data;

use glam::{DMat3, DQuat, DVec3};
pub(crate) use gltf_data::GltfData;

use crate::scene::Transform;

/// Local TRS of a glTF node, with the rotation as XYZ Euler angles.
pub fn decompose_transform(transform: gltf::scene::Transform) -> Transform {
  let (translation, rotation, scale) = transform.decomposed();
  let quat = DQuat::from_xyzw(
    rotation[0] as f64,
    rotation[1] as f64,
    rotation[2] as f64,
    rotation[3] as f64,
  );
  Transform {
    position: DVec3::from_array(translation.map(f64::from)),
    rotation: euler_xyz_from_quat(quat),
    scale: DVec3::from_array(scale.map(f64::from)),
  }
}

///
/// XYZ Euler angles of a rotation, extracted from its matrix the way three.js does it.
///
pub fn euler_xyz_from_quat(quat: DQuat) -> DVec3 {
  let m = DMat3::from_quat(quat.normalize());
  // Row/column naming follows the usual m<row><col> convention.
  let m11 = m.x_axis.x;
  let m12 = m.y_axis.x;
  let m13 = m.z_axis.x;
  let m22 = m.y_axis.y;
  let m23 = m.z_axis.y;
  let m32 = m.y_axis.z;
  let m33 = m.z_axis.z;

  let y = m13.clamp(-1.0, 1.0).asin();
  if m13.abs() < 0.9999999 {
    DVec3::new((-m23).atan2(m33), y, (-m12).atan2(m11))
  } else {
    DVec3::new(m32.atan2(m22), y, 0.0)
  }
}

///
/// Round `x` to `precision` fractional digits. Negative zero comes back as zero.
///
pub fn round_to(x: f64, precision: u32) -> f64 {
  let factor = 10f64.powi(precision as i32);
  let rounded = (x * factor).round() / factor;
  if rounded == 0.0 {
    0.0
  } else {
    rounded
  }
}

///
/// Compare angles at 0.00001 radian resolution. Cast into one integer.
///
pub fn into_precision(x: f64) -> i64 {
  (x * 100_000.0).round() as i64
}

const RESERVED_WORDS: &[&str] = &[
  "abstract", "arguments", "await", "boolean", "break", "byte", "case", "catch", "char", "class",
  "const", "continue", "debugger", "default", "delete", "do", "double", "else", "enum", "eval",
  "export", "extends", "false", "final", "finally", "float", "for", "function", "goto", "if",
  "implements", "import", "in", "instanceof", "int", "interface", "let", "long", "native", "new",
  "null", "package", "private", "protected", "public", "return", "short", "static", "super",
  "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try", "typeof",
  "undefined", "var", "void", "volatile", "while", "with", "yield",
];

///
/// Whether `name` can be used as a JavaScript identifier.
///
pub fn is_var_name(name: &str) -> bool {
  let mut chars = name.chars();
  let valid_start = match chars.next() {
    Some(c) => c.is_ascii_alphabetic() || c == '_' || c == '$',
    None => false,
  };
  valid_start
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    && !RESERVED_WORDS.contains(&name)
}

///
/// Property access for `name`: `.name` when it is an identifier, `['name']` otherwise.
///
pub fn property_access(name: &str) -> String {
  if is_var_name(name) {
    format!(".{}", name)
  } else {
    format!("['{}']", name.replace('\\', "\\\\").replace('\'', "\\'"))
  }
}

///
/// Make a name usable as an animation binding path: whitespace becomes `_`,
/// the reserved characters `[ ] . : /` are dropped.
///
pub fn sanitize_node_name(name: &str) -> String {
  name
    .chars()
    .filter(|c| !matches!(c, '[' | ']' | '.' | ':' | '/'))
    .map(|c| if c.is_whitespace() { '_' } else { c })
    .collect()
}

///
/// Human readable byte count.
///
pub fn format_bytes(bytes: u64) -> String {
  if bytes < 1024 {
    format!("{}B", bytes)
  } else if bytes < 1024 * 1024 {
    format!("{:.1}KB", bytes as f64 / 1024.0)
  } else if bytes < 1024 * 1024 * 1024 {
    format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
  } else {
    format!("{:.2}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use float_cmp::approx_eq;
  use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

  #[test]
  fn euler_roundtrips_single_axis_rotations() {
    let euler = euler_xyz_from_quat(DQuat::from_rotation_x(-FRAC_PI_2));
    assert!(approx_eq!(f64, euler.x, -FRAC_PI_2, epsilon = 1e-9));
    assert!(approx_eq!(f64, euler.y, 0.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, euler.z, 0.0, epsilon = 1e-9));

    let euler = euler_xyz_from_quat(DQuat::from_rotation_z(FRAC_PI_4));
    assert!(approx_eq!(f64, euler.z, FRAC_PI_4, epsilon = 1e-9));
  }

  #[test]
  fn euler_matches_xyz_composition() {
    let quat = DQuat::from_euler(glam::EulerRot::XYZ, 0.3, -0.2, 1.1);
    let euler = euler_xyz_from_quat(quat);
    let back = DQuat::from_rotation_x(euler.x)
      * DQuat::from_rotation_y(euler.y)
      * DQuat::from_rotation_z(euler.z);
    assert!(back.abs_diff_eq(quat, 1e-9) || back.abs_diff_eq(-quat, 1e-9));
  }

  #[test]
  fn rounding_boundary() {
    assert_eq!(round_to(0.004, 2), 0.0);
    assert_eq!(round_to(0.005, 2), 0.01);
    assert_eq!(round_to(-0.001, 2).to_string(), "0");
    assert_eq!(round_to(1.23456, 3), 1.235);
  }

  #[test]
  fn identifiers() {
    assert!(is_var_name("Cube_001"));
    assert!(!is_var_name("Cube.001"));
    assert!(!is_var_name("1abc"));
    assert!(!is_var_name("default"));
    assert!(!is_var_name(""));
    assert_eq!(property_access("Cube"), ".Cube");
    assert_eq!(property_access("Cube 1"), "['Cube 1']");
  }

  #[test]
  fn node_names_are_sanitized_for_bindings() {
    assert_eq!(sanitize_node_name("Arm.L bone"), "ArmL_bone");
    assert_eq!(sanitize_node_name("a[0]:b/c"), "a0bc");
  }
}
