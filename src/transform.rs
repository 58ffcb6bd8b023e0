//! Pose-to-transform pipeline.
//!
//! Converts a tracking-space device pose into a scene-space 4x4 transform:
//!
//! ```text
//! floor_rotation * calibrate(axis_conversion * pose * T(loc * scale) * R(rot) * S(scale))
//! ```
//!
//! where `calibrate` multiplies the translation by the calibration scale and
//! adds the floor position. The order is part of the contract.

use crate::types::Pose;
use glam::{DMat3, DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Change of basis from tracking space (Y up, -Z forward) to scene space (Z up).
///
/// Maps tracking +Y to scene +Z and tracking +Z to scene +Y; a proper rotation,
/// so tracking +X becomes scene -X.
pub const AXIS_CONVERSION: DMat4 = DMat4::from_cols_array(&[
    -1.0, 0.0, 0.0, 0.0, // column 0
    0.0, 0.0, 1.0, 0.0, // column 1
    0.0, 1.0, 0.0, 0.0, // column 2
    0.0, 0.0, 0.0, 1.0, // column 3
]);

/// Per-binding offset from the device to the bound target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    pub location: DVec3,
    /// Euler XYZ, degrees.
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Default for Offset {
    fn default() -> Self {
        Self {
            location: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
        }
    }
}

impl Offset {
    /// `T(location * location_scale) * R(rotation) * S(scale)`.
    pub fn matrix(&self, location_scale: f64) -> DMat4 {
        DMat4::from_translation(self.location * location_scale)
            * DMat4::from_mat3(euler_xyz_degrees(self.rotation))
            * DMat4::from_scale(self.scale)
    }
}

/// Global room calibration shared by every bound device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub location_scale: f64,
    pub floor_position: DVec3,
    /// Euler XYZ, degrees, applied around the world origin.
    pub floor_rotation: DVec3,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            location_scale: 1.0,
            floor_position: DVec3::ZERO,
            floor_rotation: DVec3::ZERO,
        }
    }
}

impl Calibration {
    pub fn floor_rotation_matrix(&self) -> DMat4 {
        DMat4::from_mat3(euler_xyz_degrees(self.floor_rotation))
    }
}

/// Rotation matrix for XYZ Euler angles in degrees (X applied first).
pub fn euler_xyz_degrees(degrees: DVec3) -> DMat3 {
    let r = DVec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    );
    DMat3::from_quat(
        DQuat::from_rotation_z(r.z) * DQuat::from_rotation_y(r.y) * DQuat::from_rotation_x(r.x),
    )
}

/// Run the full pipeline for one device pose.
pub fn world_transform(pose: &Pose, offset: &Offset, calibration: &Calibration) -> DMat4 {
    let scale = calibration.location_scale;

    let mut world = AXIS_CONVERSION * pose.to_homogeneous() * offset.matrix(scale);

    let translation = world.w_axis.truncate() * scale + calibration.floor_position;
    world.w_axis = translation.extend(1.0);

    calibration.floor_rotation_matrix() * world
}

/// Split a transform into (translation, rotation, scale).
///
/// Fails for degenerate matrices (zero scale on any axis).
pub fn decompose(m: &DMat4) -> Option<(DVec3, DQuat, DVec3)> {
    if m.determinant().abs() <= f64::EPSILON {
        return None;
    }
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    Some((translation, rotation.normalize(), scale))
}
