//! Rotation continuity across frames.
//!
//! A rotation matrix has two quaternions (q and -q) and, for each Euler
//! order, two angle triples plus every 2π shift of them. Writing whichever
//! one falls out of the decomposition makes keyframed curves jump; this
//! module always picks the representation nearest to the previous frame.

use crate::types::{EulerOrder, RotationMode};
use glam::{DMat3, DQuat, DVec3};
use std::f64::consts::TAU;

/// Below this, the middle Euler axis is treated as gimbal locked.
const GIMBAL_EPSILON: f64 = 16.0 * f32::EPSILON as f64;

/// A target's rotation in the representation the target uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    Quaternion(DQuat),
    /// Radians, indexed by axis (x, y, z) regardless of order.
    Euler { angles: DVec3, order: EulerOrder },
}

impl Rotation {
    pub fn identity(mode: RotationMode) -> Self {
        match mode {
            RotationMode::Quaternion => Rotation::Quaternion(DQuat::IDENTITY),
            RotationMode::Euler(order) => Rotation::Euler {
                angles: DVec3::ZERO,
                order,
            },
        }
    }

    pub fn to_quat(&self) -> DQuat {
        match *self {
            Rotation::Quaternion(q) => q,
            Rotation::Euler { angles, order } => DQuat::from_mat3(&euler_to_mat3(angles, order)),
        }
    }

    /// Re-express in `mode`, used when a target switches rotation mode.
    fn in_mode(&self, mode: RotationMode) -> Rotation {
        match (mode, *self) {
            (RotationMode::Quaternion, Rotation::Quaternion(_)) => *self,
            (RotationMode::Euler(order), Rotation::Euler { order: prev, .. }) if order == prev => {
                *self
            }
            (RotationMode::Quaternion, _) => Rotation::Quaternion(self.to_quat()),
            (RotationMode::Euler(order), _) => Rotation::Euler {
                angles: euler_from_mat3(&DMat3::from_quat(self.to_quat()), order).0,
                order,
            },
        }
    }
}

/// Pick the rotation for `rotation` (unit quaternion) that continues `previous`.
pub fn resolve(rotation: DQuat, mode: RotationMode, previous: Option<&Rotation>) -> Rotation {
    let previous = previous
        .map(|p| p.in_mode(mode))
        .unwrap_or_else(|| Rotation::identity(mode));

    match previous {
        Rotation::Quaternion(prev) => Rotation::Quaternion(compatible_quaternion(rotation, prev)),
        Rotation::Euler { angles, order } => Rotation::Euler {
            angles: compatible_euler_from_mat3(&DMat3::from_quat(rotation), order, angles),
            order,
        },
    }
}

/// Flip `q` onto the hemisphere of `previous` (shortest path).
pub fn compatible_quaternion(q: DQuat, previous: DQuat) -> DQuat {
    if q.dot(previous) < 0.0 {
        -q
    } else {
        q
    }
}

/// Rotation matrix for Euler `angles` applied in `order`.
pub fn euler_to_mat3(angles: DVec3, order: EulerOrder) -> DMat3 {
    let ([i, j, k], _) = order.axes();
    let axis = |a: usize| match a {
        0 => DQuat::from_rotation_x(angles.x),
        1 => DQuat::from_rotation_y(angles.y),
        _ => DQuat::from_rotation_z(angles.z),
    };
    DMat3::from_quat(axis(k) * axis(j) * axis(i))
}

/// Both Euler decompositions of an orthonormal matrix for `order`.
///
/// Returns `(primary, alternate)`; the primary keeps the middle angle in
/// [-π/2, π/2]. At gimbal lock both are the same.
pub fn euler_from_mat3(mat: &DMat3, order: EulerOrder) -> (DVec3, DVec3) {
    let ([i, j, k], parity) = order.axes();
    // m(column, row)
    let m = |c: usize, r: usize| mat.col(c)[r];

    let cy = m(i, i).hypot(m(i, j));
    let mut first = [0.0; 3];
    let mut second = [0.0; 3];

    if cy > GIMBAL_EPSILON {
        first[i] = m(j, k).atan2(m(k, k));
        first[j] = (-m(i, k)).atan2(cy);
        first[k] = m(i, j).atan2(m(i, i));

        second[i] = (-m(j, k)).atan2(-m(k, k));
        second[j] = (-m(i, k)).atan2(-cy);
        second[k] = (-m(i, j)).atan2(-m(i, i));
    } else {
        first[i] = (-m(k, j)).atan2(m(j, j));
        first[j] = (-m(i, k)).atan2(cy);
        first[k] = 0.0;
        second = first;
    }

    let (mut first, mut second) = (DVec3::from_array(first), DVec3::from_array(second));
    if parity {
        first = -first;
        second = -second;
    }
    (first, second)
}

/// Shift each axis of `angles` by whole turns to land within π of `previous`.
pub fn compatible_euler(angles: DVec3, previous: DVec3) -> DVec3 {
    let shift = |a: f64, p: f64| a - ((a - p) / TAU).round() * TAU;
    DVec3::new(
        shift(angles.x, previous.x),
        shift(angles.y, previous.y),
        shift(angles.z, previous.z),
    )
}

/// Euler angles for `mat` in `order`, choosing the branch nearest `previous`.
pub fn compatible_euler_from_mat3(mat: &DMat3, order: EulerOrder, previous: DVec3) -> DVec3 {
    let (first, second) = euler_from_mat3(mat, order);
    let first = compatible_euler(first, previous);
    let second = compatible_euler(second, previous);

    let distance = |e: DVec3| (e - previous).abs().element_sum();
    if distance(second) < distance(first) {
        second
    } else {
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_quaternion_sign_flip_is_removed() {
        let base = DQuat::from_rotation_z(0.3);
        let raw = [base, -base, base, -base, -base];

        let mut previous: Option<Rotation> = None;
        let mut emitted = Vec::new();
        for q in raw {
            let r = resolve(q, RotationMode::Quaternion, previous.as_ref());
            emitted.push(r.to_quat());
            previous = Some(r);
        }
        for pair in emitted.windows(2) {
            assert!(pair[0].dot(pair[1]) >= 0.0);
        }
    }

    #[test]
    fn test_quaternion_continuity_through_half_turn() {
        // Sweep past 180 degrees; glam's matrix decomposition flips sign on the way.
        let mut previous: Option<Rotation> = None;
        let mut last = DQuat::IDENTITY;
        for step in 0..=72 {
            let angle = (step as f64).to_radians() * 5.0;
            let raw = DQuat::from_mat3(&DMat3::from_rotation_z(angle));
            let r = resolve(raw, RotationMode::Quaternion, previous.as_ref());
            let q = r.to_quat();
            assert!(q.dot(last) >= 0.0, "discontinuity at step {}", step);
            last = q;
            previous = Some(r);
        }
    }

    #[test]
    fn test_euler_round_trip_all_orders() {
        let angles = DVec3::new(0.4, -0.7, 1.1);
        for order in EulerOrder::ALL {
            let m = euler_to_mat3(angles, order);
            let (first, second) = euler_from_mat3(&m, order);
            assert!(first.abs_diff_eq(angles, 1e-9), "{:?}: {:?}", order, first);
            // The alternate solution describes the same rotation.
            assert!(euler_to_mat3(second, order).abs_diff_eq(m, 1e-9), "{:?}", order);

            // Middle axis at a quarter turn: only the matrix is recoverable.
            for middle in [FRAC_PI_2, -FRAC_PI_2] {
                let ([_, j, _], _) = order.axes();
                let mut locked = angles;
                locked[j] = middle;
                let m = euler_to_mat3(locked, order);
                let (first, second) = euler_from_mat3(&m, order);
                assert_eq!(first, second);
                assert!(euler_to_mat3(first, order).abs_diff_eq(m, 1e-9), "{:?}", order);
                assert!((first[j].abs() - FRAC_PI_2).abs() < 1e-9, "{:?}", order);
            }
        }
    }

    #[test]
    fn test_euler_order_composition() {
        // XYZ: X first, then Y, then Z.
        let m = euler_to_mat3(DVec3::new(FRAC_PI_2, 0.0, FRAC_PI_2), EulerOrder::Xyz);
        // Y -> Z (by X), then Z stays under Z rotation.
        assert!(m.mul_vec3(DVec3::Y).abs_diff_eq(DVec3::Z, 1e-12));
        // X stays under X, then goes to Y under Z.
        assert!(m.mul_vec3(DVec3::X).abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_euler_wraps_past_pi() {
        let previous = DVec3::new(0.0, 0.0, 179f64.to_radians());
        let m = DMat3::from_rotation_z(181f64.to_radians());
        let e = compatible_euler_from_mat3(&m, EulerOrder::Xyz, previous);
        assert!((e.z - 181f64.to_radians()).abs() < 1e-9, "{}", e.z.to_degrees());
        assert!(e.x.abs() < 1e-9 && e.y.abs() < 1e-9);
    }

    #[test]
    fn test_euler_accumulates_full_turns() {
        let previous = DVec3::new(0.0, 0.0, 4.0 * PI + 0.1);
        let m = DMat3::from_rotation_z(0.15);
        let e = compatible_euler_from_mat3(&m, EulerOrder::Xyz, previous);
        assert!((e.z - (4.0 * PI + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn test_euler_keeps_branch_near_previous() {
        let previous = DVec3::new(PI - 0.01, 0.0, PI - 0.01);
        let target = DVec3::new(PI, 0.05, PI);
        let m = euler_to_mat3(target, EulerOrder::Xyz);
        let e = compatible_euler_from_mat3(&m, EulerOrder::Xyz, previous);
        assert!(e.abs_diff_eq(target, 1e-9), "{:?}", e);
    }

    #[test]
    fn test_euler_switches_to_alternate_branch() {
        // (π, 0.05, π) is the same rotation as (0, π - 0.05, 0).
        let previous = DVec3::new(0.0, PI - 0.01, 0.0);
        let m = euler_to_mat3(DVec3::new(PI, 0.05, PI), EulerOrder::Xyz);
        let e = compatible_euler_from_mat3(&m, EulerOrder::Xyz, previous);
        assert!(e.abs_diff_eq(DVec3::new(0.0, PI - 0.05, 0.0), 1e-9), "{:?}", e);
    }

    #[test]
    fn test_resolve_converts_previous_representation() {
        let previous = Rotation::Quaternion(DQuat::from_rotation_z(3.0));
        let r = resolve(
            DQuat::from_rotation_z(3.1),
            RotationMode::Euler(EulerOrder::Xyz),
            Some(&previous),
        );
        match r {
            Rotation::Euler { angles, order } => {
                assert_eq!(order, EulerOrder::Xyz);
                assert!((angles.z - 3.1).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_resolve_without_history_uses_identity() {
        let r = resolve(-DQuat::IDENTITY, RotationMode::Quaternion, None);
        assert_eq!(r, Rotation::Quaternion(DQuat::IDENTITY));
    }
}
