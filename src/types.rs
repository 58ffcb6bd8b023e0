use glam::{DMat4, DVec4};
use serde::{Deserialize, Serialize};

/// Device pose as reported by the runtime, in tracking space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 3x4 row-major rotation+translation matrix (last column is translation).
    pub matrix: [[f64; 4]; 3],
    /// The runtime's own validity flag for this sample.
    pub is_valid: bool,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        matrix: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
        is_valid: true,
    };

    /// Identity rotation with the given translation.
    pub fn from_translation(t: [f64; 3]) -> Self {
        let mut pose = Self::IDENTITY;
        for (row, v) in pose.matrix.iter_mut().zip(t) {
            row[3] = v;
        }
        pose
    }

    /// Extend to a 4x4 homogeneous matrix with last row [0, 0, 0, 1].
    pub fn to_homogeneous(&self) -> DMat4 {
        let m = &self.matrix;
        // glam is column-major; the pose rows become matrix rows.
        DMat4::from_cols(
            DVec4::new(m[0][0], m[1][0], m[2][0], 0.0),
            DVec4::new(m[0][1], m[1][1], m[2][1], 0.0),
            DVec4::new(m[0][2], m[1][2], m[2][2], 0.0),
            DVec4::new(m[0][3], m[1][3], m[2][3], 1.0),
        )
    }
}

/// Tracked device class as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Invalid,
    #[serde(rename = "HMD")]
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
    DisplayRedirect,
}

impl DeviceClass {
    /// Whether devices of this class can be bound to scene targets.
    pub fn is_trackable(self) -> bool {
        matches!(
            self,
            DeviceClass::Hmd | DeviceClass::Controller | DeviceClass::GenericTracker
        )
    }
}

/// One entry of a runtime device enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Runtime slot; reassigned freely between sessions.
    pub index: u32,
    pub class: DeviceClass,
    /// Stable identity.
    pub serial: String,
    pub connected: bool,
}

bitflags::bitflags! {
    /// Controller button bitmap (pressed state).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u64 {
        const SYSTEM           = 1 << 0;
        const APPLICATION_MENU = 1 << 1;
        const GRIP             = 1 << 2;
        const DPAD_LEFT        = 1 << 3;
        const DPAD_UP          = 1 << 4;
        const DPAD_RIGHT       = 1 << 5;
        const DPAD_DOWN        = 1 << 6;
        const A                = 1 << 7;
        const TOUCHPAD         = 1 << 32;
        const TRIGGER          = 1 << 33;
    }
}

/// Controller input snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerState {
    /// Analog trigger in [0, 1].
    pub trigger: f64,
    /// Trackpad (x, y), each in [-1, 1].
    pub trackpad: [f64; 2],
    pub pressed: Buttons,
}

impl ControllerState {
    pub fn grip(&self) -> f64 {
        bit_value(self.pressed, Buttons::GRIP)
    }

    pub fn menu(&self) -> f64 {
        bit_value(self.pressed, Buttons::APPLICATION_MENU)
    }
}

fn bit_value(pressed: Buttons, button: Buttons) -> f64 {
    if pressed.contains(button) {
        1.0
    } else {
        0.0
    }
}

/// Application mode requested from the runtime when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationMode {
    /// Full scene application (owns the compositor).
    #[default]
    Scene,
    /// Background tracking without rendering.
    Background,
}

/// Euler rotation order; the first axis is applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl EulerOrder {
    pub const ALL: [EulerOrder; 6] = [
        EulerOrder::Xyz,
        EulerOrder::Xzy,
        EulerOrder::Yxz,
        EulerOrder::Yzx,
        EulerOrder::Zxy,
        EulerOrder::Zyx,
    ];

    /// Axis indices in application order and the permutation parity.
    pub(crate) fn axes(self) -> ([usize; 3], bool) {
        match self {
            EulerOrder::Xyz => ([0, 1, 2], false),
            EulerOrder::Xzy => ([0, 2, 1], true),
            EulerOrder::Yxz => ([1, 0, 2], true),
            EulerOrder::Yzx => ([1, 2, 0], false),
            EulerOrder::Zxy => ([2, 0, 1], false),
            EulerOrder::Zyx => ([2, 1, 0], true),
        }
    }
}

/// How a scene target stores its rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    Quaternion,
    Euler(EulerOrder),
}

impl Default for RotationMode {
    fn default() -> Self {
        RotationMode::Euler(EulerOrder::Xyz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_pose_to_homogeneous() {
        let pose = Pose {
            matrix: [
                [0.0, -1.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 2.0],
                [0.0, 0.0, 1.0, 3.0],
            ],
            is_valid: true,
        };
        let m = pose.to_homogeneous();
        assert_eq!(m.w_axis, glam::DVec4::new(1.0, 2.0, 3.0, 1.0));
        assert!(m
            .transform_vector3(DVec3::X)
            .abs_diff_eq(DVec3::Y, 1e-12));
        assert_eq!(m.row(3), glam::DVec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_controller_button_values() {
        let state = ControllerState {
            pressed: Buttons::GRIP,
            ..Default::default()
        };
        assert_eq!(state.grip(), 1.0);
        assert_eq!(state.menu(), 0.0);
        assert_eq!(Buttons::GRIP.bits() >> 2 & 1, 1);
        assert_eq!(Buttons::APPLICATION_MENU.bits() >> 1 & 1, 1);
    }

    #[test]
    fn test_trackable_classes() {
        assert!(DeviceClass::Hmd.is_trackable());
        assert!(DeviceClass::GenericTracker.is_trackable());
        assert!(!DeviceClass::TrackingReference.is_trackable());
    }
}
