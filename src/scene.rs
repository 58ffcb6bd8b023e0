//! Host scene graph interface.
//!
//! Everything the streamer needs from the 3D application it runs inside.
//! The host adapter implements [`Scene`] and passes it into every frame
//! call; nothing here reaches for global state.

use crate::property::{PropertyKey, Value};
use crate::rotation::Rotation;
use crate::types::RotationMode;
use glam::DMat4;
use std::fmt;

/// What kind of scene object a binding names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Object,
    /// Articulated skeleton with named sub-parts (bones).
    Skeleton,
}

/// A concrete transform target: an object, or one sub-part of a skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId {
    pub object: String,
    pub sub_part: Option<String>,
}

impl TargetId {
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            object: name.into(),
            sub_part: None,
        }
    }

    pub fn sub_part(object: impl Into<String>, sub_part: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            sub_part: Some(sub_part.into()),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_part {
            Some(sub_part) => write!(f, "{}:{}", self.object, sub_part),
            None => f.write_str(&self.object),
        }
    }
}

/// Transform channel of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformChannel {
    Location,
    RotationQuaternion,
    RotationEuler,
    Scale,
}

impl TransformChannel {
    pub fn rotation_for(mode: RotationMode) -> Self {
        match mode {
            RotationMode::Quaternion => TransformChannel::RotationQuaternion,
            RotationMode::Euler(_) => TransformChannel::RotationEuler,
        }
    }
}

/// A keyframe request at the host's current frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyframe {
    Transform {
        target: TargetId,
        channel: TransformChannel,
    },
    Property(PropertyKey),
}

pub trait Scene {
    /// Kind of the named object, or `None` when it does not exist.
    fn target_kind(&self, object: &str) -> Option<TargetKind>;

    fn has_sub_part(&self, object: &str, sub_part: &str) -> bool;

    fn rotation_mode(&self, target: &TargetId) -> RotationMode;

    /// Set the target's full transform from a world-space matrix.
    fn set_world_matrix(&mut self, target: &TargetId, matrix: DMat4);

    /// Express a world-space matrix in the target's local (parent) space.
    ///
    /// Only called for sub-part targets.
    fn world_to_local(&self, target: &TargetId, matrix: DMat4) -> DMat4;

    /// Overwrite the target's stored rotation.
    fn set_rotation(&mut self, target: &TargetId, rotation: Rotation);

    /// Root of the scene's numeric property tree.
    fn properties_mut(&mut self) -> &mut Value;

    fn auto_keyframe(&self) -> bool;

    fn insert_keyframe(&mut self, keyframe: &Keyframe);

    /// Add an empty marker object, optionally parented.
    fn create_empty(&mut self, name: &str, display_size: f64, parent: Option<&str>);
}
