//! In-memory runtime and scene.
//!
//! [`SimulatedRuntime`] stands in for a VR runtime with scripted devices,
//! poses and controller states, plus failure injection. [`MemoryScene`] is a
//! minimal scene graph with objects, skeleton sub-parts, a property tree and
//! a keyframe log. Used by the test suite and the `simulate` demo.

use crate::error::RuntimeError;
use crate::property::Value;
use crate::rotation::Rotation;
use crate::runtime::{PoseSet, VrRuntime};
use crate::scene::{Keyframe, Scene, TargetId, TargetKind};
use crate::types::{ApplicationMode, ControllerState, DeviceClass, DeviceInfo, Pose, RotationMode};
use glam::DMat4;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct SimulatedRuntime {
    devices: Vec<DeviceInfo>,
    poses: PoseSet,
    controllers: HashMap<u32, ControllerState>,
    open: bool,
    mode: Option<ApplicationMode>,
    init_failure: Option<String>,
    pose_failure: Option<RuntimeError>,
    init_count: usize,
    shutdown_count: usize,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug in a connected device.
    pub fn add_device(&mut self, index: u32, class: DeviceClass, serial: &str) {
        self.devices.retain(|d| d.serial != serial);
        self.devices.push(DeviceInfo {
            index,
            class,
            serial: serial.to_string(),
            connected: true,
        });
    }

    pub fn remove_device(&mut self, serial: &str) {
        self.devices.retain(|d| d.serial != serial);
    }

    pub fn set_connected(&mut self, serial: &str, connected: bool) {
        if let Some(device) = self.devices.iter_mut().find(|d| d.serial == serial) {
            device.connected = connected;
        }
    }

    /// Move a device to another index slot.
    pub fn set_index(&mut self, serial: &str, index: u32) {
        if let Some(device) = self.devices.iter_mut().find(|d| d.serial == serial) {
            device.index = index;
        }
    }

    pub fn set_pose(&mut self, index: u32, pose: Pose) {
        self.poses.insert(index, pose);
    }

    pub fn clear_poses(&mut self) {
        self.poses.clear();
    }

    pub fn set_controller(&mut self, index: u32, state: ControllerState) {
        self.controllers.insert(index, state);
    }

    /// Make every following `init` fail with `reason`, or succeed again on `None`.
    pub fn fail_init(&mut self, reason: Option<&str>) {
        self.init_failure = reason.map(str::to_string);
    }

    /// Make every following pose wait fail with `error`, or succeed again on `None`.
    pub fn fail_poses(&mut self, error: Option<RuntimeError>) {
        self.pose_failure = error;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> Option<ApplicationMode> {
        self.mode
    }

    pub fn init_count(&self) -> usize {
        self.init_count
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdown_count
    }
}

impl VrRuntime for SimulatedRuntime {
    fn init(&mut self, mode: ApplicationMode) -> Result<(), RuntimeError> {
        if let Some(reason) = &self.init_failure {
            return Err(RuntimeError::Init(reason.clone()));
        }
        self.open = true;
        self.mode = Some(mode);
        self.init_count += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.open {
            self.shutdown_count += 1;
        }
        self.open = false;
        self.mode = None;
    }

    fn enumerate_devices(&mut self) -> Vec<DeviceInfo> {
        if !self.open {
            return Vec::new();
        }
        self.devices.clone()
    }

    fn synchronized_poses(&mut self, _timeout: Duration) -> Result<PoseSet, RuntimeError> {
        if !self.open {
            return Err(RuntimeError::NotInitialized);
        }
        if let Some(error) = &self.pose_failure {
            return Err(error.clone());
        }
        Ok(self.poses.clone())
    }

    fn controller_state(&mut self, index: u32) -> Result<ControllerState, RuntimeError> {
        if !self.open {
            return Err(RuntimeError::NotInitialized);
        }
        self.controllers
            .get(&index)
            .copied()
            .ok_or(RuntimeError::ControllerState(index))
    }
}

/// Skeleton sub-part. Matrices are in the owning object's space.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub rest: DMat4,
    pub matrix: DMat4,
    pub rotation_mode: RotationMode,
    pub rotation: Option<Rotation>,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            rest: DMat4::IDENTITY,
            matrix: DMat4::IDENTITY,
            rotation_mode: RotationMode::default(),
            rotation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub kind: TargetKind,
    pub matrix_world: DMat4,
    pub rotation_mode: RotationMode,
    pub rotation: Option<Rotation>,
    pub parent: Option<String>,
    pub display_size: f64,
    pub bones: BTreeMap<String, Bone>,
}

impl SceneObject {
    fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            matrix_world: DMat4::IDENTITY,
            rotation_mode: RotationMode::default(),
            rotation: None,
            parent: None,
            display_size: 1.0,
            bones: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryScene {
    objects: BTreeMap<String, SceneObject>,
    properties: Value,
    auto_keyframe: bool,
    keyframes: Vec<Keyframe>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            properties: Value::Object(BTreeMap::new()),
            auto_keyframe: false,
            keyframes: Vec::new(),
        }
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, name: &str) -> &mut SceneObject {
        self.objects
            .entry(name.to_string())
            .or_insert_with(|| SceneObject::new(TargetKind::Object))
    }

    pub fn add_skeleton(&mut self, name: &str, bones: &[&str]) -> &mut SceneObject {
        let object = self
            .objects
            .entry(name.to_string())
            .or_insert_with(|| SceneObject::new(TargetKind::Skeleton));
        object.kind = TargetKind::Skeleton;
        for bone in bones {
            object.bones.entry(bone.to_string()).or_default();
        }
        object
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.get_mut(name)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&str, &SceneObject)> {
        self.objects.iter().map(|(name, object)| (name.as_str(), object))
    }

    pub fn bone(&self, object: &str, bone: &str) -> Option<&Bone> {
        self.objects.get(object)?.bones.get(bone)
    }

    pub fn set_rotation_mode(&mut self, target: &TargetId, mode: RotationMode) {
        let Some(object) = self.objects.get_mut(&target.object) else {
            return;
        };
        match &target.sub_part {
            Some(name) => {
                if let Some(bone) = object.bones.get_mut(name) {
                    bone.rotation_mode = mode;
                }
            }
            None => object.rotation_mode = mode,
        }
    }

    pub fn set_auto_keyframe(&mut self, enabled: bool) {
        self.auto_keyframe = enabled;
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn properties(&self) -> &Value {
        &self.properties
    }
}

impl Scene for MemoryScene {
    fn target_kind(&self, object: &str) -> Option<TargetKind> {
        self.objects.get(object).map(|o| o.kind)
    }

    fn has_sub_part(&self, object: &str, sub_part: &str) -> bool {
        self.objects
            .get(object)
            .is_some_and(|o| o.kind == TargetKind::Skeleton && o.bones.contains_key(sub_part))
    }

    fn rotation_mode(&self, target: &TargetId) -> RotationMode {
        let Some(object) = self.objects.get(&target.object) else {
            return RotationMode::default();
        };
        match &target.sub_part {
            Some(name) => object
                .bones
                .get(name)
                .map(|b| b.rotation_mode)
                .unwrap_or_default(),
            None => object.rotation_mode,
        }
    }

    fn set_world_matrix(&mut self, target: &TargetId, matrix: DMat4) {
        let Some(object) = self.objects.get_mut(&target.object) else {
            return;
        };
        match &target.sub_part {
            Some(name) => {
                let to_object = object.matrix_world.inverse();
                if let Some(bone) = object.bones.get_mut(name) {
                    bone.matrix = to_object * matrix;
                }
            }
            None => object.matrix_world = matrix,
        }
    }

    fn world_to_local(&self, target: &TargetId, matrix: DMat4) -> DMat4 {
        let Some(object) = self.objects.get(&target.object) else {
            return matrix;
        };
        let rest = target
            .sub_part
            .as_ref()
            .and_then(|name| object.bones.get(name))
            .map_or(DMat4::IDENTITY, |b| b.rest);
        rest.inverse() * object.matrix_world.inverse() * matrix
    }

    fn set_rotation(&mut self, target: &TargetId, rotation: Rotation) {
        let Some(object) = self.objects.get_mut(&target.object) else {
            return;
        };
        match &target.sub_part {
            Some(name) => {
                if let Some(bone) = object.bones.get_mut(name) {
                    bone.rotation = Some(rotation);
                }
            }
            None => object.rotation = Some(rotation),
        }
    }

    fn properties_mut(&mut self) -> &mut Value {
        &mut self.properties
    }

    fn auto_keyframe(&self) -> bool {
        self.auto_keyframe
    }

    fn insert_keyframe(&mut self, keyframe: &Keyframe) {
        self.keyframes.push(keyframe.clone());
    }

    fn create_empty(&mut self, name: &str, display_size: f64, parent: Option<&str>) {
        let object = self.add_object(name);
        object.display_size = display_size;
        object.parent = parent.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_requires_open_session() {
        let mut runtime = SimulatedRuntime::new();
        runtime.add_device(1, DeviceClass::GenericTracker, "T");
        assert!(runtime.enumerate_devices().is_empty());
        assert_eq!(
            runtime.synchronized_poses(Duration::ZERO),
            Err(RuntimeError::NotInitialized)
        );

        runtime.init(ApplicationMode::Scene).unwrap();
        assert_eq!(runtime.enumerate_devices().len(), 1);
        assert_eq!(
            runtime.controller_state(1),
            Err(RuntimeError::ControllerState(1))
        );

        runtime.shutdown();
        runtime.shutdown();
        assert_eq!(runtime.shutdown_count(), 1);
        assert!(!runtime.is_open());
    }

    #[test]
    fn test_runtime_failure_injection() {
        let mut runtime = SimulatedRuntime::new();
        runtime.fail_init(Some("no headset"));
        assert_eq!(
            runtime.init(ApplicationMode::Scene),
            Err(RuntimeError::Init("no headset".into()))
        );
        assert!(!runtime.is_open());

        runtime.fail_init(None);
        runtime.init(ApplicationMode::Background).unwrap();
        assert_eq!(runtime.mode(), Some(ApplicationMode::Background));
        runtime.fail_poses(Some(RuntimeError::Timeout));
        assert_eq!(
            runtime.synchronized_poses(Duration::ZERO),
            Err(RuntimeError::Timeout)
        );
    }

    #[test]
    fn test_bone_matrix_is_object_relative() {
        let mut scene = MemoryScene::new();
        scene.add_skeleton("Rig", &["hips"]).matrix_world =
            DMat4::from_translation(glam::DVec3::new(1.0, 0.0, 0.0));
        let target = TargetId::sub_part("Rig", "hips");
        scene.set_world_matrix(&target, DMat4::from_translation(glam::DVec3::new(3.0, 2.0, 0.0)));

        let bone = scene.bone("Rig", "hips").unwrap();
        assert_eq!(bone.matrix.w_axis.truncate(), glam::DVec3::new(2.0, 2.0, 0.0));
        assert!(scene.has_sub_part("Rig", "hips"));
        assert!(!scene.has_sub_part("Rig", "head"));
    }

    #[test]
    fn test_create_empty_is_parented() {
        let mut scene = MemoryScene::new();
        scene.create_empty("LHR-1", 0.1, Some("Root"));
        let object = scene.object("LHR-1").unwrap();
        assert_eq!(object.kind, TargetKind::Object);
        assert_eq!(object.display_size, 0.1);
        assert_eq!(object.parent.as_deref(), Some("Root"));
    }
}
