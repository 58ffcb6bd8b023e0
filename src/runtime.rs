use crate::error::RuntimeError;
use crate::types::{ApplicationMode, ControllerState, DeviceInfo, Pose};
use std::collections::HashMap;
use std::time::Duration;

/// Synchronized poses keyed by runtime device index.
pub type PoseSet = HashMap<u32, Pose>;

/// VR runtime client.
///
/// Implemented over the vendor runtime by the host adapter, and by
/// [`crate::sim::SimulatedRuntime`] for tests. Every call happens on the
/// frame thread.
pub trait VrRuntime {
    /// Open a runtime session.
    fn init(&mut self, mode: ApplicationMode) -> Result<(), RuntimeError>;

    /// Close the runtime session. Safe to call when not open.
    fn shutdown(&mut self);

    /// Every device slot the runtime currently knows about.
    fn enumerate_devices(&mut self) -> Vec<DeviceInfo>;

    /// Block until the runtime publishes a synchronized pose set, at most `timeout`.
    fn synchronized_poses(&mut self, timeout: Duration) -> Result<PoseSet, RuntimeError>;

    fn controller_state(&mut self, index: u32) -> Result<ControllerState, RuntimeError>;
}

impl<R: VrRuntime + ?Sized> VrRuntime for Box<R> {
    fn init(&mut self, mode: ApplicationMode) -> Result<(), RuntimeError> {
        (**self).init(mode)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn enumerate_devices(&mut self) -> Vec<DeviceInfo> {
        (**self).enumerate_devices()
    }

    fn synchronized_poses(&mut self, timeout: Duration) -> Result<PoseSet, RuntimeError> {
        (**self).synchronized_poses(timeout)
    }

    fn controller_state(&mut self, index: u32) -> Result<ControllerState, RuntimeError> {
        (**self).controller_state(index)
    }
}

impl<R: VrRuntime + ?Sized> VrRuntime for &mut R {
    fn init(&mut self, mode: ApplicationMode) -> Result<(), RuntimeError> {
        (**self).init(mode)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn enumerate_devices(&mut self) -> Vec<DeviceInfo> {
        (**self).enumerate_devices()
    }

    fn synchronized_poses(&mut self, timeout: Duration) -> Result<PoseSet, RuntimeError> {
        (**self).synchronized_poses(timeout)
    }

    fn controller_state(&mut self, index: u32) -> Result<ControllerState, RuntimeError> {
        (**self).controller_state(index)
    }
}
