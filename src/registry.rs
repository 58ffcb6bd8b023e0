//! Persisted tracker list, bindings and calibration.
//!
//! Trackers are keyed by serial. Runtime indices are refreshed on every
//! enumeration and never used as identity.

use crate::remap::ControllerMapping;
use crate::rotation::Rotation;
use crate::scene::{TargetId, TargetKind};
use crate::transform::{Calibration, Offset};
use crate::types::{DeviceClass, DeviceInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a tracker's pose is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binding {
    /// Scene object name; `None` leaves the tracker unbound.
    pub target: Option<String>,
    /// Only meaningful for skeleton targets.
    pub use_sub_part: bool,
    pub sub_part: Option<String>,
    pub offset: Offset,
}

impl Default for Binding {
    fn default() -> Self {
        Self {
            target: None,
            use_sub_part: true,
            sub_part: None,
            offset: Offset::default(),
        }
    }
}

impl Binding {
    pub fn to_object(name: impl Into<String>) -> Self {
        Self {
            target: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn to_sub_part(object: impl Into<String>, sub_part: impl Into<String>) -> Self {
        Self {
            target: Some(object.into()),
            use_sub_part: true,
            sub_part: Some(sub_part.into()),
            offset: Offset::default(),
        }
    }

    /// Target object name, treating an empty string as unbound.
    pub fn object(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether this binding addresses a sub-part of a target of `kind`.
    pub fn wants_sub_part(&self, kind: TargetKind) -> bool {
        kind == TargetKind::Skeleton && self.use_sub_part
    }

    pub fn sub_part_name(&self) -> Option<&str> {
        self.sub_part.as_deref().filter(|s| !s.is_empty())
    }
}

/// One known tracked device and its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub serial: String,
    /// Display name for the UI; defaults to the serial.
    pub friendly_name: String,
    pub index: u32,
    pub class: DeviceClass,
    pub connected: bool,
    #[serde(default)]
    pub binding: Binding,
    #[serde(default)]
    pub controller: ControllerMapping,
}

impl Tracker {
    fn discovered(info: &DeviceInfo) -> Self {
        Self {
            serial: info.serial.clone(),
            friendly_name: info.serial.clone(),
            index: info.index,
            class: info.class,
            connected: info.connected,
            binding: Binding::default(),
            controller: ControllerMapping::default(),
        }
    }

    pub fn is_controller(&self) -> bool {
        self.class == DeviceClass::Controller
    }
}

/// Change produced by folding an enumeration into the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceChange {
    Discovered { serial: String, class: DeviceClass },
    Connected { serial: String },
    Disconnected { serial: String },
    Reindexed { serial: String, from: u32, to: u32 },
}

/// Previous-frame rotation per target.
#[derive(Debug, Clone, Default)]
pub struct RotationHistory {
    rotations: HashMap<TargetId, Rotation>,
}

impl RotationHistory {
    pub fn get(&self, target: &TargetId) -> Option<&Rotation> {
        self.rotations.get(target)
    }

    pub fn record(&mut self, target: TargetId, rotation: Rotation) {
        self.rotations.insert(target, rotation);
    }

    pub fn forget(&mut self, target: &TargetId) {
        self.rotations.remove(target);
    }
}

/// Borrowed view used by one frame pass.
pub struct FrameView<'a> {
    pub trackers: &'a [Tracker],
    pub calibration: &'a Calibration,
    pub history: &'a mut RotationHistory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub calibration: Calibration,
    trackers: Vec<Tracker>,
    active: usize,
    #[serde(skip)]
    history: RotationHistory,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tracker> {
        self.trackers.iter()
    }

    pub fn get(&self, serial: &str) -> Option<&Tracker> {
        self.trackers.iter().find(|t| t.serial == serial)
    }

    pub fn get_mut(&mut self, serial: &str) -> Option<&mut Tracker> {
        self.trackers.iter_mut().find(|t| t.serial == serial)
    }

    pub fn position(&self, serial: &str) -> Option<usize> {
        self.trackers.iter().position(|t| t.serial == serial)
    }

    pub fn at(&self, position: usize) -> Option<&Tracker> {
        self.trackers.get(position)
    }

    pub fn at_mut(&mut self, position: usize) -> Option<&mut Tracker> {
        self.trackers.get_mut(position)
    }

    /// Tracker selected in the UI list.
    pub fn active(&self) -> Option<&Tracker> {
        self.trackers.get(self.active)
    }

    pub fn active_position(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, position: usize) {
        self.active = position.min(self.trackers.len().saturating_sub(1));
    }

    pub fn history(&self) -> &RotationHistory {
        &self.history
    }

    /// Replace a tracker's binding; the old target's rotation history is dropped.
    pub fn bind(&mut self, serial: &str, binding: Binding) -> bool {
        match self.trackers.iter_mut().find(|t| t.serial == serial) {
            Some(tracker) => {
                if let Some(object) = tracker.binding.object() {
                    let old = TargetId {
                        object: object.to_string(),
                        sub_part: tracker.binding.sub_part_name().map(str::to_string),
                    };
                    self.history.forget(&old);
                    self.history.forget(&TargetId::object(object));
                }
                tracker.binding = binding;
                true
            }
            None => false,
        }
    }

    /// Insert a new tracker or update a known one in place.
    ///
    /// Configuration on a known tracker is never touched. Returns the changes
    /// worth reporting.
    pub fn upsert(&mut self, info: &DeviceInfo) -> Vec<DeviceChange> {
        let mut changes = Vec::new();

        let Some(position) = self.position(&info.serial) else {
            log::debug!(
                "Discovered {:?} {} at index {}",
                info.class,
                info.serial,
                info.index
            );
            self.trackers.push(Tracker::discovered(info));
            changes.push(DeviceChange::Discovered {
                serial: info.serial.clone(),
                class: info.class,
            });
            if info.connected {
                changes.push(DeviceChange::Connected {
                    serial: info.serial.clone(),
                });
            }
            return changes;
        };
        let tracker = &mut self.trackers[position];

        if tracker.index != info.index {
            log::debug!(
                "Tracker {} moved from index {} to {}",
                tracker.serial,
                tracker.index,
                info.index
            );
            changes.push(DeviceChange::Reindexed {
                serial: tracker.serial.clone(),
                from: tracker.index,
                to: info.index,
            });
            tracker.index = info.index;
        }
        if tracker.connected != info.connected {
            changes.push(if info.connected {
                DeviceChange::Connected {
                    serial: tracker.serial.clone(),
                }
            } else {
                DeviceChange::Disconnected {
                    serial: tracker.serial.clone(),
                }
            });
            tracker.connected = info.connected;
        }
        tracker.class = info.class;

        changes
    }

    /// Fold a full runtime enumeration into the registry.
    ///
    /// Untrackable classes are ignored. Known trackers missing from the
    /// enumeration are marked disconnected, since their old index may now
    /// belong to another device.
    pub fn sync(&mut self, devices: &[DeviceInfo]) -> Vec<DeviceChange> {
        let mut changes = Vec::new();
        let trackable: Vec<&DeviceInfo> =
            devices.iter().filter(|d| d.class.is_trackable()).collect();

        for info in &trackable {
            changes.extend(self.upsert(info));
        }

        for tracker in &mut self.trackers {
            let present = trackable.iter().any(|d| d.serial == tracker.serial);
            if !present && tracker.connected {
                tracker.connected = false;
                changes.push(DeviceChange::Disconnected {
                    serial: tracker.serial.clone(),
                });
            }
        }

        changes
    }

    pub fn frame_view(&mut self) -> FrameView<'_> {
        FrameView {
            trackers: &self.trackers,
            calibration: &self.calibration,
            history: &mut self.history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn info(index: u32, serial: &str, class: DeviceClass) -> DeviceInfo {
        DeviceInfo {
            index,
            class,
            serial: serial.to_string(),
            connected: true,
        }
    }

    #[test]
    fn test_binding_follows_serial_when_indices_swap() {
        let mut registry = Registry::new();
        registry.sync(&[
            info(1, "LHR-A", DeviceClass::GenericTracker),
            info(2, "LHR-B", DeviceClass::GenericTracker),
        ]);
        registry.bind("LHR-A", Binding::to_object("Hips"));
        registry.bind("LHR-B", Binding::to_object("Head"));

        let changes = registry.sync(&[
            info(2, "LHR-A", DeviceClass::GenericTracker),
            info(1, "LHR-B", DeviceClass::GenericTracker),
        ]);

        assert_eq!(registry.len(), 2);
        let a = registry.get("LHR-A").unwrap();
        assert_eq!((a.index, a.binding.object()), (2, Some("Hips")));
        let b = registry.get("LHR-B").unwrap();
        assert_eq!((b.index, b.binding.object()), (1, Some("Head")));
        assert!(changes.contains(&DeviceChange::Reindexed {
            serial: "LHR-A".into(),
            from: 1,
            to: 2,
        }));
    }

    #[test]
    fn test_upsert_keeps_configuration() {
        let mut registry = Registry::new();
        registry.upsert(&info(3, "CTRL", DeviceClass::Controller));
        {
            let tracker = registry.get_mut("CTRL").unwrap();
            tracker.friendly_name = "Left hand".into();
            tracker.controller.trigger.property = "a.b".into();
            tracker.binding.offset.location = DVec3::new(0.0, 0.0, 0.1);
        }

        let mut again = info(3, "CTRL", DeviceClass::Controller);
        again.connected = false;
        let changes = registry.upsert(&again);

        let tracker = registry.get("CTRL").unwrap();
        assert_eq!(tracker.friendly_name, "Left hand");
        assert_eq!(tracker.controller.trigger.property, "a.b");
        assert_eq!(tracker.binding.offset.location, DVec3::new(0.0, 0.0, 0.1));
        assert!(!tracker.connected);
        assert_eq!(
            changes,
            vec![DeviceChange::Disconnected {
                serial: "CTRL".into()
            }]
        );
    }

    #[test]
    fn test_sync_ignores_untrackable_and_marks_missing() {
        let mut registry = Registry::new();
        let changes = registry.sync(&[
            info(0, "HMD", DeviceClass::Hmd),
            info(1, "BASE", DeviceClass::TrackingReference),
            info(2, "T1", DeviceClass::GenericTracker),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("BASE").is_none());
        assert_eq!(
            changes
                .iter()
                .filter(|c| matches!(c, DeviceChange::Discovered { .. }))
                .count(),
            2
        );

        let changes = registry.sync(&[info(0, "HMD", DeviceClass::Hmd)]);
        assert!(!registry.get("T1").unwrap().connected);
        assert_eq!(
            changes,
            vec![DeviceChange::Disconnected {
                serial: "T1".into()
            }]
        );
    }

    #[test]
    fn test_active_selection_is_clamped() {
        let mut registry = Registry::new();
        registry.set_active(4);
        assert_eq!(registry.active_position(), 0);
        assert!(registry.active().is_none());

        registry.sync(&[
            info(0, "A", DeviceClass::Hmd),
            info(1, "B", DeviceClass::Controller),
        ]);
        registry.set_active(9);
        assert_eq!(registry.active().map(|t| t.serial.as_str()), Some("B"));
        assert_eq!(registry.at(0).map(|t| t.serial.as_str()), Some("A"));
        assert_eq!(registry.position("B"), Some(1));
    }

    #[test]
    fn test_persisted_state_fills_defaults() {
        let json = r#"{
            "calibration": { "location_scale": 2.0 },
            "trackers": [{
                "serial": "LHR-1",
                "friendly_name": "Waist",
                "index": 4,
                "class": "GenericTracker",
                "connected": false,
                "binding": { "target": "Armature", "sub_part": "hips" }
            }]
        }"#;
        let registry: Registry = serde_json::from_str(json).unwrap();

        assert_eq!(registry.calibration.location_scale, 2.0);
        assert_eq!(registry.calibration.floor_position, DVec3::ZERO);
        let tracker = registry.get("LHR-1").unwrap();
        assert!(tracker.binding.use_sub_part);
        assert_eq!(tracker.binding.offset.scale, DVec3::ONE);
        assert_eq!(tracker.controller.trackpad_x.min, -1.0);
        assert!(tracker.controller.menu.is_inert());
    }

    #[test]
    fn test_bind_drops_rotation_history() {
        let mut registry = Registry::new();
        registry.upsert(&info(1, "T", DeviceClass::GenericTracker));
        registry.bind("T", Binding::to_object("Cube"));
        registry
            .frame_view()
            .history
            .record(TargetId::object("Cube"), Rotation::Quaternion(glam::DQuat::IDENTITY));

        assert!(registry.bind("T", Binding::to_object("Sphere")));
        assert!(registry.history().get(&TargetId::object("Cube")).is_none());
        assert!(!registry.bind("missing", Binding::default()));
    }
}
