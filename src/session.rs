//! Runtime session lifecycle and the per-frame update pass.

use crate::config::{ErrorPolicy, StreamerConfig};
use crate::error::{Error, RuntimeError};
use crate::registry::{Binding, DeviceChange, Registry};
use crate::remap;
use crate::runtime::VrRuntime;
use crate::scene::Scene;
use crate::tracking;
use crate::types::DeviceClass;
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Name of the shared parent empty created by [`Streamer::create_targets`].
pub const TARGET_ROOT: &str = "Root";
/// Display size of the empties created for trackers.
pub const TARGET_DISPLAY_SIZE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
}

/// Notification for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    Stopped,
    DeviceDiscovered { serial: String, class: DeviceClass },
    DeviceConnected { serial: String },
    DeviceDisconnected { serial: String },
    DeviceReindexed { serial: String, from: u32, to: u32 },
    /// Pose retrieval failed; tracking was skipped for one frame.
    FrameSkipped(RuntimeError),
}

impl From<DeviceChange> for SessionEvent {
    fn from(change: DeviceChange) -> Self {
        match change {
            DeviceChange::Discovered { serial, class } => {
                SessionEvent::DeviceDiscovered { serial, class }
            }
            DeviceChange::Connected { serial } => SessionEvent::DeviceConnected { serial },
            DeviceChange::Disconnected { serial } => SessionEvent::DeviceDisconnected { serial },
            DeviceChange::Reindexed { serial, from, to } => {
                SessionEvent::DeviceReindexed { serial, from, to }
            }
        }
    }
}

/// A per-device failure surfaced under [`ErrorPolicy::Report`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIssue {
    pub serial: String,
    pub error: Error,
}

/// Outcome of one frame pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Targets whose transform was written.
    pub tracked: usize,
    /// Controller channels written to scene properties.
    pub inputs_written: usize,
    /// Set when pose retrieval failed and tracking was skipped.
    pub poses_skipped: bool,
    pub issues: Vec<FrameIssue>,
}

/// Streams a VR runtime into a host scene.
///
/// Owns the runtime session and the tracker registry. The host adapter
/// calls [`Streamer::on_frame_advance`] once per frame with its scene.
/// Dropping an open streamer closes the runtime session.
pub struct Streamer<R: VrRuntime> {
    runtime: R,
    config: StreamerConfig,
    registry: Registry,
    state: SessionState,
    sender: Sender<SessionEvent>,
    receiver: Receiver<SessionEvent>,
}

impl<R: VrRuntime> Streamer<R> {
    pub fn new(runtime: R, config: StreamerConfig) -> Self {
        Self::with_registry(runtime, config, Registry::new())
    }

    /// Start from previously persisted registry state.
    pub fn with_registry(runtime: R, config: StreamerConfig, registry: Registry) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(config.event_capacity.max(1));
        Self {
            runtime,
            config,
            registry,
            state: SessionState::Closed,
            sender,
            receiver,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// Subscribe to session events.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.receiver.clone()
    }

    /// Open the runtime session and enumerate devices.
    ///
    /// Does nothing when already open. On failure the session stays closed.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Open {
            log::debug!("Streamer already running");
            return Ok(());
        }

        if let Err(e) = self.runtime.init(self.config.application_mode) {
            log::warn!("Failed to open VR session: {}", e);
            return Err(e.into());
        }
        self.state = SessionState::Open;
        log::info!("VR session opened ({:?} mode)", self.config.application_mode);
        self.emit(SessionEvent::Started);

        self.refresh_devices();
        Ok(())
    }

    /// Close the runtime session. Trackers and bindings are kept.
    pub fn stop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.runtime.shutdown();
        self.state = SessionState::Closed;
        log::info!("VR session closed");
        self.emit(SessionEvent::Stopped);
    }

    /// Start when closed, stop when open.
    pub fn toggle(&mut self) -> Result<SessionState, Error> {
        match self.state {
            SessionState::Open => self.stop(),
            SessionState::Closed => self.start()?,
        }
        Ok(self.state)
    }

    /// Fold the runtime's current device list into the registry.
    pub fn refresh_devices(&mut self) -> Vec<DeviceChange> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }
        let devices = self.runtime.enumerate_devices();
        let changes = self.registry.sync(&devices);
        for change in &changes {
            self.emit(change.clone().into());
        }
        changes
    }

    /// Run one update pass: enumerate, fetch poses, move bound targets and
    /// push controller inputs.
    ///
    /// A failure on one device never affects another. Failed pose retrieval
    /// skips tracking for this frame; controllers are still read.
    pub fn on_frame_advance<S: Scene + ?Sized>(&mut self, scene: &mut S) -> FrameReport {
        let mut report = FrameReport::default();
        if self.state == SessionState::Closed {
            return report;
        }

        self.refresh_devices();

        let poses = match self.runtime.synchronized_poses(self.config.pose_timeout) {
            Ok(poses) => Some(poses),
            Err(e) => {
                log::warn!("Skipping tracking this frame: {}", e);
                self.emit(SessionEvent::FrameSkipped(e));
                report.poses_skipped = true;
                None
            }
        };

        let policy = self.config.error_policy;
        let view = self.registry.frame_view();
        for tracker in view.trackers.iter().filter(|t| t.connected) {
            let pose = poses
                .as_ref()
                .and_then(|p| p.get(&tracker.index))
                .filter(|p| p.is_valid);
            if let Some(pose) = pose {
                let applied =
                    tracking::apply_tracking(scene, tracker, pose, view.calibration, view.history);
                match applied {
                    Ok(_) => report.tracked += 1,
                    Err(e) => note(policy, &mut report, &tracker.serial, e),
                }
            }

            if !tracker.is_controller() {
                continue;
            }
            match self.runtime.controller_state(tracker.index) {
                Ok(state) => {
                    let results = remap::apply_controller(scene, &tracker.controller, &state);
                    for (channel, result) in results {
                        match result {
                            Ok(_) => report.inputs_written += 1,
                            Err(e) => {
                                log::trace!("{} {:?} channel not written", tracker.serial, channel);
                                note(policy, &mut report, &tracker.serial, e.into());
                            }
                        }
                    }
                }
                Err(e) => note(policy, &mut report, &tracker.serial, e.into()),
            }
        }

        log::debug!(
            "Frame: {} tracked, {} inputs written, {} issues",
            report.tracked,
            report.inputs_written,
            report.issues.len()
        );
        report
    }

    /// Bind every known tracker to an object named after its serial.
    ///
    /// Missing objects are created as small empties under a shared
    /// [`TARGET_ROOT`] empty, itself created on first need. Offsets and
    /// sub-part settings are kept. Returns the number of empties created.
    pub fn create_targets<S: Scene + ?Sized>(&mut self, scene: &mut S) -> usize {
        let trackers: Vec<(String, Binding)> = self
            .registry
            .iter()
            .map(|t| (t.serial.clone(), t.binding.clone()))
            .collect();

        let mut created = 0;
        for (serial, mut binding) in trackers {
            if scene.target_kind(&serial).is_none() {
                if scene.target_kind(TARGET_ROOT).is_none() {
                    scene.create_empty(TARGET_ROOT, TARGET_DISPLAY_SIZE, None);
                }
                scene.create_empty(&serial, TARGET_DISPLAY_SIZE, Some(TARGET_ROOT));
                created += 1;
            }
            binding.target = Some(serial.clone());
            self.registry.bind(&serial, binding);
        }
        log::info!("Created {} tracker targets", created);
        created
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(TrySendError::Full(_)) = self.sender.try_send(event) {
            log::trace!("Session event channel full, dropping event");
        }
    }
}

impl<R: VrRuntime> Drop for Streamer<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn note(policy: ErrorPolicy, report: &mut FrameReport, serial: &str, error: Error) {
    if error.is_binding_missing() {
        return;
    }
    match policy {
        ErrorPolicy::Silent => log::debug!("{}: {}", serial, error),
        ErrorPolicy::Warn => log::warn!("{}: {}", serial, error),
        ErrorPolicy::Report => {
            log::warn!("{}: {}", serial, error);
            report.issues.push(FrameIssue {
                serial: serial.to_string(),
                error,
            });
        }
    }
}
