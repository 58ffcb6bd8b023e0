//! # trackbind - stream VR tracking into a 3D scene
//!
//! Binds tracked devices (headset, controllers, generic trackers) to scene
//! objects or skeleton sub-parts and updates them once per host frame.
//! Provides:
//! - Pose to scene transform pipeline with offsets and floor calibration
//! - Rotation continuity across frames (quaternion sign, Euler branches)
//! - Controller input remapping onto arbitrary numeric scene properties
//! - Runtime session lifecycle with serial-keyed device tracking
//!
//! ## Quick Start
//! ```no_run
//! use trackbind::sim::{MemoryScene, SimulatedRuntime};
//! use trackbind::{Binding, DeviceClass, Pose, Streamer, StreamerConfig};
//!
//! let mut runtime = SimulatedRuntime::new();
//! runtime.add_device(3, DeviceClass::GenericTracker, "LHR-1");
//! runtime.set_pose(3, Pose::from_translation([0.0, 1.5, 0.0]));
//!
//! let mut scene = MemoryScene::new();
//! scene.add_object("Head");
//!
//! let mut streamer = Streamer::new(runtime, StreamerConfig::from_env());
//! streamer.start().unwrap();
//! streamer.registry_mut().bind("LHR-1", Binding::to_object("Head"));
//! let report = streamer.on_frame_advance(&mut scene);
//! println!("tracked {} targets", report.tracked);
//! ```

pub mod config;
pub mod error;
pub mod property;
pub mod registry;
pub mod remap;
pub mod rotation;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod sim;
pub mod tracking;
pub mod transform;
pub mod types;

pub use config::{ErrorPolicy, StreamerConfig};
pub use error::{ConfigurationError, Error, RuntimeError};
pub use registry::{Binding, Registry, Tracker};
pub use runtime::VrRuntime;
pub use scene::Scene;
pub use session::{FrameReport, SessionEvent, SessionState, Streamer};
pub use types::*;

/// Result type alias for trackbind operations.
pub type Result<T> = std::result::Result<T, Error>;
