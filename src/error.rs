/// Failures reported by the VR runtime client.
///
/// These are recoverable: the session either stays closed (init) or skips
/// the affected frame (poses) or channel (controller state).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("VR runtime initialization failed: {0}")]
    Init(String),

    #[error("Pose retrieval failed: {0}")]
    Poses(String),

    #[error("Timeout waiting for synchronized poses")]
    Timeout,

    #[error("Controller state unavailable for device index {0}")]
    ControllerState(u32),

    #[error("VR runtime session is not open")]
    NotInitialized,
}

/// A user-supplied configuration that cannot be applied.
///
/// Raised per channel or per binding and never fatal to a frame pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Property path is empty")]
    EmptyPath,

    #[error("Malformed property path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Invalid subscript '{0}': expected a quoted key or an integer")]
    InvalidSubscript(String),

    #[error("Attribute '{0}' not found")]
    MissingAttribute(String),

    #[error("Cannot read attribute '{0}' from a non-object value")]
    NotAnObject(String),

    #[error("Key '{0}' not found")]
    MissingKey(String),

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot subscript '{segment}' with {subscript}")]
    NotSubscriptable { segment: String, subscript: String },

    #[error("Property '{0}' is not a floating point field")]
    NotNumeric(String),

    #[error("Degenerate remap input range [{0}, {0}]")]
    DegenerateRange(f64),
}

/// Errors that can occur while streaming tracking data into a scene.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Tracker {serial} has no target configured")]
    BindingMissing { serial: String },

    #[error("Target object '{object}' does not exist")]
    TargetMissing { object: String },

    #[error("Target '{object}' has no sub-part '{sub_part}'")]
    SubPartMissing { object: String, sub_part: String },
}

impl Error {
    /// True for the "nothing configured yet" case that is never worth reporting.
    pub fn is_binding_missing(&self) -> bool {
        matches!(self, Error::BindingMissing { .. })
    }
}
