use crate::types::ApplicationMode;
use std::time::Duration;

pub const DEFAULT_POSE_TIMEOUT: Duration = Duration::from_millis(50);
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How per-device failures inside a frame pass are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log at debug level only; the device just shows no response.
    #[default]
    Silent,
    /// Log at warn level.
    Warn,
    /// Log at warn level and return the failure in the frame report.
    Report,
}

impl ErrorPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "silent" | "off" => Some(ErrorPolicy::Silent),
            "warn" | "log" => Some(ErrorPolicy::Warn),
            "report" | "strict" => Some(ErrorPolicy::Report),
            _ => None,
        }
    }
}

/// Streamer settings that are not part of the persisted scene state.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamerConfig {
    /// Upper bound handed to the runtime's synchronized pose wait.
    pub pose_timeout: Duration,
    pub error_policy: ErrorPolicy,
    /// Session event channel size; events beyond it are dropped.
    pub event_capacity: usize,
    pub application_mode: ApplicationMode,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            pose_timeout: DEFAULT_POSE_TIMEOUT,
            error_policy: ErrorPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            application_mode: ApplicationMode::Scene,
        }
    }
}

fn parse_application_mode(value: &str) -> Option<ApplicationMode> {
    match value {
        "scene" => Some(ApplicationMode::Scene),
        "background" => Some(ApplicationMode::Background),
        _ => None,
    }
}

impl StreamerConfig {
    /// Defaults overridden by `TRACKBIND_POSE_TIMEOUT_MS`,
    /// `TRACKBIND_ERROR_POLICY` (silent|warn|report),
    /// `TRACKBIND_EVENT_CAPACITY` and `TRACKBIND_APPLICATION_MODE`
    /// (scene|background).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pose_timeout = Duration::from_millis(read_env_u64(
            "TRACKBIND_POSE_TIMEOUT_MS",
            defaults.pose_timeout.as_millis() as u64,
        ));

        let policy = read_env_string("TRACKBIND_ERROR_POLICY", "silent");
        let error_policy = ErrorPolicy::parse(&policy).unwrap_or_else(|| {
            log::warn!(
                "Unknown TRACKBIND_ERROR_POLICY='{}', using silent (supported: silent|warn|report)",
                policy
            );
            ErrorPolicy::Silent
        });

        let event_capacity =
            read_env_u64("TRACKBIND_EVENT_CAPACITY", defaults.event_capacity as u64).max(1);

        let mode = read_env_string("TRACKBIND_APPLICATION_MODE", "scene");
        let application_mode = parse_application_mode(&mode).unwrap_or_else(|| {
            log::warn!(
                "Unknown TRACKBIND_APPLICATION_MODE='{}', using scene (scene|background)",
                mode
            );
            defaults.application_mode
        });

        let config = Self {
            pose_timeout,
            error_policy,
            event_capacity: event_capacity as usize,
            application_mode,
        };
        log::debug!("Streamer config: {:?}", config);
        config
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Ignoring {}='{}': not an integer", name, v);
            default
        }),
        Err(_) => default,
    }
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
