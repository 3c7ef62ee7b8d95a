use crate::layout::QueueGeometry;
use crate::names::{DEFAULT_PREFIX, QueueNames};
use std::env;

/// Everything both ends must agree on: object names and layout geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueConfig {
    pub names: QueueNames,
    pub geometry: QueueGeometry,
}

impl QueueConfig {
    /// Read the shared queue settings from the environment.
    ///
    /// `QUEUE_PREFIX`, `QUEUE_CAPACITY`, `MAX_DETECTIONS`, `FRAME_WIDTH`,
    /// `FRAME_HEIGHT`, `FRAME_CHANNELS`. Unset or unparsable values fall back
    /// to the defaults (5 slots, 200 detections, 640x640x3).
    pub fn from_env() -> Self {
        let prefix = env::var("QUEUE_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());
        let defaults = QueueGeometry::default();

        let geometry = QueueGeometry {
            capacity: env_or("QUEUE_CAPACITY", defaults.capacity),
            max_detections: env_or("MAX_DETECTIONS", defaults.max_detections),
            width: env_or("FRAME_WIDTH", defaults.width),
            height: env_or("FRAME_HEIGHT", defaults.height),
            channels: env_or("FRAME_CHANNELS", defaults.channels),
        };

        Self {
            names: QueueNames::with_prefix(&prefix),
            geometry,
        }
    }
}

fn env_or(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
