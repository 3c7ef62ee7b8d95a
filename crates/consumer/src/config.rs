use anyhow::Result;
use common::env_or;
use shmqueue::QueueConfig;
use std::env;
use std::path::PathBuf;

pub use common::Environment;

/// Upper bound on a single blocking wait
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub environment: Environment,
    pub otel_endpoint: Option<String>,
    pub queue: QueueConfig,
    /// Retry interval while waiting for the producer, and the longest a
    /// single consume blocks before re-checking for shutdown
    pub poll_interval_ms: u64,
    /// Print one JSON object per frame on stdout instead of a log event
    pub output_json: bool,
    /// Newline-separated class names; the built-in COCO list is used when unset
    pub class_names_path: Option<PathBuf>,
    /// Stop after this many frames; `None` runs until signalled
    pub frame_limit: Option<u64>,
}

impl ConsumerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            environment: Environment::from_env(),
            otel_endpoint: common::otel_endpoint(),
            queue: QueueConfig::from_env(),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", 500u64).clamp(1, MAX_POLL_INTERVAL_MS),
            output_json: env_or("OUTPUT_JSON", false),
            class_names_path: env::var("CLASS_NAMES_PATH").ok().map(PathBuf::from),
            frame_limit: match env_or("FRAME_LIMIT", 0u64) {
                0 => None,
                n => Some(n),
            },
        };
        config.queue.geometry.validate()?;
        config.queue.names.validate()?;
        Ok(config)
    }
}
