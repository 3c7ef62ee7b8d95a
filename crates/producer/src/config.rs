use anyhow::{Result, bail};
use common::env_or;
use shmqueue::QueueConfig;
use std::env;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub environment: Environment,
    pub otel_endpoint: Option<String>,
    pub queue: QueueConfig,
    pub target_fps: f64,
    /// Stop after this many frames; `None` runs until signalled
    pub frame_limit: Option<u32>,
    pub objects_per_frame: usize,
    /// Resolution the synthetic detections are generated in, before scaling
    /// into the slot's frame size
    pub source_width: u32,
    pub source_height: u32,
    /// Remove objects left by a previous run before creating the queue
    pub reset_stale: bool,
    pub seed: Option<u64>,
}

impl ProducerConfig {
    pub fn from_env() -> Result<Self> {
        let frame_limit = match env_or("FRAME_LIMIT", 0u32) {
            0 => None,
            n => Some(n),
        };

        let config = Self {
            environment: Environment::from_env(),
            otel_endpoint: common::otel_endpoint(),
            queue: QueueConfig::from_env(),
            target_fps: env_or("TARGET_FPS", 30.0),
            frame_limit,
            objects_per_frame: env_or("OBJECTS_PER_FRAME", 5),
            source_width: env_or("SOURCE_WIDTH", 1280),
            source_height: env_or("SOURCE_HEIGHT", 720),
            reset_stale: env_or("RESET_STALE", false),
            seed: env::var("PRODUCER_SEED").ok().and_then(|s| s.parse().ok()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            bail!("TARGET_FPS must be a positive number, got {}", self.target_fps);
        }
        if self.source_width == 0 || self.source_height == 0 {
            bail!(
                "Source resolution must be non-zero, got {}x{}",
                self.source_width,
                self.source_height
            );
        }
        self.queue.geometry.validate()?;
        self.queue.names.validate()?;
        Ok(())
    }
}
