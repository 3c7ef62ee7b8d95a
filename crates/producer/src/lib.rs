pub mod config;
pub mod metrics;
pub mod pacing;
pub mod scaling;
pub mod service;
pub mod source;

pub use config::ProducerConfig;
pub use service::ProducerService;
