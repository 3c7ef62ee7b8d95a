pub mod config;
pub mod fps;
pub mod labels;
pub mod metrics;
pub mod report;
pub mod service;

pub use config::ConsumerConfig;
pub use service::ConsumerService;
