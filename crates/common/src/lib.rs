pub mod config;
pub mod logging;
pub mod telemetry;
pub mod wait;

pub use config::{Environment, env_or, otel_endpoint};
pub use logging::setup_logging;
pub use telemetry::{Observability, TelemetryGuard};
pub use wait::wait_for_resource;
