use anyhow::Context;
use common::Observability;
use producer::{ProducerConfig, ProducerService};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn main() -> anyhow::Result<()> {
    let config = ProducerConfig::from_env()?;
    let _observability =
        Observability::init("producer", config.environment, config.otel_endpoint.as_deref())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(config = ?config, "Loaded configuration");

    let mut service =
        ProducerService::build(config).context("Failed to initialize producer")?;

    match service.run(&shutdown) {
        Ok(published) => {
            tracing::info!(published, "Producer stopped gracefully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Producer failed");
            Err(e)
        }
    }
}
