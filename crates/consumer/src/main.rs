use anyhow::Context;
use common::Observability;
use consumer::{ConsumerConfig, ConsumerService};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn main() -> anyhow::Result<()> {
    let config = ConsumerConfig::from_env()?;
    let _observability =
        Observability::init("consumer", config.environment, config.otel_endpoint.as_deref())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(config = ?config, "Loaded configuration");

    let Some(mut service) =
        ConsumerService::attach(config, &shutdown).context("Failed to initialize consumer")?
    else {
        tracing::info!("Shutdown requested before the producer appeared");
        return Ok(());
    };

    match service.run(&shutdown) {
        Ok(consumed) => {
            tracing::info!(consumed, "Consumer stopped gracefully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Consumer failed");
            Err(e)
        }
    }
}
