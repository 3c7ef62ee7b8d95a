use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Poll `connect` until it succeeds, sleeping `poll_interval` between tries.
///
/// Returns `None` if `stop` is raised first. The first failure is logged at
/// info level, later ones at debug.
pub fn wait_for_resource<F, T, E>(
    mut connect: F,
    poll_interval: Duration,
    resource_name: &str,
    stop: &AtomicBool,
) -> Option<T>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempts: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        match connect() {
            Ok(resource) => {
                tracing::info!(attempts, "{} connected", resource_name);
                return Some(resource);
            }
            Err(e) if attempts == 0 => {
                tracing::info!(error = %e, "Waiting for {}", resource_name);
            }
            Err(e) => {
                tracing::debug!(error = %e, attempts, "Still waiting for {}", resource_name);
            }
        }
        attempts += 1;
        thread::sleep(poll_interval);
    }
    None
}
