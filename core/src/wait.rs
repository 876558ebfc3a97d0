use log::{debug, info};
use snafu::Snafu;
use std::future::Future;
use std::time::Duration;

/// The probe never succeeded within the allowed number of attempts.
#[derive(Debug, Snafu)]
#[snafu(display(
    "not ready after {} attempt(s) spaced {}s apart",
    attempts,
    interval.as_secs_f64()
))]
pub struct Timeout {
    pub attempts: u32,
    pub interval: Duration,
}

/// Runs `probe` until it returns `true`, at most `max_attempts` times with `interval` between
/// attempts. There is no sleep after the final attempt, so the wait never takes longer than
/// `max_attempts * interval` plus the time spent in the probes themselves.
pub async fn wait_until_ready<F, Fut>(
    mut probe: F,
    max_attempts: u32,
    interval: Duration,
) -> Result<(), Timeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=max_attempts {
        if probe().await {
            info!("Ready after {} attempt(s)", attempt);
            return Ok(());
        }
        debug!("Not ready, attempt {} of {}", attempt, max_attempts);
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    TimeoutSnafu {
        attempts: max_attempts,
        interval,
    }
    .fail()
}
