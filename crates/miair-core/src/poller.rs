//! Periodic refresh of every exposed characteristic.
//!
//! The purifier never pushes changes on its own, so the bridge polls it. Each
//! cycle force-fetches every polled property in one round trip and then
//! re-runs every get handler against the fresh cache, which broadcasts any
//! change made with the physical buttons or the vendor app.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};

use crate::bridge::Bridge;

/// Default time between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Background poller for a [`Bridge`].
#[derive(Debug)]
pub struct Poller {
    bridge: Arc<Bridge>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl Poller {
    pub fn new(bridge: Arc<Bridge>, interval: Duration) -> Self {
        Self {
            bridge,
            interval: interval.max(Duration::from_millis(1)),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Token that stops the poller when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Poll until cancelled. The first cycle runs one interval after start.
    pub async fn run(self) {
        info!(
            "Starting poller for {} (interval: {:?})",
            self.bridge.device().name(),
            self.interval
        );

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!("Poller cancelled, stopping gracefully");
                    break;
                }
                _ = timer.tick() => {}
            }

            match self.bridge.refresh().await {
                Ok(()) => {
                    if consecutive_failures > 0 {
                        info!("Polling recovered after {} failure(s)", consecutive_failures);
                    }
                    consecutive_failures = 0;
                    debug!("Poll cycle complete");
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let level = failure_level(consecutive_failures);
                    if level == Level::WARN {
                        warn!("Polling failed: {} (attempt {})", e, consecutive_failures);
                    } else if level == Level::ERROR {
                        error!(
                            "Polling failed {} times in a row: {}; further failures are logged at debug level",
                            consecutive_failures, e
                        );
                    } else {
                        debug!("Polling failed: {} (attempt {})", e, consecutive_failures);
                    }
                }
            }
        }
    }

    /// Run on a background task. Cancel through the returned token.
    pub fn spawn(self) -> (JoinHandle<()>, CancellationToken) {
        let token = self.cancellation_token();
        (tokio::spawn(self.run()), token)
    }
}

/// Log level for the `n`th failed cycle in a row.
fn failure_level(consecutive_failures: u32) -> Level {
    match consecutive_failures {
        0..=3 => Level::WARN,
        4 => Level::ERROR,
        _ => Level::DEBUG,
    }
}
