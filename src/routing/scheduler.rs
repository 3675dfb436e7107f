//! Scheduled background reload.
//!
//! # Responsibilities
//! - Trigger one reload after a startup delay
//! - Retry failed reloads with jittered exponential backoff
//! - Stop after the first success or on shutdown
//!
//! # Design Decisions
//! - Runs as its own task; request dispatch never waits on it
//! - Reloads through the store, so it queues behind admin batches
//! - Later reloads come only from store mutations

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::ReloadConfig;
use crate::lifecycle::shutdown::triggered;
use crate::routing::Router;

pub struct ReloadScheduler {
    router: Arc<Router>,
    config: ReloadConfig,
}

impl ReloadScheduler {
    pub fn new(router: Arc<Router>, config: ReloadConfig) -> Self {
        Self { router, config }
    }

    /// Run until a reload succeeds or shutdown is signalled.
    ///
    /// Returns the generation installed, if any.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Option<u64> {
        if !self.config.scheduled {
            tracing::info!("Scheduled reload disabled");
            return None;
        }

        tracing::info!(
            initial_delay_secs = self.config.initial_delay_secs,
            "Reload scheduler starting"
        );

        let mut delay = Duration::from_secs(self.config.initial_delay_secs);
        let mut attempt = 0;

        loop {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = triggered(&mut shutdown) => {
                    tracing::info!("Reload scheduler received shutdown signal, exiting loop");
                    return None;
                }
            }

            attempt += 1;
            tracing::debug!(attempt, "Triggered scheduled reload of router");
            let router = self.router.clone();
            let result = match tokio::task::spawn_blocking(move || router.refresh()).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match result {
                Ok(generation) => {
                    tracing::info!(generation, attempt, "Scheduled reload succeeded");
                    return Some(generation);
                }
                Err(error) => {
                    delay = retry_delay(&self.config, attempt);
                    tracing::error!(error = %error, attempt, retry_in = ?delay, "Unable to reload router");
                }
            }
        }
    }
}

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// Doubles from `backoff_base_ms` per failure up to `backoff_max_ms`, plus up
/// to 10% jitter so instances restarted together do not hit the store in
/// lockstep.
fn retry_delay(config: &ReloadConfig, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let capped = config
        .backoff_base_ms
        .saturating_mul(factor)
        .min(config.backoff_max_ms);

    let jitter = match capped / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    };
    Duration::from_millis(capped + jitter)
}
