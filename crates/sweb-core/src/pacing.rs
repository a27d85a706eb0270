//! Request pacing
//!
//! The panel has no published rate limits and is not meant to be driven by
//! scripts. Before every RPC-issuing step the engine waits a jittered delay so
//! requests arrive at a human cadence instead of in bursts.
//!
//! Delays are drawn independently as `base ± base * jitter` in steps of one
//! hundredth of a second and clamped at zero.

use rand::Rng;
use std::time::Duration;
use tracing::debug;

use crate::config::PacingConfig;

/// Draw one jittered delay
///
/// # Parameters
///
/// - `base_secs`: Base delay in seconds
/// - `jitter`: Spread as a fraction of `base_secs`
/// - `rng`: Random source
pub fn jittered_delay<R: Rng>(base_secs: f64, jitter: f64, rng: &mut R) -> Duration {
    let spread = (base_secs * jitter * 100.0).round() as i64;
    let offset = if spread > 0 {
        rng.gen_range(-spread..=spread) as f64 / 100.0
    } else {
        0.0
    };

    Duration::from_secs_f64((base_secs + offset).max(0.0))
}

/// Sleeps between requests
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    /// Create a pacer from configuration
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A pacer that never sleeps
    pub fn disabled() -> Self {
        Self::new(PacingConfig::disabled())
    }

    /// Check whether this pacer ever sleeps
    pub fn is_enabled(&self) -> bool {
        self.config.base_secs > 0.0
    }

    /// Draw the next delay
    pub fn next_delay(&self) -> Duration {
        jittered_delay(
            self.config.base_secs,
            self.config.jitter,
            &mut rand::thread_rng(),
        )
    }

    /// Wait before the next request
    ///
    /// The wait happens before the request is sent, never concurrently with it.
    pub async fn pause(&self) {
        if !self.is_enabled() {
            return;
        }

        let delay = self.next_delay();
        debug!("Pacing: waiting {:.2}s before next request", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}
