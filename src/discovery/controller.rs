use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DiscoveryError, Result, guarded};
use crate::config::DiscoveryConfig;
use crate::extractor::PageExtractor;
use crate::pacing::{Pacing, sleep_or_cancel};

/// Stall and batching limits for one discovery run
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryPolicy {
    pub max_retries: u32,
    pub batch_size: usize,
    pub batch_pause: Pacing,
    pub stall_pause: Pacing,
}

impl From<&DiscoveryConfig> for DiscoveryPolicy {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            batch_size: config.batch_size,
            batch_pause: Pacing::new(config.batch_pause, config.batch_pause_jitter),
            stall_pause: Pacing::new(config.stall_delay, config.stall_jitter),
        }
    }
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryController {
    policy: DiscoveryPolicy,
}

impl DiscoveryController {
    pub fn new(policy: DiscoveryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DiscoveryPolicy {
        &self.policy
    }

    /// Collect up to `target` distinct references in first-seen order.
    ///
    /// Returns fewer than `target` when the page stops yielding new entries
    /// for `max_retries` consecutive passes.
    pub async fn discover(
        &self,
        extractor: &mut dyn PageExtractor,
        target: usize,
        max_scroll: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if target == 0 {
            return Err(DiscoveryError::InvalidTarget(target));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut found: Vec<String> = Vec::new();
        let mut stall_count = 0u32;
        let mut since_pause = 0usize;

        loop {
            guarded(cancel, extractor.advance(max_scroll)).await?;
            let visible = guarded(cancel, extractor.enumerate_visible()).await?;

            let before = found.len();
            for reference in visible {
                if found.len() >= target {
                    break;
                }
                if seen.insert(reference.clone()) {
                    found.push(reference);
                }
            }
            let added = found.len() - before;

            if found.len() >= target {
                info!(found = found.len(), target, "Discovery target reached");
                return Ok(found);
            }

            if added == 0 {
                stall_count += 1;
                if stall_count >= self.policy.max_retries {
                    warn!(
                        found = found.len(),
                        target,
                        stall_count,
                        "No new references after max retries, returning partial result"
                    );
                    return Ok(found);
                }

                debug!(stall_count, found = found.len(), "No progress, reloading page");
                if !sleep_or_cancel(self.policy.stall_pause.sample(), cancel).await {
                    return Err(DiscoveryError::Cancelled);
                }
                guarded(cancel, extractor.recover()).await?;
                continue;
            }

            stall_count = 0;
            since_pause += added;
            debug!(added, found = found.len(), target, "Discovered new references");

            if since_pause >= self.policy.batch_size {
                since_pause = 0;
                let pause = self.policy.batch_pause.sample();
                info!(found = found.len(), pause_ms = pause.as_millis() as u64, "Batch pause");
                if !sleep_or_cancel(pause, cancel).await {
                    return Err(DiscoveryError::Cancelled);
                }
            }
        }
    }
}
