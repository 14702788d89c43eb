//! Per-guild play cooldown: a token-bucket window keyed by guild.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Cooldown policy for the play command.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    /// Max invocations allowed per window.
    pub max_invocations: u32,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            max_invocations: 1,
            window_secs: 5,
        }
    }
}

/// Cooldown check result.
#[derive(Debug, Clone)]
pub struct CooldownResult {
    pub allowed: bool,
    /// Seconds until the window resets.
    pub reset_in_secs: u64,
}

struct BucketState {
    count: u32,
    window_start: Instant,
}

/// In-memory cooldown tracker, one bucket per guild.
pub struct PlayCooldown {
    policy: CooldownPolicy,
    buckets: Mutex<HashMap<u64, BucketState>>,
}

impl PlayCooldown {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check and update the cooldown for a guild. Returns whether the
    /// invocation is allowed.
    pub async fn check(&self, guild_id: u64) -> CooldownResult {
        let window = Duration::from_secs(self.policy.window_secs);
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        let state = buckets.entry(guild_id).or_insert_with(|| BucketState {
            count: 0,
            window_start: now,
        });

        // Reset window if expired.
        if now.duration_since(state.window_start) >= window {
            state.count = 0;
            state.window_start = now;
        }

        let elapsed = now.duration_since(state.window_start);
        let reset_in_secs = window.saturating_sub(elapsed).as_secs();

        if state.count < self.policy.max_invocations {
            state.count += 1;
            debug!(guild_id, count = state.count, "cooldown check: allowed");
            CooldownResult {
                allowed: true,
                reset_in_secs,
            }
        } else {
            debug!(guild_id, "cooldown check: denied");
            CooldownResult {
                allowed: false,
                reset_in_secs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denies_second_play_within_window() {
        let cooldown = PlayCooldown::new(CooldownPolicy {
            max_invocations: 1,
            window_secs: 60,
        });
        let r1 = cooldown.check(1).await;
        let r2 = cooldown.check(1).await;
        assert!(r1.allowed);
        assert!(!r2.allowed);
        assert!(r2.reset_in_secs <= 60);
    }

    #[tokio::test]
    async fn guilds_have_separate_windows() {
        let cooldown = PlayCooldown::new(CooldownPolicy {
            max_invocations: 1,
            window_secs: 60,
        });
        let r1 = cooldown.check(1).await;
        let r2 = cooldown.check(2).await;
        assert!(r1.allowed);
        assert!(r2.allowed); // Different guild, fresh bucket.
    }

    #[tokio::test]
    async fn window_expiry_resets_the_bucket() {
        let cooldown = PlayCooldown::new(CooldownPolicy {
            max_invocations: 1,
            window_secs: 0,
        });
        let r1 = cooldown.check(1).await;
        let r2 = cooldown.check(1).await;
        assert!(r1.allowed);
        assert!(r2.allowed); // Zero-length window expires immediately.
    }
}
