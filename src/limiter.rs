//! Per-author placement cooldown.
//!
//! The limiter reads the author's latest placement event and compares it
//! with the current time. It never writes: the event for the current
//! placement is appended by the write path after the square is stored.
//!
//! Two requests from the same author that arrive together can both read the
//! same "latest" event and both pass. The log is append-only and the check
//! is not serialized per author, so that window stays open.

use std::sync::Arc;

use tracing::debug;

use crate::error::{PlaceError, PlaceResult};
use crate::store::PlacementLog;

/// Default seconds between two placements by the same author.
pub const DEFAULT_COOLDOWN_SECS: u64 = 1;

#[derive(Clone)]
pub struct CooldownLimiter {
    log: Arc<dyn PlacementLog>,
    cooldown_secs: u64,
}

impl CooldownLimiter {
    pub fn new(log: Arc<dyn PlacementLog>, cooldown_secs: u64) -> Self {
        Self { log, cooldown_secs }
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    /// Allow the placement, or reject it with [`PlaceError::RateLimited`].
    pub async fn check(&self, author: &str, now: i64) -> PlaceResult<()> {
        let Some(last) = self.log.latest(author).await? else {
            return Ok(());
        };

        // An event dated after `now` (clock skew between writers) counts as
        // placed right now.
        let elapsed = now.saturating_sub(last.timestamp).max(0);
        let cooldown = i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX);
        if elapsed < cooldown {
            debug!(author, elapsed, cooldown, "placement inside cooldown");
            return Err(PlaceError::RateLimited {
                retry_after: cooldown.saturating_sub(elapsed).unsigned_abs(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::PlacementEvent;
    use crate::store::InMemoryPlacementLog;

    async fn limiter_with(events: &[(&str, i64)], cooldown: u64) -> CooldownLimiter {
        let log = Arc::new(InMemoryPlacementLog::new());
        for (author, timestamp) in events {
            log.append(&PlacementEvent {
                author: (*author).into(),
                timestamp: *timestamp,
            })
            .await
            .unwrap();
        }
        CooldownLimiter::new(log, cooldown)
    }

    #[tokio::test]
    async fn first_placement_passes() {
        let limiter = limiter_with(&[], 5).await;
        assert!(limiter.check("ann", 100).await.is_ok());
    }

    #[tokio::test]
    async fn inside_cooldown_is_rejected() {
        let limiter = limiter_with(&[("ann", 100)], 5).await;
        assert_eq!(
            limiter.check("ann", 103).await,
            Err(PlaceError::RateLimited { retry_after: 2 })
        );
        assert!(limiter.check("bob", 103).await.is_ok());
    }

    #[tokio::test]
    async fn exactly_cooldown_is_allowed() {
        let limiter = limiter_with(&[("ann", 100)], 5).await;
        assert!(limiter.check("ann", 105).await.is_ok());
    }

    #[tokio::test]
    async fn zero_cooldown_never_limits() {
        let limiter = limiter_with(&[("ann", 100)], 0).await;
        assert!(limiter.check("ann", 100).await.is_ok());
    }

    #[tokio::test]
    async fn future_event_waits_full_cooldown() {
        let limiter = limiter_with(&[("ann", 200)], 5).await;
        assert_eq!(
            limiter.check("ann", 100).await,
            Err(PlaceError::RateLimited { retry_after: 5 })
        );

        let limiter = limiter_with(&[("ann", 200)], u64::MAX).await;
        assert_eq!(
            limiter.check("ann", 100).await,
            Err(PlaceError::RateLimited {
                retry_after: i64::MAX as u64
            })
        );
    }

    #[tokio::test]
    async fn uses_most_recent_event() {
        let limiter = limiter_with(&[("ann", 200), ("ann", 100)], 10).await;
        assert!(limiter.check("ann", 205).await.is_err());
    }
}
