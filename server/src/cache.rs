//! The viewer-count / daemon-latency key-value cache, modeled as a trait
//! with an in-memory implementation so a persistent-store implementation
//! could be dropped in later without touching the Manager or Runner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DaemonLatencyStats {
    pub count: u64,
    pub sum: f64,
    pub sumsq: f64,
}

impl DaemonLatencyStats {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// `game:viewer_count:{id}`, `game:max_viewer_count:{id}` and
/// `daemon:response_time:{daemon_id}` from spec §6, as an async trait.
#[async_trait]
pub trait ViewerCache: Send + Sync {
    async fn reset_viewer_count(&self, game_id: Uuid);
    async fn incr_viewer_count(&self, game_id: Uuid) -> u64;
    async fn decr_viewer_count(&self, game_id: Uuid) -> u64;
    async fn viewer_count(&self, game_id: Uuid) -> u64;

    async fn bump_max_viewer_count(&self, game_id: Uuid) -> u64;
    async fn max_viewer_count(&self, game_id: Uuid) -> u64;

    async fn record_daemon_latency(&self, daemon_id: &str, latency_ms: f64);
    async fn daemon_latency_stats(&self, daemon_id: &str) -> DaemonLatencyStats;
}

#[derive(Debug, Default)]
pub struct InMemoryViewerCache {
    viewer_counts: RwLock<HashMap<Uuid, u64>>,
    max_viewer_counts: RwLock<HashMap<Uuid, u64>>,
    daemon_latencies: RwLock<HashMap<String, DaemonLatencyStats>>,
}

impl InMemoryViewerCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ViewerCache for InMemoryViewerCache {
    async fn reset_viewer_count(&self, game_id: Uuid) {
        self.viewer_counts.write().await.insert(game_id, 0);
    }

    async fn incr_viewer_count(&self, game_id: Uuid) -> u64 {
        let mut counts = self.viewer_counts.write().await;
        let count = counts.entry(game_id).or_insert(0);
        *count += 1;
        *count
    }

    async fn decr_viewer_count(&self, game_id: Uuid) -> u64 {
        let mut counts = self.viewer_counts.write().await;
        let count = counts.entry(game_id).or_insert(0);
        *count = count.saturating_sub(1);
        *count
    }

    async fn viewer_count(&self, game_id: Uuid) -> u64 {
        self.viewer_counts.read().await.get(&game_id).copied().unwrap_or(0)
    }

    async fn bump_max_viewer_count(&self, game_id: Uuid) -> u64 {
        let current = self.viewer_count(game_id).await;
        let mut maxes = self.max_viewer_counts.write().await;
        let max = maxes.entry(game_id).or_insert(0);
        *max = (*max).max(current);
        *max
    }

    async fn max_viewer_count(&self, game_id: Uuid) -> u64 {
        self.max_viewer_counts.read().await.get(&game_id).copied().unwrap_or(0)
    }

    async fn record_daemon_latency(&self, daemon_id: &str, latency_ms: f64) {
        let mut latencies = self.daemon_latencies.write().await;
        let stats = latencies.entry(daemon_id.to_string()).or_default();
        stats.count += 1;
        stats.sum += latency_ms;
        stats.sumsq += latency_ms * latency_ms;
    }

    async fn daemon_latency_stats(&self, daemon_id: &str) -> DaemonLatencyStats {
        self.daemon_latencies
            .read()
            .await
            .get(daemon_id)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn viewer_count_never_goes_negative() {
        let cache = InMemoryViewerCache::new();
        let game_id = Uuid::new_v4();
        assert_eq!(cache.decr_viewer_count(game_id).await, 0);
    }

    #[tokio::test]
    async fn max_viewer_count_is_monotone() {
        let cache = InMemoryViewerCache::new();
        let game_id = Uuid::new_v4();

        cache.incr_viewer_count(game_id).await;
        cache.incr_viewer_count(game_id).await;
        assert_eq!(cache.bump_max_viewer_count(game_id).await, 2);

        cache.decr_viewer_count(game_id).await;
        assert_eq!(cache.viewer_count(game_id).await, 1);
        // max does not drop when current viewer count drops
        assert_eq!(cache.bump_max_viewer_count(game_id).await, 2);
    }

    #[tokio::test]
    async fn daemon_latency_accumulates_count_sum_sumsq() {
        let cache = InMemoryViewerCache::new();
        cache.record_daemon_latency("d1", 10.0).await;
        cache.record_daemon_latency("d1", 20.0).await;

        let stats = cache.daemon_latency_stats("d1").await;
        assert_eq!(stats.count, 2);
        assert_eq!(stats.sum, 30.0);
        assert_eq!(stats.sumsq, 500.0);
        assert_eq!(stats.mean(), 15.0);
    }

    #[tokio::test]
    async fn reset_viewer_count_zeroes_existing_count() {
        let cache = InMemoryViewerCache::new();
        let game_id = Uuid::new_v4();
        cache.incr_viewer_count(game_id).await;
        cache.incr_viewer_count(game_id).await;
        cache.reset_viewer_count(game_id).await;
        assert_eq!(cache.viewer_count(game_id).await, 0);
    }
}
