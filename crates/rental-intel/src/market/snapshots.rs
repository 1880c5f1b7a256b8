use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as TtlDuration;
use tracing::{debug, warn};

use super::cache::TtlCache;
use super::clock::Clock;
use super::sources::{MarketSnapshot, SnapshotKey, SourceAdapter, SourceError, SourceKind};

pub const DEFAULT_SNAPSHOT_TTL_HOURS: i64 = 24;

/// TTL cache in front of a `SourceAdapter`.
///
/// A hit inside the TTL returns the stored snapshot untouched (same
/// `fetched_at`). A miss fetches under `fetch_timeout` and only a successful
/// fetch is written back.
pub struct MarketDataCache {
    adapter: Arc<dyn SourceAdapter>,
    snapshots: TtlCache<SnapshotKey, MarketSnapshot>,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
}

impl MarketDataCache {
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        clock: Arc<dyn Clock>,
        ttl: TtlDuration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            snapshots: TtlCache::new(ttl, clock.clone()),
            clock,
            fetch_timeout,
        }
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    pub async fn get(
        &self,
        source: SourceKind,
        region: &str,
        period: &str,
    ) -> Result<MarketSnapshot, SourceError> {
        let key = SnapshotKey {
            source,
            region: region.to_string(),
            period: period.to_string(),
        };

        if let Some(snapshot) = self.snapshots.get(&key) {
            debug!(%source, region, period, "snapshot cache hit");
            return Ok(snapshot);
        }

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.adapter.fetch(source, region, period),
        )
        .await
        .map_err(|_| SourceError::Timeout {
            kind: source,
            after: self.fetch_timeout,
        })
        .and_then(|result| result);

        let areas = match fetched {
            Ok(areas) => areas,
            Err(err) => {
                warn!(%source, region, period, error = %err, "market source fetch failed");
                return Err(err);
            }
        };

        let snapshot = MarketSnapshot {
            source,
            region: key.region.clone(),
            period: key.period.clone(),
            fetched_at: self.clock.now(),
            areas,
        };
        self.snapshots.set(key, snapshot.clone());
        debug!(%source, region, period, areas = snapshot.areas.len(), "snapshot cached");
        Ok(snapshot)
    }

    pub fn evict_expired(&self) -> usize {
        self.snapshots.evict_expired()
    }

    pub fn cached_len(&self) -> usize {
        self.snapshots.len()
    }
}
