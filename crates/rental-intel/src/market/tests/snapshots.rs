use super::common::*;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::market::clock::Clock;
use crate::market::snapshots::MarketDataCache;
use crate::market::sources::{FixtureSourceAdapter, SourceAdapter, SourceError, SourceKind};

fn cache_over(
    adapter: Arc<dyn SourceAdapter>,
    clock: Arc<dyn Clock>,
    fetch_timeout: StdDuration,
) -> MarketDataCache {
    MarketDataCache::new(adapter, clock, Duration::hours(24), fetch_timeout)
}

#[tokio::test]
async fn hit_within_ttl_returns_the_same_snapshot() {
    let adapter = Arc::new(FixtureSourceAdapter::standard());
    let clock = manual_clock();
    let cache = cache_over(adapter.clone(), clock.clone(), StdDuration::from_secs(1));

    let first = cache
        .get(SourceKind::HousePriceIndex, "UK", "latest")
        .await
        .expect("first fetch");
    clock.advance(Duration::hours(23));
    let second = cache
        .get(SourceKind::HousePriceIndex, "UK", "latest")
        .await
        .expect("cached fetch");

    assert_eq!(first.fetched_at, second.fetched_at);
    assert_eq!(first, second);
    assert_eq!(adapter.fetch_count(), 1);
}

#[tokio::test]
async fn expired_entry_triggers_a_fresh_fetch() {
    let adapter = Arc::new(FixtureSourceAdapter::standard());
    let clock = manual_clock();
    let cache = cache_over(adapter.clone(), clock.clone(), StdDuration::from_secs(1));

    let first = cache
        .get(SourceKind::RentalStatistics, "UK", "latest")
        .await
        .expect("first fetch");
    clock.advance(Duration::hours(24));
    let refreshed = cache
        .get(SourceKind::RentalStatistics, "UK", "latest")
        .await
        .expect("refetch");

    assert_eq!(first.fetched_at, start());
    assert_eq!(refreshed.fetched_at, start() + Duration::hours(24));
    assert_eq!(adapter.fetch_count(), 2);
}

#[tokio::test]
async fn keys_include_source_region_and_period() {
    let adapter = Arc::new(FixtureSourceAdapter::standard());
    let cache = cache_over(adapter.clone(), manual_clock(), StdDuration::from_secs(1));

    for (source, region, period) in [
        (SourceKind::HousePriceIndex, "UK", "latest"),
        (SourceKind::PricePaid, "UK", "latest"),
        (SourceKind::HousePriceIndex, "North West", "latest"),
        (SourceKind::HousePriceIndex, "UK", "2025-06"),
        (SourceKind::HousePriceIndex, "UK", "latest"),
    ] {
        cache.get(source, region, period).await.expect("fetch");
    }

    assert_eq!(adapter.fetch_count(), 4);
    assert_eq!(cache.cached_len(), 4);
}

#[tokio::test]
async fn slow_source_times_out_with_a_typed_error() {
    let cache = cache_over(
        Arc::new(SlowAdapter),
        manual_clock(),
        StdDuration::from_millis(20),
    );

    match cache.get(SourceKind::PricePaid, "UK", "latest").await {
        Err(SourceError::Timeout { kind, after }) => {
            assert_eq!(kind, SourceKind::PricePaid);
            assert_eq!(after, StdDuration::from_millis(20));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(cache.cached_len(), 0);
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let adapter = Arc::new(FixtureSourceAdapter::standard());
    let cache = cache_over(adapter.clone(), manual_clock(), StdDuration::from_secs(1));

    adapter.fail_source(SourceKind::HousePriceIndex);
    let failure = cache
        .get(SourceKind::HousePriceIndex, "UK", "latest")
        .await
        .expect_err("outage propagates");
    assert_eq!(failure.source_kind(), SourceKind::HousePriceIndex);
    assert_eq!(cache.cached_len(), 0);

    adapter.restore(SourceKind::HousePriceIndex);
    cache
        .get(SourceKind::HousePriceIndex, "UK", "latest")
        .await
        .expect("recovered fetch");
    assert_eq!(adapter.fetch_count(), 2);
    assert_eq!(cache.cached_len(), 1);
}
