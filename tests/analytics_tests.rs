//! 事件记录与摘要聚合的集成测试

mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use skafolio::analytics::{
    Clock, ManualClock, RefreshPoolConfig, SummaryAggregator, SummaryRefresh, SummaryRefresher,
};
use skafolio::errors::SkafolioError;
use skafolio::services::AnalyticsService;
use skafolio::storage::{EventMetadata, EventType, SeaOrmStorage};

const CACHE_TTL_SECS: u64 = 300;

struct Harness {
    _dir: tempfile::TempDir,
    storage: Arc<SeaOrmStorage>,
    clock: Arc<ManualClock>,
    refresher: Arc<SummaryRefresher>,
    service: AnalyticsService,
}

/// `workers = 0` 时刷新任务只入队不执行，摘要完全由读取路径决定
async fn harness(workers: usize) -> Harness {
    let (dir, storage) = common::test_storage().await;
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let aggregator = Arc::new(SummaryAggregator::new(storage.clone(), clock.clone()));
    let target: Arc<dyn SummaryRefresh> = aggregator.clone();
    let refresher = Arc::new(SummaryRefresher::start(
        target,
        RefreshPoolConfig {
            workers,
            queue_capacity: 64,
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 4,
        },
        common::metrics(),
    ));
    let service = AnalyticsService::new(
        storage.clone(),
        aggregator,
        refresher.clone(),
        CACHE_TTL_SECS,
        common::metrics(),
    );
    Harness {
        _dir: dir,
        storage,
        clock,
        refresher,
        service,
    }
}

async fn record(h: &Harness, card_id: &str, event_type: EventType) {
    h.service
        .record(card_id, event_type, EventMetadata::new(), Some("198.51.100.7"))
        .await
        .expect("记录事件失败");
}

#[tokio::test]
async fn test_summary_counts_all_events_by_type() {
    let h = harness(0).await;
    let user = common::register_user(&h.storage, "owner@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "owner-card", true).await;

    for _ in 0..3 {
        record(&h, &card.id, EventType::View).await;
    }
    record(&h, &card.id, EventType::LinkClick).await;
    record(&h, &card.id, EventType::QrScan).await;

    let view = h.service.get_summary(&card.id, &user.id).await.unwrap();
    let summary = view.analytics;
    assert!(!view.cached);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.by_type.get("view"), Some(&3));
    assert_eq!(summary.by_type.get("link_click"), Some(&1));
    assert_eq!(summary.by_type.get("qr_scan"), Some(&1));
    assert_eq!(summary.by_type.get("share"), None);
    assert_eq!(summary.total, summary.by_type.values().sum::<u64>());
}

#[tokio::test]
async fn test_summary_windows_follow_event_age() {
    let h = harness(0).await;
    let user = common::register_user(&h.storage, "windows@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "windows-card", true).await;
    let now = h.clock.now();

    for (age, count) in [
        (Duration::days(40), 1),
        (Duration::days(10), 2),
        (Duration::days(3), 1),
        (Duration::hours(2), 3),
    ] {
        h.clock.set(now - age);
        for _ in 0..count {
            record(&h, &card.id, EventType::View).await;
        }
    }
    h.clock.set(now);

    let summary = h.service.get_summary(&card.id, &user.id).await.unwrap().analytics;
    assert_eq!(summary.total, 7);
    assert_eq!(summary.last_30d, 6);
    assert_eq!(summary.last_7d, 4);
    assert_eq!(summary.last_24h, 3);
    assert!(summary.last_24h <= summary.last_7d);
    assert!(summary.last_7d <= summary.last_30d);
    assert!(summary.last_30d <= summary.total);
    assert_eq!(summary.last_updated, now);
}

#[tokio::test]
async fn test_summary_cache_hit_then_expiry() {
    let h = harness(0).await;
    let user = common::register_user(&h.storage, "cache@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "cache-card", true).await;
    record(&h, &card.id, EventType::View).await;

    let first = h.service.get_summary(&card.id, &user.id).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.analytics.total, 1);

    // 缓存有效期内新事件不可见
    record(&h, &card.id, EventType::Share).await;
    h.clock.advance(Duration::seconds(CACHE_TTL_SECS as i64 - 1));
    let second = h.service.get_summary(&card.id, &user.id).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.analytics.total, 1);

    h.clock.advance(Duration::seconds(2));
    let third = h.service.get_summary(&card.id, &user.id).await.unwrap();
    assert!(!third.cached);
    assert_eq!(third.analytics.total, 2);
    assert_eq!(third.analytics.by_type.get("share"), Some(&1));
}

#[tokio::test]
async fn test_record_rejects_unpublished_and_missing_cards() {
    let h = harness(0).await;
    let user = common::register_user(&h.storage, "draft@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "draft-card", false).await;

    let err = h
        .service
        .record(&card.id, EventType::View, EventMetadata::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::PreconditionFailed(_)));

    let err = h
        .service
        .record("missing", EventType::View, EventMetadata::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::NotFound(_)));

    assert_eq!(h.storage.count_events(&card.id, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_summary_is_owner_only() {
    let h = harness(0).await;
    let owner = common::register_user(&h.storage, "me@example.com").await;
    let other = common::register_user(&h.storage, "them@example.com").await;
    let card = common::insert_card(&h.storage, &owner.id, "private-stats", true).await;

    let err = h.service.get_summary(&card.id, &other.id).await.unwrap_err();
    assert!(matches!(err, SkafolioError::Forbidden(_)));

    let err = h.service.get_summary("missing", &owner.id).await.unwrap_err();
    assert!(matches!(err, SkafolioError::NotFound(_)));
}

#[tokio::test]
async fn test_event_stores_hashed_address() {
    let h = harness(0).await;
    let user = common::register_user(&h.storage, "hash@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "hash-card", true).await;
    record(&h, &card.id, EventType::View).await;

    let events = h.storage.list_recent_events(&card.id, 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ip_hash, skafolio::utils::hash_ip(Some("198.51.100.7")));
    assert_ne!(events[0].ip_hash, "198.51.100.7");
}

#[tokio::test]
async fn test_background_refresh_writes_summary_before_shutdown_returns() {
    let h = harness(1).await;
    let user = common::register_user(&h.storage, "bg@example.com").await;
    let card = common::insert_card(&h.storage, &user.id, "bg-card", true).await;

    for _ in 0..4 {
        record(&h, &card.id, EventType::View).await;
    }
    h.refresher.shutdown().await;

    let stored = h.storage.find_card(&card.id).await.unwrap().unwrap();
    let summary = stored.analytics.expect("后台刷新应写回摘要");
    assert_eq!(summary.total, 4);

    // 关闭后提交会被丢弃，事件仍然写入
    assert!(!h.refresher.submit(&card.id));
    record(&h, &card.id, EventType::View).await;
    assert_eq!(h.storage.count_events(&card.id, None).await.unwrap(), 5);
}
