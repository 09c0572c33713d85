//! 名片分析摘要的重算
//!
//! 摘要总是整体重算后覆盖写回 `cards.analytics`，并发重算时后写者生效。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::Clock;
use crate::errors::Result;
use crate::storage::{AnalyticsSummary, SeaOrmStorage};

/// 统计窗口（小时）：24 小时、7 天、30 天
pub const WINDOW_24H_HOURS: i64 = 24;
pub const WINDOW_7D_HOURS: i64 = 7 * 24;
pub const WINDOW_30D_HOURS: i64 = 30 * 24;

/// 摘要在 `ttl` 内仍可直接返回
pub fn is_fresh(summary: &AnalyticsSummary, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(summary.last_updated) < ttl
}

/// 由各项计数组装摘要
///
/// `total` 取分组计数之和；窗口计数逐级截断，两次查询之间插入的事件不会破坏
/// `last_24h <= last_7d <= last_30d <= total`。
pub fn assemble_summary(
    by_type: BTreeMap<String, u64>,
    last_24h: u64,
    last_7d: u64,
    last_30d: u64,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let total: u64 = by_type.values().sum();
    let last_30d = last_30d.min(total);
    let last_7d = last_7d.min(last_30d);
    let last_24h = last_24h.min(last_7d);

    AnalyticsSummary {
        total,
        last_24h,
        last_7d,
        last_30d,
        by_type,
        last_updated: now,
    }
}

/// 摘要聚合器
pub struct SummaryAggregator {
    storage: Arc<SeaOrmStorage>,
    clock: Arc<dyn Clock>,
}

impl SummaryAggregator {
    pub fn new(storage: Arc<SeaOrmStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 从事件表重算摘要（不写回）
    pub async fn compute(&self, card_id: &str) -> Result<AnalyticsSummary> {
        let now = self.clock.now();

        let rows = self.storage.count_events_by_type(card_id).await?;
        let by_type: BTreeMap<String, u64> = rows
            .into_iter()
            .map(|row| (row.event_type, row.count.max(0) as u64))
            .collect();

        let since = |hours: i64| Some(now - Duration::hours(hours));
        let last_24h = self.storage.count_events(card_id, since(WINDOW_24H_HOURS)).await?;
        let last_7d = self.storage.count_events(card_id, since(WINDOW_7D_HOURS)).await?;
        let last_30d = self.storage.count_events(card_id, since(WINDOW_30D_HOURS)).await?;

        Ok(assemble_summary(by_type, last_24h, last_7d, last_30d, now))
    }

    /// 重算并写回名片
    pub async fn recompute(&self, card_id: &str) -> Result<AnalyticsSummary> {
        let summary = self.compute(card_id).await?;
        self.storage.save_card_summary(card_id, &summary).await?;
        debug!(
            "Analytics summary refreshed for card {}: total={}",
            card_id, summary.total
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_total_is_sum_of_types() {
        let by_type = BTreeMap::from([
            ("view".to_string(), 4),
            ("link_click".to_string(), 2),
            ("share".to_string(), 1),
        ]);
        let summary = assemble_summary(by_type, 1, 3, 7, Utc::now());
        assert_eq!(summary.total, 7);
        assert_eq!(summary.by_type.values().sum::<u64>(), summary.total);
    }

    #[test]
    fn test_assemble_clamps_windows() {
        let by_type = BTreeMap::from([("view".to_string(), 2)]);
        // 查询间隙插入了新事件
        let summary = assemble_summary(by_type, 5, 4, 3, Utc::now());
        assert!(summary.last_24h <= summary.last_7d);
        assert!(summary.last_7d <= summary.last_30d);
        assert!(summary.last_30d <= summary.total);
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let ttl = Duration::seconds(300);
        let mut summary = assemble_summary(BTreeMap::new(), 0, 0, 0, now);
        assert!(is_fresh(&summary, now + Duration::seconds(299), ttl));
        assert!(!is_fresh(&summary, now + Duration::seconds(300), ttl));

        summary.last_updated = now - Duration::minutes(10);
        assert!(!is_fresh(&summary, now, ttl));
    }
}
