//! Card analytics service
//!
//! 事件写入与摘要读取。写入后只提交后台刷新任务，不等待重算；
//! 读取时摘要在缓存有效期内直接返回，否则同步重算并写回。

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, trace};

use crate::analytics::{Clock, SummaryAggregator, SummaryRefresher, is_fresh};
use crate::errors::{Result, SkafolioError};
use crate::metrics_core::MetricsRecorder;
use crate::storage::{AnalyticsSummary, EventMetadata, EventType, NewCardEvent, SeaOrmStorage};
use crate::utils::hash_ip;

/// 摘要读取结果
#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub analytics: AnalyticsSummary,
    /// 是否直接返回了缓存
    pub cached: bool,
}

pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
    aggregator: Arc<SummaryAggregator>,
    refresher: Arc<SummaryRefresher>,
    cache_ttl: Duration,
    metrics: Arc<dyn MetricsRecorder>,
}

impl AnalyticsService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        aggregator: Arc<SummaryAggregator>,
        refresher: Arc<SummaryRefresher>,
        cache_ttl_secs: u64,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            storage,
            aggregator,
            refresher,
            cache_ttl: Duration::seconds(cache_ttl_secs as i64),
            metrics,
        }
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.aggregator.clock()
    }

    /// 记录一次名片事件
    ///
    /// 名片不存在返回 NotFound，未发布返回 PreconditionFailed。
    /// 来源地址只以 SHA-256 摘要落库。
    pub async fn record(
        &self,
        card_id: &str,
        event_type: EventType,
        metadata: EventMetadata,
        source_address: Option<&str>,
    ) -> Result<()> {
        let card = self
            .storage
            .find_card(card_id)
            .await?
            .ok_or_else(|| SkafolioError::not_found("Card not found"))?;

        if !card.is_published {
            return Err(SkafolioError::precondition_failed(
                "Cannot track analytics for unpublished cards",
            ));
        }

        let event = NewCardEvent {
            card_id: card.id.clone(),
            event_type,
            metadata,
            ip_hash: hash_ip(source_address),
            timestamp: self.clock().now(),
        };
        let id = self.storage.insert_event(&event).await?;
        trace!("Event {} ({}) recorded for card {}", id, event_type, card.id);
        self.metrics.inc_event_recorded(event_type.as_ref());

        // 刷新失败或被丢弃都不影响本次写入结果
        if !self.refresher.submit(&card.id) {
            debug!("Summary refresh for card {} not queued", card.id);
        }
        Ok(())
    }

    /// 获取名片摘要，仅名片所有者可读
    pub async fn get_summary(&self, card_id: &str, requester_id: &str) -> Result<SummaryView> {
        let card = self
            .storage
            .find_card(card_id)
            .await?
            .ok_or_else(|| SkafolioError::not_found("Card not found"))?;

        if card.user_id != requester_id {
            return Err(SkafolioError::forbidden(
                "You do not have access to this card's analytics",
            ));
        }

        if let Some(summary) = card.analytics
            && is_fresh(&summary, self.clock().now(), self.cache_ttl)
        {
            self.metrics.inc_summary_read(true);
            return Ok(SummaryView {
                analytics: summary,
                cached: true,
            });
        }

        let summary = self.aggregator.recompute(&card.id).await?;
        self.metrics.inc_summary_read(false);
        Ok(SummaryView {
            analytics: summary,
            cached: false,
        })
    }
}
