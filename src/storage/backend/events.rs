//! 名片事件表操作
//!
//! 事件只追加；汇总查询由 AnalyticsSummary 重算时调用。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::SeaOrmStorage;
use super::converters::{model_to_event, new_event_to_active_model};
use super::retry;
use crate::errors::{Result, SkafolioError};
use crate::storage::models::{CardEvent, NewCardEvent};

use migration::entities::card_event;

/// 按事件类型分组计数的结果行
#[derive(Debug, FromQueryResult)]
pub struct EventTypeCountRow {
    pub event_type: String,
    pub count: i64,
}

impl SeaOrmStorage {
    /// 追加一条事件，返回自增 id
    pub async fn insert_event(&self, event: &NewCardEvent) -> Result<i64> {
        let active = new_event_to_active_model(event)?;
        let db = &self.db;

        let result = retry::with_retry("insert_event", self.retry_config, || {
            card_event::Entity::insert(active.clone()).exec(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("写入事件失败: {}", e)))?;

        Ok(result.last_insert_id)
    }

    /// 统计名片事件数；`since` 为 None 时统计全部
    pub async fn count_events(&self, card_id: &str, since: Option<DateTime<Utc>>) -> Result<u64> {
        let db = &self.db;
        retry::with_retry("count_events", self.retry_config, || {
            let mut query = card_event::Entity::find().filter(card_event::Column::CardId.eq(card_id));
            if let Some(since) = since {
                query = query.filter(card_event::Column::Timestamp.gte(since));
            }
            query.count(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("统计事件失败: {}", e)))
    }

    /// 按事件类型分组计数
    pub async fn count_events_by_type(&self, card_id: &str) -> Result<Vec<EventTypeCountRow>> {
        let db = &self.db;
        retry::with_retry("count_events_by_type", self.retry_config, || {
            card_event::Entity::find()
                .select_only()
                .column(card_event::Column::EventType)
                .column_as(card_event::Column::Id.count(), "count")
                .filter(card_event::Column::CardId.eq(card_id))
                .group_by(card_event::Column::EventType)
                .into_model::<EventTypeCountRow>()
                .all(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("分组统计事件失败: {}", e)))
    }

    /// 按时间倒序列出名片的最近事件
    pub async fn list_recent_events(&self, card_id: &str, limit: u64) -> Result<Vec<CardEvent>> {
        let db = &self.db;
        let models = retry::with_retry("list_recent_events", self.retry_config, || {
            card_event::Entity::find()
                .filter(card_event::Column::CardId.eq(card_id))
                .order_by_desc(card_event::Column::Timestamp)
                .limit(limit)
                .all(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询事件失败: {}", e)))?;

        models.into_iter().map(model_to_event).collect()
    }
}
