//! 名片表操作

use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{card_to_active_model, model_to_card};
use super::retry;
use crate::errors::{Result, SkafolioError};
use crate::storage::models::{AnalyticsSummary, Card};

use migration::entities::{card, card_event};

impl SeaOrmStorage {
    /// 新建名片，slug 冲突返回 Conflict
    pub async fn insert_card(&self, c: &Card) -> Result<()> {
        card::Entity::insert(card_to_active_model(c, true)?)
            .exec(&self.db)
            .await
            .map_err(|e| super::map_write_error(e, "This slug is already in use"))?;

        info!("Card created: {} ({})", c.id, c.slug);
        Ok(())
    }

    pub async fn find_card(&self, id: &str) -> Result<Option<Card>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_card({})", id), self.retry_config, || {
            card::Entity::find_by_id(id.to_string()).one(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询名片失败: {}", e)))?;

        model.map(model_to_card).transpose()
    }

    pub async fn find_card_by_slug(&self, slug: &str) -> Result<Option<Card>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("find_card_by_slug({})", slug),
            self.retry_config,
            || card::Entity::find().filter(card::Column::Slug.eq(slug)).one(db),
        )
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询名片失败: {}", e)))?;

        model.map(model_to_card).transpose()
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let db = &self.db;
        let count = retry::with_retry("slug_exists", self.retry_config, || {
            card::Entity::find()
                .filter(card::Column::Slug.eq(slug))
                .count(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询 slug 失败: {}", e)))?;

        Ok(count > 0)
    }

    /// 列出用户的名片，按更新时间倒序
    pub async fn list_cards_by_user(&self, user_id: &str) -> Result<Vec<Card>> {
        let db = &self.db;
        let models = retry::with_retry("list_cards_by_user", self.retry_config, || {
            card::Entity::find()
                .filter(card::Column::UserId.eq(user_id))
                .order_by_desc(card::Column::UpdatedAt)
                .all(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询名片列表失败: {}", e)))?;

        models.into_iter().map(model_to_card).collect()
    }

    /// 写回名片的可编辑字段（不含 analytics）
    pub async fn update_card(&self, c: &Card) -> Result<()> {
        let active = card_to_active_model(c, false)?;
        card::Entity::update(active)
            .exec(&self.db)
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => {
                    SkafolioError::not_found(format!("Card not found: {}", c.id))
                }
                other => super::map_write_error(other, "This slug is already in use"),
            })?;
        Ok(())
    }

    /// 覆盖名片缓存的分析摘要（最后写入者胜出）
    pub async fn save_card_summary(&self, card_id: &str, summary: &AnalyticsSummary) -> Result<()> {
        let json = serde_json::to_string(summary)?;
        let db = &self.db;

        let result = retry::with_retry(
            &format!("save_card_summary({})", card_id),
            self.retry_config,
            || {
                card::Entity::update_many()
                    .col_expr(card::Column::Analytics, Expr::value(json.clone()))
                    .filter(card::Column::Id.eq(card_id))
                    .exec(db)
            },
        )
        .await
        .map_err(|e| SkafolioError::database_operation(format!("保存分析摘要失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(SkafolioError::not_found(format!(
                "Card not found: {}",
                card_id
            )));
        }
        Ok(())
    }

    /// 在同一事务中删除名片及其全部事件
    ///
    /// 返回是否删除了名片。
    pub async fn delete_card_with_events(&self, card_id: &str) -> Result<bool> {
        let db = &self.db;
        let deleted = retry::with_retry(
            &format!("delete_card({})", card_id),
            self.retry_config,
            || async move {
                let txn = db.begin().await?;
                let events = card_event::Entity::delete_many()
                    .filter(card_event::Column::CardId.eq(card_id))
                    .exec(&txn)
                    .await?;
                let cards = card::Entity::delete_by_id(card_id.to_string())
                    .exec(&txn)
                    .await?;
                txn.commit().await?;
                Ok((cards.rows_affected, events.rows_affected))
            },
        )
        .await
        .map_err(|e| SkafolioError::database_operation(format!("删除名片失败: {}", e)))?;

        if deleted.0 > 0 {
            info!("Card deleted: {} ({} events removed)", card_id, deleted.1);
        }
        Ok(deleted.0 > 0)
    }
}
