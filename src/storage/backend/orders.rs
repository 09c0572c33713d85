//! 订单表操作

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_order, order_to_active_model};
use super::retry;
use crate::errors::{Result, SkafolioError};
use crate::storage::models::Order;

use migration::entities::order;

impl SeaOrmStorage {
    pub async fn insert_order(&self, o: &Order) -> Result<()> {
        let active = order_to_active_model(o)?;
        let db = &self.db;

        retry::with_retry("insert_order", self.retry_config, || {
            order::Entity::insert(active.clone()).exec(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("创建订单失败: {}", e)))?;

        info!(
            "Order created: {} ({} x {}, {})",
            o.id, o.product_type, o.quantity, o.payment_method
        );
        Ok(())
    }

    pub async fn find_order(&self, id: &str) -> Result<Option<Order>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_order({})", id), self.retry_config, || {
            order::Entity::find_by_id(id.to_string()).one(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询订单失败: {}", e)))?;

        model.map(model_to_order).transpose()
    }

    /// 列出用户订单，按创建时间倒序
    pub async fn list_orders_by_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let db = &self.db;
        let models = retry::with_retry("list_orders_by_user", self.retry_config, || {
            order::Entity::find()
                .filter(order::Column::UserId.eq(user_id))
                .order_by_desc(order::Column::CreatedAt)
                .all(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询订单列表失败: {}", e)))?;

        models.into_iter().map(model_to_order).collect()
    }
}
