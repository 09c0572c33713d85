//! 支付表操作
//!
//! 回调结果的落库是唯一的多表写：支付记录与订单在同一事务内更新，
//! 且仅当支付仍处于 pending 时生效。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_payment, payment_to_active_model};
use super::retry;
use crate::errors::{Result, SkafolioError};
use crate::storage::models::{OrderStatus, Payment, PaymentStatus};

use migration::entities::{order, payment};

/// 一次支付终态迁移
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    pub payment_id: String,
    pub order_id: String,
    /// `Paid` 或 `Failed`
    pub outcome: PaymentStatus,
    /// 网关流水号 (pf_payment_id)
    pub gateway_id: Option<String>,
    /// 原始回调字段
    pub metadata: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl SeaOrmStorage {
    pub async fn insert_payment(&self, p: &Payment) -> Result<()> {
        let active = payment_to_active_model(p)?;
        let db = &self.db;

        retry::with_retry("insert_payment", self.retry_config, || {
            payment::Entity::insert(active.clone()).exec(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("创建支付记录失败: {}", e)))?;
        Ok(())
    }

    pub async fn find_payment(&self, id: &str) -> Result<Option<Payment>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_payment({})", id), self.retry_config, || {
            payment::Entity::find_by_id(id.to_string()).one(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("查询支付记录失败: {}", e)))?;

        model.map(model_to_payment).transpose()
    }

    pub async fn count_payments_for_order(&self, order_id: &str) -> Result<u64> {
        let db = &self.db;
        retry::with_retry("count_payments_for_order", self.retry_config, || {
            payment::Entity::find()
                .filter(payment::Column::OrderId.eq(order_id))
                .count(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("统计支付记录失败: {}", e)))
    }

    /// 记录发往网关的签名与请求字段
    pub async fn record_gateway_request(
        &self,
        payment_id: &str,
        signature: &str,
        outbound: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let metadata = serde_json::to_string(outbound)?;
        let db = &self.db;

        retry::with_retry("record_gateway_request", self.retry_config, || {
            payment::Entity::update_many()
                .col_expr(payment::Column::GatewayId, Expr::value(signature.to_string()))
                .col_expr(payment::Column::Metadata, Expr::value(metadata.clone()))
                .col_expr(payment::Column::UpdatedAt, Expr::value(at))
                .filter(payment::Column::Id.eq(payment_id))
                .exec(db)
        })
        .await
        .map_err(|e| SkafolioError::database_operation(format!("更新支付记录失败: {}", e)))?;
        Ok(())
    }

    /// 在单个事务中应用支付终态
    ///
    /// 支付记录以 `status = 'pending'` 为条件更新；若影响行数为 0（已被并发请求终结），
    /// 事务回滚并返回 `false`，订单保持不变。`Paid` 同时把订单推进到 `processing`，
    /// `Failed` 只改订单的 paymentStatus。已支付的订单不再被任何尝试改写，
    /// 旧尝试迟到的失败回调只终结它自己的支付记录。
    pub async fn apply_payment_transition(&self, t: &PaymentTransition) -> Result<bool> {
        let metadata = serde_json::to_string(&t.metadata)?;
        let db = &self.db;

        let applied = retry::with_retry(
            &format!("apply_payment_transition({})", t.payment_id),
            self.retry_config,
            || {
                let metadata = metadata.clone();
                async move {
                    let txn = db.begin().await?;

                    let mut update = payment::Entity::update_many()
                        .col_expr(payment::Column::Status, Expr::value(t.outcome.to_string()))
                        .col_expr(payment::Column::Metadata, Expr::value(metadata))
                        .col_expr(payment::Column::UpdatedAt, Expr::value(t.at));
                    if let Some(gateway_id) = &t.gateway_id {
                        update = update
                            .col_expr(payment::Column::GatewayId, Expr::value(gateway_id.clone()));
                    }
                    let paid_rows = update
                        .filter(payment::Column::Id.eq(t.payment_id.as_str()))
                        .filter(payment::Column::Status.eq(PaymentStatus::Pending.to_string()))
                        .exec(&txn)
                        .await?;

                    if paid_rows.rows_affected == 0 {
                        txn.rollback().await?;
                        return Ok(false);
                    }

                    let mut order_update = order::Entity::update_many()
                        .col_expr(
                            order::Column::PaymentStatus,
                            Expr::value(t.outcome.to_string()),
                        )
                        .col_expr(order::Column::UpdatedAt, Expr::value(t.at));
                    if t.outcome == PaymentStatus::Paid {
                        order_update = order_update.col_expr(
                            order::Column::Status,
                            Expr::value(OrderStatus::Processing.to_string()),
                        );
                    }
                    order_update
                        .filter(order::Column::Id.eq(t.order_id.as_str()))
                        .filter(order::Column::PaymentStatus.ne(PaymentStatus::Paid.to_string()))
                        .exec(&txn)
                        .await?;

                    txn.commit().await?;
                    Ok(true)
                }
            },
        )
        .await
        .map_err(|e| SkafolioError::database_operation(format!("更新支付状态失败: {}", e)))?;

        if applied {
            info!(
                "Payment {} -> {} (order {})",
                t.payment_id, t.outcome, t.order_id
            );
        }
        Ok(applied)
    }
}
