//! Payment service
//!
//! 发起 PayFast 支付与处理网关回调（ITN）。回调按固定顺序校验：
//! 签名、商户号、结果、标识、金额、终态守卫，最后在事务中落库。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PayfastConfig;
use crate::errors::{Result, SkafolioError};
use crate::metrics_core::MetricsRecorder;
use crate::payments::payfast::{
    PayfastFields, PaymentRequest, STATUS_COMPLETE, amount_matches, build_payment_request,
    verify_signature,
};
use crate::payments::order_amount;
use crate::storage::{Payment, PaymentStatus, PaymentTransition, SeaOrmStorage};

const GATEWAY_NAME: &str = "PAYFAST";

/// createPayment 的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreated {
    pub payment_url: String,
    pub payment_id: String,
    pub amount: f64,
}

/// 已确认的回调
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledged {
    pub payment_id: String,
    pub outcome: PaymentStatus,
    /// 同一结果的重复投递
    pub duplicate: bool,
}

fn required_field<'a>(fields: &'a PayfastFields, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SkafolioError::validation(format!("Missing field: {}", key)))
}

pub struct PaymentService {
    storage: Arc<SeaOrmStorage>,
    payfast: PayfastConfig,
    base_url: String,
    metrics: Arc<dyn MetricsRecorder>,
}

impl PaymentService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        payfast: PayfastConfig,
        base_url: &str,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            storage,
            payfast,
            base_url: base_url.to_string(),
            metrics,
        }
    }

    /// 为订单创建一次支付尝试并返回网关跳转地址
    pub async fn create_payment(&self, user_id: &str, order_id: &str) -> Result<PaymentCreated> {
        let order = match self.storage.find_order(order_id).await? {
            Some(order) if order.user_id == user_id => order,
            _ => return Err(SkafolioError::not_found("Order not found")),
        };
        if order.payment_status == PaymentStatus::Paid {
            return Err(SkafolioError::already_paid("Order is already paid"));
        }

        let user = self
            .storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| SkafolioError::not_found("User not found"))?;

        let amount = order_amount(order.product_type, order.material, order.quantity);
        let now = Utc::now();
        let payment = Payment {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            order_id: order.id.clone(),
            amount,
            currency: self.payfast.currency.clone(),
            gateway: GATEWAY_NAME.to_string(),
            status: PaymentStatus::Pending,
            gateway_id: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_payment(&payment).await?;

        let request = PaymentRequest {
            order_id: order.id.clone(),
            payment_id: payment.id.clone(),
            user_id: user_id.to_string(),
            amount,
            item_name: format!("{} x {}", order.product_type, order.quantity),
            item_description: format!("Order #{}", order.id),
            email: user.email.clone(),
            phone: user.phone.clone(),
        };
        let signed = build_payment_request(&self.payfast, &self.base_url, &request);

        let outbound = serde_json::to_value(&signed.fields)?;
        self.storage
            .record_gateway_request(&payment.id, &signed.signature, &outbound, Utc::now())
            .await?;

        info!(
            "Payment {} created for order {} ({:.2} {})",
            payment.id, order.id, amount, payment.currency
        );
        Ok(PaymentCreated {
            payment_url: signed.url,
            payment_id: payment.id,
            amount,
        })
    }

    /// 处理网关回调
    pub async fn confirm_payment(&self, fields: &PayfastFields) -> Result<Acknowledged> {
        match self.confirm_inner(fields).await {
            Ok(ack) => {
                let label = if ack.duplicate {
                    "duplicate"
                } else {
                    ack.outcome.as_ref()
                };
                self.metrics.inc_payment_notification(label);
                Ok(ack)
            }
            Err(e) => {
                self.metrics.inc_payment_notification("rejected");
                if e.is_internal() {
                    error!("Payment notification failed: {}", e);
                } else {
                    warn!("Payment notification rejected: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn confirm_inner(&self, fields: &PayfastFields) -> Result<Acknowledged> {
        if !verify_signature(fields, &self.payfast.passphrase) {
            return Err(SkafolioError::invalid_signature("Invalid signature"));
        }

        if fields.get("merchant_id").map(|m| m.trim()) != Some(self.payfast.merchant_id.as_str()) {
            return Err(SkafolioError::merchant_mismatch("Merchant ID mismatch"));
        }

        let outcome = match fields.get("payment_status").map(|s| s.trim()) {
            Some(STATUS_COMPLETE) => PaymentStatus::Paid,
            _ => PaymentStatus::Failed,
        };

        let payment_id = required_field(fields, "custom_str3")?;
        let order_id = required_field(fields, "custom_str2")?;

        let payment = match self.storage.find_payment(payment_id).await? {
            Some(p) if p.order_id == order_id => p,
            _ => return Err(SkafolioError::not_found("Payment not found")),
        };
        if self.storage.find_order(order_id).await?.is_none() {
            return Err(SkafolioError::not_found("Order not found"));
        }

        let reported: f64 = required_field(fields, "amount_gross")?
            .parse()
            .map_err(|_| SkafolioError::validation("amount_gross: Invalid amount"))?;
        if !amount_matches(reported, payment.amount) {
            return Err(SkafolioError::amount_mismatch(format!(
                "Amount mismatch: expected {:.2}, received {:.2}",
                payment.amount, reported
            )));
        }

        if payment.status.is_terminal() {
            return self.terminal_guard(&payment.id, payment.status, outcome);
        }

        let transition = PaymentTransition {
            payment_id: payment.id.clone(),
            order_id: order_id.to_string(),
            outcome,
            gateway_id: fields
                .get("pf_payment_id")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            metadata: serde_json::to_value(fields)?,
            at: Utc::now(),
        };

        if self.storage.apply_payment_transition(&transition).await? {
            return Ok(Acknowledged {
                payment_id: payment.id,
                outcome,
                duplicate: false,
            });
        }

        // 条件更新未生效：并发回调已先一步终结该支付
        let current = self
            .storage
            .find_payment(&payment.id)
            .await?
            .ok_or_else(|| SkafolioError::not_found("Payment not found"))?;
        self.terminal_guard(&payment.id, current.status, outcome)
    }

    fn terminal_guard(
        &self,
        payment_id: &str,
        current: PaymentStatus,
        outcome: PaymentStatus,
    ) -> Result<Acknowledged> {
        if current == outcome {
            info!("Duplicate notification for payment {} ({})", payment_id, outcome);
            Ok(Acknowledged {
                payment_id: payment_id.to_string(),
                outcome,
                duplicate: true,
            })
        } else {
            Err(SkafolioError::conflict(format!(
                "Payment already {}, cannot mark as {}",
                current, outcome
            )))
        }
    }
}
