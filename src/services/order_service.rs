//! Order service

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::errors::{Result, SkafolioError};
use crate::storage::{
    Material, Order, OrderStatus, PaymentMethod, PaymentStatus, ProductType, SeaOrmStorage,
    ShippingInfo,
};
use crate::utils::is_valid_email;

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 100;

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub card_id: Option<String>,
    pub product_type: ProductType,
    /// 未校验的数量，合法范围见 MIN_QUANTITY..=MAX_QUANTITY
    pub quantity: i64,
    pub material: Option<Material>,
    pub custom_design: Option<String>,
    pub payment_method: PaymentMethod,
    pub shipping_info: ShippingInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order: Order,
    pub requires_payment: bool,
}

/// 校验订单请求，返回逐字段问题
pub fn validate_order_request(req: &CreateOrderRequest) -> Vec<String> {
    let mut issues = Vec::new();

    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&req.quantity) {
        issues.push(format!(
            "quantity: must be between {} and {}",
            MIN_QUANTITY, MAX_QUANTITY
        ));
    }

    let s = &req.shipping_info;
    let required = [
        ("name", &s.name),
        ("phone", &s.phone),
        ("address", &s.address),
        ("city", &s.city),
        ("postalCode", &s.postal_code),
        ("country", &s.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            issues.push(format!("shippingInfo.{}: is required", field));
        }
    }
    if !is_valid_email(s.email.trim()) {
        issues.push("shippingInfo.email: Invalid email".to_string());
    }

    issues
}

pub struct OrderService {
    storage: Arc<SeaOrmStorage>,
}

impl OrderService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, user_id: &str, req: CreateOrderRequest) -> Result<OrderCreated> {
        let issues = validate_order_request(&req);
        if !issues.is_empty() {
            return Err(SkafolioError::validation_issues(issues));
        }

        if let Some(card_id) = req.card_id.as_deref() {
            match self.storage.find_card(card_id).await? {
                Some(card) if card.user_id == user_id => {}
                _ => return Err(SkafolioError::not_found("Card not found")),
            }
        }

        let now = Utc::now();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            card_id: req.card_id,
            product_type: req.product_type,
            quantity: req.quantity as u32,
            material: req.material,
            custom_design: req.custom_design,
            payment_method: req.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            shipping_info: req.shipping_info,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_order(&order).await?;

        Ok(OrderCreated {
            requires_payment: order.payment_method != PaymentMethod::Cod,
            order,
        })
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Order>> {
        self.storage.list_orders_by_user(user_id).await
    }
}
