//! Sea-ORM Model 与领域模型之间的转换
//!
//! 枚举列按字符串存储，JSON 列按文本存储；读取时解析失败视为数据损坏。

use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};

use crate::errors::{Result, SkafolioError};
use crate::storage::models::{
    AnalyticsSummary, Card, CardData, CardEvent, EventMetadata, NewCardEvent, Order, Payment,
    ShippingInfo, User,
};
use migration::entities::{card, card_event, order, payment, user};

fn parse_enum<T: FromStr>(value: &str, column: &str) -> Result<T> {
    T::from_str(value).map_err(|_| {
        SkafolioError::database_operation(format!("列 {} 含有无法识别的值: {}", column, value))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(value: &str, column: &str) -> Result<T> {
    serde_json::from_str(value).map_err(|e| {
        SkafolioError::serialization(format!("列 {} JSON 解析失败: {}", column, e))
    })
}

// ============ users ============

pub fn model_to_user(model: user::Model) -> Result<User> {
    Ok(User {
        role: parse_enum(&model.role, "users.role")?,
        subscription_status: parse_enum(&model.subscription_status, "users.subscription_status")?,
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        phone: model.phone,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn user_to_active_model(u: &User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(u.id.clone()),
        email: Set(u.email.clone()),
        password_hash: Set(u.password_hash.clone()),
        phone: Set(u.phone.clone()),
        role: Set(u.role.to_string()),
        subscription_status: Set(u.subscription_status.to_string()),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
    }
}

// ============ cards ============

pub fn model_to_card(model: card::Model) -> Result<Card> {
    let data: CardData = parse_json(&model.data, "cards.data")?;
    // 摘要只是缓存，损坏时当作不存在，下次读取会重算
    let analytics = model
        .analytics
        .as_deref()
        .and_then(|raw| serde_json::from_str::<AnalyticsSummary>(raw).ok());

    Ok(Card {
        id: model.id,
        user_id: model.user_id,
        slug: model.slug,
        title: model.title,
        data,
        is_published: model.is_published,
        public_url: model.public_url,
        qr_code_url: model.qr_code_url,
        analytics,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// 构建插入/更新用 ActiveModel
///
/// `analytics` 不在此处写入，由汇总刷新单独维护。
pub fn card_to_active_model(c: &Card, is_new: bool) -> Result<card::ActiveModel> {
    Ok(card::ActiveModel {
        id: Set(c.id.clone()),
        user_id: if is_new { Set(c.user_id.clone()) } else { NotSet },
        slug: Set(c.slug.clone()),
        title: Set(c.title.clone()),
        data: Set(serde_json::to_string(&c.data)?),
        is_published: Set(c.is_published),
        public_url: Set(c.public_url.clone()),
        qr_code_url: Set(c.qr_code_url.clone()),
        analytics: if is_new { Set(None) } else { NotSet },
        created_at: if is_new { Set(c.created_at) } else { NotSet },
        updated_at: Set(c.updated_at),
    })
}

// ============ card_events ============

pub fn model_to_event(model: card_event::Model) -> Result<CardEvent> {
    let metadata: EventMetadata = parse_json(&model.metadata, "card_events.metadata")?;
    Ok(CardEvent {
        event_type: parse_enum(&model.event_type, "card_events.event_type")?,
        id: model.id,
        card_id: model.card_id,
        metadata,
        ip_hash: model.ip_hash,
        timestamp: model.timestamp,
    })
}

pub fn new_event_to_active_model(e: &NewCardEvent) -> Result<card_event::ActiveModel> {
    Ok(card_event::ActiveModel {
        id: NotSet,
        card_id: Set(e.card_id.clone()),
        event_type: Set(e.event_type.to_string()),
        metadata: Set(serde_json::to_string(&e.metadata)?),
        ip_hash: Set(e.ip_hash.clone()),
        timestamp: Set(e.timestamp),
    })
}

// ============ orders ============

pub fn model_to_order(model: order::Model) -> Result<Order> {
    let shipping_info: ShippingInfo = parse_json(&model.shipping_info, "orders.shipping_info")?;
    let material = match model.material.as_deref() {
        Some(m) => Some(parse_enum(m, "orders.material")?),
        None => None,
    };

    Ok(Order {
        product_type: parse_enum(&model.product_type, "orders.product_type")?,
        payment_method: parse_enum(&model.payment_method, "orders.payment_method")?,
        payment_status: parse_enum(&model.payment_status, "orders.payment_status")?,
        status: parse_enum(&model.status, "orders.status")?,
        quantity: model.quantity.max(0) as u32,
        material,
        shipping_info,
        id: model.id,
        user_id: model.user_id,
        card_id: model.card_id,
        custom_design: model.custom_design,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn order_to_active_model(o: &Order) -> Result<order::ActiveModel> {
    Ok(order::ActiveModel {
        id: Set(o.id.clone()),
        user_id: Set(o.user_id.clone()),
        card_id: Set(o.card_id.clone()),
        product_type: Set(o.product_type.to_string()),
        quantity: Set(o.quantity as i32),
        material: Set(o.material.map(|m| m.to_string())),
        custom_design: Set(o.custom_design.clone()),
        payment_method: Set(o.payment_method.to_string()),
        payment_status: Set(o.payment_status.to_string()),
        status: Set(o.status.to_string()),
        shipping_info: Set(serde_json::to_string(&o.shipping_info)?),
        created_at: Set(o.created_at),
        updated_at: Set(o.updated_at),
    })
}

// ============ payments ============

pub fn model_to_payment(model: payment::Model) -> Result<Payment> {
    let metadata = match model.metadata.as_deref() {
        Some(raw) => Some(parse_json(raw, "payments.metadata")?),
        None => None,
    };

    Ok(Payment {
        status: parse_enum(&model.status, "payments.status")?,
        id: model.id,
        user_id: model.user_id,
        order_id: model.order_id,
        amount: model.amount,
        currency: model.currency,
        gateway: model.gateway,
        gateway_id: model.gateway_id,
        metadata,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub fn payment_to_active_model(p: &Payment) -> Result<payment::ActiveModel> {
    let metadata = match &p.metadata {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    };

    Ok(payment::ActiveModel {
        id: Set(p.id.clone()),
        user_id: Set(p.user_id.clone()),
        order_id: Set(p.order_id.clone()),
        amount: Set(p.amount),
        currency: Set(p.currency.clone()),
        gateway: Set(p.gateway.clone()),
        status: Set(p.status.to_string()),
        gateway_id: Set(p.gateway_id.clone()),
        metadata: Set(metadata),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{OrderStatus, PaymentMethod, PaymentStatus, ProductType};
    use chrono::Utc;

    fn order_model() -> order::Model {
        order::Model {
            id: "o1".into(),
            user_id: "u1".into(),
            card_id: None,
            product_type: "NFC_CARD".into(),
            quantity: 2,
            material: Some("metal".into()),
            custom_design: None,
            payment_method: "PAYFAST".into(),
            payment_status: "pending".into(),
            status: "pending".into(),
            shipping_info: r#"{"name":"A","email":"a@example.com","phone":"1","address":"x","city":"y","postalCode":"z","country":"PK"}"#.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_model_parses_enums_and_json() {
        let order = model_to_order(order_model()).unwrap();
        assert_eq!(order.product_type, ProductType::NfcCard);
        assert_eq!(order.payment_method, PaymentMethod::Payfast);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shipping_info.postal_code, "z");
    }

    #[test]
    fn test_unknown_enum_value_is_reported() {
        let mut model = order_model();
        model.status = "lost".into();
        let err = model_to_order(model).unwrap_err();
        assert!(err.message().contains("orders.status"));
    }

    #[test]
    fn test_corrupt_cached_summary_is_dropped() {
        let model = card::Model {
            id: "c1".into(),
            user_id: "u1".into(),
            slug: "jane".into(),
            title: "Jane".into(),
            data: "{}".into(),
            is_published: true,
            public_url: None,
            qr_code_url: None,
            analytics: Some("not json".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let card = model_to_card(model).unwrap();
        assert!(card.analytics.is_none());
    }
}
