//! 订单支付全流程：发起支付、网关回调、终态守卫

mod common;

use std::sync::Arc;

use skafolio::errors::SkafolioError;
use skafolio::payments::PayfastFields;
use skafolio::payments::payfast::generate_signature;
use skafolio::services::{CreateOrderRequest, OrderService, PaymentService};
use skafolio::storage::{
    Material, Order, OrderStatus, PaymentMethod, PaymentStatus, ProductType, SeaOrmStorage,
    ShippingInfo, User,
};

const PASSPHRASE: &str = "jt7NOE43FZPn";

struct Flow {
    _dir: tempfile::TempDir,
    storage: Arc<SeaOrmStorage>,
    payments: PaymentService,
    user: User,
    order: Order,
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Ayesha Khan".into(),
        email: "ayesha@example.com".into(),
        phone: "+92 300 1234567".into(),
        address: "12 Mall Road".into(),
        city: "Lahore".into(),
        postal_code: "54000".into(),
        country: "PK".into(),
        notes: None,
    }
}

/// 两张金属 NFC 卡：500 × 2 = 1000
async fn flow() -> Flow {
    let (dir, storage) = common::test_storage().await;
    let user = common::register_user(&storage, "buyer@example.com").await;
    let created = OrderService::new(storage.clone())
        .create(
            &user.id,
            CreateOrderRequest {
                card_id: None,
                product_type: ProductType::NfcCard,
                quantity: 2,
                material: Some(Material::Metal),
                custom_design: None,
                payment_method: PaymentMethod::Payfast,
                shipping_info: shipping(),
            },
        )
        .await
        .unwrap();
    assert!(created.requires_payment);

    let payments = PaymentService::new(
        storage.clone(),
        common::payfast_config(PASSPHRASE),
        common::BASE_URL,
        common::metrics(),
    );
    Flow {
        _dir: dir,
        storage,
        payments,
        user,
        order: created.order,
    }
}

/// 构造网关回调字段并签名
fn notification(order_id: &str, payment_id: &str, status: &str, amount: &str) -> PayfastFields {
    let mut fields = PayfastFields::new();
    for (key, value) in [
        ("m_payment_id", order_id),
        ("pf_payment_id", "1089250"),
        ("payment_status", status),
        ("item_name", "NFC_CARD x 2"),
        ("amount_gross", amount),
        ("amount_fee", "-23.00"),
        ("amount_net", "977.00"),
        ("custom_str2", order_id),
        ("custom_str3", payment_id),
        ("merchant_id", "10000100"),
    ] {
        fields.insert(key.to_string(), value.to_string());
    }
    let signature = generate_signature(&fields, PASSPHRASE);
    fields.insert("signature".to_string(), signature);
    fields
}

#[tokio::test]
async fn test_create_payment_prices_order_and_signs_redirect() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    assert_eq!(created.amount, 1000.0);
    assert!(
        created
            .payment_url
            .starts_with("https://sandbox.payfast.co.za/eng/process?")
    );
    assert!(created.payment_url.contains("amount=1000.00"));
    assert!(created.payment_url.contains("signature="));
    assert!(created.payment_url.contains(&format!("custom_str3={}", created.payment_id)));

    let payment = f.storage.find_payment(&created.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.order_id, f.order.id);
    assert_eq!(payment.gateway, "PAYFAST");
    assert_eq!(payment.currency, "PKR");
}

#[tokio::test]
async fn test_create_payment_requires_owned_order() {
    let f = flow().await;
    let stranger = common::register_user(&f.storage, "stranger@example.com").await;

    let err = f
        .payments
        .create_payment(&stranger.id, &f.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::NotFound(_)));

    let err = f.payments.create_payment(&f.user.id, "missing").await.unwrap_err();
    assert!(matches!(err, SkafolioError::NotFound(_)));
    assert_eq!(f.storage.count_payments_for_order(&f.order.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_complete_notification_marks_order_paid_and_processing() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    let ack = f
        .payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00"))
        .await
        .unwrap();
    assert_eq!(ack.outcome, PaymentStatus::Paid);
    assert!(!ack.duplicate);

    let payment = f.storage.find_payment(&created.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.gateway_id.as_deref(), Some("1089250"));
    assert!(payment.metadata.is_some());

    let order = f.storage.find_order(&f.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_failed_notification_leaves_order_pending() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    let ack = f
        .payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "FAILED", "1000.00"))
        .await
        .unwrap();
    assert_eq!(ack.outcome, PaymentStatus::Failed);

    let order = f.storage.find_order(&f.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_tampered_notification_is_rejected() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    let mut fields = notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00");
    fields.insert("amount_gross".into(), "1.00".into());
    let err = f.payments.confirm_payment(&fields).await.unwrap_err();
    assert!(matches!(err, SkafolioError::InvalidSignature(_)));

    let mut fields = notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00");
    fields.remove("signature");
    let err = f.payments.confirm_payment(&fields).await.unwrap_err();
    assert!(matches!(err, SkafolioError::InvalidSignature(_)));

    let payment = f.storage.find_payment(&created.payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_merchant_mismatch_is_rejected() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    let mut fields = notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00");
    fields.insert("merchant_id".into(), "99999999".into());
    let signature = generate_signature(&fields, PASSPHRASE);
    fields.insert("signature".into(), signature);

    let err = f.payments.confirm_payment(&fields).await.unwrap_err();
    assert!(matches!(err, SkafolioError::MerchantMismatch(_)));
}

#[tokio::test]
async fn test_amount_tolerance() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();

    let err = f
        .payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "COMPLETE", "999.50"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::AmountMismatch(_)));

    // 一分钱以内视为一致
    let ack = f
        .payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "COMPLETE", "999.99"))
        .await
        .unwrap();
    assert_eq!(ack.outcome, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_duplicate_and_contradicting_notifications() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();
    let complete = notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00");

    assert!(!f.payments.confirm_payment(&complete).await.unwrap().duplicate);

    let again = f.payments.confirm_payment(&complete).await.unwrap();
    assert!(again.duplicate);
    assert_eq!(again.outcome, PaymentStatus::Paid);

    let err = f
        .payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "FAILED", "1000.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::Conflict(_)));

    let order = f.storage.find_order(&f.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn test_paid_order_cannot_start_another_payment() {
    let f = flow().await;
    let created = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();
    f.payments
        .confirm_payment(&notification(&f.order.id, &created.payment_id, "COMPLETE", "1000.00"))
        .await
        .unwrap();

    let err = f
        .payments
        .create_payment(&f.user.id, &f.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::AlreadyPaid(_)));
    assert_eq!(f.storage.count_payments_for_order(&f.order.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_notification_for_unknown_payment() {
    let f = flow().await;
    let err = f
        .payments
        .confirm_payment(&notification(&f.order.id, "no-such-payment", "COMPLETE", "1000.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkafolioError::NotFound(_)));
}

#[tokio::test]
async fn test_late_cancel_of_abandoned_attempt_keeps_order_paid() {
    let f = flow().await;
    let abandoned = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();
    let retried = f.payments.create_payment(&f.user.id, &f.order.id).await.unwrap();
    assert_ne!(abandoned.payment_id, retried.payment_id);

    f.payments
        .confirm_payment(&notification(&f.order.id, &retried.payment_id, "COMPLETE", "1000.00"))
        .await
        .unwrap();

    let ack = f
        .payments
        .confirm_payment(&notification(&f.order.id, &abandoned.payment_id, "CANCELLED", "1000.00"))
        .await
        .unwrap();
    assert_eq!(ack.outcome, PaymentStatus::Failed);
    assert!(!ack.duplicate);

    let stale = f.storage.find_payment(&abandoned.payment_id).await.unwrap().unwrap();
    assert_eq!(stale.status, PaymentStatus::Failed);
    let paid = f.storage.find_payment(&retried.payment_id).await.unwrap().unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);

    let order = f.storage.find_order(&f.order.id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
}
