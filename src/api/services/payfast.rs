//! PayFast 端点
//!
//! `/ipn` 接收网关的表单回调；负向结果（支付失败）同样以 200 确认，
//! 只有校验失败才返回 4xx。

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::api::middleware::AuthUser;
use crate::payments::PayfastFields;
use crate::services::PaymentService;

use super::helpers::api_result;
use super::types::CreatePaymentBody;

pub async fn create_payment(
    user: AuthUser,
    payments: web::Data<PaymentService>,
    body: web::Json<CreatePaymentBody>,
) -> HttpResponse {
    api_result(payments.create_payment(&user.id, &body.order_id).await)
}

pub async fn notify(
    payments: web::Data<PaymentService>,
    form: web::Form<PayfastFields>,
) -> HttpResponse {
    let fields = form.into_inner();
    info!(
        "PayFast notification for payment {:?} ({:?})",
        fields.get("custom_str3"),
        fields.get("payment_status")
    );
    api_result(payments.confirm_payment(&fields).await)
}
