//! 订单端点

use actix_web::{HttpResponse, web};

use crate::api::middleware::AuthUser;
use crate::services::OrderService;

use super::helpers::{api_created, api_result};
use super::types::CreateOrderBody;

pub async fn list_orders(user: AuthUser, orders: web::Data<OrderService>) -> HttpResponse {
    api_result(orders.list(&user.id).await)
}

pub async fn create_order(
    user: AuthUser,
    orders: web::Data<OrderService>,
    body: web::Json<CreateOrderBody>,
) -> HttpResponse {
    api_created(orders.create(&user.id, body.into_inner().into()).await)
}
