//! API 路由配置
//!
//! `/api` 下按功能拆分 scope；`/health` 独立挂载。

use actix_web::web;

use super::analytics::{card_summary, track_event};
use super::auth::{login, login_rate_limiter, logout, me, refresh_token, register};
use super::cards::{
    check_slug, create_card, delete_card, get_card, list_cards, public_card, publish_card,
    update_card,
};
use super::health::HealthService;
use super::helpers::{form_error_handler, json_error_handler};
use super::orders::{create_order, list_orders};
use super::payfast::{create_payment, notify};

/// 认证路由 `/auth`
///
/// - POST /auth/register - 注册（带限流）
/// - POST /auth/login - 登录（带限流）
/// - POST /auth/refresh - 刷新 access token
/// - POST /auth/logout - 登出
/// - GET /auth/me - 当前用户
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route(
            "/register",
            web::post().to(register).wrap(login_rate_limiter()),
        )
        .route("/login", web::post().to(login).wrap(login_rate_limiter()))
        .route("/refresh", web::post().to(refresh_token))
        .route("/logout", web::post().to(logout))
        .route("/me", web::get().to(me))
}

/// 名片路由 `/cards`
pub fn cards_routes() -> actix_web::Scope {
    web::scope("/cards")
        .route("", web::get().to(list_cards))
        .route("", web::post().to(create_card))
        // 固定路径必须在 /{id} 之前
        .route("/slug-check", web::get().to(check_slug))
        .route("/public/{slug}", web::get().to(public_card))
        .route("/{id}/publish", web::post().to(publish_card))
        .route("/{id}", web::get().to(get_card))
        .route("/{id}", web::put().to(update_card))
        .route("/{id}", web::delete().to(delete_card))
}

/// 分析路由 `/analytics`
pub fn analytics_routes() -> actix_web::Scope {
    web::scope("/analytics")
        .route("/event", web::post().to(track_event))
        .route("/card/{card_id}/summary", web::get().to(card_summary))
}

/// 订单路由 `/orders`
pub fn orders_routes() -> actix_web::Scope {
    web::scope("/orders")
        .route("", web::get().to(list_orders))
        .route("", web::post().to(create_order))
}

/// 支付路由 `/payfast`
pub fn payfast_routes() -> actix_web::Scope {
    web::scope("/payfast")
        .route("/create", web::post().to(create_payment))
        .route("/ipn", web::post().to(notify))
}

/// `/api` 路由，请求体解析错误统一为信封格式
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(auth_routes())
        .service(cards_routes())
        .service(analytics_routes())
        .service(orders_routes())
        .service(payfast_routes())
}

/// Health 路由 `/health`
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
