//! 分析端点

use actix_web::{HttpRequest, HttpResponse, web};

use crate::api::middleware::AuthUser;
use crate::config::get_config;
use crate::services::AnalyticsService;
use crate::utils::ip::extract_client_ip;

use super::helpers::{api_created, api_result};
use super::types::{MessageResponse, TrackEventBody};

/// 记录名片事件（公开端点）
pub async fn track_event(
    req: HttpRequest,
    analytics: web::Data<AnalyticsService>,
    body: web::Json<TrackEventBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let source = extract_client_ip(&req, &get_config().server.trusted_proxies);

    api_created(
        analytics
            .record(
                &body.card_id,
                body.event_type,
                body.metadata.unwrap_or_default(),
                source.as_deref(),
            )
            .await
            .map(|()| MessageResponse::new("Event tracked")),
    )
}

pub async fn card_summary(
    user: AuthUser,
    analytics: web::Data<AnalyticsService>,
    path: web::Path<String>,
) -> HttpResponse {
    api_result(analytics.get_summary(&path, &user.id).await)
}
