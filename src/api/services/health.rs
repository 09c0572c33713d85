use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::storage::SeaOrmStorage;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 数据库探测超时
const PING_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub database: DatabaseCheck,
    pub response_time_ms: u64,
}

async fn ping_database(storage: &SeaOrmStorage) -> Result<(), String> {
    match tokio::time::timeout(PING_TIMEOUT, storage.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("database error: {}", e.message())),
        Err(_) => Err("timeout".to_string()),
    }
}

/// Health Service
///
/// 直接探测存储层，不经过业务服务。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<SeaOrmStorage>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let ping = ping_database(&storage).await;
        if let Err(e) = &ping {
            error!("Storage health check failed: {}", e);
        }
        let is_healthy = ping.is_ok();

        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let health = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: now.to_rfc3339(),
            uptime,
            database: DatabaseCheck {
                status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
                backend: storage.backend_name().to_string(),
                error: ping.err(),
            },
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            health.status,
            uptime
        );

        let (status, code, message) = if is_healthy {
            (StatusCode::OK, ErrorCode::Success, "OK")
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "Service Unavailable",
            )
        };

        HttpResponse::build(status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(ApiResponse {
                code: code as i32,
                message: message.to_string(),
                data: Some(health),
            })
    }

    /// 就绪检查：数据库可达才返回 200
    pub async fn readiness_check(storage: web::Data<Arc<SeaOrmStorage>>) -> impl Responder {
        trace!("Received readiness check request");

        match ping_database(&storage).await {
            Ok(()) => HttpResponse::Ok()
                .append_header(("Content-Type", "text/plain"))
                .body("OK"),
            Err(e) => {
                error!("Readiness check failed: {}", e);
                HttpResponse::ServiceUnavailable()
                    .append_header(("Content-Type", "text/plain"))
                    .body("Not Ready")
            }
        }
    }

    // 活跃性检查，进程能响应即可
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}
