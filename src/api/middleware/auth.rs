//! 认证提取器
//!
//! 受保护的 handler 以 `AuthUser` 作为参数即可要求登录。
//! token 来源依次为 Authorization Bearer 头、access cookie。

use std::sync::Arc;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use tracing::{debug, trace};

use crate::api::constants::ACCESS_COOKIE_NAME;
use crate::api::jwt::JwtService;
use crate::errors::SkafolioError;
use crate::metrics_core::MetricsRecorder;
use crate::storage::Role;

/// 已认证的调用者
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// 认证方式，用于指标打点
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    Cookie,
}

impl AuthMethod {
    fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Bearer => "bearer",
            AuthMethod::Cookie => "cookie",
        }
    }
}

/// 从 Authorization header 提取 Bearer token
fn extract_bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_token(req: &HttpRequest) -> Option<(String, AuthMethod)> {
    if let Some(token) = extract_bearer_token(req) {
        return Some((token, AuthMethod::Bearer));
    }
    req.cookie(ACCESS_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(|token| (token, AuthMethod::Cookie))
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, SkafolioError> {
    let Some((token, method)) = extract_token(req) else {
        debug!("No access token on request");
        return Err(SkafolioError::unauthorized("Authentication required"));
    };

    let jwt = req
        .app_data::<web::Data<JwtService>>()
        .ok_or_else(|| SkafolioError::internal("JwtService not registered"))?;

    match jwt.validate_access_token(&token) {
        Ok(claims) => {
            trace!("Access token accepted for {}", claims.sub);
            Ok(AuthUser {
                id: claims.sub,
                email: claims.email,
                role: claims.role,
            })
        }
        Err(e) => {
            debug!("Access token rejected ({}): {}", method.as_str(), e);
            if let Some(metrics) = req.app_data::<web::Data<Arc<dyn MetricsRecorder>>>() {
                metrics.inc_auth_failure(method.as_str());
            }
            Err(SkafolioError::unauthorized("Invalid or expired token"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = SkafolioError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
