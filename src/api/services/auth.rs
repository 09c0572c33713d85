//! 认证相关端点

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, info};

use crate::api::constants::REFRESH_COOKIE_NAME;
use crate::api::jwt::JwtService;
use crate::api::middleware::AuthUser;
use crate::config::get_config;
use crate::errors::SkafolioError;
use crate::services::UserService;
use crate::storage::User;
use crate::utils::ip::extract_client_ip;

use super::error_code::ErrorCode;
use super::helpers::{CookieBuilder, api_result, error_from_skafolio};
use super::types::{
    ApiResponse, AuthSuccessResponse, LoginBody, MessageResponse, RegisterBody,
};

/// 基于客户端 IP 的限流 key
///
/// 只有连接方是可信代理时才采信转发头；取不到地址的请求共享同一个桶。
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let config = get_config();
        let key = extract_client_ip(req.request(), &config.server.trusted_proxies)
            .unwrap_or_else(|| "unknown".to_string());
        Ok(key)
    }
}

/// 登录/注册限流器，超限返回 429
pub fn login_rate_limiter() -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    let auth = &get_config().auth;
    let rate = auth.login_rate_per_second.max(1);
    let burst = auth.login_burst.max(1);

    let config = GovernorConfigBuilder::default()
        .requests_per_second(rate)
        .burst_size(burst)
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!("Login rate limiter created: {} req/s, burst {}", rate, burst);
    Governor::new(&config)
}

/// 签发 access + refresh token 并以 cookie 下发
fn session_response(status: StatusCode, jwt: &JwtService, user: User) -> HttpResponse {
    let tokens = jwt
        .generate_access_token(&user)
        .and_then(|access| Ok((access, jwt.generate_refresh_token(&user)?)));
    let (access_token, refresh_token) = match tokens {
        Ok(pair) => pair,
        Err(e) => return error_from_skafolio(&SkafolioError::from(e)),
    };

    let cookies = CookieBuilder::from_config();
    HttpResponse::build(status)
        .cookie(cookies.build_access_cookie(access_token))
        .cookie(cookies.build_refresh_cookie(refresh_token))
        .json(ApiResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(AuthSuccessResponse { user }),
        })
}

pub async fn register(
    users: web::Data<UserService>,
    jwt: web::Data<JwtService>,
    body: web::Json<RegisterBody>,
) -> HttpResponse {
    match users.register(body.into_inner().into()).await {
        Ok(user) => session_response(StatusCode::CREATED, &jwt, user),
        Err(e) => error_from_skafolio(&e),
    }
}

pub async fn login(
    users: web::Data<UserService>,
    jwt: web::Data<JwtService>,
    body: web::Json<LoginBody>,
) -> HttpResponse {
    match users.login(&body.email, &body.password).await {
        Ok(user) => {
            info!("User {} logged in", user.id);
            session_response(StatusCode::OK, &jwt, user)
        }
        Err(e) => error_from_skafolio(&e),
    }
}

/// 用 refresh cookie 换取新的 access cookie
pub async fn refresh_token(
    req: HttpRequest,
    users: web::Data<UserService>,
    jwt: web::Data<JwtService>,
) -> HttpResponse {
    let Some(token) = req.cookie(REFRESH_COOKIE_NAME).map(|c| c.value().to_string()) else {
        return error_from_skafolio(&SkafolioError::unauthorized("Refresh token missing"));
    };

    let claims = match jwt.validate_refresh_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Refresh token rejected: {}", e);
            return error_from_skafolio(&SkafolioError::unauthorized(
                "Invalid or expired refresh token",
            ));
        }
    };

    // 账号已删除时拒绝续期
    let user = match users.get_user(&claims.sub).await {
        Ok(user) => user,
        Err(SkafolioError::NotFound(_)) => {
            return error_from_skafolio(&SkafolioError::unauthorized("Account no longer exists"));
        }
        Err(e) => return error_from_skafolio(&e),
    };

    let access_token = match jwt.generate_access_token(&user) {
        Ok(token) => token,
        Err(e) => return error_from_skafolio(&SkafolioError::from(e)),
    };

    HttpResponse::Ok()
        .cookie(CookieBuilder::from_config().build_access_cookie(access_token))
        .json(ApiResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(MessageResponse::new("Token refreshed")),
        })
}

pub async fn logout() -> HttpResponse {
    let cookies = CookieBuilder::from_config();
    HttpResponse::Ok()
        .cookie(cookies.build_expired_access_cookie())
        .cookie(cookies.build_expired_refresh_cookie())
        .json(ApiResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(MessageResponse::new("Logged out")),
        })
}

pub async fn me(user: AuthUser, users: web::Data<UserService>) -> HttpResponse {
    api_result(users.get_user(&user.id).await)
}
