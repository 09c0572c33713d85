//! API 帮助函数
//!
//! 所有 handler 的结果都经由这里转换为统一的 `{code, message, data}` 信封。

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::error::{JsonPayloadError, UrlencodedError};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

use crate::api::constants;
use crate::config::{AuthConfig, SameSitePolicy};
use crate::errors::SkafolioError;

use super::error_code::ErrorCode;
use super::types::{ApiResponse, ErrorDetails};

/// 内部错误对外统一的提示
const INTERNAL_MESSAGE: &str = "Internal server error";

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建 201 响应
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 SkafolioError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 内部错误只写日志，响应中替换为通用提示。
pub fn error_from_skafolio(err: &SkafolioError) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::from(err);

    if err.is_internal() {
        error!("{}", err);
        return error_response(status, code, INTERNAL_MESSAGE);
    }

    let issues = err.issues();
    if issues.is_empty() {
        error_response(status, code, err.message())
    } else {
        json_response(
            status,
            code,
            err.message(),
            Some(ErrorDetails {
                issues: issues.to_vec(),
            }),
        )
    }
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 SkafolioError。
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<SkafolioError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_skafolio(&e.into()),
    }
}

/// 同 `api_result`，成功时返回 201
pub fn api_created<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<SkafolioError>,
{
    match result {
        Ok(data) => created_response(data),
        Err(e) => error_from_skafolio(&e.into()),
    }
}

impl ResponseError for SkafolioError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        error_from_skafolio(self)
    }
}

/// JSON 请求体解析失败时返回信封格式的 400
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let err = SkafolioError::validation(format!("Invalid request body: {}", err));
    err.into()
}

/// 表单请求体解析失败时返回信封格式的 400
pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let err = SkafolioError::validation(format!("Invalid form body: {}", err));
    err.into()
}

/// Cookie 构建器，统一认证 cookie 的属性
pub struct CookieBuilder {
    same_site: SameSite,
    secure: bool,
    domain: Option<String>,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl CookieBuilder {
    pub fn new(auth: &AuthConfig) -> Self {
        let same_site = match auth.cookie_same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
            SameSitePolicy::Lax => SameSite::Lax,
        };

        Self {
            same_site,
            secure: auth.cookie_secure,
            domain: auth.cookie_domain.clone(),
            access_token_minutes: auth.access_token_minutes,
            refresh_token_days: auth.refresh_token_days,
        }
    }

    pub fn from_config() -> Self {
        Self::new(&crate::config::get_config().auth)
    }

    fn build_cookie_base(
        &self,
        name: &str,
        value: String,
        path: &str,
        max_age: actix_web::cookie::time::Duration,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), value);
        cookie.set_path(path.to_string());
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.set_max_age(max_age);
        if let Some(ref domain) = self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub fn build_access_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            token,
            "/",
            actix_web::cookie::time::Duration::minutes(self.access_token_minutes as i64),
        )
    }

    pub fn build_refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            token,
            constants::REFRESH_COOKIE_PATH,
            actix_web::cookie::time::Duration::days(self.refresh_token_days as i64),
        )
    }

    pub fn build_expired_access_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            String::new(),
            "/",
            actix_web::cookie::time::Duration::ZERO,
        )
    }

    pub fn build_expired_refresh_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            String::new(),
            constants::REFRESH_COOKIE_PATH,
            actix_web::cookie::time::Duration::ZERO,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn test_success_envelope() {
        let body = body_json(success_response(serde_json::json!({"a": 1}))).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["a"], 1);
    }

    #[actix_rt::test]
    async fn test_validation_error_carries_issues() {
        let err = SkafolioError::validation_issues(vec!["quantity: out of range".into()]);
        let resp = error_from_skafolio(&err);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], ErrorCode::ValidationFailed as i32);
        assert_eq!(body["data"]["issues"][0], "quantity: out of range");
    }

    #[actix_rt::test]
    async fn test_internal_error_is_masked() {
        let err = SkafolioError::database_operation("password=hunter2 connection refused");
        let resp = error_from_skafolio(&err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(body["data"].is_null());
    }

    #[test]
    fn test_cookie_attributes() {
        let builder = CookieBuilder::new(&AuthConfig::default());
        let access = builder.build_access_cookie("tok".into());
        assert_eq!(access.name(), constants::ACCESS_COOKIE_NAME);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.path(), Some("/"));

        let refresh = builder.build_refresh_cookie("tok".into());
        assert_eq!(refresh.path(), Some(constants::REFRESH_COOKIE_PATH));

        let expired = builder.build_expired_access_cookie();
        assert_eq!(expired.value(), "");
        assert_eq!(
            expired.max_age(),
            Some(actix_web::cookie::time::Duration::ZERO)
        );
    }
}
