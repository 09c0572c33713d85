//! HTTP 端点
//!
//! handler 只做请求解析与响应包装，业务逻辑在 `crate::services`。

pub mod analytics;
pub mod auth;
pub mod cards;
pub mod error_code;
pub mod health;
mod helpers;
pub mod orders;
pub mod payfast;
pub mod routes;
mod types;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService};
pub use helpers::{
    CookieBuilder, api_created, api_result, error_from_skafolio, error_response,
    success_response,
};
pub use routes::{api_routes, health_routes};
pub use types::*;
