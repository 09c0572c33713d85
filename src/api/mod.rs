//! HTTP API：路由、认证与中间件

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
