//! API 模块常量定义
//!
//! 包含认证、Cookie、缓存头等硬编码常量。

/// Access Token Cookie 名称
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Refresh Token Cookie 名称
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Refresh Cookie 只随认证端点发送
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// 公开名片页的缓存策略
pub const PUBLIC_CARD_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=300";
