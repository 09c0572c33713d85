//! Service layer for business logic
//!
//! 服务层只依赖存储与领域模块，HTTP 细节（cookie、响应包装）留在 API 层。

mod analytics_service;
mod card_service;
mod order_service;
mod payment_service;
pub mod qr;
mod user_service;

pub use analytics_service::*;
pub use card_service::*;
pub use order_service::*;
pub use payment_service::*;
pub use qr::{QrCodeProvider, UrlQrProvider};
pub use user_service::*;
