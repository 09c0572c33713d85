//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::SkafolioError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 名片错误
/// - 4000-4099: 支付错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    ValidationFailed = 1002,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    DatabaseError = 1006,
    Conflict = 1009,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,

    // 名片错误 3000-3099
    CardNotPublished = 3000,

    // 支付错误 4000-4099
    PaymentAlreadyPaid = 4000,
    PaymentInvalidSignature = 4001,
    PaymentMerchantMismatch = 4002,
    PaymentAmountMismatch = 4003,
}

impl From<&SkafolioError> for ErrorCode {
    fn from(err: &SkafolioError) -> Self {
        match err {
            SkafolioError::Unauthorized(_) => ErrorCode::AuthFailed,
            SkafolioError::Token(_) => ErrorCode::TokenInvalid,
            SkafolioError::Forbidden(_) => ErrorCode::Forbidden,
            SkafolioError::NotFound(_) => ErrorCode::NotFound,
            SkafolioError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SkafolioError::Conflict(_) => ErrorCode::Conflict,
            SkafolioError::AlreadyPaid(_) => ErrorCode::PaymentAlreadyPaid,
            SkafolioError::PreconditionFailed(_) => ErrorCode::CardNotPublished,
            SkafolioError::InvalidSignature(_) => ErrorCode::PaymentInvalidSignature,
            SkafolioError::MerchantMismatch(_) => ErrorCode::PaymentMerchantMismatch,
            SkafolioError::AmountMismatch(_) => ErrorCode::PaymentAmountMismatch,
            SkafolioError::DatabaseConfig(_)
            | SkafolioError::DatabaseConnection(_)
            | SkafolioError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            SkafolioError::PasswordHash(_)
            | SkafolioError::Serialization(_)
            | SkafolioError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}
