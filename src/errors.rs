use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SkafolioError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// 请求内容校验失败，`issues` 为逐字段的问题描述
    ValidationFailed {
        message: String,
        issues: Vec<String>,
    },
    Conflict(String),
    AlreadyPaid(String),
    PreconditionFailed(String),
    InvalidSignature(String),
    MerchantMismatch(String),
    AmountMismatch(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    PasswordHash(String),
    Token(String),
    Serialization(String),
    Internal(String),
}

impl SkafolioError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SkafolioError::Unauthorized(_) => "E001",
            SkafolioError::Forbidden(_) => "E002",
            SkafolioError::NotFound(_) => "E003",
            SkafolioError::ValidationFailed { .. } => "E004",
            SkafolioError::Conflict(_) => "E005",
            SkafolioError::AlreadyPaid(_) => "E006",
            SkafolioError::PreconditionFailed(_) => "E007",
            SkafolioError::InvalidSignature(_) => "E008",
            SkafolioError::MerchantMismatch(_) => "E009",
            SkafolioError::AmountMismatch(_) => "E010",
            SkafolioError::DatabaseConfig(_) => "E011",
            SkafolioError::DatabaseConnection(_) => "E012",
            SkafolioError::DatabaseOperation(_) => "E013",
            SkafolioError::PasswordHash(_) => "E014",
            SkafolioError::Token(_) => "E015",
            SkafolioError::Serialization(_) => "E016",
            SkafolioError::Internal(_) => "E017",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SkafolioError::Unauthorized(_) => "Unauthorized",
            SkafolioError::Forbidden(_) => "Forbidden",
            SkafolioError::NotFound(_) => "Resource Not Found",
            SkafolioError::ValidationFailed { .. } => "Validation Error",
            SkafolioError::Conflict(_) => "Conflict",
            SkafolioError::AlreadyPaid(_) => "Already Paid",
            SkafolioError::PreconditionFailed(_) => "Precondition Failed",
            SkafolioError::InvalidSignature(_) => "Invalid Signature",
            SkafolioError::MerchantMismatch(_) => "Merchant Mismatch",
            SkafolioError::AmountMismatch(_) => "Amount Mismatch",
            SkafolioError::DatabaseConfig(_) => "Database Configuration Error",
            SkafolioError::DatabaseConnection(_) => "Database Connection Error",
            SkafolioError::DatabaseOperation(_) => "Database Operation Error",
            SkafolioError::PasswordHash(_) => "Password Hash Error",
            SkafolioError::Token(_) => "Token Error",
            SkafolioError::Serialization(_) => "Serialization Error",
            SkafolioError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SkafolioError::Unauthorized(msg)
            | SkafolioError::Forbidden(msg)
            | SkafolioError::NotFound(msg)
            | SkafolioError::Conflict(msg)
            | SkafolioError::AlreadyPaid(msg)
            | SkafolioError::PreconditionFailed(msg)
            | SkafolioError::InvalidSignature(msg)
            | SkafolioError::MerchantMismatch(msg)
            | SkafolioError::AmountMismatch(msg)
            | SkafolioError::DatabaseConfig(msg)
            | SkafolioError::DatabaseConnection(msg)
            | SkafolioError::DatabaseOperation(msg)
            | SkafolioError::PasswordHash(msg)
            | SkafolioError::Token(msg)
            | SkafolioError::Serialization(msg)
            | SkafolioError::Internal(msg) => msg,
            SkafolioError::ValidationFailed { message, .. } => message,
        }
    }

    /// 校验失败时的逐字段问题，其他错误为空
    pub fn issues(&self) -> &[String] {
        match self {
            SkafolioError::ValidationFailed { issues, .. } => issues,
            _ => &[],
        }
    }

    /// 是否为内部错误（细节只写日志，不返回给客户端）
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SkafolioError::DatabaseConfig(_)
                | SkafolioError::DatabaseConnection(_)
                | SkafolioError::DatabaseOperation(_)
                | SkafolioError::PasswordHash(_)
                | SkafolioError::Serialization(_)
                | SkafolioError::Internal(_)
        )
    }

    /// 映射为 HTTP 状态码
    #[cfg(feature = "server")]
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            SkafolioError::Unauthorized(_) | SkafolioError::Token(_) => StatusCode::UNAUTHORIZED,
            SkafolioError::Forbidden(_) | SkafolioError::MerchantMismatch(_) => {
                StatusCode::FORBIDDEN
            }
            SkafolioError::NotFound(_) => StatusCode::NOT_FOUND,
            SkafolioError::ValidationFailed { .. }
            | SkafolioError::AlreadyPaid(_)
            | SkafolioError::InvalidSignature(_)
            | SkafolioError::AmountMismatch(_) => StatusCode::BAD_REQUEST,
            SkafolioError::Conflict(_) => StatusCode::CONFLICT,
            SkafolioError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            SkafolioError::DatabaseConfig(_)
            | SkafolioError::DatabaseConnection(_)
            | SkafolioError::DatabaseOperation(_)
            | SkafolioError::PasswordHash(_)
            | SkafolioError::Serialization(_)
            | SkafolioError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SkafolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())?;
        let issues = self.issues();
        if !issues.is_empty() {
            write!(f, " ({})", issues.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SkafolioError {}

// 便捷的构造函数
impl SkafolioError {
    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Forbidden(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SkafolioError::NotFound(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        let message = msg.into();
        SkafolioError::ValidationFailed {
            issues: vec![message.clone()],
            message,
        }
    }

    pub fn validation_issues(issues: Vec<String>) -> Self {
        SkafolioError::ValidationFailed {
            message: "Validation failed".to_string(),
            issues,
        }
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Conflict(msg.into())
    }

    pub fn already_paid<T: Into<String>>(msg: T) -> Self {
        SkafolioError::AlreadyPaid(msg.into())
    }

    pub fn precondition_failed<T: Into<String>>(msg: T) -> Self {
        SkafolioError::PreconditionFailed(msg.into())
    }

    pub fn invalid_signature<T: Into<String>>(msg: T) -> Self {
        SkafolioError::InvalidSignature(msg.into())
    }

    pub fn merchant_mismatch<T: Into<String>>(msg: T) -> Self {
        SkafolioError::MerchantMismatch(msg.into())
    }

    pub fn amount_mismatch<T: Into<String>>(msg: T) -> Self {
        SkafolioError::AmountMismatch(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        SkafolioError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        SkafolioError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        SkafolioError::DatabaseOperation(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        SkafolioError::PasswordHash(msg.into())
    }

    pub fn token<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Token(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Serialization(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        SkafolioError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for SkafolioError {
    fn from(err: sea_orm::DbErr) -> Self {
        SkafolioError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for SkafolioError {
    fn from(err: serde_json::Error) -> Self {
        SkafolioError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for SkafolioError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SkafolioError::Token(err.to_string())
    }
}

impl From<crate::utils::password::PasswordError> for SkafolioError {
    fn from(err: crate::utils::password::PasswordError) -> Self {
        SkafolioError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkafolioError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_validation_issues_are_exposed() {
        let err = SkafolioError::validation_issues(vec![
            "quantity: must be between 1 and 100".into(),
            "shippingInfo.email: invalid email".into(),
        ]);
        assert_eq!(err.issues().len(), 2);
        assert_eq!(err.message(), "Validation failed");
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            SkafolioError::unauthorized("x").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SkafolioError::not_found("x").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SkafolioError::conflict("x").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SkafolioError::precondition_failed("x").http_status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            SkafolioError::invalid_signature("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SkafolioError::database_operation("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_flagged() {
        assert!(SkafolioError::database_connection("down").is_internal());
        assert!(SkafolioError::internal("boom").is_internal());
        assert!(!SkafolioError::amount_mismatch("off").is_internal());
    }

    #[test]
    fn test_db_err_conversion() {
        let err: SkafolioError = sea_orm::DbErr::Custom("boom".into()).into();
        assert_eq!(err.code(), "E013");
        assert!(err.message().contains("boom"));
    }
}
