//! Account service
//!
//! 注册、登录与资料查询。令牌签发在 API 层完成，这里只负责身份本身。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::{Result, SkafolioError};
use crate::metrics_core::MetricsRecorder;
use crate::storage::{Role, SeaOrmStorage, SubscriptionStatus, User};
use crate::utils::is_valid_email;
use crate::utils::password::{MIN_PASSWORD_LENGTH, hash_password, verify_password};

/// 未知邮箱与密码错误使用同一提示，避免泄露账号是否存在
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

pub struct UserService {
    storage: Arc<SeaOrmStorage>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { storage, metrics }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        let email = req.email.trim().to_lowercase();

        let mut issues = Vec::new();
        if !is_valid_email(&email) {
            issues.push("email: Invalid email".to_string());
        }
        if req.password.chars().count() < MIN_PASSWORD_LENGTH {
            issues.push(format!(
                "password: Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }
        if !issues.is_empty() {
            return Err(SkafolioError::validation_issues(issues));
        }

        if self.storage.find_user_by_email(&email).await?.is_some() {
            return Err(SkafolioError::conflict(
                "An account with this email already exists",
            ));
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(&req.password)?,
            phone: req.phone.filter(|p| !p.trim().is_empty()),
            role: Role::User,
            subscription_status: SubscriptionStatus::Free,
            created_at: now,
            updated_at: now,
        };

        // 并发注册由唯一索引兜底，insert_user 返回 Conflict
        self.storage.insert_user(&user).await?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) || password.is_empty() {
            return Err(SkafolioError::validation("Email and password are required"));
        }

        let Some(user) = self.storage.find_user_by_email(&email).await? else {
            self.metrics.inc_auth_failure("password");
            warn!("Login failed: unknown account");
            return Err(SkafolioError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(password, &user.password_hash)? {
            self.metrics.inc_auth_failure("password");
            warn!("Login failed for user {}", user.id);
            return Err(SkafolioError::unauthorized(INVALID_CREDENTIALS));
        }

        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| SkafolioError::not_found("User not found"))
    }
}
