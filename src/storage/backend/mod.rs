//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod cards;
mod connection;
mod converters;
mod events;
mod orders;
mod payments;
pub mod retry;
mod users;

use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{Result, SkafolioError};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_card, model_to_event, model_to_order, model_to_payment};
pub use payments::PaymentTransition;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(SkafolioError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 唯一约束冲突映射为 Conflict，其余按数据库错误处理
pub(crate) fn map_write_error(err: DbErr, conflict_message: &str) -> SkafolioError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => SkafolioError::conflict(conflict_message),
        _ => SkafolioError::database_operation(err.to_string()),
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(SkafolioError::database_config("database_url 未设置"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url, config).await?
        } else {
            connect_generic(database_url, backend_name, config).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config: retry::RetryConfig::from_database_config(config),
        };

        run_migrations(&storage.db).await?;

        info!(
            "{} storage initialized",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 健康检查用的轻量探测
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| SkafolioError::database_connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data.db?mode=rwc").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("skafolio.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url(":memory:").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("mariadb://u:p@h/db").unwrap(), "mysql");
        assert_eq!(infer_backend_from_url("postgresql://u@h/db").unwrap(), "postgres");
        assert!(infer_backend_from_url("mongodb://h/db").is_err());
    }
}
