//! 数据库操作重试
//!
//! 对死锁、SQLite BUSY、连接获取失败等瞬时错误做指数退避重试。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 判断数据库错误是否可重试
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            is_retryable_runtime_error(runtime_err)
        }
        _ => false,
    }
}

fn is_retryable_runtime_error(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(db_err) = sqlx_err.deref().as_database_error()
                && let Some(code) = db_err.code()
            {
                return matches!(
                    code.as_ref(),
                    // MySQL 死锁 / 锁等待超时
                    "1213" | "1205" |
                    // PostgreSQL 序列化失败 / 死锁
                    "40001" | "40P01" |
                    // SQLite BUSY / LOCKED
                    "5" | "6"
                );
            }
            is_retryable_error_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_retryable_error_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn is_retryable_error_message(err_str: &str) -> bool {
    err_str.contains("deadlock")
        || err_str.contains("lock wait timeout")
        || err_str.contains("database is locked")
        || err_str.contains("serialization failure")
}

/// 重试配置
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn from_database_config(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// 指数退避重试执行器，仅对 [`is_retryable_error`] 判定的错误重试
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(result);
            }
            Err(e) if is_retryable_error(&e) && attempt < config.max_retries => {
                attempt += 1;
                let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    config.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 计算第 `attempt` 次重试的延迟（从 1 开始），封顶后再加 0-25% 抖动
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    use rand::RngExt;
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn busy() -> DbErr {
        DbErr::Query(sea_orm::error::RuntimeErr::Internal(
            "database is locked".to_string(),
        ))
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(is_retryable_error(&DbErr::ConnectionAcquire(
            sea_orm::error::ConnAcquireErr::Timeout
        )));
        assert!(is_retryable_error(&busy()));
        assert!(is_retryable_error(&DbErr::Exec(
            sea_orm::error::RuntimeErr::Internal("Deadlock found".to_string())
        )));
    }

    #[test]
    fn test_logical_errors_are_not_retryable() {
        assert!(!is_retryable_error(&DbErr::RecordNotFound("x".into())));
        assert!(!is_retryable_error(&DbErr::Custom("bad input".into())));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert!((50..=62).contains(&calculate_backoff(1, 50, 1000)));
        assert!((200..=250).contains(&calculate_backoff(3, 50, 1000)));
        assert!((1000..=1250).contains(&calculate_backoff(12, 50, 1000)));
    }

    #[test]
    fn test_backoff_attempt_zero_does_not_underflow() {
        assert!((100..=125).contains(&calculate_backoff(0, 100, 1000)));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_busy() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 5,
            max_delay_ms: 20,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("busy_then_ok", config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n == 0 { Err(busy()) } else { Ok("done") } }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max_retries() {
        let config = RetryConfig {
            max_retries: 1,
            base_delay_ms: 5,
            max_delay_ms: 20,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("always_busy", config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(busy()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_logical_errors() {
        let calls = AtomicU32::new(0);

        let result = with_retry("missing", RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::RecordNotFound("gone".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
