//! 摘要后台刷新池
//!
//! 记录事件后提交刷新任务，由固定数量的 worker 从有界队列中取出执行：
//! - 队列满时直接丢弃任务（warn 日志 + 指标）
//! - 失败按指数退避重试，超过次数后记 error 日志，不向调用方暴露
//! - 关闭时停止接收新任务，等待队列中剩余任务执行完毕

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, trace, warn};

use super::summary::SummaryAggregator;
use crate::config::AnalyticsConfig;
use crate::errors::Result;
use crate::metrics_core::MetricsRecorder;
use crate::storage::backend::retry::calculate_backoff;

/// 单张名片的摘要刷新
#[async_trait::async_trait]
pub trait SummaryRefresh: Send + Sync {
    async fn refresh(&self, card_id: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl SummaryRefresh for SummaryAggregator {
    async fn refresh(&self, card_id: &str) -> Result<()> {
        self.recompute(card_id).await.map(|_| ())
    }
}

/// 刷新池参数
#[derive(Debug, Clone, Copy)]
pub struct RefreshPoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&AnalyticsConfig> for RefreshPoolConfig {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            workers: config.refresh_workers,
            queue_capacity: config.refresh_queue_capacity,
            max_attempts: config.refresh_max_attempts,
            base_delay_ms: config.refresh_base_delay_ms,
            max_delay_ms: config.refresh_base_delay_ms.saturating_mul(16),
        }
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>;

pub struct SummaryRefresher {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SummaryRefresher {
    /// 启动 worker（需在 tokio 运行时内调用）
    pub fn start(
        target: Arc<dyn SummaryRefresh>,
        config: RefreshPoolConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<String>(config.queue_capacity.max(1));
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers)
            .map(|id| {
                let rx = Arc::clone(&rx);
                let target = Arc::clone(&target);
                let metrics = Arc::clone(&metrics);
                tokio::spawn(async move {
                    Self::worker_loop(id, rx, target, config, metrics).await;
                })
            })
            .collect();

        debug!(
            "SummaryRefresher started: {} workers, queue capacity {}",
            config.workers,
            config.queue_capacity.max(1)
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            metrics,
        }
    }

    /// 提交刷新任务，不等待执行；返回是否入队
    pub fn submit(&self, card_id: &str) -> bool {
        let guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            trace!("SummaryRefresher closed, dropping refresh for {}", card_id);
            self.metrics.inc_summary_refresh_dropped("closed");
            return false;
        };

        match tx.try_send(card_id.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Summary refresh queue full, dropping refresh for card {}", card_id);
                self.metrics.inc_summary_refresh_dropped("queue_full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.inc_summary_refresh_dropped("closed");
                false
            }
        }
    }

    /// 停止接收新任务并等待队列排空
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Summary refresh worker terminated abnormally: {}", e);
            }
        }
        debug!("SummaryRefresher drained");
    }

    async fn worker_loop(
        id: usize,
        rx: SharedReceiver,
        target: Arc<dyn SummaryRefresh>,
        config: RefreshPoolConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) {
        loop {
            // 只在取任务时持有接收端锁
            let job = { rx.lock().await.recv().await };
            let Some(card_id) = job else {
                trace!("Summary refresh worker {} exiting", id);
                break;
            };
            Self::run_job(&card_id, target.as_ref(), config, metrics.as_ref()).await;
        }
    }

    async fn run_job(
        card_id: &str,
        target: &dyn SummaryRefresh,
        config: RefreshPoolConfig,
        metrics: &dyn MetricsRecorder,
    ) {
        let max_attempts = config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match target.refresh(card_id).await {
                Ok(()) => {
                    metrics.inc_summary_refresh("ok");
                    return;
                }
                Err(e) if attempt < max_attempts => {
                    let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                    warn!(
                        "Summary refresh for card {} failed (attempt {}/{}): {}; retrying in {} ms",
                        card_id, attempt, max_attempts, e, delay
                    );
                    metrics.inc_summary_refresh("retry");
                    sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    error!(
                        "Summary refresh for card {} gave up after {} attempts: {}",
                        card_id, attempt, e
                    );
                    metrics.inc_summary_refresh("failed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SkafolioError;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// 前 `fail_times` 次失败的刷新目标
    struct FlakyTarget {
        fail_times: u32,
        calls: AtomicU32,
        done: AtomicUsize,
    }

    impl FlakyTarget {
        fn new(fail_times: u32) -> Self {
            Self {
                fail_times,
                calls: AtomicU32::new(0),
                done: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl SummaryRefresh for FlakyTarget {
        async fn refresh(&self, _card_id: &str) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_times {
                return Err(SkafolioError::database_operation("database is locked"));
            }
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        dropped: AtomicUsize,
        failed: AtomicUsize,
    }

    impl MetricsRecorder for CountingMetrics {
        fn inc_summary_refresh(&self, status: &str) {
            if status == "failed" {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn inc_summary_refresh_dropped(&self, _reason: &str) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pool(workers: usize, capacity: usize, attempts: u32) -> RefreshPoolConfig {
        RefreshPoolConfig {
            workers,
            queue_capacity: capacity,
            max_attempts: attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[tokio::test]
    async fn test_jobs_are_drained_on_shutdown() {
        let target = Arc::new(FlakyTarget::new(0));
        let refresher = SummaryRefresher::start(
            Arc::clone(&target) as Arc<dyn SummaryRefresh>,
            pool(2, 16, 3),
            crate::metrics_core::NoopMetrics::arc(),
        );

        for i in 0..10 {
            assert!(refresher.submit(&format!("card-{}", i)));
        }
        refresher.shutdown().await;

        assert_eq!(target.done.load(Ordering::SeqCst), 10);
        // 关闭后拒绝新任务
        assert!(!refresher.submit("late"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let target = Arc::new(FlakyTarget::new(2));
        let refresher = SummaryRefresher::start(
            Arc::clone(&target) as Arc<dyn SummaryRefresh>,
            pool(1, 4, 3),
            crate::metrics_core::NoopMetrics::arc(),
        );

        assert!(refresher.submit("card"));
        refresher.shutdown().await;

        assert_eq!(target.calls.load(Ordering::SeqCst), 3);
        assert_eq!(target.done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_counted_not_raised() {
        let target = Arc::new(FlakyTarget::new(u32::MAX));
        let metrics = Arc::new(CountingMetrics::default());
        let refresher = SummaryRefresher::start(
            Arc::clone(&target) as Arc<dyn SummaryRefresh>,
            pool(1, 4, 2),
            Arc::clone(&metrics) as Arc<dyn MetricsRecorder>,
        );

        assert!(refresher.submit("card"));
        refresher.shutdown().await;

        assert_eq!(target.calls.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_job() {
        let target = Arc::new(FlakyTarget::new(0));
        let metrics = Arc::new(CountingMetrics::default());
        // 没有 worker，队列不会被消费
        let refresher = SummaryRefresher::start(
            Arc::clone(&target) as Arc<dyn SummaryRefresh>,
            pool(0, 1, 1),
            Arc::clone(&metrics) as Arc<dyn MetricsRecorder>,
        );

        assert!(refresher.submit("a"));
        assert!(!refresher.submit("b"));
        assert_eq!(metrics.dropped.load(Ordering::SeqCst), 1);

        refresher.shutdown().await;
        assert_eq!(target.calls.load(Ordering::SeqCst), 0);
    }
}
