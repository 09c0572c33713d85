use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analytics::{
    Clock, RefreshPoolConfig, SummaryAggregator, SummaryRefresh, SummaryRefresher, SystemClock,
};
use crate::api::jwt::JwtService;
use crate::api::services::AppStartTime;
use crate::config::{StaticConfig, get_config};
use crate::metrics_core::{MetricsRecorder, NoopMetrics};
use crate::services::{
    AnalyticsService, CardService, OrderService, PaymentService, QrCodeProvider, UrlQrProvider,
    UserService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// HTTP 层共享的服务集合
///
/// 服务均包在 `web::Data` 中，跨 worker 克隆只增加引用计数。
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub jwt: web::Data<JwtService>,
    pub users: web::Data<UserService>,
    pub cards: web::Data<CardService>,
    pub analytics: web::Data<AnalyticsService>,
    pub orders: web::Data<OrderService>,
    pub payments: web::Data<PaymentService>,
    pub start_time: AppStartTime,
}

impl AppServices {
    /// 组装服务；需在 tokio 运行时内调用（会启动摘要刷新 worker）
    ///
    /// 返回服务集合与刷新池句柄，后者用于优雅关闭时排空队列。
    pub fn build(
        storage: Arc<SeaOrmStorage>,
        config: &StaticConfig,
        clock: Arc<dyn Clock>,
        qr: Arc<dyn QrCodeProvider>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> (Self, Arc<SummaryRefresher>) {
        let aggregator = Arc::new(SummaryAggregator::new(storage.clone(), clock));
        let refresh_target: Arc<dyn SummaryRefresh> = aggregator.clone();
        let refresher = Arc::new(SummaryRefresher::start(
            refresh_target,
            RefreshPoolConfig::from(&config.analytics),
            metrics.clone(),
        ));

        let analytics = AnalyticsService::new(
            storage.clone(),
            aggregator,
            refresher.clone(),
            config.analytics.cache_ttl_secs,
            metrics.clone(),
        );
        let cards = CardService::new(storage.clone(), qr, &config.app.base_url);
        let users = UserService::new(storage.clone(), metrics.clone());
        let orders = OrderService::new(storage.clone());
        let payments = PaymentService::new(
            storage.clone(),
            config.payfast.clone(),
            &config.app.base_url,
            metrics.clone(),
        );

        let services = Self {
            storage,
            metrics,
            jwt: web::Data::new(JwtService::from_auth_config(&config.auth)),
            users: web::Data::new(users),
            cards: web::Data::new(cards),
            analytics: web::Data::new(analytics),
            orders: web::Data::new(orders),
            payments: web::Data::new(payments),
            start_time: AppStartTime::now(),
        };
        (services, refresher)
    }

    /// 注册到 actix App 的 app_data
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.metrics.clone()))
            .app_data(web::Data::new(self.start_time.clone()))
            .app_data(self.jwt.clone())
            .app_data(self.users.clone())
            .app_data(self.cards.clone())
            .app_data(self.analytics.clone())
            .app_data(self.orders.clone())
            .app_data(self.payments.clone());
    }
}

pub struct StartupContext {
    pub services: AppServices,
    pub refresher: Arc<SummaryRefresher>,
}

/// 准备服务器启动的上下文：连接数据库、运行迁移、组装服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = get_config();

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    storage
        .ping()
        .await
        .context("Database is not reachable")?;
    info!("Using storage backend: {}", storage.backend_name());

    let metrics = NoopMetrics::arc();
    let qr: Arc<dyn QrCodeProvider> = Arc::new(UrlQrProvider::new(&config.qr));
    let (services, refresher) =
        AppServices::build(storage, &config, SystemClock::arc(), qr, metrics);

    check_component_config(&config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        services,
        refresher,
    })
}

fn check_component_config(config: &StaticConfig) {
    if config.auth.jwt_secret.len() < 32 {
        warn!(
            "WARNING: JWT secret is short ({} bytes). Recommended minimum is 32 bytes.",
            config.auth.jwt_secret.len()
        );
    }

    if !config.auth.cookie_secure {
        warn!(
            "WARNING: Cookie Secure flag is disabled. \
            Enable auth.cookie_secure for production environments."
        );
    }

    if config.payfast.passphrase.is_empty() {
        warn!("PayFast passphrase is empty; signatures are computed without it");
    }
    info!(
        "PayFast mode: {} ({})",
        config.payfast.mode.as_ref(),
        config.payfast.process_url()
    );

    if config.server.trusted_proxies.is_empty() {
        warn!(
            "Trusted proxies not configured. \
             Connections from private IPs will use X-Forwarded-For."
        );
    }
}
