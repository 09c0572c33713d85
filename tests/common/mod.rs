//! 集成测试共用的环境构造
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use skafolio::config::{DatabaseConfig, PayfastConfig, PayfastMode};
use skafolio::metrics_core::{MetricsRecorder, NoopMetrics};
use skafolio::services::{RegisterRequest, UserService};
use skafolio::storage::{Card, CardData, SeaOrmStorage, StorageFactory, User};

pub const BASE_URL: &str = "http://cards.test";

/// 临时 SQLite 存储；TempDir 需与存储同生命周期
pub async fn test_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    let temp_dir = TempDir::new().expect("创建临时目录失败");
    let db_path = temp_dir.path().join("skafolio_test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let storage = StorageFactory::create(&config)
        .await
        .expect("创建存储失败");
    (temp_dir, storage)
}

pub fn metrics() -> Arc<dyn MetricsRecorder> {
    NoopMetrics::arc()
}

pub async fn register_user(storage: &Arc<SeaOrmStorage>, email: &str) -> User {
    UserService::new(storage.clone(), metrics())
        .register(RegisterRequest {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            phone: Some("+92 300 1234567".to_string()),
        })
        .await
        .expect("注册用户失败")
}

/// 直接写入一张名片，绕过 CardService
pub async fn insert_card(
    storage: &Arc<SeaOrmStorage>,
    user_id: &str,
    slug: &str,
    published: bool,
) -> Card {
    let now = Utc::now();
    let card = Card {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        slug: slug.to_string(),
        title: slug.to_string(),
        data: CardData::default(),
        is_published: published,
        public_url: None,
        qr_code_url: None,
        analytics: None,
        created_at: now,
        updated_at: now,
    };
    storage.insert_card(&card).await.expect("写入名片失败");
    card
}

pub fn payfast_config(passphrase: &str) -> PayfastConfig {
    PayfastConfig {
        merchant_id: "10000100".into(),
        merchant_key: "46f0cd694581a".into(),
        passphrase: passphrase.into(),
        mode: PayfastMode::Sandbox,
        sandbox_url: "https://sandbox.payfast.co.za/eng/process".into(),
        live_url: "https://www.payfast.co.za/eng/process".into(),
        currency: "PKR".into(),
    }
}
