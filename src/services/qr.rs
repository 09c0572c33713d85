//! QR 码图片地址生成
//!
//! 图片由外部服务渲染，这里只负责构造图片地址。

use crate::config::QrConfig;
use crate::errors::{Result, SkafolioError};

#[async_trait::async_trait]
pub trait QrCodeProvider: Send + Sync {
    /// 为 `target_url` 生成 QR 图片并返回其地址
    async fn generate(&self, target_url: &str, card_id: &str) -> Result<String>;
}

/// 以查询参数形式拼接图片服务地址：`{provider}?data=...&size=NxN`
#[derive(Debug, Clone)]
pub struct UrlQrProvider {
    provider_url: String,
    size: u32,
}

impl UrlQrProvider {
    pub fn new(config: &QrConfig) -> Self {
        Self {
            provider_url: config.provider_url.clone(),
            size: config.size,
        }
    }
}

#[async_trait::async_trait]
impl QrCodeProvider for UrlQrProvider {
    async fn generate(&self, target_url: &str, _card_id: &str) -> Result<String> {
        let base = url::Url::parse(&self.provider_url).map_err(|e| {
            SkafolioError::internal(format!("Invalid QR provider URL '{}': {}", self.provider_url, e))
        })?;
        if self.size == 0 {
            return Err(SkafolioError::internal("QR size must be positive"));
        }

        let separator = if base.query().is_some() { '&' } else { '?' };
        Ok(format!(
            "{}{}data={}&size={}x{}",
            self.provider_url,
            separator,
            urlencoding::encode(target_url),
            self.size,
            self.size
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(url: &str, size: u32) -> UrlQrProvider {
        UrlQrProvider::new(&QrConfig {
            provider_url: url.to_string(),
            size,
        })
    }

    #[tokio::test]
    async fn test_generates_encoded_image_url() {
        let qr = provider("https://api.qrserver.com/v1/create-qr-code/", 300);
        let url = qr
            .generate("http://localhost:8080/card/jane-doe", "c1")
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://api.qrserver.com/v1/create-qr-code/?data=http%3A%2F%2Flocalhost%3A8080%2Fcard%2Fjane-doe&size=300x300"
        );
    }

    #[tokio::test]
    async fn test_existing_query_is_extended() {
        let qr = provider("https://qr.example.com/render?format=png", 128);
        let url = qr.generate("https://x.test/card/a", "c1").await.unwrap();
        assert!(url.starts_with("https://qr.example.com/render?format=png&data="));
    }

    #[tokio::test]
    async fn test_invalid_provider_fails() {
        let qr = provider("not a url", 300);
        assert!(qr.generate("https://x.test/card/a", "c1").await.is_err());
    }
}
