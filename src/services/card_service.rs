//! Card management service
//!
//! 名片的创建、编辑、删除、发布和公开查看。所有按 id 的操作都以调用者身份过滤，
//! 非本人名片与不存在的名片同样返回 NotFound。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{Result, SkafolioError};
use crate::services::qr::QrCodeProvider;
use crate::storage::{Card, CardData, CardMeta, SeaOrmStorage};
use crate::utils::{is_valid_email, is_valid_url, slugify, validate_slug};

const DEFAULT_TITLE: &str = "Untitled Card";
const DEFAULT_META_TITLE: &str = "Digital Business Card";
const DEFAULT_META_DESCRIPTION: &str = "View my digital business card";
const SLUG_TAKEN: &str = "This slug is already in use. Please choose another.";

/// 并发创建时 slug 撞车的重试次数
const CREATE_ATTEMPTS: usize = 3;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default)]
pub struct CreateCardRequest {
    pub title: Option<String>,
    pub data: Option<CardData>,
}

/// 字段为 None 表示保持不变
#[derive(Debug, Clone, Default)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub data: Option<CardData>,
}

#[derive(Debug, Clone)]
pub struct PublishCardRequest {
    pub slug: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_image: Option<String>,
}

/// slug 可用性检查结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlugCheck {
    pub available: bool,
    pub message: String,
}

/// 公开展示的名片，不含所有者与分析数据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCard {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub data: CardData,
    pub public_url: Option<String>,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Card> for PublicCard {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            slug: card.slug,
            title: card.title,
            data: card.data,
            public_url: card.public_url,
            qr_code_url: card.qr_code_url,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// 校验名片内容中的网址与邮箱，返回逐字段问题
pub fn validate_card_data(data: &CardData) -> Vec<String> {
    let mut issues = Vec::new();

    if let Some(personal) = &data.personal {
        if let Some(website) = personal.website.as_deref()
            && !website.is_empty()
            && !is_valid_url(website)
        {
            issues.push("data.personal.website: Invalid url".to_string());
        }
        if let Some(email) = personal.email.as_deref()
            && !email.is_empty()
            && !is_valid_email(email)
        {
            issues.push("data.personal.email: Invalid email".to_string());
        }
    }

    for (i, social) in data.social.iter().enumerate() {
        if !is_valid_url(&social.url) {
            issues.push(format!("data.social[{}].url: Invalid url", i));
        }
    }
    for (i, link) in data.links.iter().enumerate() {
        if !is_valid_url(&link.url) {
            issues.push(format!("data.links[{}].url: Invalid url", i));
        }
    }

    issues
}

fn ensure_valid_data(data: Option<&CardData>) -> Result<()> {
    let Some(data) = data else {
        return Ok(());
    };
    let issues = validate_card_data(data);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SkafolioError::validation_issues(issues))
    }
}

// ============ CardService ============

pub struct CardService {
    storage: Arc<SeaOrmStorage>,
    qr: Arc<dyn QrCodeProvider>,
    base_url: String,
}

impl CardService {
    pub fn new(storage: Arc<SeaOrmStorage>, qr: Arc<dyn QrCodeProvider>, base_url: &str) -> Self {
        Self {
            storage,
            qr,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, slug: &str) -> String {
        format!("{}/card/{}", self.base_url, slug)
    }

    /// 由标题生成未被占用的 slug，冲突时依次追加 `-1`、`-2`……
    pub async fn generate_unique_slug(&self, title: Option<&str>) -> Result<String> {
        let base = title
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("card-{}", Utc::now().timestamp_millis()));

        let mut slug = base.clone();
        let mut counter = 1u32;
        while self.storage.slug_exists(&slug).await? {
            slug = format!("{}-{}", base, counter);
            counter += 1;
        }
        Ok(slug)
    }

    pub async fn create(&self, user_id: &str, req: CreateCardRequest) -> Result<Card> {
        ensure_valid_data(req.data.as_ref())?;

        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let slug = self.generate_unique_slug(title).await?;
            let now = Utc::now();
            let card = Card {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                slug,
                title: title.unwrap_or(DEFAULT_TITLE).to_string(),
                data: req.data.clone().unwrap_or_default(),
                is_published: false,
                public_url: None,
                qr_code_url: None,
                analytics: None,
                created_at: now,
                updated_at: now,
            };

            match self.storage.insert_card(&card).await {
                Ok(()) => {
                    info!("Card {} created with slug '{}'", card.id, card.slug);
                    return Ok(card);
                }
                // 检查与插入之间 slug 被抢占，重新生成
                Err(e @ SkafolioError::Conflict(_)) => {
                    warn!("Slug '{}' taken concurrently, regenerating", card.slug);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| SkafolioError::conflict("Could not allocate a unique slug")))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Card>> {
        self.storage.list_cards_by_user(user_id).await
    }

    pub async fn get(&self, user_id: &str, card_id: &str) -> Result<Card> {
        match self.storage.find_card(card_id).await? {
            Some(card) if card.user_id == user_id => Ok(card),
            _ => Err(SkafolioError::not_found("Card not found")),
        }
    }

    pub async fn update(&self, user_id: &str, card_id: &str, req: UpdateCardRequest) -> Result<Card> {
        let mut card = self.get(user_id, card_id).await?;
        ensure_valid_data(req.data.as_ref())?;

        if let Some(title) = req.title.filter(|t| !t.trim().is_empty()) {
            card.title = title;
        }
        if let Some(data) = req.data {
            card.data = data;
        }
        card.updated_at = Utc::now();

        self.storage.update_card(&card).await?;
        Ok(card)
    }

    /// 删除名片及其全部事件
    pub async fn delete(&self, user_id: &str, card_id: &str) -> Result<()> {
        let card = self.get(user_id, card_id).await?;
        if !self.storage.delete_card_with_events(&card.id).await? {
            return Err(SkafolioError::not_found("Card not found"));
        }
        info!("Card {} deleted", card.id);
        Ok(())
    }

    pub async fn check_slug(&self, slug: &str) -> Result<SlugCheck> {
        if let Err(message) = validate_slug(slug) {
            return Ok(SlugCheck {
                available: false,
                message: message.to_string(),
            });
        }

        let taken = self.storage.slug_exists(slug).await?;
        Ok(SlugCheck {
            available: !taken,
            message: if taken {
                "This slug is already taken".to_string()
            } else {
                "Slug is available".to_string()
            },
        })
    }

    /// 以指定 slug 发布名片
    ///
    /// QR 生成失败不阻止发布，沿用原有的 qr_code_url。
    pub async fn publish(&self, user_id: &str, card_id: &str, req: PublishCardRequest) -> Result<Card> {
        let mut card = self.get(user_id, card_id).await?;
        validate_slug(&req.slug).map_err(SkafolioError::validation)?;

        if req.slug != card.slug
            && let Some(other) = self.storage.find_card_by_slug(&req.slug).await?
            && other.id != card.id
        {
            return Err(SkafolioError::conflict(SLUG_TAKEN));
        }

        let public_url = self.public_url(&req.slug);
        match self.qr.generate(&public_url, &card.id).await {
            Ok(url) => card.qr_code_url = Some(url),
            Err(e) => warn!("QR generation failed for card {}: {}", card.id, e),
        }

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let meta_title = non_empty(req.meta_title)
            .or_else(|| Some(card.title.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| DEFAULT_META_TITLE.to_string());
        card.data.meta = Some(CardMeta {
            title: meta_title,
            description: non_empty(req.meta_description)
                .unwrap_or_else(|| DEFAULT_META_DESCRIPTION.to_string()),
            image: non_empty(req.meta_image),
        });

        card.slug = req.slug;
        card.is_published = true;
        card.public_url = Some(public_url);
        card.updated_at = Utc::now();

        self.storage
            .update_card(&card)
            .await
            .map_err(|e| match e {
                SkafolioError::Conflict(_) => SkafolioError::conflict(SLUG_TAKEN),
                other => other,
            })?;

        info!("Card {} published at {}", card.id, card.slug);
        Ok(card)
    }

    /// 按 slug 获取已发布名片
    pub async fn public_view(&self, slug: &str) -> Result<PublicCard> {
        match self.storage.find_card_by_slug(slug).await? {
            Some(card) if card.is_published => Ok(card.into()),
            _ => Err(SkafolioError::not_found("Card not found or not published")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CardLink, PersonalInfo, SocialLink};

    #[test]
    fn test_valid_card_data_has_no_issues() {
        let data = CardData {
            personal: Some(PersonalInfo {
                website: Some("https://jane.dev".into()),
                email: Some("jane@example.com".into()),
                ..Default::default()
            }),
            social: vec![SocialLink {
                platform: "github".into(),
                url: "https://github.com/jane".into(),
                icon: None,
            }],
            ..Default::default()
        };
        assert!(validate_card_data(&data).is_empty());
    }

    #[test]
    fn test_empty_optional_fields_are_allowed() {
        let data = CardData {
            personal: Some(PersonalInfo {
                website: Some(String::new()),
                email: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_card_data(&data).is_empty());
    }

    #[test]
    fn test_invalid_urls_and_email_are_reported() {
        let data = CardData {
            personal: Some(PersonalInfo {
                website: Some("jane.dev".into()),
                email: Some("not-an-email".into()),
                ..Default::default()
            }),
            links: vec![CardLink {
                id: "l1".into(),
                title: "Blog".into(),
                url: "blog".into(),
                description: None,
                icon: None,
                visible: true,
                order: 0,
            }],
            ..Default::default()
        };
        let issues = validate_card_data(&data);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().any(|i| i.starts_with("data.links[0].url")));
    }
}
