//! Business card entity
//!
//! `data` 与 `analytics` 以 JSON 文本存储，由上层负责序列化。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub data: String,
    pub is_published: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub public_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub qr_code_url: Option<String>,
    /// Cached analytics summary (JSON)
    #[sea_orm(column_type = "Text", nullable)]
    pub analytics: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
