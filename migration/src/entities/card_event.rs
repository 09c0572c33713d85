//! Card analytics event entity (append-only)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "card_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub card_id: String,
    /// view | link_click | qr_scan | share
    pub event_type: String,
    #[sea_orm(column_type = "Text")]
    pub metadata: String,
    /// SHA-256 hex of the client address
    pub ip_hash: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
