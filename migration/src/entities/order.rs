//! Physical product order entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub card_id: Option<String>,
    pub product_type: String,
    pub quantity: i32,
    pub material: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_design: Option<String>,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    #[sea_orm(column_type = "Text")]
    pub shipping_info: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
