//! 用户与名片表迁移
//!
//! 创建 users 与 cards 表。名片内容 (data) 与分析摘要 (analytics)
//! 以 JSON 文本列保存。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                    .col(ColumnDef::new(Users::Phone).string_len(32).null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default("user"),
                    )
                    .col(
                        ColumnDef::new(Users::SubscriptionStatus)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cards::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cards::UserId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Cards::Slug)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Cards::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Cards::Data).text().not_null())
                    .col(
                        ColumnDef::new(Cards::IsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Cards::PublicUrl).text().null())
                    .col(ColumnDef::new(Cards::QrCodeUrl).text().null())
                    .col(ColumnDef::new(Cards::Analytics).text().null())
                    .col(
                        ColumnDef::new(Cards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cards_user_id")
                            .from(Cards::Table, Cards::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 按用户列出名片
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_cards_user_id")
                    .table(Cards::Table)
                    .col(Cards::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_cards_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    PasswordHash,
    Phone,
    Role,
    SubscriptionStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Cards {
    #[sea_orm(iden = "cards")]
    Table,
    Id,
    UserId,
    Slug,
    Title,
    Data,
    IsPublished,
    PublicUrl,
    QrCodeUrl,
    Analytics,
    CreatedAt,
    UpdatedAt,
}
