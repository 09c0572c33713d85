//! 名片事件表迁移
//!
//! card_events 为只追加的事实表，汇总统计基于它重新计算。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CardEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CardEvents::CardId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CardEvents::Metadata).text().not_null())
                    .col(
                        ColumnDef::new(CardEvents::IpHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CardEvents::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_card_events_card_id")
                    .table(CardEvents::Table)
                    .col(CardEvents::CardId)
                    .to_owned(),
            )
            .await?;

        // 窗口计数 (card_id, timestamp >= since)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_card_events_card_time")
                    .table(CardEvents::Table)
                    .col(CardEvents::CardId)
                    .col(CardEvents::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_card_events_card_time").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_card_events_card_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CardEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CardEvents {
    #[sea_orm(iden = "card_events")]
    Table,
    Id,
    CardId,
    EventType,
    Metadata,
    IpHash,
    Timestamp,
}
