//! 订单与支付表迁移

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Orders::CardId).string_len(36).null())
                    .col(
                        ColumnDef::new(Orders::ProductType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::Quantity).integer().not_null())
                    .col(ColumnDef::new(Orders::Material).string_len(16).null())
                    .col(ColumnDef::new(Orders::CustomDesign).text().null())
                    .col(
                        ColumnDef::new(Orders::PaymentMethod)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::ShippingInfo).text().not_null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
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
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Payments::OrderId).string_len(36).not_null())
                    .col(ColumnDef::new(Payments::Amount).double().not_null())
                    .col(ColumnDef::new(Payments::Currency).string_len(8).not_null())
                    .col(ColumnDef::new(Payments::Gateway).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Payments::GatewayId).string_len(128).null())
                    .col(ColumnDef::new(Payments::Metadata).text().null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_order_id")
                            .from(Payments::Table, Payments::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payments_order_id")
                    .table(Payments::Table)
                    .col(Payments::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_payments_order_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_orders_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    #[sea_orm(iden = "orders")]
    Table,
    Id,
    UserId,
    CardId,
    ProductType,
    Quantity,
    Material,
    CustomDesign,
    PaymentMethod,
    PaymentStatus,
    Status,
    ShippingInfo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    #[sea_orm(iden = "payments")]
    Table,
    Id,
    UserId,
    OrderId,
    Amount,
    Currency,
    Gateway,
    Status,
    GatewayId,
    Metadata,
    CreatedAt,
    UpdatedAt,
}
