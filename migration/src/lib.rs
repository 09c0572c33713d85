pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20251018_000001_users_cards;
mod m20251018_000002_card_events;
mod m20251018_000003_orders_payments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251018_000001_users_cards::Migration),
            Box::new(m20251018_000002_card_events::Migration),
            Box::new(m20251018_000003_orders_payments::Migration),
        ]
    }
}
