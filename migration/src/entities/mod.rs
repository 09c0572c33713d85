pub mod card;
pub mod card_event;
pub mod order;
pub mod payment;
pub mod user;

pub use card::Entity as CardEntity;
pub use card_event::Entity as CardEventEntity;
pub use order::Entity as OrderEntity;
pub use payment::Entity as PaymentEntity;
pub use user::Entity as UserEntity;
