//! 支付网关相关的纯逻辑：定价与 PayFast 签名

pub mod payfast;
pub mod pricing;

pub use payfast::{PayfastFields, PaymentRequest, SignedRequest};
pub use pricing::{order_amount, unit_price};
