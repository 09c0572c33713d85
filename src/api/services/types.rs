//! API 请求/响应类型定义
//!
//! 请求体字段为 camelCase，转换为服务层 DTO 后再处理。

use serde::{Deserialize, Serialize};

use crate::services::{
    CreateCardRequest, CreateOrderRequest, PublishCardRequest, RegisterRequest,
    UpdateCardRequest,
};
use crate::storage::{
    CardData, EventMetadata, EventType, Material, PaymentMethod, ProductType, ShippingInfo, User,
};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 校验失败时附带的逐字段问题
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorDetails {
    pub issues: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============ 认证 ============

#[derive(Deserialize, Clone, Debug)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<RegisterBody> for RegisterRequest {
    fn from(body: RegisterBody) -> Self {
        Self {
            email: body.email,
            password: body.password,
            phone: body.phone,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct AuthSuccessResponse {
    pub user: User,
}

// ============ 名片 ============

#[derive(Deserialize, Clone, Debug, Default)]
pub struct CreateCardBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Option<CardData>,
}

impl From<CreateCardBody> for CreateCardRequest {
    fn from(body: CreateCardBody) -> Self {
        Self {
            title: body.title,
            data: body.data,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpdateCardBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Option<CardData>,
}

impl From<UpdateCardBody> for UpdateCardRequest {
    fn from(body: UpdateCardBody) -> Self {
        Self {
            title: body.title,
            data: body.data,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublishCardBody {
    pub slug: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_image: Option<String>,
}

impl From<PublishCardBody> for PublishCardRequest {
    fn from(body: PublishCardBody) -> Self {
        Self {
            slug: body.slug,
            meta_title: body.meta_title,
            meta_description: body.meta_description,
            meta_image: body.meta_image,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SlugCheckQuery {
    pub slug: Option<String>,
}

// ============ 分析 ============

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventBody {
    pub card_id: String,
    pub event_type: EventType,
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

// ============ 订单与支付 ============

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Payfast
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    #[serde(default)]
    pub card_id: Option<String>,
    pub product_type: ProductType,
    pub quantity: i64,
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub custom_design: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    pub shipping_info: ShippingInfo,
}

impl From<CreateOrderBody> for CreateOrderRequest {
    fn from(body: CreateOrderBody) -> Self {
        Self {
            card_id: body.card_id.filter(|id| !id.is_empty()),
            product_type: body.product_type,
            quantity: body.quantity,
            material: body.material,
            custom_design: body.custom_design,
            payment_method: body.payment_method,
            shipping_info: body.shipping_info,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    pub order_id: String,
}
