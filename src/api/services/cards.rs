//! 名片端点

use actix_web::http::header::CACHE_CONTROL;
use actix_web::{HttpResponse, web};

use crate::api::constants::PUBLIC_CARD_CACHE_CONTROL;
use crate::api::middleware::AuthUser;
use crate::errors::SkafolioError;
use crate::services::CardService;

use super::error_code::ErrorCode;
use super::helpers::{api_created, api_result, error_from_skafolio};
use super::types::{
    ApiResponse, CreateCardBody, MessageResponse, PublishCardBody, SlugCheckQuery, UpdateCardBody,
};

pub async fn list_cards(user: AuthUser, cards: web::Data<CardService>) -> HttpResponse {
    api_result(cards.list(&user.id).await)
}

pub async fn create_card(
    user: AuthUser,
    cards: web::Data<CardService>,
    body: web::Json<CreateCardBody>,
) -> HttpResponse {
    api_created(cards.create(&user.id, body.into_inner().into()).await)
}

pub async fn get_card(
    user: AuthUser,
    cards: web::Data<CardService>,
    path: web::Path<String>,
) -> HttpResponse {
    api_result(cards.get(&user.id, &path).await)
}

pub async fn update_card(
    user: AuthUser,
    cards: web::Data<CardService>,
    path: web::Path<String>,
    body: web::Json<UpdateCardBody>,
) -> HttpResponse {
    api_result(cards.update(&user.id, &path, body.into_inner().into()).await)
}

pub async fn delete_card(
    user: AuthUser,
    cards: web::Data<CardService>,
    path: web::Path<String>,
) -> HttpResponse {
    api_result(
        cards
            .delete(&user.id, &path)
            .await
            .map(|()| MessageResponse::new("Card deleted")),
    )
}

pub async fn publish_card(
    user: AuthUser,
    cards: web::Data<CardService>,
    path: web::Path<String>,
    body: web::Json<PublishCardBody>,
) -> HttpResponse {
    api_result(cards.publish(&user.id, &path, body.into_inner().into()).await)
}

pub async fn check_slug(
    cards: web::Data<CardService>,
    query: web::Query<SlugCheckQuery>,
) -> HttpResponse {
    let Some(slug) = query.slug.as_deref().filter(|s| !s.is_empty()) else {
        return error_from_skafolio(&SkafolioError::validation("Slug is required"));
    };
    api_result(cards.check_slug(slug).await)
}

pub async fn public_card(cards: web::Data<CardService>, path: web::Path<String>) -> HttpResponse {
    match cards.public_view(&path).await {
        Ok(card) => HttpResponse::Ok()
            .insert_header((CACHE_CONTROL, PUBLIC_CARD_CACHE_CONTROL))
            .json(ApiResponse {
                code: ErrorCode::Success as i32,
                message: "OK".to_string(),
                data: Some(card),
            }),
        Err(e) => error_from_skafolio(&e),
    }
}
