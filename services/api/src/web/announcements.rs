//! services/api/src/web/announcements.rs
//!
//! The home banner carousel and the admin updates feed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::domain::{Banner, BannerDraft, FeedPost};
use membership_core::SessionContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BannerResponse {
    pub id: Uuid,
    pub image_url: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub sort_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Banner> for BannerResponse {
    fn from(b: Banner) -> Self {
        Self {
            id: b.id,
            image_url: b.image_url,
            title: b.title,
            link: b.link,
            sort_order: b.sort_order,
            active: b.active,
            created_at: b.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BannerRequest {
    pub image_url: String,
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl From<BannerRequest> for BannerDraft {
    fn from(req: BannerRequest) -> Self {
        Self {
            image_url: req.image_url,
            title: req.title,
            link: req.link,
            sort_order: req.sort_order,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BannerActiveRequest {
    pub active: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FeedPostResponse {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FeedPost> for FeedPostResponse {
    fn from(p: FeedPost) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            content: p.content,
            image_url: p.image_url,
            created_at: p.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateFeedPostRequest {
    pub content: String,
    pub image_url: Option<String>,
}

//=========================================================================================
// Member Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/banners",
    responses((status = 200, description = "Active banners in carousel order", body = [BannerResponse]))
)]
pub async fn active_banners_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<BannerResponse>>, ApiError> {
    let banners = state.announcements.active_banners(&ctx).await?;
    Ok(Json(banners.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/feed",
    responses((status = 200, description = "Admin updates, newest first", body = [FeedPostResponse]))
)]
pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<FeedPostResponse>>, ApiError> {
    let posts = state.announcements.feed(&ctx).await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/admin/banners",
    responses(
        (status = 200, description = "Every banner, inactive included", body = [BannerResponse]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_banners_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<BannerResponse>>, ApiError> {
    let banners = state.announcements.list_banners(&ctx).await?;
    Ok(Json(banners.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/banners",
    request_body = BannerRequest,
    responses(
        (status = 201, description = "Banner created", body = BannerResponse),
        (status = 400, description = "Missing image"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_banner_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<BannerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let banner = state.announcements.create_banner(&ctx, req.into()).await?;
    Ok((StatusCode::CREATED, Json(BannerResponse::from(banner))))
}

#[utoipa::path(
    put,
    path = "/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner id")),
    request_body = BannerRequest,
    responses(
        (status = 200, description = "Banner updated", body = BannerResponse),
        (status = 404, description = "No such banner")
    )
)]
pub async fn update_banner_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(banner_id): Path<Uuid>,
    Json(req): Json<BannerRequest>,
) -> Result<Json<BannerResponse>, ApiError> {
    let banner = state
        .announcements
        .update_banner(&ctx, banner_id, req.into())
        .await?;
    Ok(Json(banner.into()))
}

#[utoipa::path(
    put,
    path = "/admin/banners/{id}/active",
    params(("id" = Uuid, Path, description = "Banner id")),
    request_body = BannerActiveRequest,
    responses(
        (status = 200, description = "Visibility changed", body = BannerResponse),
        (status = 404, description = "No such banner")
    )
)]
pub async fn set_banner_active_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(banner_id): Path<Uuid>,
    Json(req): Json<BannerActiveRequest>,
) -> Result<Json<BannerResponse>, ApiError> {
    let banner = state
        .announcements
        .set_banner_active(&ctx, banner_id, req.active)
        .await?;
    Ok(Json(banner.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/banners/{id}",
    params(("id" = Uuid, Path, description = "Banner id")),
    responses(
        (status = 204, description = "Banner deleted"),
        (status = 404, description = "No such banner")
    )
)]
pub async fn delete_banner_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(banner_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.announcements.delete_banner(&ctx, banner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/feed",
    request_body = CreateFeedPostRequest,
    responses(
        (status = 201, description = "Feed post published", body = FeedPostResponse),
        (status = 400, description = "Empty content"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_feed_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<CreateFeedPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .announcements
        .publish_feed_post(&ctx, &req.content, req.image_url)
        .await?;
    Ok((StatusCode::CREATED, Json(FeedPostResponse::from(post))))
}

#[utoipa::path(
    delete,
    path = "/admin/feed/{id}",
    params(("id" = Uuid, Path, description = "Feed post id")),
    responses(
        (status = 204, description = "Feed post deleted"),
        (status = 404, description = "No such feed post")
    )
)]
pub async fn delete_feed_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(feed_post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.announcements.delete_feed_post(&ctx, feed_post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
