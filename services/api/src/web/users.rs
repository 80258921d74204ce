//! services/api/src/web/users.rs
//!
//! Profile endpoints for the signed-in member and the admin user directory:
//! role changes and per-user product grants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::domain::{Entitlement, ProfileUpdate};
use membership_core::profiles::UserSummary;
use membership_core::{Profile, SessionContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::catalog::OwnedProductResponse;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub nickname: Option<String>,
    pub show_nickname: bool,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub notify_comments: bool,
    /// The name other members see next to this user's posts and comments.
    pub display_label: String,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        let display_label = p.display_label();
        Self {
            user_id: p.user_id,
            name: p.name,
            email: p.email,
            avatar_url: p.avatar_url,
            nickname: p.nickname,
            show_nickname: p.show_nickname,
            bio: p.bio,
            phone: p.phone,
            notify_comments: p.notify_comments,
            display_label,
        }
    }
}

/// Absent fields are left unchanged.
#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub nickname: Option<String>,
    pub show_nickname: Option<bool>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub notify_comments: Option<bool>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            name: req.name,
            avatar_url: req.avatar_url,
            nickname: req.nickname,
            show_nickname: req.show_nickname,
            bio: req.bio,
            phone: req.phone,
            notify_comments: req.notify_comments,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserSummaryResponse {
    pub profile: ProfileResponse,
    pub is_admin: bool,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(u: UserSummary) -> Self {
        Self {
            profile: u.profile.into(),
            is_admin: u.is_admin,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EntitlementResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

impl From<Entitlement> for EntitlementResponse {
    fn from(e: Entitlement) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            product_id: e.product_id,
            granted_at: e.granted_at,
        }
    }
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "The caller's profile", body = ProfileResponse))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(state.profiles.me(&ctx).await?.into()))
}

#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid profile field")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.update_me(&ctx, req.into()).await?;
    Ok(Json(profile.into()))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All members with their role", body = [UserSummaryResponse]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let users = state.profiles.list_users(&ctx).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/admin",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User is an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn grant_admin_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.access.grant_admin(&ctx, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}/admin",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 204, description = "User is no longer an admin"))
)]
pub async fn revoke_admin_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.access.revoke_admin(&ctx, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/users/{id}/products",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Products granted to the user", body = [OwnedProductResponse]))
)]
pub async fn user_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<OwnedProductResponse>>, ApiError> {
    let owned = state.access.products_of_user(&ctx, user_id).await?;
    Ok(Json(owned.into_iter().map(Into::into).collect()))
}

/// Granting twice returns the original grant.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Access granted", body = EntitlementResponse),
        (status = 404, description = "No such user or product")
    )
)]
pub async fn grant_access_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EntitlementResponse>, ApiError> {
    let entitlement = state.access.grant_access(&ctx, user_id, product_id).await?;
    Ok(Json(entitlement.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("product_id" = Uuid, Path, description = "Product id")
    ),
    responses((status = 204, description = "Access revoked"))
)]
pub async fn revoke_access_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.access.revoke_access(&ctx, user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
