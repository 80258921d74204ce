//! services/api/src/web/settings.rs
//!
//! Public branding/contact settings, the admin settings editor, and the
//! schema export.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::domain::AppSetting;
use membership_core::settings::{Palette, WhatsAppContact};
use membership_core::SessionContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct WhatsAppResponse {
    pub number: String,
    pub message: String,
}

impl From<WhatsAppContact> for WhatsAppResponse {
    fn from(c: WhatsAppContact) -> Self {
        Self {
            number: c.number,
            message: c.message,
        }
    }
}

/// HSL triplets such as `"228 76% 58%"`.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PaletteResponse {
    pub primary: String,
    pub background: String,
    pub foreground: String,
    pub card: String,
    pub accent: String,
    pub muted: String,
    pub destructive: String,
    pub border: String,
}

impl From<Palette> for PaletteResponse {
    fn from(p: Palette) -> Self {
        Self {
            primary: p.primary,
            background: p.background,
            foreground: p.foreground,
            card: p.card,
            accent: p.accent,
            muted: p.muted,
            destructive: p.destructive,
            border: p.border,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PublicSettingsResponse {
    pub whatsapp: WhatsAppResponse,
    pub palette: PaletteResponse,
    pub comment_approval_required: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl From<AppSetting> for SettingResponse {
    fn from(s: AppSetting) -> Self {
        Self {
            key: s.key,
            value: s.value,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SetSettingRequest {
    pub value: String,
}

#[utoipa::path(
    get,
    path = "/settings/public",
    responses((status = 200, description = "Settings every visitor may read", body = PublicSettingsResponse))
)]
pub async fn public_settings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PublicSettingsResponse>, ApiError> {
    let whatsapp = state.settings.whatsapp_contact().await?;
    let comment_approval_required = state.settings.require_comment_approval().await?;
    let palette = state.settings.palette().await;
    Ok(Json(PublicSettingsResponse {
        whatsapp: whatsapp.into(),
        palette: palette.into(),
        comment_approval_required,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/settings",
    responses(
        (status = 200, description = "Every stored setting", body = [SettingResponse]),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_settings_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<SettingResponse>>, ApiError> {
    let settings = state.settings.list(&ctx).await?;
    Ok(Json(settings.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = SetSettingRequest,
    responses((status = 200, description = "Setting stored", body = SettingResponse))
)]
pub async fn set_setting_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(key): Path<String>,
    Json(req): Json<SetSettingRequest>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = state.settings.set(&ctx, &key, &req.value).await?;
    Ok(Json(setting.into()))
}

/// One `CREATE TABLE` statement per public table.
#[utoipa::path(
    get,
    path = "/admin/export/schema",
    responses(
        (status = 200, description = "Schema as SQL text", content_type = "text/plain", body = String),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn export_schema_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<impl IntoResponse, ApiError> {
    let sql = state.schema.export(&ctx).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], sql))
}
