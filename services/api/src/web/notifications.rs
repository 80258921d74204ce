//! services/api/src/web/notifications.rs
//!
//! Inbox endpoints for members and the admin broadcast endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::domain::NotificationDraft;
use membership_core::notifications::SentNotification;
use membership_core::{Notification, NotificationType, Recipient, SessionContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub sender_id: Option<Uuid>,
    /// `system`, `manual` or `comment`.
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            sender_id: n.sender_id,
            kind: n.kind.as_str().to_string(),
            title: n.title,
            message: n.message,
            link: n.link,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNotificationsQuery {
    /// Defaults to 50.
    pub limit: Option<i64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

/// `recipient` is either `"all"` or a user id.
#[derive(Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    pub recipient: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SendNotificationResponse {
    pub delivered: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SentNotificationResponse {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub recipients: usize,
}

impl From<SentNotification> for SentNotificationResponse {
    fn from(s: SentNotification) -> Self {
        Self {
            title: s.title,
            message: s.message,
            link: s.link,
            created_at: s.created_at,
            recipients: s.recipients,
        }
    }
}

fn parse_recipient(raw: &str) -> Result<Recipient, ApiError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(Recipient::All);
    }
    Uuid::parse_str(raw)
        .map(Recipient::User)
        .map_err(|_| ApiError::BadRequest(format!("'{}' is neither 'all' nor a user id", raw)))
}

//=========================================================================================
// Member Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/notifications",
    params(ListNotificationsQuery),
    responses((status = 200, description = "The caller's notifications, newest first", body = [NotificationResponse]))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.notifications.list_for_user(&ctx, query.limit).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    responses((status = 200, description = "Unread notifications", body = UnreadCountResponse))
)]
pub async fn unread_count_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = state.notifications.unread_count(&ctx).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Not one of the caller's notifications")
    )
)]
pub async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.notifications.mark_read(&ctx, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses((status = 200, description = "Everything marked read", body = MarkedReadResponse))
)]
pub async fn mark_all_read_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<MarkedReadResponse>, ApiError> {
    let updated = state.notifications.mark_all_read(&ctx).await?;
    Ok(Json(MarkedReadResponse { updated }))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/admin/notifications",
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Notifications written", body = SendNotificationResponse),
        (status = 400, description = "Missing title, message or recipient"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No such recipient")
    )
)]
pub async fn send_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    let recipient = parse_recipient(&req.recipient)?;
    let draft = NotificationDraft {
        sender_id: None,
        kind: NotificationType::Manual,
        title: req.title,
        message: req.message,
        link: req.link,
    };
    let delivered = state.notifications.notify(&ctx, recipient, draft).await?;
    Ok(Json(SendNotificationResponse { delivered }))
}

#[utoipa::path(
    get,
    path = "/admin/notifications/history",
    responses((status = 200, description = "Recent manual sends", body = [SentNotificationResponse]))
)]
pub async fn sent_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<SentNotificationResponse>>, ApiError> {
    let history = state.notifications.sent_history(&ctx).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_accepts_all_or_a_user_id() {
        assert_eq!(parse_recipient(" ALL ").unwrap(), Recipient::All);
        let id = Uuid::new_v4();
        assert_eq!(parse_recipient(&id.to_string()).unwrap(), Recipient::User(id));
        assert!(parse_recipient("everyone").is_err());
    }
}
