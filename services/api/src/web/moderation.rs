//! services/api/src/web/moderation.rs
//!
//! Admin moderation queue and the bulk approval endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use membership_core::SessionContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::community::{CommentResponse, PostResponse};
use crate::web::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ModerationQueueResponse {
    pub posts: Vec<PostResponse>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentApprovedResponse {
    /// The parent post's approved-comment count after the change.
    pub comments_count: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApproveAllResponse {
    pub posts_approved: u64,
    pub posts_recounted: usize,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub posts_corrected: usize,
}

#[utoipa::path(
    get,
    path = "/admin/moderation",
    responses(
        (status = 200, description = "Pending posts and comments, newest first", body = ModerationQueueResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn pending_queue_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<ModerationQueueResponse>, ApiError> {
    let queue = state.community.pending_queue(&ctx).await?;
    Ok(Json(ModerationQueueResponse {
        posts: queue.posts.into_iter().map(Into::into).collect(),
        comments: queue.comments.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/moderation/posts/{id}/approve",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post approved"),
        (status = 404, description = "No such post")
    )
)]
pub async fn approve_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.community.approve_post(&ctx, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/moderation/comments/{id}/approve",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment approved", body = CommentApprovedResponse),
        (status = 404, description = "No such comment")
    )
)]
pub async fn approve_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentApprovedResponse>, ApiError> {
    let comments_count = state.community.approve_comment(&ctx, comment_id).await?;
    Ok(Json(CommentApprovedResponse { comments_count }))
}

#[utoipa::path(
    post,
    path = "/admin/moderation/approve-all",
    responses((status = 200, description = "Everything pending is approved", body = ApproveAllResponse))
)]
pub async fn approve_all_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<ApproveAllResponse>, ApiError> {
    let summary = state.community.approve_all(&ctx).await?;
    Ok(Json(ApproveAllResponse {
        posts_approved: summary.posts_approved,
        posts_recounted: summary.posts_recounted,
    }))
}

/// Recomputes like and comment counters on every post from the stored rows.
#[utoipa::path(
    post,
    path = "/admin/moderation/reconcile",
    responses((status = 200, description = "Counters rebuilt", body = ReconcileResponse))
)]
pub async fn reconcile_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let posts_corrected = state.community.reconcile_counters(&ctx).await?;
    Ok(Json(ReconcileResponse { posts_corrected }))
}
