//! services/api/src/web/community.rs
//!
//! Community feed endpoints: posts, comments and likes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::community::{CommentEntry, FeedEntry, LikeState, PostInput};
use membership_core::domain::{CommunityComment, CommunityPost};
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
pub struct PostResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub approved: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<CommunityPost> for PostResponse {
    fn from(p: CommunityPost) -> Self {
        Self {
            id: p.id,
            user_id: p.authored_by,
            content: p.content,
            image_url: p.image_url,
            approved: p.approved,
            likes_count: p.likes_count,
            comments_count: p.comments_count,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FeedEntryResponse {
    pub post: PostResponse,
    pub author: AuthorResponse,
    pub liked_by_me: bool,
}

impl From<FeedEntry> for FeedEntryResponse {
    fn from(e: FeedEntry) -> Self {
        Self {
            post: e.post.into(),
            author: AuthorResponse {
                name: e.author.name,
                avatar_url: e.author.avatar_url,
            },
            liked_by_me: e.liked_by_me,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CommunityComment> for CommentResponse {
    fn from(c: CommunityComment) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            content: c.content,
            approved: c.approved,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentEntryResponse {
    pub comment: CommentResponse,
    pub author: AuthorResponse,
}

impl From<CommentEntry> for CommentEntryResponse {
    fn from(e: CommentEntry) -> Self {
        Self {
            comment: e.comment.into(),
            author: AuthorResponse {
                name: e.author.name,
                avatar_url: e.author.avatar_url,
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

impl From<LikeState> for LikeResponse {
    fn from(s: LikeState) -> Self {
        Self {
            liked: s.liked,
            likes_count: s.likes_count,
        }
    }
}

/// `display_name` and `display_avatar_url` post under another identity and
/// are accepted from admins only.
#[derive(Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub content: String,
    pub image_url: Option<String>,
    pub display_name: Option<String>,
    pub display_avatar_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

//=========================================================================================
// Post Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/community/posts",
    responses((status = 200, description = "Visible posts, newest first", body = [FeedEntryResponse]))
)]
pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<FeedEntryResponse>>, ApiError> {
    let feed = state.community.list_feed(&ctx).await?;
    Ok(Json(feed.into_iter().map(Into::into).collect()))
}

/// New posts wait for approval when moderation is on, unless written by an admin.
#[utoipa::path(
    post,
    path = "/community/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Empty content"),
        (status = 403, description = "Identity override by a non-admin")
    )
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = PostInput {
        content: req.content,
        image_url: req.image_url,
        display_name: req.display_name,
        display_avatar_url: req.display_avatar_url,
    };
    let post = state.community.create_post(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

#[utoipa::path(
    get,
    path = "/community/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = FeedEntryResponse),
        (status = 404, description = "Missing or hidden from the caller")
    )
)]
pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<FeedEntryResponse>, ApiError> {
    Ok(Json(state.community.get_post(&ctx, post_id).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/community/posts/{id}",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted with its comments and likes"),
        (status = 403, description = "Neither the author nor an admin"),
        (status = 404, description = "Missing or hidden from the caller")
    )
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.community.delete_post(&ctx, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/community/posts/{id}/like",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Like state after the toggle", body = LikeResponse))
)]
pub async fn toggle_like_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, ApiError> {
    Ok(Json(state.community.toggle_like(&ctx, post_id).await?.into()))
}

//=========================================================================================
// Comment Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/community/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Visible comments, oldest first", body = [CommentEntryResponse]))
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<CommentEntryResponse>>, ApiError> {
    let comments = state.community.list_comments(&ctx, post_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/community/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Missing or hidden post")
    )
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .community
        .create_comment(&ctx, post_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

#[utoipa::path(
    delete,
    path = "/community/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Neither the author nor an admin"),
        (status = 404, description = "Missing or hidden from the caller")
    )
)]
pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.community.delete_comment(&ctx, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
