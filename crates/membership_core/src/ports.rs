//! crates/membership_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database.

use crate::domain::{
    AppSetting, Banner, BannerDraft, ColumnInfo, CommunityComment, CommunityPost, ContentDraft,
    Entitlement, FeedPost, Module, ModuleContent, ModuleDraft, NewComment, NewFeedPost, NewPost,
    Notification, NotificationDraft, NotificationType, Product, ProductDraft, Profile,
    ProfileUpdate, Role, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// Everything the core needs from the persistence/auth backend.
///
/// Each method is one independent store call. Multi-step operations in the
/// service layer are sequences of these calls and are not atomic.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user, or `Unauthorized` if missing or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Profiles ---
    async fn create_profile(&self, user_id: Uuid, email: Option<&str>) -> PortResult<Profile>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile>;

    async fn list_profiles(&self) -> PortResult<Vec<Profile>>;

    // --- Roles ---
    async fn has_role(&self, user_id: Uuid, role: Role) -> PortResult<bool>;

    /// Returns `true` when a new row was written.
    async fn add_role(&self, user_id: Uuid, role: Role) -> PortResult<bool>;

    /// Returns `true` when a row was removed.
    async fn remove_role(&self, user_id: Uuid, role: Role) -> PortResult<bool>;

    async fn list_users_with_role(&self, role: Role) -> PortResult<Vec<Uuid>>;

    // --- Entitlements ---
    async fn find_entitlement(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> PortResult<Option<Entitlement>>;

    async fn insert_entitlement(&self, user_id: Uuid, product_id: Uuid)
        -> PortResult<Entitlement>;

    async fn delete_entitlement(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool>;

    async fn delete_entitlements_for_product(&self, product_id: Uuid) -> PortResult<u64>;

    /// Newest grant first.
    async fn list_entitlements_for_user(&self, user_id: Uuid) -> PortResult<Vec<Entitlement>>;

    // --- Products ---
    /// Ascending `sort_order`.
    async fn list_products(&self) -> PortResult<Vec<Product>>;

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product>;

    async fn insert_product(&self, draft: ProductDraft) -> PortResult<Product>;

    async fn update_product(&self, product_id: Uuid, draft: ProductDraft) -> PortResult<Product>;

    async fn set_product_sort_order(&self, product_id: Uuid, sort_order: i32) -> PortResult<()>;

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()>;

    // --- Modules ---
    /// Ascending `sort_order`.
    async fn list_modules(&self, product_id: Uuid) -> PortResult<Vec<Module>>;

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module>;

    async fn insert_module(&self, product_id: Uuid, draft: ModuleDraft) -> PortResult<Module>;

    async fn update_module(&self, module_id: Uuid, draft: ModuleDraft) -> PortResult<Module>;

    async fn delete_module(&self, module_id: Uuid) -> PortResult<()>;

    // --- Module Contents ---
    /// Ascending `sort_order`.
    async fn list_contents(&self, module_id: Uuid) -> PortResult<Vec<ModuleContent>>;

    async fn get_content(&self, content_id: Uuid) -> PortResult<ModuleContent>;

    async fn insert_content(&self, module_id: Uuid, draft: ContentDraft)
        -> PortResult<ModuleContent>;

    async fn update_content(
        &self,
        content_id: Uuid,
        draft: ContentDraft,
    ) -> PortResult<ModuleContent>;

    async fn delete_content(&self, content_id: Uuid) -> PortResult<()>;

    async fn delete_contents_for_module(&self, module_id: Uuid) -> PortResult<u64>;

    // --- Community Posts ---
    /// Newest first.
    async fn list_posts(&self) -> PortResult<Vec<CommunityPost>>;

    /// Newest first.
    async fn list_pending_posts(&self) -> PortResult<Vec<CommunityPost>>;

    async fn get_post(&self, post_id: Uuid) -> PortResult<CommunityPost>;

    async fn insert_post(&self, post: NewPost) -> PortResult<CommunityPost>;

    async fn set_post_approved(&self, post_id: Uuid) -> PortResult<()>;

    /// Approves every pending post. Returns the number of rows changed.
    async fn approve_all_posts(&self) -> PortResult<u64>;

    async fn delete_post(&self, post_id: Uuid) -> PortResult<()>;

    async fn set_comments_count(&self, post_id: Uuid, count: i64) -> PortResult<()>;

    async fn set_likes_count(&self, post_id: Uuid, count: i64) -> PortResult<()>;

    /// Adds `delta` to `likes_count` in one store operation, clamped at zero.
    /// Returns the new value.
    async fn adjust_likes_count(&self, post_id: Uuid, delta: i64) -> PortResult<i64>;

    // --- Community Comments ---
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> PortResult<Vec<CommunityComment>>;

    /// Newest first.
    async fn list_pending_comments(&self) -> PortResult<Vec<CommunityComment>>;

    async fn get_comment(&self, comment_id: Uuid) -> PortResult<CommunityComment>;

    async fn insert_comment(&self, comment: NewComment) -> PortResult<CommunityComment>;

    async fn set_comment_approved(&self, comment_id: Uuid) -> PortResult<()>;

    /// Approves every pending comment. Returns the distinct post ids touched.
    async fn approve_all_comments(&self) -> PortResult<Vec<Uuid>>;

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()>;

    async fn delete_comments_for_post(&self, post_id: Uuid) -> PortResult<u64>;

    async fn count_approved_comments(&self, post_id: Uuid) -> PortResult<i64>;

    // --- Community Likes ---
    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    /// Returns `true` when a new row was written.
    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    /// Returns `true` when a row was removed.
    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    async fn delete_likes_for_post(&self, post_id: Uuid) -> PortResult<u64>;

    async fn count_likes(&self, post_id: Uuid) -> PortResult<i64>;

    async fn liked_post_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    // --- Notifications ---
    async fn insert_notification(
        &self,
        user_id: Uuid,
        draft: NotificationDraft,
    ) -> PortResult<Notification>;

    /// Inserts one row per existing profile in a single operation.
    /// Returns the number of rows written.
    async fn insert_notification_for_all(&self, draft: NotificationDraft) -> PortResult<u64>;

    /// Newest first.
    async fn list_notifications(&self, user_id: Uuid, limit: i64)
        -> PortResult<Vec<Notification>>;

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification>;

    async fn mark_notification_read(&self, notification_id: Uuid) -> PortResult<()>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<i64>;

    /// Newest first, across all recipients.
    async fn list_notifications_by_type(
        &self,
        kind: NotificationType,
        limit: i64,
    ) -> PortResult<Vec<Notification>>;

    // --- Banners ---
    /// All banners, active or not, ordered by `sort_order`.
    async fn list_banners(&self) -> PortResult<Vec<Banner>>;

    async fn insert_banner(&self, draft: BannerDraft) -> PortResult<Banner>;

    async fn update_banner(&self, banner_id: Uuid, draft: BannerDraft) -> PortResult<Banner>;

    async fn set_banner_active(&self, banner_id: Uuid, active: bool) -> PortResult<Banner>;

    async fn delete_banner(&self, banner_id: Uuid) -> PortResult<()>;

    // --- Feed Posts ---
    /// Newest first.
    async fn list_feed_posts(&self, limit: i64) -> PortResult<Vec<FeedPost>>;

    async fn insert_feed_post(&self, post: NewFeedPost) -> PortResult<FeedPost>;

    async fn delete_feed_post(&self, feed_post_id: Uuid) -> PortResult<()>;

    // --- App Settings ---
    async fn get_setting(&self, key: &str) -> PortResult<Option<String>>;

    async fn list_settings(&self) -> PortResult<Vec<AppSetting>>;

    async fn upsert_setting(&self, key: &str, value: &str) -> PortResult<AppSetting>;

    // --- Schema ---
    async fn describe_schema(&self) -> PortResult<Vec<ColumnInfo>>;
}
