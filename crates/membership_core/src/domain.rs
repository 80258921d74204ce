//! crates/membership_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Identity
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie or bearer token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The only role the application checks. Absence of an `Admin` row means an
/// ordinary user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// Public profile data attached to a user.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub nickname: Option<String>,
    pub show_nickname: bool,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub notify_comments: bool,
}

impl Profile {
    /// The label shown next to content authored by this profile.
    pub fn display_label(&self) -> String {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if self.show_nickname {
            if let Some(nick) = non_empty(&self.nickname) {
                return nick;
            }
        }
        non_empty(&self.name)
            .or_else(|| non_empty(&self.email))
            .unwrap_or_else(|| "Member".to_string())
    }
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub nickname: Option<String>,
    pub show_nickname: Option<bool>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub notify_comments: Option<bool>,
}

//=========================================================================================
// Catalog: Product -> Module -> ModuleContent
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    /// Sold through an external purchase link; no module tree.
    Simple,
    /// Content is organised in modules.
    Modules,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Simple => "simple",
            ProductKind::Modules => "modules",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simple" => Some(ProductKind::Simple),
            "modules" => Some(ProductKind::Modules),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub kind: ProductKind,
    pub purchase_link: Option<String>,
    pub sort_order: i32,
}

/// Input for creating or replacing a product's editable fields.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub kind: ProductKind,
    pub purchase_link: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub sort_order: i32,
    pub image_url: Option<String>,
    pub show_order: bool,
}

#[derive(Debug, Clone)]
pub struct ModuleDraft {
    pub title: String,
    pub sort_order: i32,
    pub image_url: Option<String>,
    pub show_order: bool,
}

/// The payload of a content item. Each kind carries exactly the field it needs,
/// so a link without a url or a text item without a body cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBody {
    Pdf { url: String },
    Video { url: String },
    Link { url: String },
    App { url: String },
    Text { content: String },
}

impl ContentBody {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBody::Pdf { .. } => "pdf",
            ContentBody::Video { .. } => "video",
            ContentBody::Link { .. } => "link",
            ContentBody::App { .. } => "app",
            ContentBody::Text { .. } => "text",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ContentBody::Pdf { url }
            | ContentBody::Video { url }
            | ContentBody::Link { url }
            | ContentBody::App { url } => Some(url),
            ContentBody::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ContentBody::Text { content } => Some(content),
            _ => None,
        }
    }

    /// Builds a body from the flat storage columns. Returns `None` when the
    /// kind is unknown or its required column is missing or blank.
    pub fn from_parts(kind: &str, url: Option<String>, content: Option<String>) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match kind {
            "pdf" => present(url).map(|url| ContentBody::Pdf { url }),
            "video" => present(url).map(|url| ContentBody::Video { url }),
            "link" => present(url).map(|url| ContentBody::Link { url }),
            "app" => present(url).map(|url| ContentBody::App { url }),
            "text" => present(content).map(|content| ContentBody::Text { content }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleContent {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub body: ContentBody,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct ContentDraft {
    pub title: String,
    pub body: ContentBody,
    pub sort_order: i32,
}

/// What the client should do when a content item is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAction {
    /// Show inside the in-app viewer (pdf, video).
    Embed { url: String },
    /// Leave the app (link, app).
    OpenExternal { url: String },
    /// Render the body inline.
    RenderText { content: String },
}

/// A user's grant to a product.
#[derive(Debug, Clone)]
pub struct Entitlement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

//=========================================================================================
// Community
//=========================================================================================

/// Display override an admin may attach to a post. Ownership stays with the
/// real author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayIdentity {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl DisplayIdentity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CommunityPost {
    pub id: Uuid,
    /// The real author. Never replaced by the display override.
    pub authored_by: Uuid,
    pub displayed_as: DisplayIdentity,
    pub content: String,
    pub image_url: Option<String>,
    pub approved: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub authored_by: Uuid,
    pub displayed_as: DisplayIdentity,
    pub content: String,
    pub image_url: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Clone)]
pub struct CommunityComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub approved: bool,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    System,
    Manual,
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::System => "system",
            NotificationType::Manual => "manual",
            NotificationType::Comment => "comment",
        }
    }

    /// Unknown stored values are treated as system notifications.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "manual" => NotificationType::Manual,
            "comment" => NotificationType::Comment,
            _ => NotificationType::System,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Content of a notification before it is addressed to recipients.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub sender_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

//=========================================================================================
// Announcements
//=========================================================================================

/// A home-screen carousel slide. Inactive banners stay editable but are hidden
/// from members.
#[derive(Debug, Clone)]
pub struct Banner {
    pub id: Uuid,
    pub image_url: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub sort_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BannerDraft {
    pub image_url: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub sort_order: i32,
}

/// An admin-authored update shown on the members' feed page. Separate from
/// community posts: no moderation, likes or comments.
#[derive(Debug, Clone)]
pub struct FeedPost {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedPost {
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
}

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Debug, Clone)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Column metadata used to describe the store's schema.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}
