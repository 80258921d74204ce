//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membership_core::domain::{
    AppSetting, Banner, BannerDraft, ColumnInfo, CommunityComment, CommunityPost, ContentBody,
    ContentDraft, DisplayIdentity, Entitlement, FeedPost, Module, ModuleContent, ModuleDraft,
    NewComment, NewFeedPost, NewPost, Notification, NotificationDraft, NotificationType, Product,
    ProductDraft, ProductKind, Profile, ProfileUpdate, Role, User, UserCredentials,
};
use membership_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeSet;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps `RowNotFound` to `PortError::NotFound` naming the missing item.
fn fetch_err(what: &'static str, id: impl std::fmt::Display) -> impl FnOnce(sqlx::Error) -> PortError {
    let label = format!("{} {} not found", what, id);
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(label),
        _ => unexpected(e),
    }
}

/// A write against a missing parent row surfaces as a foreign key violation.
fn write_err(what: &'static str, id: impl std::fmt::Display) -> impl FnOnce(sqlx::Error) -> PortError {
    let label = format!("{} {} not found", what, id);
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return PortError::NotFound(label);
            }
        }
        unexpected(e)
    }
}

/// Named in the migration so the missing side of an entitlement can be told
/// apart.
const ENTITLEMENT_USER_FK: &str = "user_product_access_user_fk";

fn entitlement_err(user_id: Uuid, product_id: Uuid) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return if db.constraint() == Some(ENTITLEMENT_USER_FK) {
                    PortError::NotFound(format!("User {} not found", user_id))
                } else {
                    PortError::NotFound(format!("Product {} not found", product_id))
                };
            }
        }
        unexpected(e)
    }
}

fn expect_rows(affected: u64, what: &str, id: impl std::fmt::Display) -> PortResult<()> {
    if affected == 0 {
        Err(PortError::NotFound(format!("{} {} not found", what, id)))
    } else {
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "user_id, name, email, avatar_url, nickname, show_nickname, bio, phone, notify_comments";

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    nickname: Option<String>,
    show_nickname: bool,
    bio: Option<String>,
    phone: Option<String>,
    notify_comments: bool,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
            nickname: self.nickname,
            show_nickname: self.show_nickname,
            bio: self.bio,
            phone: self.phone,
            notify_comments: self.notify_comments,
        }
    }
}

#[derive(FromRow)]
struct EntitlementRecord {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    granted_at: DateTime<Utc>,
}
impl EntitlementRecord {
    fn to_domain(self) -> Entitlement {
        Entitlement {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            granted_at: self.granted_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, image_url, type AS kind, purchase_link, sort_order";

#[derive(FromRow)]
struct ProductRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    kind: String,
    purchase_link: Option<String>,
    sort_order: i32,
}
impl ProductRecord {
    fn to_domain(self) -> PortResult<Product> {
        let kind = ProductKind::parse(&self.kind).ok_or_else(|| {
            PortError::Unexpected(format!("product {} has unknown type '{}'", self.id, self.kind))
        })?;
        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            kind,
            purchase_link: self.purchase_link,
            sort_order: self.sort_order,
        })
    }
}

const MODULE_COLUMNS: &str = "id, product_id, title, sort_order, image_url, show_order";

#[derive(FromRow)]
struct ModuleRecord {
    id: Uuid,
    product_id: Uuid,
    title: String,
    sort_order: i32,
    image_url: Option<String>,
    show_order: bool,
}
impl ModuleRecord {
    fn to_domain(self) -> Module {
        Module {
            id: self.id,
            product_id: self.product_id,
            title: self.title,
            sort_order: self.sort_order,
            image_url: self.image_url,
            show_order: self.show_order,
        }
    }
}

const CONTENT_COLUMNS: &str = "id, module_id, type AS kind, title, url, content, sort_order";

#[derive(FromRow)]
struct ContentRecord {
    id: Uuid,
    module_id: Uuid,
    kind: String,
    title: String,
    url: Option<String>,
    content: Option<String>,
    sort_order: i32,
}
impl ContentRecord {
    fn to_domain(self) -> PortResult<ModuleContent> {
        let body = ContentBody::from_parts(&self.kind, self.url, self.content).ok_or_else(|| {
            PortError::Unexpected(format!("content {} has an invalid '{}' body", self.id, self.kind))
        })?;
        Ok(ModuleContent {
            id: self.id,
            module_id: self.module_id,
            title: self.title,
            body,
            sort_order: self.sort_order,
        })
    }
}

const POST_COLUMNS: &str = "id, user_id, content, image_url, approved, display_name, \
     display_avatar_url, likes_count, comments_count, created_at";

#[derive(FromRow)]
struct PostRecord {
    id: Uuid,
    user_id: Uuid,
    content: String,
    image_url: Option<String>,
    approved: bool,
    display_name: Option<String>,
    display_avatar_url: Option<String>,
    likes_count: i64,
    comments_count: i64,
    created_at: DateTime<Utc>,
}
impl PostRecord {
    fn to_domain(self) -> CommunityPost {
        CommunityPost {
            id: self.id,
            authored_by: self.user_id,
            displayed_as: DisplayIdentity {
                name: self.display_name,
                avatar_url: self.display_avatar_url,
            },
            content: self.content,
            image_url: self.image_url,
            approved: self.approved,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            created_at: self.created_at,
        }
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, approved, created_at";

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
    approved: bool,
    created_at: DateTime<Utc>,
}
impl CommentRecord {
    fn to_domain(self) -> CommunityComment {
        CommunityComment {
            id: self.id,
            post_id: self.post_id,
            user_id: self.user_id,
            content: self.content,
            approved: self.approved,
            created_at: self.created_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, sender_id, type AS kind, title, message, link, read, created_at";

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    sender_id: Option<Uuid>,
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            sender_id: self.sender_id,
            kind: NotificationType::parse(&self.kind),
            title: self.title,
            message: self.message,
            link: self.link,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SettingRecord {
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}
impl SettingRecord {
    fn to_domain(self) -> AppSetting {
        AppSetting {
            key: self.key,
            value: self.value,
            updated_at: self.updated_at,
        }
    }
}

const BANNER_COLUMNS: &str = "id, image_url, title, link, sort_order, active, created_at";

#[derive(FromRow)]
struct BannerRecord {
    id: Uuid,
    image_url: String,
    title: Option<String>,
    link: Option<String>,
    sort_order: i32,
    active: bool,
    created_at: DateTime<Utc>,
}
impl BannerRecord {
    fn to_domain(self) -> Banner {
        Banner {
            id: self.id,
            image_url: self.image_url,
            title: self.title,
            link: self.link,
            sort_order: self.sort_order,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

const FEED_POST_COLUMNS: &str = "id, user_id, content, image_url, created_at";

#[derive(FromRow)]
struct FeedPostRecord {
    id: Uuid,
    user_id: Option<Uuid>,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}
impl FeedPostRecord {
    fn to_domain(self) -> FeedPost {
        FeedPost {
            id: self.id,
            author_id: self.user_id,
            content: self.content,
            image_url: self.image_url,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ColumnRecord {
    table_name: String,
    column_name: String,
    data_type: String,
    is_nullable: String,
    column_default: Option<String>,
}
impl ColumnRecord {
    fn to_domain(self) -> ColumnInfo {
        ColumnInfo {
            table: self.table_name,
            column: self.column_name,
            data_type: self.data_type,
            nullable: self.is_nullable == "YES",
            default: self.column_default,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Auth Methods ---

    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, hashed_password) VALUES ($1, $2) RETURNING user_id",
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return PortError::Conflict(format!("email {} already registered", email));
                }
            }
            unexpected(e)
        })?;
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("User", email))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Profiles ---

    async fn create_profile(&self, user_id: Uuid, email: Option<&str>) -> PortResult<Profile> {
        sqlx::query(
            "INSERT INTO profiles (user_id, email) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        self.get_profile(user_id).await
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Profile", user_id))?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "UPDATE profiles SET \
                name = COALESCE($2, name), \
                avatar_url = COALESCE($3, avatar_url), \
                nickname = COALESCE($4, nickname), \
                show_nickname = COALESCE($5, show_nickname), \
                bio = COALESCE($6, bio), \
                phone = COALESCE($7, phone), \
                notify_comments = COALESCE($8, notify_comments) \
             WHERE user_id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(update.name)
        .bind(update.avatar_url)
        .bind(update.nickname)
        .bind(update.show_nickname)
        .bind(update.bio)
        .bind(update.phone)
        .bind(update.notify_comments)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Profile", user_id))?;
        Ok(record.to_domain())
    }

    async fn list_profiles(&self) -> PortResult<Vec<Profile>> {
        let records = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {} FROM profiles ORDER BY created_at DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Roles ---

    async fn has_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn add_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id, role) DO NOTHING",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err("User", user_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users_with_role(&self, role: Role) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM user_roles WHERE role = $1")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    // --- Entitlements ---

    async fn find_entitlement(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> PortResult<Option<Entitlement>> {
        let record = sqlx::query_as::<_, EntitlementRecord>(
            "SELECT id, user_id, product_id, granted_at FROM user_product_access \
             WHERE user_id = $1 AND product_id = $2 LIMIT 1",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn insert_entitlement(&self, user_id: Uuid, product_id: Uuid) -> PortResult<Entitlement> {
        let record = sqlx::query_as::<_, EntitlementRecord>(
            "INSERT INTO user_product_access (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING id, user_id, product_id, granted_at",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(entitlement_err(user_id, product_id))?;
        Ok(record.to_domain())
    }

    async fn delete_entitlement(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool> {
        let result =
            sqlx::query("DELETE FROM user_product_access WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_entitlements_for_product(&self, product_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM user_product_access WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn list_entitlements_for_user(&self, user_id: Uuid) -> PortResult<Vec<Entitlement>> {
        let records = sqlx::query_as::<_, EntitlementRecord>(
            "SELECT id, user_id, product_id, granted_at FROM user_product_access \
             WHERE user_id = $1 ORDER BY granted_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Products ---

    async fn list_products(&self) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products ORDER BY sort_order ASC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Product", product_id))?;
        record.to_domain()
    }

    async fn insert_product(&self, draft: ProductDraft) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "INSERT INTO products (name, description, image_url, type, purchase_link, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(draft.name)
        .bind(draft.description)
        .bind(draft.image_url)
        .bind(draft.kind.as_str())
        .bind(draft.purchase_link)
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_product(&self, product_id: Uuid, draft: ProductDraft) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "UPDATE products SET name = $2, description = $3, image_url = $4, type = $5, \
             purchase_link = $6, sort_order = $7 WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(draft.name)
        .bind(draft.description)
        .bind(draft.image_url)
        .bind(draft.kind.as_str())
        .bind(draft.purchase_link)
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Product", product_id))?;
        record.to_domain()
    }

    async fn set_product_sort_order(&self, product_id: Uuid, sort_order: i32) -> PortResult<()> {
        let result = sqlx::query("UPDATE products SET sort_order = $2 WHERE id = $1")
            .bind(product_id)
            .bind(sort_order)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Product", product_id)
    }

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Product", product_id)
    }

    // --- Modules ---

    async fn list_modules(&self, product_id: Uuid) -> PortResult<Vec<Module>> {
        let records = sqlx::query_as::<_, ModuleRecord>(&format!(
            "SELECT {} FROM modules WHERE product_id = $1 ORDER BY sort_order ASC",
            MODULE_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module> {
        let record = sqlx::query_as::<_, ModuleRecord>(&format!(
            "SELECT {} FROM modules WHERE id = $1",
            MODULE_COLUMNS
        ))
        .bind(module_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Module", module_id))?;
        Ok(record.to_domain())
    }

    async fn insert_module(&self, product_id: Uuid, draft: ModuleDraft) -> PortResult<Module> {
        let record = sqlx::query_as::<_, ModuleRecord>(&format!(
            "INSERT INTO modules (product_id, title, sort_order, image_url, show_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MODULE_COLUMNS
        ))
        .bind(product_id)
        .bind(draft.title)
        .bind(draft.sort_order)
        .bind(draft.image_url)
        .bind(draft.show_order)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err("Product", product_id))?;
        Ok(record.to_domain())
    }

    async fn update_module(&self, module_id: Uuid, draft: ModuleDraft) -> PortResult<Module> {
        let record = sqlx::query_as::<_, ModuleRecord>(&format!(
            "UPDATE modules SET title = $2, sort_order = $3, image_url = $4, show_order = $5 \
             WHERE id = $1 RETURNING {}",
            MODULE_COLUMNS
        ))
        .bind(module_id)
        .bind(draft.title)
        .bind(draft.sort_order)
        .bind(draft.image_url)
        .bind(draft.show_order)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Module", module_id))?;
        Ok(record.to_domain())
    }

    async fn delete_module(&self, module_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Module", module_id)
    }

    // --- Module Contents ---

    async fn list_contents(&self, module_id: Uuid) -> PortResult<Vec<ModuleContent>> {
        let records = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM module_contents WHERE module_id = $1 ORDER BY sort_order ASC",
            CONTENT_COLUMNS
        ))
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_content(&self, content_id: Uuid) -> PortResult<ModuleContent> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM module_contents WHERE id = $1",
            CONTENT_COLUMNS
        ))
        .bind(content_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Content", content_id))?;
        record.to_domain()
    }

    async fn insert_content(&self, module_id: Uuid, draft: ContentDraft) -> PortResult<ModuleContent> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "INSERT INTO module_contents (module_id, type, title, url, content, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(module_id)
        .bind(draft.body.kind())
        .bind(draft.title)
        .bind(draft.body.url())
        .bind(draft.body.text())
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err("Module", module_id))?;
        record.to_domain()
    }

    async fn update_content(&self, content_id: Uuid, draft: ContentDraft) -> PortResult<ModuleContent> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "UPDATE module_contents SET type = $2, title = $3, url = $4, content = $5, \
             sort_order = $6 WHERE id = $1 RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(content_id)
        .bind(draft.body.kind())
        .bind(draft.title)
        .bind(draft.body.url())
        .bind(draft.body.text())
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Content", content_id))?;
        record.to_domain()
    }

    async fn delete_content(&self, content_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM module_contents WHERE id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Content", content_id)
    }

    async fn delete_contents_for_module(&self, module_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM module_contents WHERE module_id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    // --- Community Posts ---

    async fn list_posts(&self) -> PortResult<Vec<CommunityPost>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {} FROM community_posts ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_pending_posts(&self) -> PortResult<Vec<CommunityPost>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {} FROM community_posts WHERE approved = false ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_post(&self, post_id: Uuid) -> PortResult<CommunityPost> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {} FROM community_posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Post", post_id))?;
        Ok(record.to_domain())
    }

    async fn insert_post(&self, post: NewPost) -> PortResult<CommunityPost> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "INSERT INTO community_posts \
                (user_id, content, image_url, approved, display_name, display_avatar_url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            POST_COLUMNS
        ))
        .bind(post.authored_by)
        .bind(post.content)
        .bind(post.image_url)
        .bind(post.approved)
        .bind(post.displayed_as.name)
        .bind(post.displayed_as.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn set_post_approved(&self, post_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE community_posts SET approved = true WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Post", post_id)
    }

    async fn approve_all_posts(&self) -> PortResult<u64> {
        let result = sqlx::query("UPDATE community_posts SET approved = true WHERE approved = false")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_post(&self, post_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM community_posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Post", post_id)
    }

    async fn set_comments_count(&self, post_id: Uuid, count: i64) -> PortResult<()> {
        let result = sqlx::query("UPDATE community_posts SET comments_count = $2 WHERE id = $1")
            .bind(post_id)
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Post", post_id)
    }

    async fn set_likes_count(&self, post_id: Uuid, count: i64) -> PortResult<()> {
        let result = sqlx::query("UPDATE community_posts SET likes_count = $2 WHERE id = $1")
            .bind(post_id)
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Post", post_id)
    }

    async fn adjust_likes_count(&self, post_id: Uuid, delta: i64) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE community_posts SET likes_count = GREATEST(likes_count + $2, 0) \
             WHERE id = $1 RETURNING likes_count",
        )
        .bind(post_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Post {} not found", post_id)))
    }

    // --- Community Comments ---

    async fn list_comments(&self, post_id: Uuid) -> PortResult<Vec<CommunityComment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM community_post_comments WHERE post_id = $1 ORDER BY created_at ASC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_pending_comments(&self) -> PortResult<Vec<CommunityComment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM community_post_comments WHERE approved = false ORDER BY created_at DESC",
            COMMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_comment(&self, comment_id: Uuid) -> PortResult<CommunityComment> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM community_post_comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Comment", comment_id))?;
        Ok(record.to_domain())
    }

    async fn insert_comment(&self, comment: NewComment) -> PortResult<CommunityComment> {
        let post_id = comment.post_id;
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "INSERT INTO community_post_comments (post_id, user_id, content, approved) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.content)
        .bind(comment.approved)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err("Post", post_id))?;
        Ok(record.to_domain())
    }

    async fn set_comment_approved(&self, comment_id: Uuid) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE community_post_comments SET approved = true WHERE id = $1")
                .bind(comment_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Comment", comment_id)
    }

    async fn approve_all_comments(&self) -> PortResult<Vec<Uuid>> {
        let post_ids = sqlx::query_scalar::<_, Uuid>(
            "UPDATE community_post_comments SET approved = true WHERE approved = false RETURNING post_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(post_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM community_post_comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Comment", comment_id)
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM community_post_comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_approved_comments(&self, post_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM community_post_comments WHERE post_id = $1 AND approved = true",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    // --- Community Likes ---

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM community_post_likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO community_post_likes (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (post_id, user_id) DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(write_err("Post", post_id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result =
            sqlx::query("DELETE FROM community_post_likes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_likes_for_post(&self, post_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM community_post_likes WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_likes(&self, post_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM community_post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn liked_post_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT post_id FROM community_post_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    // --- Notifications ---

    async fn insert_notification(
        &self,
        user_id: Uuid,
        draft: NotificationDraft,
    ) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "INSERT INTO notifications (user_id, sender_id, type, title, message, link) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(draft.sender_id)
        .bind(draft.kind.as_str())
        .bind(draft.title)
        .bind(draft.message)
        .bind(draft.link)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn insert_notification_for_all(&self, draft: NotificationDraft) -> PortResult<u64> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, sender_id, type, title, message, link) \
             SELECT user_id, $1, $2, $3, $4, $5 FROM profiles",
        )
        .bind(draft.sender_id)
        .bind(draft.kind.as_str())
        .bind(draft.title)
        .bind(draft.message)
        .bind(draft.link)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Notification", notification_id))?;
        Ok(record.to_domain())
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE notifications SET read = true WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Notification", notification_id)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND read = false")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn list_notifications_by_type(
        &self,
        kind: NotificationType,
        limit: i64,
    ) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(&format!(
            "SELECT {} FROM notifications WHERE type = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(kind.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Banners ---

    async fn list_banners(&self) -> PortResult<Vec<Banner>> {
        let records = sqlx::query_as::<_, BannerRecord>(&format!(
            "SELECT {} FROM banners ORDER BY sort_order ASC, created_at ASC",
            BANNER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_banner(&self, draft: BannerDraft) -> PortResult<Banner> {
        let record = sqlx::query_as::<_, BannerRecord>(&format!(
            "INSERT INTO banners (image_url, title, link, sort_order) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            BANNER_COLUMNS
        ))
        .bind(draft.image_url)
        .bind(draft.title)
        .bind(draft.link)
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_banner(&self, banner_id: Uuid, draft: BannerDraft) -> PortResult<Banner> {
        let record = sqlx::query_as::<_, BannerRecord>(&format!(
            "UPDATE banners SET image_url = $2, title = $3, link = $4, sort_order = $5 \
             WHERE id = $1 RETURNING {}",
            BANNER_COLUMNS
        ))
        .bind(banner_id)
        .bind(draft.image_url)
        .bind(draft.title)
        .bind(draft.link)
        .bind(draft.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Banner", banner_id))?;
        Ok(record.to_domain())
    }

    async fn set_banner_active(&self, banner_id: Uuid, active: bool) -> PortResult<Banner> {
        let record = sqlx::query_as::<_, BannerRecord>(&format!(
            "UPDATE banners SET active = $2 WHERE id = $1 RETURNING {}",
            BANNER_COLUMNS
        ))
        .bind(banner_id)
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .map_err(fetch_err("Banner", banner_id))?;
        Ok(record.to_domain())
    }

    async fn delete_banner(&self, banner_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(banner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Banner", banner_id)
    }

    // --- Feed Posts ---

    async fn list_feed_posts(&self, limit: i64) -> PortResult<Vec<FeedPost>> {
        let records = sqlx::query_as::<_, FeedPostRecord>(&format!(
            "SELECT {} FROM feed_posts ORDER BY created_at DESC LIMIT $1",
            FEED_POST_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_feed_post(&self, post: NewFeedPost) -> PortResult<FeedPost> {
        let record = sqlx::query_as::<_, FeedPostRecord>(&format!(
            "INSERT INTO feed_posts (user_id, content, image_url) VALUES ($1, $2, $3) RETURNING {}",
            FEED_POST_COLUMNS
        ))
        .bind(post.author_id)
        .bind(post.content)
        .bind(post.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_feed_post(&self, feed_post_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM feed_posts WHERE id = $1")
            .bind(feed_post_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_rows(result.rows_affected(), "Feed post", feed_post_id)
    }

    // --- App Settings ---

    async fn get_setting(&self, key: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn list_settings(&self) -> PortResult<Vec<AppSetting>> {
        let records = sqlx::query_as::<_, SettingRecord>(
            "SELECT key, value, updated_at FROM app_settings ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> PortResult<AppSetting> {
        let record = sqlx::query_as::<_, SettingRecord>(
            "INSERT INTO app_settings (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    // --- Schema ---

    async fn describe_schema(&self) -> PortResult<Vec<ColumnInfo>> {
        let records = sqlx::query_as::<_, ColumnRecord>(
            "SELECT table_name::text AS table_name, column_name::text AS column_name, \
                    data_type::text AS data_type, is_nullable::text AS is_nullable, \
                    column_default::text AS column_default \
             FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name NOT LIKE '\\_sqlx%' \
             ORDER BY table_name, ordinal_position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
