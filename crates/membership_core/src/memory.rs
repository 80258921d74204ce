//! crates/membership_core/src/memory.rs
//!
//! An in-process implementation of `DatabaseService`. Backs the test suites and
//! lets the API run without PostgreSQL during local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    AppSetting, Banner, BannerDraft, ColumnInfo, CommunityComment, CommunityPost, ContentDraft,
    Entitlement, FeedPost, Module, ModuleContent, ModuleDraft, NewComment, NewFeedPost, NewPost,
    Notification, NotificationDraft, NotificationType, Product, ProductDraft, Profile,
    ProfileUpdate, Role, User, UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    auth_sessions: Vec<(String, Uuid, DateTime<Utc>)>,
    profiles: Vec<Profile>,
    roles: Vec<(Uuid, Role)>,
    entitlements: Vec<Entitlement>,
    products: Vec<Product>,
    modules: Vec<Module>,
    contents: Vec<ModuleContent>,
    posts: Vec<CommunityPost>,
    comments: Vec<CommunityComment>,
    likes: Vec<(Uuid, Uuid)>,
    notifications: Vec<Notification>,
    settings: Vec<AppSetting>,
    banners: Vec<Banner>,
    feed_posts: Vec<FeedPost>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `PortError::Unexpected`, simulating a
    /// backend outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

/// Rows keyed by a user require that user's profile, matching the foreign keys
/// on the Postgres side.
fn require_user(t: &Tables, user_id: Uuid) -> PortResult<()> {
    if t.profiles.iter().any(|p| p.user_id == user_id) {
        Ok(())
    } else {
        Err(not_found("User", user_id))
    }
}

fn apply_update(profile: &mut Profile, update: ProfileUpdate) {
    if let Some(v) = update.name {
        profile.name = Some(v);
    }
    if let Some(v) = update.avatar_url {
        profile.avatar_url = Some(v);
    }
    if let Some(v) = update.nickname {
        profile.nickname = Some(v);
    }
    if let Some(v) = update.show_nickname {
        profile.show_nickname = v;
    }
    if let Some(v) = update.bio {
        profile.bio = Some(v);
    }
    if let Some(v) = update.phone {
        profile.phone = Some(v);
    }
    if let Some(v) = update.notify_comments {
        profile.notify_comments = v;
    }
}

/// Newest first; rows with equal timestamps keep reverse insertion order.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

fn build_notification(user_id: Uuid, draft: &NotificationDraft, now: DateTime<Utc>) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        sender_id: draft.sender_id,
        kind: draft.kind,
        title: draft.title.clone(),
        message: draft.message.clone(),
        link: draft.link.clone(),
        read: false,
        created_at: now,
    }
}

const SCHEMA: &[(&str, &[(&str, &str, bool)])] = &[
    ("products", &[("id", "uuid", false), ("name", "text", false), ("description", "text", true), ("image_url", "text", true), ("type", "text", false), ("purchase_link", "text", true), ("sort_order", "integer", false)]),
    ("modules", &[("id", "uuid", false), ("product_id", "uuid", false), ("title", "text", false), ("sort_order", "integer", false), ("image_url", "text", true), ("show_order", "boolean", false)]),
    ("module_contents", &[("id", "uuid", false), ("module_id", "uuid", false), ("type", "text", false), ("title", "text", false), ("url", "text", true), ("content", "text", true), ("sort_order", "integer", false)]),
    ("user_product_access", &[("id", "uuid", false), ("user_id", "uuid", false), ("product_id", "uuid", false), ("granted_at", "timestamp with time zone", false)]),
    ("user_roles", &[("id", "uuid", false), ("user_id", "uuid", false), ("role", "text", false)]),
    ("community_posts", &[("id", "uuid", false), ("user_id", "uuid", false), ("content", "text", false), ("image_url", "text", true), ("approved", "boolean", false), ("display_name", "text", true), ("display_avatar_url", "text", true), ("likes_count", "bigint", false), ("comments_count", "bigint", false), ("created_at", "timestamp with time zone", false)]),
    ("community_post_comments", &[("id", "uuid", false), ("post_id", "uuid", false), ("user_id", "uuid", false), ("content", "text", false), ("approved", "boolean", false), ("created_at", "timestamp with time zone", false)]),
    ("community_post_likes", &[("id", "uuid", false), ("post_id", "uuid", false), ("user_id", "uuid", false), ("created_at", "timestamp with time zone", false)]),
    ("notifications", &[("id", "uuid", false), ("user_id", "uuid", false), ("sender_id", "uuid", true), ("type", "text", false), ("title", "text", false), ("message", "text", false), ("link", "text", true), ("read", "boolean", false), ("created_at", "timestamp with time zone", false)]),
    ("app_settings", &[("key", "text", false), ("value", "text", false), ("updated_at", "timestamp with time zone", false)]),
    ("banners", &[("id", "uuid", false), ("image_url", "text", false), ("title", "text", true), ("link", "text", true), ("sort_order", "integer", false), ("active", "boolean", false), ("created_at", "timestamp with time zone", false)]),
    ("feed_posts", &[("id", "uuid", false), ("user_id", "uuid", true), ("content", "text", false), ("image_url", "text", true), ("created_at", "timestamp with time zone", false)]),
    ("profiles", &[("user_id", "uuid", false), ("name", "text", true), ("email", "text", true), ("avatar_url", "text", true), ("nickname", "text", true), ("show_nickname", "boolean", false), ("bio", "text", true), ("phone", "text", true), ("notify_comments", "boolean", false)]),
];

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        self.check()?;
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(PortError::Conflict(format!("email {} already registered", email)));
        }
        let creds = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let user = User {
            user_id: creds.user_id,
            email: Some(creds.email.clone()),
        };
        t.users.push(creds);
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.check()?;
        let t = self.tables.read().await;
        t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| not_found("User", email))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        t.auth_sessions.push((session_id.to_string(), user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.check()?;
        let t = self.tables.read().await;
        t.auth_sessions
            .iter()
            .find(|(id, _, expires_at)| id == session_id && *expires_at > Utc::now())
            .map(|(_, user_id, _)| *user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        t.auth_sessions.retain(|(id, _, _)| id != session_id);
        Ok(())
    }

    async fn create_profile(&self, user_id: Uuid, email: Option<&str>) -> PortResult<Profile> {
        self.check()?;
        let mut t = self.tables.write().await;
        if let Some(existing) = t.profiles.iter().find(|p| p.user_id == user_id) {
            return Ok(existing.clone());
        }
        let profile = Profile {
            user_id,
            email: email.map(str::to_string),
            notify_comments: true,
            ..Profile::default()
        };
        t.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        self.check()?;
        let t = self.tables.read().await;
        t.profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found("Profile", user_id))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        self.check()?;
        let mut t = self.tables.write().await;
        let profile = t
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| not_found("Profile", user_id))?;
        apply_update(profile, update);
        Ok(profile.clone())
    }

    async fn list_profiles(&self) -> PortResult<Vec<Profile>> {
        self.check()?;
        Ok(self.tables.read().await.profiles.clone())
    }

    async fn has_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.roles.contains(&(user_id, role)))
    }

    async fn add_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        require_user(&t, user_id)?;
        if t.roles.contains(&(user_id, role)) {
            return Ok(false);
        }
        t.roles.push((user_id, role));
        Ok(true)
    }

    async fn remove_role(&self, user_id: Uuid, role: Role) -> PortResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.roles.len();
        t.roles.retain(|r| *r != (user_id, role));
        Ok(t.roles.len() != before)
    }

    async fn list_users_with_role(&self, role: Role) -> PortResult<Vec<Uuid>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.roles.iter().filter(|(_, r)| *r == role).map(|(u, _)| *u).collect())
    }

    async fn find_entitlement(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> PortResult<Option<Entitlement>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.entitlements
            .iter()
            .find(|e| e.user_id == user_id && e.product_id == product_id)
            .cloned())
    }

    async fn insert_entitlement(&self, user_id: Uuid, product_id: Uuid) -> PortResult<Entitlement> {
        self.check()?;
        let mut t = self.tables.write().await;
        require_user(&t, user_id)?;
        if !t.products.iter().any(|p| p.id == product_id) {
            return Err(not_found("Product", product_id));
        }
        let entitlement = Entitlement {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            granted_at: Utc::now(),
        };
        t.entitlements.push(entitlement.clone());
        Ok(entitlement)
    }

    async fn delete_entitlement(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.entitlements.len();
        t.entitlements
            .retain(|e| !(e.user_id == user_id && e.product_id == product_id));
        Ok(t.entitlements.len() != before)
    }

    async fn delete_entitlements_for_product(&self, product_id: Uuid) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.entitlements.len();
        t.entitlements.retain(|e| e.product_id != product_id);
        Ok((before - t.entitlements.len()) as u64)
    }

    async fn list_entitlements_for_user(&self, user_id: Uuid) -> PortResult<Vec<Entitlement>> {
        self.check()?;
        let t = self.tables.read().await;
        let mine: Vec<Entitlement> = t
            .entitlements
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&mine, |e| e.granted_at))
    }

    async fn list_products(&self) -> PortResult<Vec<Product>> {
        self.check()?;
        let mut products = self.tables.read().await.products.clone();
        products.sort_by_key(|p| p.sort_order);
        Ok(products)
    }

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        self.check()?;
        let t = self.tables.read().await;
        t.products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| not_found("Product", product_id))
    }

    async fn insert_product(&self, draft: ProductDraft) -> PortResult<Product> {
        self.check()?;
        let product = Product {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            image_url: draft.image_url,
            kind: draft.kind,
            purchase_link: draft.purchase_link,
            sort_order: draft.sort_order,
        };
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, product_id: Uuid, draft: ProductDraft) -> PortResult<Product> {
        self.check()?;
        let mut t = self.tables.write().await;
        let product = t
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| not_found("Product", product_id))?;
        product.name = draft.name;
        product.description = draft.description;
        product.image_url = draft.image_url;
        product.kind = draft.kind;
        product.purchase_link = draft.purchase_link;
        product.sort_order = draft.sort_order;
        Ok(product.clone())
    }

    async fn set_product_sort_order(&self, product_id: Uuid, sort_order: i32) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let product = t
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| not_found("Product", product_id))?;
        product.sort_order = sort_order;
        Ok(())
    }

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.products.len();
        t.products.retain(|p| p.id != product_id);
        if t.products.len() == before {
            return Err(not_found("Product", product_id));
        }
        Ok(())
    }

    async fn list_modules(&self, product_id: Uuid) -> PortResult<Vec<Module>> {
        self.check()?;
        let t = self.tables.read().await;
        let mut modules: Vec<Module> = t
            .modules
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| m.sort_order);
        Ok(modules)
    }

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module> {
        self.check()?;
        let t = self.tables.read().await;
        t.modules
            .iter()
            .find(|m| m.id == module_id)
            .cloned()
            .ok_or_else(|| not_found("Module", module_id))
    }

    async fn insert_module(&self, product_id: Uuid, draft: ModuleDraft) -> PortResult<Module> {
        self.check()?;
        let mut t = self.tables.write().await;
        if !t.products.iter().any(|p| p.id == product_id) {
            return Err(not_found("Product", product_id));
        }
        let module = Module {
            id: Uuid::new_v4(),
            product_id,
            title: draft.title,
            sort_order: draft.sort_order,
            image_url: draft.image_url,
            show_order: draft.show_order,
        };
        t.modules.push(module.clone());
        Ok(module)
    }

    async fn update_module(&self, module_id: Uuid, draft: ModuleDraft) -> PortResult<Module> {
        self.check()?;
        let mut t = self.tables.write().await;
        let module = t
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .ok_or_else(|| not_found("Module", module_id))?;
        module.title = draft.title;
        module.sort_order = draft.sort_order;
        module.image_url = draft.image_url;
        module.show_order = draft.show_order;
        Ok(module.clone())
    }

    async fn delete_module(&self, module_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.modules.len();
        t.modules.retain(|m| m.id != module_id);
        if t.modules.len() == before {
            return Err(not_found("Module", module_id));
        }
        Ok(())
    }

    async fn list_contents(&self, module_id: Uuid) -> PortResult<Vec<ModuleContent>> {
        self.check()?;
        let t = self.tables.read().await;
        let mut contents: Vec<ModuleContent> = t
            .contents
            .iter()
            .filter(|c| c.module_id == module_id)
            .cloned()
            .collect();
        contents.sort_by_key(|c| c.sort_order);
        Ok(contents)
    }

    async fn get_content(&self, content_id: Uuid) -> PortResult<ModuleContent> {
        self.check()?;
        let t = self.tables.read().await;
        t.contents
            .iter()
            .find(|c| c.id == content_id)
            .cloned()
            .ok_or_else(|| not_found("Content", content_id))
    }

    async fn insert_content(&self, module_id: Uuid, draft: ContentDraft) -> PortResult<ModuleContent> {
        self.check()?;
        let mut t = self.tables.write().await;
        if !t.modules.iter().any(|m| m.id == module_id) {
            return Err(not_found("Module", module_id));
        }
        let content = ModuleContent {
            id: Uuid::new_v4(),
            module_id,
            title: draft.title,
            body: draft.body,
            sort_order: draft.sort_order,
        };
        t.contents.push(content.clone());
        Ok(content)
    }

    async fn update_content(&self, content_id: Uuid, draft: ContentDraft) -> PortResult<ModuleContent> {
        self.check()?;
        let mut t = self.tables.write().await;
        let content = t
            .contents
            .iter_mut()
            .find(|c| c.id == content_id)
            .ok_or_else(|| not_found("Content", content_id))?;
        content.title = draft.title;
        content.body = draft.body;
        content.sort_order = draft.sort_order;
        Ok(content.clone())
    }

    async fn delete_content(&self, content_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.contents.len();
        t.contents.retain(|c| c.id != content_id);
        if t.contents.len() == before {
            return Err(not_found("Content", content_id));
        }
        Ok(())
    }

    async fn delete_contents_for_module(&self, module_id: Uuid) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.contents.len();
        t.contents.retain(|c| c.module_id != module_id);
        Ok((before - t.contents.len()) as u64)
    }

    async fn list_posts(&self) -> PortResult<Vec<CommunityPost>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(newest_first(&t.posts, |p| p.created_at))
    }

    async fn list_pending_posts(&self) -> PortResult<Vec<CommunityPost>> {
        self.check()?;
        let t = self.tables.read().await;
        let pending: Vec<CommunityPost> = t.posts.iter().filter(|p| !p.approved).cloned().collect();
        Ok(newest_first(&pending, |p| p.created_at))
    }

    async fn get_post(&self, post_id: Uuid) -> PortResult<CommunityPost> {
        self.check()?;
        let t = self.tables.read().await;
        t.posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| not_found("Post", post_id))
    }

    async fn insert_post(&self, post: NewPost) -> PortResult<CommunityPost> {
        self.check()?;
        let post = CommunityPost {
            id: Uuid::new_v4(),
            authored_by: post.authored_by,
            displayed_as: post.displayed_as,
            content: post.content,
            image_url: post.image_url,
            approved: post.approved,
            likes_count: 0,
            comments_count: 0,
            created_at: Utc::now(),
        };
        self.tables.write().await.posts.push(post.clone());
        Ok(post)
    }

    async fn set_post_approved(&self, post_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| not_found("Post", post_id))?;
        post.approved = true;
        Ok(())
    }

    async fn approve_all_posts(&self) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let mut changed = 0;
        for post in t.posts.iter_mut().filter(|p| !p.approved) {
            post.approved = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_post(&self, post_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != post_id);
        if t.posts.len() == before {
            return Err(not_found("Post", post_id));
        }
        Ok(())
    }

    async fn set_comments_count(&self, post_id: Uuid, count: i64) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| not_found("Post", post_id))?;
        post.comments_count = count;
        Ok(())
    }

    async fn set_likes_count(&self, post_id: Uuid, count: i64) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| not_found("Post", post_id))?;
        post.likes_count = count;
        Ok(())
    }

    async fn adjust_likes_count(&self, post_id: Uuid, delta: i64) -> PortResult<i64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| not_found("Post", post_id))?;
        post.likes_count = (post.likes_count + delta).max(0);
        Ok(post.likes_count)
    }

    async fn list_comments(&self, post_id: Uuid) -> PortResult<Vec<CommunityComment>> {
        self.check()?;
        let t = self.tables.read().await;
        let mut comments: Vec<CommunityComment> = t
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn list_pending_comments(&self) -> PortResult<Vec<CommunityComment>> {
        self.check()?;
        let t = self.tables.read().await;
        let pending: Vec<CommunityComment> =
            t.comments.iter().filter(|c| !c.approved).cloned().collect();
        Ok(newest_first(&pending, |c| c.created_at))
    }

    async fn get_comment(&self, comment_id: Uuid) -> PortResult<CommunityComment> {
        self.check()?;
        let t = self.tables.read().await;
        t.comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned()
            .ok_or_else(|| not_found("Comment", comment_id))
    }

    async fn insert_comment(&self, comment: NewComment) -> PortResult<CommunityComment> {
        self.check()?;
        let mut t = self.tables.write().await;
        if !t.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(not_found("Post", comment.post_id));
        }
        let comment = CommunityComment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            approved: comment.approved,
            created_at: Utc::now(),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn set_comment_approved(&self, comment_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let comment = t
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| not_found("Comment", comment_id))?;
        comment.approved = true;
        Ok(())
    }

    async fn approve_all_comments(&self) -> PortResult<Vec<Uuid>> {
        self.check()?;
        let mut t = self.tables.write().await;
        let mut touched = BTreeSet::new();
        for comment in t.comments.iter_mut().filter(|c| !c.approved) {
            comment.approved = true;
            touched.insert(comment.post_id);
        }
        Ok(touched.into_iter().collect())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.comments.len();
        t.comments.retain(|c| c.id != comment_id);
        if t.comments.len() == before {
            return Err(not_found("Comment", comment_id));
        }
        Ok(())
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.comments.len();
        t.comments.retain(|c| c.post_id != post_id);
        Ok((before - t.comments.len()) as u64)
    }

    async fn count_approved_comments(&self, post_id: Uuid) -> PortResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.comments
            .iter()
            .filter(|c| c.post_id == post_id && c.approved)
            .count() as i64)
    }

    async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.check()?;
        Ok(self.tables.read().await.likes.contains(&(post_id, user_id)))
    }

    async fn insert_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(not_found("Post", post_id));
        }
        if t.likes.contains(&(post_id, user_id)) {
            return Ok(false);
        }
        t.likes.push((post_id, user_id));
        Ok(true)
    }

    async fn delete_like(&self, post_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.likes.len();
        t.likes.retain(|l| *l != (post_id, user_id));
        Ok(t.likes.len() != before)
    }

    async fn delete_likes_for_post(&self, post_id: Uuid) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.likes.len();
        t.likes.retain(|(p, _)| *p != post_id);
        Ok((before - t.likes.len()) as u64)
    }

    async fn count_likes(&self, post_id: Uuid) -> PortResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.likes.iter().filter(|(p, _)| *p == post_id).count() as i64)
    }

    async fn liked_post_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.likes.iter().filter(|(_, u)| *u == user_id).map(|(p, _)| *p).collect())
    }

    async fn insert_notification(
        &self,
        user_id: Uuid,
        draft: NotificationDraft,
    ) -> PortResult<Notification> {
        self.check()?;
        let mut t = self.tables.write().await;
        require_user(&t, user_id)?;
        let notification = build_notification(user_id, &draft, Utc::now());
        t.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn insert_notification_for_all(&self, draft: NotificationDraft) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let batch: Vec<Notification> = t
            .profiles
            .iter()
            .map(|p| build_notification(p.user_id, &draft, now))
            .collect();
        let written = batch.len() as u64;
        t.notifications.extend(batch);
        Ok(written)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Notification>> {
        self.check()?;
        let t = self.tables.read().await;
        let mine: Vec<Notification> = t
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        let mut out = newest_first(&mine, |n| n.created_at);
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn get_notification(&self, notification_id: Uuid) -> PortResult<Notification> {
        self.check()?;
        let t = self.tables.read().await;
        t.notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
            .ok_or_else(|| not_found("Notification", notification_id))
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let notification = t
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| not_found("Notification", notification_id))?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        self.check()?;
        let mut t = self.tables.write().await;
        let mut changed = 0;
        for n in t
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<i64> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn list_notifications_by_type(
        &self,
        kind: NotificationType,
        limit: i64,
    ) -> PortResult<Vec<Notification>> {
        self.check()?;
        let t = self.tables.read().await;
        let matching: Vec<Notification> = t
            .notifications
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect();
        let mut out = newest_first(&matching, |n| n.created_at);
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn get_setting(&self, key: &str) -> PortResult<Option<String>> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.settings.iter().find(|s| s.key == key).map(|s| s.value.clone()))
    }

    async fn list_settings(&self) -> PortResult<Vec<AppSetting>> {
        self.check()?;
        let mut settings = self.tables.read().await.settings.clone();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(settings)
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> PortResult<AppSetting> {
        self.check()?;
        let mut t = self.tables.write().await;
        let now = Utc::now();
        if let Some(existing) = t.settings.iter_mut().find(|s| s.key == key) {
            existing.value = value.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let setting = AppSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        };
        t.settings.push(setting.clone());
        Ok(setting)
    }

    async fn list_banners(&self) -> PortResult<Vec<Banner>> {
        self.check()?;
        let mut banners = self.tables.read().await.banners.clone();
        banners.sort_by_key(|b| b.sort_order);
        Ok(banners)
    }

    async fn insert_banner(&self, draft: BannerDraft) -> PortResult<Banner> {
        self.check()?;
        let banner = Banner {
            id: Uuid::new_v4(),
            image_url: draft.image_url,
            title: draft.title,
            link: draft.link,
            sort_order: draft.sort_order,
            active: true,
            created_at: Utc::now(),
        };
        self.tables.write().await.banners.push(banner.clone());
        Ok(banner)
    }

    async fn update_banner(&self, banner_id: Uuid, draft: BannerDraft) -> PortResult<Banner> {
        self.check()?;
        let mut t = self.tables.write().await;
        let banner = t
            .banners
            .iter_mut()
            .find(|b| b.id == banner_id)
            .ok_or_else(|| not_found("Banner", banner_id))?;
        banner.image_url = draft.image_url;
        banner.title = draft.title;
        banner.link = draft.link;
        banner.sort_order = draft.sort_order;
        Ok(banner.clone())
    }

    async fn set_banner_active(&self, banner_id: Uuid, active: bool) -> PortResult<Banner> {
        self.check()?;
        let mut t = self.tables.write().await;
        let banner = t
            .banners
            .iter_mut()
            .find(|b| b.id == banner_id)
            .ok_or_else(|| not_found("Banner", banner_id))?;
        banner.active = active;
        Ok(banner.clone())
    }

    async fn delete_banner(&self, banner_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.banners.len();
        t.banners.retain(|b| b.id != banner_id);
        if t.banners.len() == before {
            return Err(not_found("Banner", banner_id));
        }
        Ok(())
    }

    async fn list_feed_posts(&self, limit: i64) -> PortResult<Vec<FeedPost>> {
        self.check()?;
        let t = self.tables.read().await;
        let mut out = newest_first(&t.feed_posts, |p| p.created_at);
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn insert_feed_post(&self, post: NewFeedPost) -> PortResult<FeedPost> {
        self.check()?;
        let feed_post = FeedPost {
            id: Uuid::new_v4(),
            author_id: Some(post.author_id),
            content: post.content,
            image_url: post.image_url,
            created_at: Utc::now(),
        };
        self.tables.write().await.feed_posts.push(feed_post.clone());
        Ok(feed_post)
    }

    async fn delete_feed_post(&self, feed_post_id: Uuid) -> PortResult<()> {
        self.check()?;
        let mut t = self.tables.write().await;
        let before = t.feed_posts.len();
        t.feed_posts.retain(|p| p.id != feed_post_id);
        if t.feed_posts.len() == before {
            return Err(not_found("Feed post", feed_post_id));
        }
        Ok(())
    }

    async fn describe_schema(&self) -> PortResult<Vec<ColumnInfo>> {
        self.check()?;
        Ok(SCHEMA
            .iter()
            .flat_map(|(table, columns)| {
                columns.iter().map(move |(column, data_type, nullable)| ColumnInfo {
                    table: table.to_string(),
                    column: column.to_string(),
                    data_type: data_type.to_string(),
                    nullable: *nullable,
                    default: None,
                })
            })
            .collect())
    }
}
