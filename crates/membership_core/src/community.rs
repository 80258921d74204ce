//! crates/membership_core/src/community.rs
//!
//! The community feed and its moderation workflow.
//!
//! Posts and comments start either approved or pending depending on who wrote
//! them and on the approval policy at creation time. Pending items are visible
//! to their author and to admins only. `likes_count` and `comments_count` are
//! denormalised onto the post; every path that changes the underlying rows
//! updates them afterwards as a separate store call, so a failure in between
//! can leave them stale until the next approval pass or reconciliation.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    CommunityComment, CommunityPost, DisplayIdentity, NewComment, NewPost, NotificationDraft,
    NotificationType, Profile,
};
use crate::error::{ServiceError, ServiceResult};
use crate::notifications::NotificationService;
use crate::ports::{DatabaseService, PortError};
use crate::retry::{read_with_retry, ReadRetryPolicy};
use crate::session::SessionContext;
use crate::settings::SettingsService;

/// Input for a new post.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub content: String,
    pub image_url: Option<String>,
    /// Simulated identity; admins only.
    pub display_name: Option<String>,
    pub display_avatar_url: Option<String>,
}

/// Who a reader sees as the author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDisplay {
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub post: CommunityPost,
    pub author: AuthorDisplay,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub comment: CommunityComment,
    pub author: AuthorDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone)]
pub struct ModerationQueue {
    pub posts: Vec<CommunityPost>,
    pub comments: Vec<CommunityComment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproveAllSummary {
    pub posts_approved: u64,
    pub posts_recounted: usize,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_content(content: &str) -> ServiceResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("content is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn author_display(profiles: &HashMap<Uuid, Profile>, user_id: Uuid) -> AuthorDisplay {
    match profiles.get(&user_id) {
        Some(profile) => AuthorDisplay {
            name: profile.display_label(),
            avatar_url: profile.avatar_url.clone(),
        },
        None => AuthorDisplay {
            name: "Member".to_string(),
            avatar_url: None,
        },
    }
}

fn post_display(profiles: &HashMap<Uuid, Profile>, post: &CommunityPost) -> AuthorDisplay {
    let real = author_display(profiles, post.authored_by);
    AuthorDisplay {
        name: post.displayed_as.name.clone().unwrap_or(real.name),
        avatar_url: post.displayed_as.avatar_url.clone().or(real.avatar_url),
    }
}

#[derive(Clone)]
pub struct CommunityService {
    db: Arc<dyn DatabaseService>,
    settings: SettingsService,
    notifications: NotificationService,
    retry: ReadRetryPolicy,
}

impl CommunityService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            settings: SettingsService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
            retry: ReadRetryPolicy::default(),
        }
    }

    async fn profile_map(&self) -> ServiceResult<HashMap<Uuid, Profile>> {
        let profiles = read_with_retry(&self.retry, || async {
            self.db.list_profiles().await.map_err(ServiceError::from)
        })
        .await?;
        Ok(profiles.into_iter().map(|p| (p.user_id, p)).collect())
    }

    /// Admins are never moderated; everyone else is when the policy is on.
    async fn starts_approved(&self, ctx: &SessionContext) -> ServiceResult<bool> {
        if ctx.is_admin {
            return Ok(true);
        }
        Ok(!self.settings.require_comment_approval().await?)
    }

    /// Fetches a post the caller is allowed to see. Hidden posts are reported
    /// as missing.
    async fn visible_post(&self, ctx: &SessionContext, post_id: Uuid) -> ServiceResult<CommunityPost> {
        let post = self.db.get_post(post_id).await?;
        if !ctx.can_see(post.approved, post.authored_by) {
            return Err(ServiceError::NotFound(format!("Post {} not found", post_id)));
        }
        Ok(post)
    }

    async fn recount_comments(&self, post_id: Uuid) -> ServiceResult<i64> {
        let count = self.db.count_approved_comments(post_id).await?;
        self.db.set_comments_count(post_id, count).await?;
        Ok(count)
    }

    /// Tells the post's author about a comment that just became public.
    /// Failures are logged and swallowed.
    async fn announce_comment(&self, comment: &CommunityComment) {
        if let Err(e) = self.try_announce_comment(comment).await {
            warn!(comment_id = %comment.id, error = %e, "comment notification not delivered");
        }
    }

    async fn try_announce_comment(&self, comment: &CommunityComment) -> ServiceResult<()> {
        let post = self.db.get_post(comment.post_id).await?;
        if post.authored_by == comment.user_id {
            return Ok(());
        }
        let owner = match self.db.get_profile(post.authored_by).await {
            Ok(profile) => profile,
            Err(PortError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if !owner.notify_comments {
            return Ok(());
        }
        let commenter = match self.db.get_profile(comment.user_id).await {
            Ok(profile) => profile.display_label(),
            Err(_) => "Someone".to_string(),
        };
        self.notifications
            .notify_system(
                post.authored_by,
                NotificationDraft {
                    sender_id: Some(comment.user_id),
                    kind: NotificationType::Comment,
                    title: "New comment".to_string(),
                    message: format!("{} commented on your post", commenter),
                    link: Some(format!("/community?post={}", post.id)),
                },
            )
            .await?;
        Ok(())
    }

    // --- Posts ---

    pub async fn create_post(&self, ctx: &SessionContext, input: PostInput) -> ServiceResult<CommunityPost> {
        let user_id = ctx.require_user()?;
        let content = require_content(&input.content)?;
        let displayed_as = DisplayIdentity {
            name: clean(input.display_name),
            avatar_url: clean(input.display_avatar_url),
        };
        if !displayed_as.is_empty() && !ctx.is_admin {
            return Err(ServiceError::AuthorizationDenied(
                "only admins may post under another name".to_string(),
            ));
        }
        let approved = self.starts_approved(ctx).await?;
        let post = self
            .db
            .insert_post(NewPost {
                authored_by: user_id,
                displayed_as,
                content,
                image_url: clean(input.image_url),
                approved,
            })
            .await?;
        info!(%user_id, post_id = %post.id, approved, "post created");
        Ok(post)
    }

    /// Newest first, filtered to what the caller may see.
    pub async fn list_feed(&self, ctx: &SessionContext) -> ServiceResult<Vec<FeedEntry>> {
        let user_id = ctx.require_user()?;
        let posts = read_with_retry(&self.retry, || async {
            self.db.list_posts().await.map_err(ServiceError::from)
        })
        .await?;
        let liked = self.db.liked_post_ids(user_id).await?;
        let profiles = self.profile_map().await?;
        Ok(posts
            .into_iter()
            .filter(|p| ctx.can_see(p.approved, p.authored_by))
            .map(|post| FeedEntry {
                author: post_display(&profiles, &post),
                liked_by_me: liked.contains(&post.id),
                post,
            })
            .collect())
    }

    pub async fn get_post(&self, ctx: &SessionContext, post_id: Uuid) -> ServiceResult<FeedEntry> {
        let user_id = ctx.require_user()?;
        let post = self.visible_post(ctx, post_id).await?;
        let liked_by_me = self.db.has_liked(post_id, user_id).await?;
        let profiles = self.profile_map().await?;
        Ok(FeedEntry {
            author: post_display(&profiles, &post),
            liked_by_me,
            post,
        })
    }

    /// Idempotent: approving an approved post changes nothing.
    pub async fn approve_post(&self, ctx: &SessionContext, post_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        let post = self.db.get_post(post_id).await?;
        if !post.approved {
            self.db.set_post_approved(post_id).await?;
            info!(%admin_id, %post_id, "post approved");
        }
        Ok(())
    }

    /// Removes comments, then likes, then the post. A post hidden from the
    /// caller is reported as missing before ownership is checked.
    pub async fn delete_post(&self, ctx: &SessionContext, post_id: Uuid) -> ServiceResult<()> {
        let post = self.visible_post(ctx, post_id).await?;
        let actor = ctx.require_owner_or_admin(post.authored_by)?;
        let comments = self.db.delete_comments_for_post(post_id).await?;
        let likes = self.db.delete_likes_for_post(post_id).await?;
        self.db.delete_post(post_id).await?;
        info!(%actor, %post_id, comments, likes, "post deleted");
        Ok(())
    }

    // --- Comments ---

    pub async fn create_comment(
        &self,
        ctx: &SessionContext,
        post_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommunityComment> {
        let user_id = ctx.require_user()?;
        let content = require_content(content)?;
        self.visible_post(ctx, post_id).await?;
        let approved = self.starts_approved(ctx).await?;
        let comment = self
            .db
            .insert_comment(NewComment {
                post_id,
                user_id,
                content,
                approved,
            })
            .await?;
        if approved {
            self.recount_comments(post_id).await?;
            self.announce_comment(&comment).await;
        }
        info!(%user_id, %post_id, comment_id = %comment.id, approved, "comment created");
        Ok(comment)
    }

    /// Oldest first, filtered to what the caller may see.
    pub async fn list_comments(
        &self,
        ctx: &SessionContext,
        post_id: Uuid,
    ) -> ServiceResult<Vec<CommentEntry>> {
        self.visible_post(ctx, post_id).await?;
        let comments = read_with_retry(&self.retry, || async {
            self.db.list_comments(post_id).await.map_err(ServiceError::from)
        })
        .await?;
        let profiles = self.profile_map().await?;
        Ok(comments
            .into_iter()
            .filter(|c| ctx.can_see(c.approved, c.user_id))
            .map(|comment| CommentEntry {
                author: author_display(&profiles, comment.user_id),
                comment,
            })
            .collect())
    }

    /// Approves a comment and rebuilds the parent's counter from the rows.
    pub async fn approve_comment(&self, ctx: &SessionContext, comment_id: Uuid) -> ServiceResult<i64> {
        let admin_id = ctx.require_admin()?;
        let comment = self.db.get_comment(comment_id).await?;
        if !comment.approved {
            self.db.set_comment_approved(comment_id).await?;
            info!(%admin_id, %comment_id, "comment approved");
        }
        let count = self.recount_comments(comment.post_id).await?;
        if !comment.approved {
            self.announce_comment(&comment).await;
        }
        Ok(count)
    }

    /// Only an approved comment was ever counted, so only its removal touches
    /// the parent's counter.
    pub async fn delete_comment(&self, ctx: &SessionContext, comment_id: Uuid) -> ServiceResult<()> {
        let comment = self.db.get_comment(comment_id).await?;
        if !ctx.can_see(comment.approved, comment.user_id) {
            return Err(ServiceError::NotFound(format!("Comment {} not found", comment_id)));
        }
        self.visible_post(ctx, comment.post_id).await?;
        let actor = ctx.require_owner_or_admin(comment.user_id)?;
        self.db.delete_comment(comment_id).await?;
        if comment.approved {
            match self.recount_comments(comment.post_id).await {
                Ok(_) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(%actor, %comment_id, "comment deleted");
        Ok(())
    }

    // --- Likes ---

    /// Likes the post, or removes the like if the caller already liked it.
    ///
    /// The counter moves by one through a single store call per toggle.
    pub async fn toggle_like(&self, ctx: &SessionContext, post_id: Uuid) -> ServiceResult<LikeState> {
        let user_id = ctx.require_user()?;
        let post = self.visible_post(ctx, post_id).await?;
        if self.db.has_liked(post_id, user_id).await? {
            let likes_count = if self.db.delete_like(post_id, user_id).await? {
                self.db.adjust_likes_count(post_id, -1).await?
            } else {
                post.likes_count
            };
            Ok(LikeState {
                liked: false,
                likes_count,
            })
        } else {
            let likes_count = if self.db.insert_like(post_id, user_id).await? {
                self.db.adjust_likes_count(post_id, 1).await?
            } else {
                post.likes_count
            };
            Ok(LikeState {
                liked: true,
                likes_count,
            })
        }
    }

    // --- Moderation (admin) ---

    pub async fn pending_queue(&self, ctx: &SessionContext) -> ServiceResult<ModerationQueue> {
        ctx.require_admin()?;
        Ok(ModerationQueue {
            posts: self.db.list_pending_posts().await?,
            comments: self.db.list_pending_comments().await?,
        })
    }

    /// Approves everything pending, then recounts every post that had a
    /// pending comment.
    pub async fn approve_all(&self, ctx: &SessionContext) -> ServiceResult<ApproveAllSummary> {
        let admin_id = ctx.require_admin()?;
        let newly_public = self.db.list_pending_comments().await?;
        let posts_approved = self.db.approve_all_posts().await?;
        let touched = self.db.approve_all_comments().await?;
        for post_id in &touched {
            match self.recount_comments(*post_id).await {
                Ok(_) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        for comment in &newly_public {
            self.announce_comment(comment).await;
        }
        info!(%admin_id, posts_approved, posts_recounted = touched.len(), "approved all pending items");
        Ok(ApproveAllSummary {
            posts_approved,
            posts_recounted: touched.len(),
        })
    }

    /// Rebuilds both counters on every post from the underlying rows.
    /// Returns how many posts had drifted.
    pub async fn reconcile_counters(&self, ctx: &SessionContext) -> ServiceResult<usize> {
        let admin_id = ctx.require_admin()?;
        let mut corrected = 0;
        for post in self.db.list_posts().await? {
            let comments = self.db.count_approved_comments(post.id).await?;
            let likes = self.db.count_likes(post.id).await?;
            if comments != post.comments_count || likes != post.likes_count {
                self.db.set_comments_count(post.id, comments).await?;
                self.db.set_likes_count(post.id, likes).await?;
                corrected += 1;
            }
        }
        info!(%admin_id, corrected, "counters reconciled");
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::memory::MemoryStore;
    use crate::settings::REQUIRE_COMMENT_APPROVAL;

    struct Fixture {
        store: Arc<MemoryStore>,
        community: CommunityService,
        admin: SessionContext,
        alice: SessionContext,
        bob: SessionContext,
    }

    async fn fixture(require_approval: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let admin_id = Uuid::new_v4();
        let alice_id = Uuid::new_v4();
        let bob_id = Uuid::new_v4();
        for (id, email) in [(admin_id, "admin@x"), (alice_id, "alice@x"), (bob_id, "bob@x")] {
            store.create_profile(id, Some(email)).await.unwrap();
        }
        store.add_role(admin_id, Role::Admin).await.unwrap();
        store
            .upsert_setting(REQUIRE_COMMENT_APPROVAL, if require_approval { "true" } else { "false" })
            .await
            .unwrap();
        Fixture {
            community: CommunityService::new(store.clone()),
            store,
            admin: SessionContext { user_id: Some(admin_id), is_admin: true },
            alice: SessionContext { user_id: Some(alice_id), is_admin: false },
            bob: SessionContext { user_id: Some(bob_id), is_admin: false },
        }
    }

    fn text(content: &str) -> PostInput {
        PostInput {
            content: content.to_string(),
            ..PostInput::default()
        }
    }

    #[tokio::test]
    async fn pending_post_is_visible_only_to_author_and_admin() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.alice, text("hello")).await.unwrap();
        assert!(!post.approved);

        assert!(f.community.list_feed(&f.bob).await.unwrap().is_empty());
        assert!(matches!(
            f.community.get_post(&f.bob, post.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(f.community.list_feed(&f.alice).await.unwrap().len(), 1);
        assert_eq!(f.community.list_feed(&f.admin).await.unwrap().len(), 1);

        f.community.approve_post(&f.admin, post.id).await.unwrap();
        assert_eq!(f.community.list_feed(&f.bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_posts_skip_moderation_and_open_policy_auto_approves() {
        let f = fixture(true).await;
        assert!(f.community.create_post(&f.admin, text("news")).await.unwrap().approved);

        let open = fixture(false).await;
        assert!(open.community.create_post(&open.alice, text("hi")).await.unwrap().approved);
    }

    #[tokio::test]
    async fn policy_change_does_not_touch_existing_rows() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.alice, text("early")).await.unwrap();
        f.store.upsert_setting(REQUIRE_COMMENT_APPROVAL, "false").await.unwrap();
        assert!(!f.store.get_post(post.id).await.unwrap().approved);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let f = fixture(false).await;
        assert!(matches!(
            f.community.create_post(&f.alice, text("   ")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(f.store.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approving_twice_does_not_double_count() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.admin, text("p")).await.unwrap();
        let comment = f.community.create_comment(&f.alice, post.id, "c").await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 0);

        assert_eq!(f.community.approve_comment(&f.admin, comment.id).await.unwrap(), 1);
        assert_eq!(f.community.approve_comment(&f.admin, comment.id).await.unwrap(), 1);
        f.community.approve_post(&f.admin, post.id).await.unwrap();
        f.community.approve_post(&f.admin, post.id).await.unwrap();

        let stored = f.store.get_post(post.id).await.unwrap();
        assert!(stored.approved);
        assert_eq!(stored.comments_count, 1);
    }

    #[tokio::test]
    async fn approval_repairs_a_drifted_counter() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.admin, text("p")).await.unwrap();
        let comment = f.community.create_comment(&f.alice, post.id, "c").await.unwrap();
        f.store.set_comments_count(post.id, 42).await.unwrap();

        f.community.approve_comment(&f.admin, comment.id).await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 1);
    }

    #[tokio::test]
    async fn pending_comments_follow_the_visibility_rule() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.admin, text("p")).await.unwrap();
        f.community.create_comment(&f.alice, post.id, "mine").await.unwrap();

        assert!(f.community.list_comments(&f.bob, post.id).await.unwrap().is_empty());
        assert_eq!(f.community.list_comments(&f.alice, post.id).await.unwrap().len(), 1);
        assert_eq!(f.community.list_comments(&f.admin, post.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_pending_comment_leaves_the_count_alone() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.admin, text("p")).await.unwrap();
        let approved = f.community.create_comment(&f.admin, post.id, "by admin").await.unwrap();
        let pending = f.community.create_comment(&f.alice, post.id, "pending").await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 1);

        f.community.delete_comment(&f.alice, pending.id).await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 1);

        f.community.delete_comment(&f.admin, approved.id).await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 0);
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes_comments() {
        let f = fixture(false).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        let comment = f.community.create_comment(&f.alice, post.id, "c").await.unwrap();
        assert!(matches!(
            f.community.delete_comment(&f.bob, comment.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(f.store.get_comment(comment.id).await.is_ok());
    }

    #[tokio::test]
    async fn deleting_hidden_items_reports_not_found() {
        let f = fixture(true).await;
        let pending = f.community.create_post(&f.alice, text("draft")).await.unwrap();
        assert!(matches!(
            f.community.delete_post(&f.bob, pending.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.store.get_post(pending.id).await.is_ok());

        let public = f.community.create_post(&f.admin, text("open")).await.unwrap();
        let comment = f.community.create_comment(&f.alice, public.id, "pending").await.unwrap();
        assert!(!comment.approved);
        assert!(matches!(
            f.community.delete_comment(&f.bob, comment.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.store.get_comment(comment.id).await.is_ok());

        // Visible but not owned is still a permission error.
        assert!(matches!(
            f.community.delete_post(&f.bob, public.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        f.community.delete_comment(&f.alice, comment.id).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_post_removes_comments_and_likes() {
        let f = fixture(false).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        let comment = f.community.create_comment(&f.bob, post.id, "c").await.unwrap();
        f.community.toggle_like(&f.bob, post.id).await.unwrap();

        f.community.delete_post(&f.alice, post.id).await.unwrap();
        assert!(matches!(
            f.store.get_comment(comment.id).await,
            Err(PortError::NotFound(_))
        ));
        assert_eq!(f.store.count_likes(post.id).await.unwrap(), 0);
        assert!(matches!(
            f.community.get_post(&f.alice, post.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn like_toggle_is_self_inverse() {
        let f = fixture(false).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        f.community.toggle_like(&f.alice, post.id).await.unwrap();
        let before = f.store.get_post(post.id).await.unwrap().likes_count;

        let liked = f.community.toggle_like(&f.bob, post.id).await.unwrap();
        assert_eq!(liked, LikeState { liked: true, likes_count: before + 1 });
        let unliked = f.community.toggle_like(&f.bob, post.id).await.unwrap();
        assert_eq!(unliked, LikeState { liked: false, likes_count: before });
        assert_eq!(f.store.get_post(post.id).await.unwrap().likes_count, before);
    }

    #[tokio::test]
    async fn simulated_identity_keeps_real_ownership() {
        let f = fixture(true).await;
        let post = f
            .community
            .create_post(
                &f.admin,
                PostInput {
                    content: "tips".to_string(),
                    display_name: Some(" Maria ".to_string()),
                    ..PostInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(Some(post.authored_by), f.admin.user_id);
        assert_eq!(post.displayed_as.name.as_deref(), Some("Maria"));

        let entry = f.community.get_post(&f.bob, post.id).await.unwrap();
        assert_eq!(entry.author.name, "Maria");

        assert!(matches!(
            f.community.delete_post(&f.bob, post.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        f.community.delete_post(&f.admin, post.id).await.unwrap();
    }

    #[tokio::test]
    async fn members_cannot_post_under_another_name() {
        let f = fixture(false).await;
        let err = f
            .community
            .create_post(
                &f.alice,
                PostInput {
                    content: "hi".to_string(),
                    display_name: Some("Maria".to_string()),
                    ..PostInput::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied(_)));
    }

    #[tokio::test]
    async fn approve_all_clears_the_queue_and_recounts() {
        let f = fixture(true).await;
        let p1 = f.community.create_post(&f.alice, text("one")).await.unwrap();
        let p2 = f.community.create_post(&f.admin, text("two")).await.unwrap();
        f.community.create_comment(&f.alice, p1.id, "a").await.unwrap();
        f.community.create_comment(&f.bob, p2.id, "b").await.unwrap();
        f.community.create_comment(&f.alice, p2.id, "c").await.unwrap();

        let queue = f.community.pending_queue(&f.admin).await.unwrap();
        assert_eq!((queue.posts.len(), queue.comments.len()), (1, 3));

        let summary = f.community.approve_all(&f.admin).await.unwrap();
        assert_eq!(summary.posts_approved, 1);
        assert_eq!(summary.posts_recounted, 2);

        let queue = f.community.pending_queue(&f.admin).await.unwrap();
        assert!(queue.posts.is_empty() && queue.comments.is_empty());
        for post in f.store.list_posts().await.unwrap() {
            assert_eq!(
                post.comments_count,
                f.store.count_approved_comments(post.id).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn reconcile_fixes_posts_without_pending_comments() {
        let f = fixture(false).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        f.community.create_comment(&f.bob, post.id, "c").await.unwrap();
        f.community.toggle_like(&f.bob, post.id).await.unwrap();
        f.store.set_comments_count(post.id, 9).await.unwrap();
        f.store.set_likes_count(post.id, 9).await.unwrap();

        f.community.approve_all(&f.admin).await.unwrap();
        assert_eq!(f.store.get_post(post.id).await.unwrap().comments_count, 9);

        assert_eq!(f.community.reconcile_counters(&f.admin).await.unwrap(), 1);
        let fixed = f.store.get_post(post.id).await.unwrap();
        assert_eq!((fixed.comments_count, fixed.likes_count), (1, 1));
    }

    #[tokio::test]
    async fn moderation_actions_are_admin_only() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        assert!(matches!(
            f.community.approve_post(&f.alice, post.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            f.community.approve_all(&f.bob).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(!f.store.get_post(post.id).await.unwrap().approved);
    }

    #[tokio::test]
    async fn public_comment_notifies_the_post_author() {
        let f = fixture(true).await;
        let post = f.community.create_post(&f.alice, text("p")).await.unwrap();
        f.community.approve_post(&f.admin, post.id).await.unwrap();
        let alice = f.alice.user_id.unwrap();

        let comment = f.community.create_comment(&f.bob, post.id, "nice").await.unwrap();
        assert_eq!(f.store.count_unread_notifications(alice).await.unwrap(), 0);

        f.community.approve_comment(&f.admin, comment.id).await.unwrap();
        let inbox = f.store.list_notifications(alice, 10).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationType::Comment);

        f.community.create_comment(&f.alice, post.id, "thanks").await.unwrap();
        f.community.create_comment(&f.bob, post.id, "again").await.unwrap();
        f.community.approve_all(&f.admin).await.unwrap();
        assert_eq!(f.store.count_unread_notifications(alice).await.unwrap(), 2);
    }
}
