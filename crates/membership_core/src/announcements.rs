//! crates/membership_core/src/announcements.rs
//!
//! Admin-curated home content: the banner carousel and the updates feed.
//! Members read, admins write.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Banner, BannerDraft, FeedPost, NewFeedPost};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::retry::{read_with_retry, ReadRetryPolicy};
use crate::session::SessionContext;

pub const FEED_PAGE_SIZE: i64 = 50;

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_banner(mut draft: BannerDraft) -> ServiceResult<BannerDraft> {
    draft.image_url = draft.image_url.trim().to_string();
    if draft.image_url.is_empty() {
        return Err(ServiceError::Validation("banner image_url is required".to_string()));
    }
    draft.title = clean(draft.title);
    draft.link = clean(draft.link);
    Ok(draft)
}

#[derive(Clone)]
pub struct AnnouncementService {
    db: Arc<dyn DatabaseService>,
    retry: ReadRetryPolicy,
}

impl AnnouncementService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            db,
            retry: ReadRetryPolicy::default(),
        }
    }

    // --- Banners ---

    /// Active banners in carousel order.
    pub async fn active_banners(&self, ctx: &SessionContext) -> ServiceResult<Vec<Banner>> {
        ctx.require_user()?;
        let banners = read_with_retry(&self.retry, || async {
            self.db.list_banners().await.map_err(ServiceError::from)
        })
        .await?;
        Ok(banners.into_iter().filter(|b| b.active).collect())
    }

    /// Every banner, including inactive ones.
    pub async fn list_banners(&self, ctx: &SessionContext) -> ServiceResult<Vec<Banner>> {
        ctx.require_admin()?;
        Ok(self.db.list_banners().await?)
    }

    /// New banners start active.
    pub async fn create_banner(&self, ctx: &SessionContext, draft: BannerDraft) -> ServiceResult<Banner> {
        let admin_id = ctx.require_admin()?;
        let banner = self.db.insert_banner(validate_banner(draft)?).await?;
        info!(%admin_id, banner_id = %banner.id, "banner created");
        Ok(banner)
    }

    pub async fn update_banner(
        &self,
        ctx: &SessionContext,
        banner_id: Uuid,
        draft: BannerDraft,
    ) -> ServiceResult<Banner> {
        ctx.require_admin()?;
        Ok(self.db.update_banner(banner_id, validate_banner(draft)?).await?)
    }

    pub async fn set_banner_active(
        &self,
        ctx: &SessionContext,
        banner_id: Uuid,
        active: bool,
    ) -> ServiceResult<Banner> {
        let admin_id = ctx.require_admin()?;
        let banner = self.db.set_banner_active(banner_id, active).await?;
        info!(%admin_id, %banner_id, active, "banner visibility changed");
        Ok(banner)
    }

    pub async fn delete_banner(&self, ctx: &SessionContext, banner_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        self.db.delete_banner(banner_id).await?;
        info!(%admin_id, %banner_id, "banner deleted");
        Ok(())
    }

    // --- Feed ---

    /// Newest first, one page.
    pub async fn feed(&self, ctx: &SessionContext) -> ServiceResult<Vec<FeedPost>> {
        ctx.require_user()?;
        read_with_retry(&self.retry, || async {
            self.db
                .list_feed_posts(FEED_PAGE_SIZE)
                .await
                .map_err(ServiceError::from)
        })
        .await
    }

    pub async fn publish_feed_post(
        &self,
        ctx: &SessionContext,
        content: &str,
        image_url: Option<String>,
    ) -> ServiceResult<FeedPost> {
        let admin_id = ctx.require_admin()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("content is required".to_string()));
        }
        let post = self
            .db
            .insert_feed_post(NewFeedPost {
                author_id: admin_id,
                content: content.to_string(),
                image_url: clean(image_url),
            })
            .await?;
        info!(%admin_id, feed_post_id = %post.id, "feed post published");
        Ok(post)
    }

    pub async fn delete_feed_post(&self, ctx: &SessionContext, feed_post_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        self.db.delete_feed_post(feed_post_id).await?;
        info!(%admin_id, %feed_post_id, "feed post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    struct Fixture {
        service: AnnouncementService,
        admin: SessionContext,
        member: SessionContext,
    }

    fn fixture() -> Fixture {
        Fixture {
            service: AnnouncementService::new(Arc::new(MemoryStore::new())),
            admin: SessionContext { user_id: Some(Uuid::new_v4()), is_admin: true },
            member: SessionContext { user_id: Some(Uuid::new_v4()), is_admin: false },
        }
    }

    fn banner(image_url: &str, sort_order: i32) -> BannerDraft {
        BannerDraft {
            image_url: image_url.to_string(),
            title: None,
            link: Some("  ".to_string()),
            sort_order,
        }
    }

    #[tokio::test]
    async fn members_see_only_active_banners_in_order() {
        let f = fixture();
        let second = f.service.create_banner(&f.admin, banner("b.png", 2)).await.unwrap();
        let first = f.service.create_banner(&f.admin, banner("a.png", 1)).await.unwrap();
        let hidden = f.service.create_banner(&f.admin, banner("c.png", 0)).await.unwrap();
        assert!(first.active);
        assert_eq!(first.link, None);

        f.service.set_banner_active(&f.admin, hidden.id, false).await.unwrap();

        let visible: Vec<Uuid> = f
            .service
            .active_banners(&f.member)
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(visible, vec![first.id, second.id]);
        assert_eq!(f.service.list_banners(&f.admin).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn banner_writes_are_admin_only_and_validated() {
        let f = fixture();
        assert!(matches!(
            f.service.create_banner(&f.member, banner("a.png", 0)).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            f.service.create_banner(&f.admin, banner("   ", 0)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            f.service.list_banners(&f.member).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            f.service.delete_banner(&f.admin, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn editing_a_banner_keeps_its_visibility() {
        let f = fixture();
        let b = f.service.create_banner(&f.admin, banner("a.png", 0)).await.unwrap();
        f.service.set_banner_active(&f.admin, b.id, false).await.unwrap();

        let mut draft = banner("new.png", 5);
        draft.title = Some(" Launch ".to_string());
        let updated = f.service.update_banner(&f.admin, b.id, draft).await.unwrap();
        assert_eq!(updated.image_url, "new.png");
        assert_eq!(updated.title.as_deref(), Some("Launch"));
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn feed_is_newest_first_and_admin_authored() {
        let f = fixture();
        let older = f.service.publish_feed_post(&f.admin, "first", None).await.unwrap();
        let newer = f.service.publish_feed_post(&f.admin, " second ", None).await.unwrap();
        assert_eq!(newer.content, "second");
        assert_eq!(newer.author_id, f.admin.user_id);

        let feed = f.service.feed(&f.member).await.unwrap();
        assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        assert!(matches!(
            f.service.publish_feed_post(&f.member, "nope", None).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            f.service.publish_feed_post(&f.admin, "  ", None).await,
            Err(ServiceError::Validation(_))
        ));

        f.service.delete_feed_post(&f.admin, older.id).await.unwrap();
        assert_eq!(f.service.feed(&f.member).await.unwrap().len(), 1);
        assert!(matches!(
            f.service.feed(&SessionContext::anonymous()).await,
            Err(ServiceError::AuthenticationRequired)
        ));
    }
}
