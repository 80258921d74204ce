//! crates/membership_core/src/profiles.rs
//!
//! Profile reads and self-service edits, plus the admin user listing.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Profile, ProfileUpdate, Role};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::session::SessionContext;

#[derive(Debug, Clone)]
pub struct UserSummary {
    pub profile: Profile,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Arc<dyn DatabaseService>,
}

impl ProfileService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn me(&self, ctx: &SessionContext) -> ServiceResult<Profile> {
        let user_id = ctx.require_user()?;
        Ok(self.db.get_profile(user_id).await?)
    }

    pub async fn update_me(&self, ctx: &SessionContext, update: ProfileUpdate) -> ServiceResult<Profile> {
        let user_id = ctx.require_user()?;
        if let Some(nickname) = &update.nickname {
            if nickname.chars().count() > 40 {
                return Err(ServiceError::Validation(
                    "nickname must be at most 40 characters".to_string(),
                ));
            }
        }
        Ok(self.db.update_profile(user_id, update).await?)
    }

    pub async fn list_users(&self, ctx: &SessionContext) -> ServiceResult<Vec<UserSummary>> {
        ctx.require_admin()?;
        let admins = self.db.list_users_with_role(Role::Admin).await?;
        Ok(self
            .db
            .list_profiles()
            .await?
            .into_iter()
            .map(|profile| UserSummary {
                is_admin: admins.contains(&profile.user_id),
                profile,
            })
            .collect())
    }

    /// Makes sure a freshly registered user has a profile row.
    pub async fn ensure_profile(&self, user_id: Uuid, email: Option<&str>) -> ServiceResult<Profile> {
        Ok(self.db.create_profile(user_id, email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn users_edit_only_their_own_profile() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(store.clone());
        let alice = Uuid::new_v4();
        service.ensure_profile(alice, Some("alice@x")).await.unwrap();
        let ctx = SessionContext { user_id: Some(alice), is_admin: false };

        let updated = service
            .update_me(
                &ctx,
                ProfileUpdate {
                    nickname: Some("ali".to_string()),
                    show_nickname: Some(true),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_label(), "ali");
        assert_eq!(service.me(&ctx).await.unwrap().email.as_deref(), Some("alice@x"));
    }

    #[tokio::test]
    async fn listing_users_marks_admins() {
        let store = Arc::new(MemoryStore::new());
        let service = ProfileService::new(store.clone());
        let admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        service.ensure_profile(admin, None).await.unwrap();
        service.ensure_profile(member, None).await.unwrap();
        store.add_role(admin, Role::Admin).await.unwrap();

        let ctx = SessionContext { user_id: Some(admin), is_admin: true };
        let users = service.list_users(&ctx).await.unwrap();
        assert_eq!(users.iter().filter(|u| u.is_admin).count(), 1);

        let as_member = SessionContext { user_id: Some(member), is_admin: false };
        assert!(matches!(
            service.list_users(&as_member).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
    }

    #[test]
    fn display_label_falls_back_in_order() {
        let mut profile = Profile {
            email: Some("e@x".to_string()),
            ..Profile::default()
        };
        assert_eq!(profile.display_label(), "e@x");
        profile.name = Some("Name".to_string());
        assert_eq!(profile.display_label(), "Name");
        profile.nickname = Some("nick".to_string());
        assert_eq!(profile.display_label(), "Name");
        profile.show_nickname = true;
        assert_eq!(profile.display_label(), "nick");
        assert_eq!(Profile::default().display_label(), "Member");
    }
}
