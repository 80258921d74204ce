//! crates/membership_core/src/access.rs
//!
//! Entitlements (who may open which product) and the role registry (who is an
//! admin). Grants and revocations are admin-only and idempotent.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Entitlement, Product, Role};
use crate::error::ServiceResult;
use crate::ports::DatabaseService;
use crate::session::SessionContext;

/// A product the user holds, paired with when it was granted.
#[derive(Debug, Clone)]
pub struct OwnedProduct {
    pub entitlement: Entitlement,
    pub product: Product,
}

#[derive(Clone)]
pub struct AccessService {
    db: Arc<dyn DatabaseService>,
}

impl AccessService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    // --- Entitlements ---

    /// True iff an entitlement row exists for the pair. Never cached.
    pub async fn has_access(&self, user_id: Uuid, product_id: Uuid) -> ServiceResult<bool> {
        Ok(self.db.find_entitlement(user_id, product_id).await?.is_some())
    }

    /// Grants access once; a second grant for the same pair returns the
    /// existing row. Unknown users and products are `NotFound`.
    pub async fn grant_access(
        &self,
        ctx: &SessionContext,
        user_id: Uuid,
        product_id: Uuid,
    ) -> ServiceResult<Entitlement> {
        let admin_id = ctx.require_admin()?;
        if let Some(existing) = self.db.find_entitlement(user_id, product_id).await? {
            return Ok(existing);
        }
        let entitlement = self.db.insert_entitlement(user_id, product_id).await?;
        info!(%admin_id, %user_id, %product_id, "product access granted");
        Ok(entitlement)
    }

    /// Revoking a grant that does not exist is a no-op.
    pub async fn revoke_access(
        &self,
        ctx: &SessionContext,
        user_id: Uuid,
        product_id: Uuid,
    ) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        if self.db.delete_entitlement(user_id, product_id).await? {
            info!(%admin_id, %user_id, %product_id, "product access revoked");
        }
        Ok(())
    }

    /// The caller's products, newest grant first. Grants whose product has
    /// since been deleted are skipped.
    pub async fn my_products(&self, ctx: &SessionContext) -> ServiceResult<Vec<OwnedProduct>> {
        let user_id = ctx.require_user()?;
        self.products_of(user_id).await
    }

    /// Admin view of another user's products.
    pub async fn products_of_user(
        &self,
        ctx: &SessionContext,
        user_id: Uuid,
    ) -> ServiceResult<Vec<OwnedProduct>> {
        ctx.require_admin()?;
        self.products_of(user_id).await
    }

    async fn products_of(&self, user_id: Uuid) -> ServiceResult<Vec<OwnedProduct>> {
        let entitlements = self.db.list_entitlements_for_user(user_id).await?;
        let products = self.db.list_products().await?;
        Ok(entitlements
            .into_iter()
            .filter_map(|entitlement| {
                products
                    .iter()
                    .find(|p| p.id == entitlement.product_id)
                    .cloned()
                    .map(|product| OwnedProduct {
                        entitlement,
                        product,
                    })
            })
            .collect())
    }

    // --- Roles ---

    pub async fn is_admin(&self, user_id: Uuid) -> ServiceResult<bool> {
        Ok(self.db.has_role(user_id, Role::Admin).await?)
    }

    pub async fn list_admins(&self, ctx: &SessionContext) -> ServiceResult<Vec<Uuid>> {
        ctx.require_admin()?;
        Ok(self.db.list_users_with_role(Role::Admin).await?)
    }

    /// Granting an existing admin is a no-op. Unknown users are `NotFound`.
    pub async fn grant_admin(&self, ctx: &SessionContext, user_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        if self.db.add_role(user_id, Role::Admin).await? {
            info!(%admin_id, %user_id, "admin role granted");
        }
        Ok(())
    }

    /// Revoking a non-admin is a no-op.
    pub async fn revoke_admin(&self, ctx: &SessionContext, user_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        if self.db.remove_role(user_id, Role::Admin).await? {
            info!(%admin_id, %user_id, "admin role revoked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProductDraft, ProductKind};
    use crate::error::ServiceError;
    use crate::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        access: AccessService,
        admin: SessionContext,
        member: SessionContext,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let admin_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();
        store.create_profile(admin_id, Some("admin@x")).await.unwrap();
        store.create_profile(member_id, Some("member@x")).await.unwrap();
        store.add_role(admin_id, Role::Admin).await.unwrap();
        Fixture {
            access: AccessService::new(store.clone()),
            store,
            admin: SessionContext { user_id: Some(admin_id), is_admin: true },
            member: SessionContext { user_id: Some(member_id), is_admin: false },
        }
    }

    async fn product(store: &MemoryStore, name: &str) -> Product {
        store
            .insert_product(ProductDraft {
                name: name.to_string(),
                description: None,
                image_url: None,
                kind: ProductKind::Modules,
                purchase_link: None,
                sort_order: 0,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn access_follows_entitlement_rows() {
        let f = fixture().await;
        let p = product(&f.store, "Course").await;
        let user = f.member.user_id.unwrap();

        assert!(!f.access.has_access(user, p.id).await.unwrap());
        f.access.grant_access(&f.admin, user, p.id).await.unwrap();
        assert!(f.access.has_access(user, p.id).await.unwrap());
        f.access.revoke_access(&f.admin, user, p.id).await.unwrap();
        assert!(!f.access.has_access(user, p.id).await.unwrap());
    }

    #[tokio::test]
    async fn granting_twice_keeps_a_single_row() {
        let f = fixture().await;
        let p = product(&f.store, "Course").await;
        let user = f.member.user_id.unwrap();

        let first = f.access.grant_access(&f.admin, user, p.id).await.unwrap();
        let second = f.access.grant_access(&f.admin, user, p.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(f.store.list_entitlements_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn members_cannot_grant_or_revoke() {
        let f = fixture().await;
        let p = product(&f.store, "Course").await;
        let user = f.member.user_id.unwrap();

        let err = f.access.grant_access(&f.member, user, p.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied(_)));
        assert!(!f.access.has_access(user, p.id).await.unwrap());

        let err = f
            .access
            .revoke_access(&SessionContext::anonymous(), user, p.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn admin_role_changes_are_idempotent() {
        let f = fixture().await;
        let user = f.member.user_id.unwrap();

        f.access.grant_admin(&f.admin, user).await.unwrap();
        f.access.grant_admin(&f.admin, user).await.unwrap();
        assert!(f.access.is_admin(user).await.unwrap());
        assert_eq!(f.access.list_admins(&f.admin).await.unwrap().len(), 2);

        f.access.revoke_admin(&f.admin, user).await.unwrap();
        f.access.revoke_admin(&f.admin, user).await.unwrap();
        assert!(!f.access.is_admin(user).await.unwrap());
    }

    #[tokio::test]
    async fn grants_to_unknown_users_are_not_found() {
        let f = fixture().await;
        let p = product(&f.store, "Course").await;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            f.access.grant_access(&f.admin, ghost, p.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.store.list_entitlements_for_user(ghost).await.unwrap().is_empty());

        assert!(matches!(
            f.access.grant_admin(&f.admin, ghost).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(!f.access.is_admin(ghost).await.unwrap());
        assert_eq!(f.access.list_admins(&f.admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn my_products_lists_granted_products() {
        let f = fixture().await;
        let a = product(&f.store, "A").await;
        let _b = product(&f.store, "B").await;
        let user = f.member.user_id.unwrap();
        f.access.grant_access(&f.admin, user, a.id).await.unwrap();

        let owned = f.access.my_products(&f.member).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].product.name, "A");
    }
}
