//! crates/membership_core/src/catalog.rs
//!
//! The content hierarchy: Product -> Module -> ModuleContent. Every read that
//! exposes module or content data checks the caller's entitlement first.

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    ContentAction, ContentBody, ContentDraft, Module, ModuleContent, ModuleDraft, Product,
    ProductDraft,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::retry::{read_with_retry, ReadRetryPolicy};
use crate::session::SessionContext;

/// Maps a content item to the single action a client should take.
pub fn resolve_content_action(content: &ModuleContent) -> ContentAction {
    match &content.body {
        ContentBody::Pdf { url } | ContentBody::Video { url } => {
            ContentAction::Embed { url: url.clone() }
        }
        ContentBody::Link { url } | ContentBody::App { url } => {
            ContentAction::OpenExternal { url: url.clone() }
        }
        ContentBody::Text { content } => ContentAction::RenderText {
            content: content.clone(),
        },
    }
}

/// A product in the catalog listing with the caller's lock state.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub product: Product,
    pub unlocked: bool,
}

#[derive(Debug, Clone)]
pub struct ModuleWithContents {
    pub module: Module,
    pub contents: Vec<ModuleContent>,
}

/// What the caller gets when opening a product. A locked view never carries
/// module or content data.
#[derive(Debug, Clone)]
pub enum ProductView {
    Locked {
        product: Product,
        purchase_link: Option<String>,
    },
    Unlocked {
        product: Product,
        modules: Vec<ModuleWithContents>,
    },
}

fn require_text(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn validate_body(body: ContentBody) -> ServiceResult<ContentBody> {
    // Re-run the storage rule so blank urls and bodies are rejected up front.
    let kind = body.kind();
    ContentBody::from_parts(
        kind,
        body.url().map(str::to_string),
        body.text().map(str::to_string),
    )
    .ok_or_else(|| match kind {
        "text" => ServiceError::Validation("text content requires a body".to_string()),
        _ => ServiceError::Validation(format!("{} content requires a url", kind)),
    })
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<dyn DatabaseService>,
    retry: ReadRetryPolicy,
}

impl CatalogService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            db,
            retry: ReadRetryPolicy::default(),
        }
    }

    async fn is_unlocked(&self, ctx: &SessionContext, product_id: Uuid) -> ServiceResult<bool> {
        let user_id = ctx.require_user()?;
        if ctx.is_admin {
            return Ok(true);
        }
        Ok(self.db.find_entitlement(user_id, product_id).await?.is_some())
    }

    async fn require_unlocked(&self, ctx: &SessionContext, product_id: Uuid) -> ServiceResult<()> {
        if self.is_unlocked(ctx, product_id).await? {
            Ok(())
        } else {
            Err(ServiceError::AuthorizationDenied(
                "product not purchased".to_string(),
            ))
        }
    }

    // --- Reads ---

    /// Every product in admin order, flagged with the caller's lock state.
    pub async fn list_products(&self, ctx: &SessionContext) -> ServiceResult<Vec<ProductCard>> {
        let user_id = ctx.require_user()?;
        let products = read_with_retry(&self.retry, || async {
            self.db.list_products().await.map_err(ServiceError::from)
        })
        .await?;
        let owned: Vec<Uuid> = self
            .db
            .list_entitlements_for_user(user_id)
            .await?
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        Ok(products
            .into_iter()
            .map(|product| ProductCard {
                unlocked: ctx.is_admin || owned.contains(&product.id),
                product,
            })
            .collect())
    }

    pub async fn open_product(
        &self,
        ctx: &SessionContext,
        product_id: Uuid,
    ) -> ServiceResult<ProductView> {
        let product = self.db.get_product(product_id).await?;
        if !self.is_unlocked(ctx, product_id).await? {
            return Ok(ProductView::Locked {
                purchase_link: product.purchase_link.clone(),
                product,
            });
        }
        let modules = self.db.list_modules(product_id).await?;
        let contents = try_join_all(modules.iter().map(|m| self.db.list_contents(m.id))).await?;
        Ok(ProductView::Unlocked {
            product,
            modules: modules
                .into_iter()
                .zip(contents)
                .map(|(module, contents)| ModuleWithContents { module, contents })
                .collect(),
        })
    }

    pub async fn list_modules(
        &self,
        ctx: &SessionContext,
        product_id: Uuid,
    ) -> ServiceResult<Vec<Module>> {
        self.require_unlocked(ctx, product_id).await?;
        read_with_retry(&self.retry, || async {
            self.db.list_modules(product_id).await.map_err(ServiceError::from)
        })
        .await
    }

    pub async fn list_contents(
        &self,
        ctx: &SessionContext,
        module_id: Uuid,
    ) -> ServiceResult<Vec<ModuleContent>> {
        let module = self.db.get_module(module_id).await?;
        self.require_unlocked(ctx, module.product_id).await?;
        read_with_retry(&self.retry, || async {
            self.db.list_contents(module_id).await.map_err(ServiceError::from)
        })
        .await
    }

    /// Resolves what opening a content item should do, if the caller may see it.
    pub async fn open_content(
        &self,
        ctx: &SessionContext,
        content_id: Uuid,
    ) -> ServiceResult<(ModuleContent, ContentAction)> {
        let content = self.db.get_content(content_id).await?;
        let module = self.db.get_module(content.module_id).await?;
        self.require_unlocked(ctx, module.product_id).await?;
        let action = resolve_content_action(&content);
        Ok((content, action))
    }

    // --- Products (admin) ---

    pub async fn create_product(
        &self,
        ctx: &SessionContext,
        mut draft: ProductDraft,
    ) -> ServiceResult<Product> {
        let admin_id = ctx.require_admin()?;
        draft.name = require_text(&draft.name, "product name")?;
        let product = self.db.insert_product(draft).await?;
        info!(%admin_id, product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        ctx: &SessionContext,
        product_id: Uuid,
        mut draft: ProductDraft,
    ) -> ServiceResult<Product> {
        ctx.require_admin()?;
        draft.name = require_text(&draft.name, "product name")?;
        Ok(self.db.update_product(product_id, draft).await?)
    }

    /// Assigns `sort_order` from the position of each id in `ordered_ids`.
    pub async fn reorder_products(
        &self,
        ctx: &SessionContext,
        ordered_ids: &[Uuid],
    ) -> ServiceResult<()> {
        ctx.require_admin()?;
        for (index, product_id) in ordered_ids.iter().enumerate() {
            self.db
                .set_product_sort_order(*product_id, index as i32)
                .await?;
        }
        Ok(())
    }

    /// Deletes modules (and their contents) and entitlements before the
    /// product itself.
    pub async fn delete_product(&self, ctx: &SessionContext, product_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        self.db.get_product(product_id).await?;
        for module in self.db.list_modules(product_id).await? {
            self.db.delete_contents_for_module(module.id).await?;
            self.db.delete_module(module.id).await?;
        }
        let revoked = self.db.delete_entitlements_for_product(product_id).await?;
        self.db.delete_product(product_id).await?;
        info!(%admin_id, %product_id, revoked, "product deleted");
        Ok(())
    }

    // --- Modules (admin) ---

    pub async fn create_module(
        &self,
        ctx: &SessionContext,
        product_id: Uuid,
        mut draft: ModuleDraft,
    ) -> ServiceResult<Module> {
        ctx.require_admin()?;
        draft.title = require_text(&draft.title, "module title")?;
        Ok(self.db.insert_module(product_id, draft).await?)
    }

    /// Edits module fields only; its content items are left untouched.
    pub async fn update_module(
        &self,
        ctx: &SessionContext,
        module_id: Uuid,
        mut draft: ModuleDraft,
    ) -> ServiceResult<Module> {
        ctx.require_admin()?;
        draft.title = require_text(&draft.title, "module title")?;
        Ok(self.db.update_module(module_id, draft).await?)
    }

    pub async fn delete_module(&self, ctx: &SessionContext, module_id: Uuid) -> ServiceResult<()> {
        let admin_id = ctx.require_admin()?;
        self.db.get_module(module_id).await?;
        let removed = self.db.delete_contents_for_module(module_id).await?;
        self.db.delete_module(module_id).await?;
        info!(%admin_id, %module_id, removed, "module deleted");
        Ok(())
    }

    // --- Contents (admin) ---

    pub async fn create_content(
        &self,
        ctx: &SessionContext,
        module_id: Uuid,
        draft: ContentDraft,
    ) -> ServiceResult<ModuleContent> {
        ctx.require_admin()?;
        let draft = ContentDraft {
            title: require_text(&draft.title, "content title")?,
            body: validate_body(draft.body)?,
            sort_order: draft.sort_order,
        };
        Ok(self.db.insert_content(module_id, draft).await?)
    }

    pub async fn update_content(
        &self,
        ctx: &SessionContext,
        content_id: Uuid,
        draft: ContentDraft,
    ) -> ServiceResult<ModuleContent> {
        ctx.require_admin()?;
        let draft = ContentDraft {
            title: require_text(&draft.title, "content title")?,
            body: validate_body(draft.body)?,
            sort_order: draft.sort_order,
        };
        Ok(self.db.update_content(content_id, draft).await?)
    }

    pub async fn delete_content(&self, ctx: &SessionContext, content_id: Uuid) -> ServiceResult<()> {
        ctx.require_admin()?;
        Ok(self.db.delete_content(content_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessService;
    use crate::domain::{ProductKind, Role};
    use crate::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        catalog: CatalogService,
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
            catalog: CatalogService::new(store.clone()),
            access: AccessService::new(store.clone()),
            store,
            admin: SessionContext { user_id: Some(admin_id), is_admin: true },
            member: SessionContext { user_id: Some(member_id), is_admin: false },
        }
    }

    fn draft(name: &str, kind: ProductKind) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            image_url: None,
            kind,
            purchase_link: None,
            sort_order: 0,
        }
    }

    fn module(title: &str, sort_order: i32) -> ModuleDraft {
        ModuleDraft {
            title: title.to_string(),
            sort_order,
            image_url: None,
            show_order: true,
        }
    }

    fn content(title: &str, body: ContentBody, sort_order: i32) -> ContentDraft {
        ContentDraft {
            title: title.to_string(),
            body,
            sort_order,
        }
    }

    #[test]
    fn content_actions_dispatch_on_kind() {
        let item = |body| ModuleContent {
            id: Uuid::new_v4(),
            module_id: Uuid::new_v4(),
            title: "x".into(),
            body,
            sort_order: 0,
        };
        assert_eq!(
            resolve_content_action(&item(ContentBody::Pdf { url: "a.pdf".into() })),
            ContentAction::Embed { url: "a.pdf".into() }
        );
        assert_eq!(
            resolve_content_action(&item(ContentBody::Video { url: "v".into() })),
            ContentAction::Embed { url: "v".into() }
        );
        assert_eq!(
            resolve_content_action(&item(ContentBody::Link { url: "l".into() })),
            ContentAction::OpenExternal { url: "l".into() }
        );
        assert_eq!(
            resolve_content_action(&item(ContentBody::App { url: "app".into() })),
            ContentAction::OpenExternal { url: "app".into() }
        );
        assert_eq!(
            resolve_content_action(&item(ContentBody::Text { content: "hi".into() })),
            ContentAction::RenderText { content: "hi".into() }
        );
    }

    #[tokio::test]
    async fn locked_product_exposes_no_content_until_granted() {
        let f = fixture().await;
        let p = f
            .catalog
            .create_product(&f.admin, draft("Ebook", ProductKind::Simple))
            .await
            .unwrap();
        let m = f.catalog.create_module(&f.admin, p.id, module("Intro", 1)).await.unwrap();
        let c = f
            .catalog
            .create_content(&f.admin, m.id, content("Guide", ContentBody::Pdf { url: "https://x/guide.pdf".into() }, 1))
            .await
            .unwrap();

        match f.catalog.open_product(&f.member, p.id).await.unwrap() {
            ProductView::Locked { purchase_link, .. } => assert!(purchase_link.is_none()),
            ProductView::Unlocked { .. } => panic!("unentitled user saw content"),
        }
        assert!(matches!(
            f.catalog.open_content(&f.member, c.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            f.catalog.list_modules(&f.member, p.id).await,
            Err(ServiceError::AuthorizationDenied(_))
        ));

        let user = f.member.user_id.unwrap();
        f.access.grant_access(&f.admin, user, p.id).await.unwrap();

        let (_, action) = f.catalog.open_content(&f.member, c.id).await.unwrap();
        assert_eq!(action, ContentAction::Embed { url: "https://x/guide.pdf".into() });
        assert!(matches!(
            f.catalog.open_product(&f.member, p.id).await.unwrap(),
            ProductView::Unlocked { .. }
        ));
    }

    #[tokio::test]
    async fn modules_come_back_in_sort_order() {
        let f = fixture().await;
        let p = f
            .catalog
            .create_product(&f.admin, draft("Course", ProductKind::Modules))
            .await
            .unwrap();
        let m2 = f.catalog.create_module(&f.admin, p.id, module("Second", 2)).await.unwrap();
        let m1 = f.catalog.create_module(&f.admin, p.id, module("First", 1)).await.unwrap();
        f.catalog
            .create_content(&f.admin, m1.id, content("b", ContentBody::Text { content: "b".into() }, 2))
            .await
            .unwrap();
        f.catalog
            .create_content(&f.admin, m1.id, content("a", ContentBody::Text { content: "a".into() }, 1))
            .await
            .unwrap();

        let modules = f.catalog.list_modules(&f.admin, p.id).await.unwrap();
        let ids: Vec<Uuid> = modules.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![m1.id, m2.id]);

        let titles: Vec<String> = f
            .catalog
            .list_contents(&f.admin, m1.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn content_requires_the_field_its_kind_needs() {
        let f = fixture().await;
        let p = f.catalog.create_product(&f.admin, draft("P", ProductKind::Modules)).await.unwrap();
        let m = f.catalog.create_module(&f.admin, p.id, module("M", 1)).await.unwrap();

        let err = f
            .catalog
            .create_content(&f.admin, m.id, content("L", ContentBody::Link { url: "  ".into() }, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = f
            .catalog
            .create_content(&f.admin, m.id, content("T", ContentBody::Text { content: "".into() }, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.store.list_contents(m.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn editing_a_module_keeps_its_contents() {
        let f = fixture().await;
        let p = f.catalog.create_product(&f.admin, draft("P", ProductKind::Modules)).await.unwrap();
        let m = f.catalog.create_module(&f.admin, p.id, module("Old", 1)).await.unwrap();
        f.catalog
            .create_content(&f.admin, m.id, content("c", ContentBody::Video { url: "v".into() }, 1))
            .await
            .unwrap();

        f.catalog.update_module(&f.admin, m.id, module("New", 5)).await.unwrap();
        assert_eq!(f.store.list_contents(m.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_module_removes_its_contents() {
        let f = fixture().await;
        let p = f.catalog.create_product(&f.admin, draft("P", ProductKind::Modules)).await.unwrap();
        let m = f.catalog.create_module(&f.admin, p.id, module("M", 1)).await.unwrap();
        let c = f
            .catalog
            .create_content(&f.admin, m.id, content("c", ContentBody::Video { url: "v".into() }, 1))
            .await
            .unwrap();

        f.catalog.delete_module(&f.admin, m.id).await.unwrap();
        assert!(f.store.get_content(c.id).await.is_err());
        assert!(f.store.get_module(m.id).await.is_err());
    }

    #[tokio::test]
    async fn deleting_a_product_cascades_and_revokes() {
        let f = fixture().await;
        let p = f.catalog.create_product(&f.admin, draft("P", ProductKind::Modules)).await.unwrap();
        let m = f.catalog.create_module(&f.admin, p.id, module("M", 1)).await.unwrap();
        let user = f.member.user_id.unwrap();
        f.access.grant_access(&f.admin, user, p.id).await.unwrap();

        f.catalog.delete_product(&f.admin, p.id).await.unwrap();
        assert!(f.store.get_module(m.id).await.is_err());
        assert!(!f.access.has_access(user, p.id).await.unwrap());
        assert!(matches!(
            f.catalog.open_product(&f.member, p.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reorder_sets_listing_order() {
        let f = fixture().await;
        let a = f.catalog.create_product(&f.admin, draft("A", ProductKind::Simple)).await.unwrap();
        let b = f.catalog.create_product(&f.admin, draft("B", ProductKind::Simple)).await.unwrap();

        f.catalog.reorder_products(&f.admin, &[b.id, a.id]).await.unwrap();
        let names: Vec<String> = f
            .catalog
            .list_products(&f.member)
            .await
            .unwrap()
            .into_iter()
            .map(|card| card.product.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn members_cannot_edit_the_catalog() {
        let f = fixture().await;
        let err = f
            .catalog
            .create_product(&f.member, draft("P", ProductKind::Simple))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied(_)));
        assert!(f.store.list_products().await.unwrap().is_empty());
    }
}
