//! services/api/src/web/catalog.rs
//!
//! Product catalog endpoints: the member-facing product list and viewer, and
//! the admin CRUD for products, modules and content items.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use membership_core::access::OwnedProduct;
use membership_core::catalog::{ModuleWithContents, ProductCard};
use membership_core::domain::{ContentDraft, Module, ModuleContent, ModuleDraft, ProductDraft};
use membership_core::{ContentAction, ContentBody, Product, ProductKind, ProductView, ServiceError, SessionContext};
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
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// `simple` or `modules`.
    pub kind: String,
    pub purchase_link: Option<String>,
    pub sort_order: i32,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            image_url: p.image_url,
            kind: p.kind.as_str().to_string(),
            purchase_link: p.purchase_link,
            sort_order: p.sort_order,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProductCardResponse {
    pub product: ProductResponse,
    pub unlocked: bool,
}

impl From<ProductCard> for ProductCardResponse {
    fn from(card: ProductCard) -> Self {
        Self {
            product: card.product.into(),
            unlocked: card.unlocked,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ModuleResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub sort_order: i32,
    pub image_url: Option<String>,
    pub show_order: bool,
}

impl From<Module> for ModuleResponse {
    fn from(m: Module) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            title: m.title,
            sort_order: m.sort_order,
            image_url: m.image_url,
            show_order: m.show_order,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    /// One of `pdf`, `video`, `link`, `text`, `app`.
    pub kind: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub sort_order: i32,
}

impl From<ModuleContent> for ContentResponse {
    fn from(c: ModuleContent) -> Self {
        Self {
            id: c.id,
            module_id: c.module_id,
            title: c.title,
            kind: c.body.kind().to_string(),
            url: c.body.url().map(str::to_string),
            content: c.body.text().map(str::to_string),
            sort_order: c.sort_order,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ModuleWithContentsResponse {
    pub module: ModuleResponse,
    pub contents: Vec<ContentResponse>,
}

impl From<ModuleWithContents> for ModuleWithContentsResponse {
    fn from(m: ModuleWithContents) -> Self {
        Self {
            module: m.module.into(),
            contents: m.contents.into_iter().map(Into::into).collect(),
        }
    }
}

/// A locked product carries only its purchase link, never module data.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductViewResponse {
    Locked {
        product: ProductResponse,
        purchase_link: Option<String>,
    },
    Unlocked {
        product: ProductResponse,
        modules: Vec<ModuleWithContentsResponse>,
    },
}

impl From<ProductView> for ProductViewResponse {
    fn from(view: ProductView) -> Self {
        match view {
            ProductView::Locked {
                product,
                purchase_link,
            } => Self::Locked {
                product: product.into(),
                purchase_link,
            },
            ProductView::Unlocked { product, modules } => Self::Unlocked {
                product: product.into(),
                modules: modules.into_iter().map(Into::into).collect(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContentActionResponse {
    Embed { url: String },
    OpenExternal { url: String },
    RenderText { content: String },
}

impl From<ContentAction> for ContentActionResponse {
    fn from(action: ContentAction) -> Self {
        match action {
            ContentAction::Embed { url } => Self::Embed { url },
            ContentAction::OpenExternal { url } => Self::OpenExternal { url },
            ContentAction::RenderText { content } => Self::RenderText { content },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OpenContentResponse {
    pub content: ContentResponse,
    pub action: ContentActionResponse,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct OwnedProductResponse {
    pub product: ProductResponse,
    pub granted_at: DateTime<Utc>,
}

impl From<OwnedProduct> for OwnedProductResponse {
    fn from(owned: OwnedProduct) -> Self {
        Self {
            product: owned.product.into(),
            granted_at: owned.entitlement.granted_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Defaults to `simple`.
    pub kind: Option<String>,
    pub purchase_link: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl ProductRequest {
    fn into_draft(self) -> Result<ProductDraft, ApiError> {
        let kind = match self.kind.as_deref() {
            None => ProductKind::Simple,
            Some(raw) => ProductKind::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown product type '{}'", raw)))?,
        };
        Ok(ProductDraft {
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            kind,
            purchase_link: self.purchase_link,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub product_ids: Vec<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct ModuleRequest {
    pub title: String,
    #[serde(default)]
    pub sort_order: i32,
    pub image_url: Option<String>,
    #[serde(default = "default_show_order")]
    pub show_order: bool,
}

fn default_show_order() -> bool {
    true
}

impl From<ModuleRequest> for ModuleDraft {
    fn from(req: ModuleRequest) -> Self {
        Self {
            title: req.title,
            sort_order: req.sort_order,
            image_url: req.image_url,
            show_order: req.show_order,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ContentRequest {
    pub title: String,
    pub kind: String,
    pub url: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl ContentRequest {
    fn into_draft(self) -> Result<ContentDraft, ApiError> {
        let kind = self.kind.clone();
        let body = ContentBody::from_parts(&self.kind, self.url, self.content).ok_or_else(|| {
            ServiceError::Validation(format!(
                "a '{}' item needs a {}",
                kind,
                if kind == "text" { "content body" } else { "url" }
            ))
        })?;
        Ok(ContentDraft {
            title: self.title,
            body,
            sort_order: self.sort_order,
        })
    }
}

//=========================================================================================
// Member Handlers
//=========================================================================================

/// List every product with its lock state for the caller.
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "Products in display order", body = [ProductCardResponse]))
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<ProductCardResponse>>, ApiError> {
    let cards = state.catalog.list_products(&ctx).await?;
    Ok(Json(cards.into_iter().map(Into::into).collect()))
}

/// Open a product. Locked products carry only the purchase link.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product view", body = ProductViewResponse),
        (status = 404, description = "No such product")
    )
)]
pub async fn open_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductViewResponse>, ApiError> {
    let view = state.catalog.open_product(&ctx, product_id).await?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    get,
    path = "/products/{id}/modules",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Modules in display order", body = [ModuleResponse]),
        (status = 403, description = "Product is locked for the caller")
    )
)]
pub async fn list_modules_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<ModuleResponse>>, ApiError> {
    let modules = state.catalog.list_modules(&ctx, product_id).await?;
    Ok(Json(modules.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/modules/{id}/contents",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 200, description = "Content items in display order", body = [ContentResponse]),
        (status = 403, description = "Product is locked for the caller")
    )
)]
pub async fn list_contents_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(module_id): Path<Uuid>,
) -> Result<Json<Vec<ContentResponse>>, ApiError> {
    let contents = state.catalog.list_contents(&ctx, module_id).await?;
    Ok(Json(contents.into_iter().map(Into::into).collect()))
}

/// What the client should do to open a content item.
#[utoipa::path(
    get,
    path = "/content/{id}/action",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Resolved action", body = OpenContentResponse),
        (status = 403, description = "Product is locked for the caller"),
        (status = 404, description = "No such content")
    )
)]
pub async fn content_action_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(content_id): Path<Uuid>,
) -> Result<Json<OpenContentResponse>, ApiError> {
    let (content, action) = state.catalog.open_content(&ctx, content_id).await?;
    Ok(Json(OpenContentResponse {
        content: content.into(),
        action: action.into(),
    }))
}

/// The caller's products, newest grant first.
#[utoipa::path(
    get,
    path = "/my-products",
    responses((status = 200, description = "Owned products", body = [OwnedProductResponse]))
)]
pub async fn my_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Vec<OwnedProductResponse>>, ApiError> {
    let owned = state.access.my_products(&ctx).await?;
    Ok(Json(owned.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/admin/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<ProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.create_product(&ctx, req.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

#[utoipa::path(
    put,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "No such product")
    )
)]
pub async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog
        .update_product(&ctx, product_id, req.into_draft()?)
        .await?;
    Ok(Json(product.into()))
}

/// Deletes the product with its modules, contents and grants.
#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "No such product")
    )
)]
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(&ctx, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/products/reorder",
    request_body = ReorderRequest,
    responses((status = 204, description = "Order saved"))
)]
pub async fn reorder_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Json(req): Json<ReorderRequest>,
) -> Result<StatusCode, ApiError> {
    state.catalog.reorder_products(&ctx, &req.product_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/products/{id}/modules",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ModuleRequest,
    responses(
        (status = 201, description = "Module created", body = ModuleResponse),
        (status = 404, description = "No such product")
    )
)]
pub async fn create_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<ModuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let module = state
        .catalog
        .create_module(&ctx, product_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ModuleResponse::from(module))))
}

#[utoipa::path(
    put,
    path = "/admin/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    request_body = ModuleRequest,
    responses(
        (status = 200, description = "Module updated", body = ModuleResponse),
        (status = 404, description = "No such module")
    )
)]
pub async fn update_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(module_id): Path<Uuid>,
    Json(req): Json<ModuleRequest>,
) -> Result<Json<ModuleResponse>, ApiError> {
    let module = state.catalog.update_module(&ctx, module_id, req.into()).await?;
    Ok(Json(module.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/modules/{id}",
    params(("id" = Uuid, Path, description = "Module id")),
    responses(
        (status = 204, description = "Module and its contents deleted"),
        (status = 404, description = "No such module")
    )
)]
pub async fn delete_module_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(module_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_module(&ctx, module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/modules/{id}/contents",
    params(("id" = Uuid, Path, description = "Module id")),
    request_body = ContentRequest,
    responses(
        (status = 201, description = "Content created", body = ContentResponse),
        (status = 400, description = "Body does not match the content type"),
        (status = 404, description = "No such module")
    )
)]
pub async fn create_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(module_id): Path<Uuid>,
    Json(req): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .catalog
        .create_content(&ctx, module_id, req.into_draft()?)
        .await?;
    Ok((StatusCode::CREATED, Json(ContentResponse::from(content))))
}

#[utoipa::path(
    put,
    path = "/admin/contents/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Content updated", body = ContentResponse),
        (status = 404, description = "No such content")
    )
)]
pub async fn update_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state
        .catalog
        .update_content(&ctx, content_id, req.into_draft()?)
        .await?;
    Ok(Json(content.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/contents/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 204, description = "Content deleted"),
        (status = 404, description = "No such content")
    )
)]
pub async fn delete_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    Path(content_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_content(&ctx, content_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
