//! services/api/src/web/router.rs
//!
//! Assembles the full axum application: public routes, member routes behind
//! `require_auth`, admin routes behind `require_admin`, CORS, and Swagger UI.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::{
    announcements, auth, catalog, community,
    middleware::{require_admin, require_auth},
    moderation, notifications,
    rest::ApiDoc,
    settings,
    state::AppState,
    users,
};

pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/settings/public", get(settings::public_settings_handler));

    // Admin routes (admin role required, checked after auth)
    let admin_routes = Router::new()
        .route("/admin/products", post(catalog::create_product_handler))
        .route("/admin/products/reorder", post(catalog::reorder_products_handler))
        .route(
            "/admin/products/{id}",
            put(catalog::update_product_handler).delete(catalog::delete_product_handler),
        )
        .route("/admin/products/{id}/modules", post(catalog::create_module_handler))
        .route(
            "/admin/modules/{id}",
            put(catalog::update_module_handler).delete(catalog::delete_module_handler),
        )
        .route("/admin/modules/{id}/contents", post(catalog::create_content_handler))
        .route(
            "/admin/contents/{id}",
            put(catalog::update_content_handler).delete(catalog::delete_content_handler),
        )
        .route(
            "/admin/users",
            get(users::list_users_handler).post(auth::create_user_handler),
        )
        .route(
            "/admin/users/{id}/admin",
            put(users::grant_admin_handler).delete(users::revoke_admin_handler),
        )
        .route("/admin/users/{id}/products", get(users::user_products_handler))
        .route(
            "/admin/users/{id}/products/{product_id}",
            put(users::grant_access_handler).delete(users::revoke_access_handler),
        )
        .route("/admin/moderation", get(moderation::pending_queue_handler))
        .route(
            "/admin/moderation/posts/{id}/approve",
            post(moderation::approve_post_handler),
        )
        .route(
            "/admin/moderation/comments/{id}/approve",
            post(moderation::approve_comment_handler),
        )
        .route("/admin/moderation/approve-all", post(moderation::approve_all_handler))
        .route("/admin/moderation/reconcile", post(moderation::reconcile_handler))
        .route("/admin/notifications", post(notifications::send_notification_handler))
        .route(
            "/admin/notifications/history",
            get(notifications::sent_history_handler),
        )
        .route("/admin/settings", get(settings::list_settings_handler))
        .route("/admin/settings/{key}", put(settings::set_setting_handler))
        .route("/admin/export/schema", get(settings::export_schema_handler))
        .route(
            "/admin/banners",
            get(announcements::list_banners_handler).post(announcements::create_banner_handler),
        )
        .route(
            "/admin/banners/{id}",
            put(announcements::update_banner_handler).delete(announcements::delete_banner_handler),
        )
        .route(
            "/admin/banners/{id}/active",
            put(announcements::set_banner_active_handler),
        )
        .route("/admin/feed", post(announcements::create_feed_post_handler))
        .route("/admin/feed/{id}", delete(announcements::delete_feed_post_handler))
        .layer(axum_middleware::from_fn(require_admin));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route(
            "/profile",
            get(users::get_profile_handler).put(users::update_profile_handler),
        )
        .route("/products", get(catalog::list_products_handler))
        .route("/products/{id}", get(catalog::open_product_handler))
        .route("/products/{id}/modules", get(catalog::list_modules_handler))
        .route("/modules/{id}/contents", get(catalog::list_contents_handler))
        .route("/content/{id}/action", get(catalog::content_action_handler))
        .route("/my-products", get(catalog::my_products_handler))
        .route("/banners", get(announcements::active_banners_handler))
        .route("/feed", get(announcements::feed_handler))
        .route(
            "/community/posts",
            get(community::list_posts_handler).post(community::create_post_handler),
        )
        .route(
            "/community/posts/{id}",
            get(community::get_post_handler).delete(community::delete_post_handler),
        )
        .route("/community/posts/{id}/like", post(community::toggle_like_handler))
        .route(
            "/community/posts/{id}/comments",
            get(community::list_comments_handler).post(community::create_comment_handler),
        )
        .route(
            "/community/comments/{id}",
            delete(community::delete_comment_handler),
        )
        .route("/notifications", get(notifications::list_notifications_handler))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count_handler),
        )
        .route("/notifications/{id}/read", post(notifications::mark_read_handler))
        .route("/notifications/read-all", post(notifications::mark_all_read_handler))
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
