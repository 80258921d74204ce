//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification. Every handler in
//! `web` is listed here; their request and response schemas are collected
//! from the `#[utoipa::path]` annotations.

use utoipa::OpenApi;

use crate::web::{
    announcements, auth, catalog, community, moderation, notifications, settings, users,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::create_user_handler,
        users::get_profile_handler,
        users::update_profile_handler,
        users::list_users_handler,
        users::grant_admin_handler,
        users::revoke_admin_handler,
        users::user_products_handler,
        users::grant_access_handler,
        users::revoke_access_handler,
        catalog::list_products_handler,
        catalog::open_product_handler,
        catalog::list_modules_handler,
        catalog::list_contents_handler,
        catalog::content_action_handler,
        catalog::my_products_handler,
        catalog::create_product_handler,
        catalog::update_product_handler,
        catalog::delete_product_handler,
        catalog::reorder_products_handler,
        catalog::create_module_handler,
        catalog::update_module_handler,
        catalog::delete_module_handler,
        catalog::create_content_handler,
        catalog::update_content_handler,
        catalog::delete_content_handler,
        community::list_posts_handler,
        community::create_post_handler,
        community::get_post_handler,
        community::delete_post_handler,
        community::toggle_like_handler,
        community::list_comments_handler,
        community::create_comment_handler,
        community::delete_comment_handler,
        moderation::pending_queue_handler,
        moderation::approve_post_handler,
        moderation::approve_comment_handler,
        moderation::approve_all_handler,
        moderation::reconcile_handler,
        notifications::list_notifications_handler,
        notifications::unread_count_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
        notifications::send_notification_handler,
        notifications::sent_history_handler,
        settings::public_settings_handler,
        settings::list_settings_handler,
        settings::set_setting_handler,
        settings::export_schema_handler,
        announcements::active_banners_handler,
        announcements::feed_handler,
        announcements::list_banners_handler,
        announcements::create_banner_handler,
        announcements::update_banner_handler,
        announcements::set_banner_active_handler,
        announcements::delete_banner_handler,
        announcements::create_feed_post_handler,
        announcements::delete_feed_post_handler,
    ),
    tags(
        (name = "Membership API", description = "Members area: catalog, community, notifications and admin tools.")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_and_member_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/auth/signup"));
        assert!(paths.contains_key("/community/posts/{id}/like"));
        assert!(paths.contains_key("/admin/export/schema"));
        assert!(paths.contains_key("/admin/banners/{id}/active"));
        assert!(paths.contains_key("/feed"));
    }
}
