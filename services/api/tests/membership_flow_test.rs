//! End-to-end flows through the router: catalog access, moderation and
//! notifications.

mod common;

use axum::http::StatusCode;
use common::create_test_app;
use serde_json::json;

#[tokio::test]
async fn test_locked_product_unlocks_after_grant() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (member_id, member) = app.signup("member@example.com").await;

    // Admin builds a product with one video lesson.
    let product = app
        .request(
            "POST",
            "/admin/products",
            Some(&admin),
            Some(json!({ "name": "Course", "kind": "modules", "purchase_link": "https://pay.example.com/course" })),
        )
        .await;
    assert_eq!(product.status, StatusCode::CREATED);
    let product_id = product.body["id"].as_str().unwrap().to_string();

    let module = app
        .request(
            "POST",
            &format!("/admin/products/{}/modules", product_id),
            Some(&admin),
            Some(json!({ "title": "Week 1" })),
        )
        .await;
    assert_eq!(module.status, StatusCode::CREATED);
    let module_id = module.body["id"].as_str().unwrap().to_string();

    let content = app
        .request(
            "POST",
            &format!("/admin/modules/{}/contents", module_id),
            Some(&admin),
            Some(json!({ "title": "Intro", "kind": "video", "url": "https://video.example.com/1" })),
        )
        .await;
    assert_eq!(content.status, StatusCode::CREATED);
    let content_id = content.body["id"].as_str().unwrap().to_string();

    // Before the grant the member only sees the purchase link.
    let locked = app
        .request("GET", &format!("/products/{}", product_id), Some(&member), None)
        .await;
    assert_eq!(locked.status, StatusCode::OK);
    assert_eq!(locked.body["status"], "locked");
    assert_eq!(locked.body["purchase_link"], "https://pay.example.com/course");
    assert!(locked.body.get("modules").is_none());

    let denied = app
        .request("GET", &format!("/content/{}/action", content_id), Some(&member), None)
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    // Granting twice is harmless.
    for _ in 0..2 {
        let grant = app
            .request(
                "PUT",
                &format!("/admin/users/{}/products/{}", member_id, product_id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(grant.status, StatusCode::OK);
    }

    let unlocked = app
        .request("GET", &format!("/products/{}", product_id), Some(&member), None)
        .await;
    assert_eq!(unlocked.body["status"], "unlocked");
    assert_eq!(unlocked.body["modules"][0]["contents"][0]["title"], "Intro");

    let action = app
        .request("GET", &format!("/content/{}/action", content_id), Some(&member), None)
        .await;
    assert_eq!(action.status, StatusCode::OK);
    assert_eq!(action.body["action"]["action"], "embed");
    assert_eq!(action.body["action"]["url"], "https://video.example.com/1");

    let mine = app.request("GET", "/my-products", Some(&member), None).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_content_body_must_match_its_type() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let product = app
        .request("POST", "/admin/products", Some(&admin), Some(json!({ "name": "Guide" })))
        .await;
    let product_id = product.body["id"].as_str().unwrap().to_string();
    let module = app
        .request(
            "POST",
            &format!("/admin/products/{}/modules", product_id),
            Some(&admin),
            Some(json!({ "title": "Only module" })),
        )
        .await;
    let module_id = module.body["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            "POST",
            &format!("/admin/modules/{}/contents", module_id),
            Some(&admin),
            Some(json!({ "title": "Notes", "kind": "text", "url": "https://x.example.com" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_moderated_post_and_comment_flow() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, author) = app.signup("author@example.com").await;
    let (_, reader) = app.signup("reader@example.com").await;

    let policy = app
        .request(
            "PUT",
            "/admin/settings/require_comment_approval",
            Some(&admin),
            Some(json!({ "value": "true" })),
        )
        .await;
    assert_eq!(policy.status, StatusCode::OK);

    // The post waits for approval and is hidden from other members.
    let post = app
        .request(
            "POST",
            "/community/posts",
            Some(&author),
            Some(json!({ "content": "  Hello everyone  " })),
        )
        .await;
    assert_eq!(post.status, StatusCode::CREATED);
    assert_eq!(post.body["approved"], false);
    assert_eq!(post.body["content"], "Hello everyone");
    let post_id = post.body["id"].as_str().unwrap().to_string();

    let feed = app.request("GET", "/community/posts", Some(&reader), None).await;
    assert!(feed.body.as_array().unwrap().is_empty());
    let hidden = app
        .request("GET", &format!("/community/posts/{}", post_id), Some(&reader), None)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let own_feed = app.request("GET", "/community/posts", Some(&author), None).await;
    assert_eq!(own_feed.body.as_array().unwrap().len(), 1);

    let queue = app.request("GET", "/admin/moderation", Some(&admin), None).await;
    assert_eq!(queue.body["posts"].as_array().unwrap().len(), 1);

    let approve = app
        .request(
            "POST",
            &format!("/admin/moderation/posts/{}/approve", post_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(approve.status, StatusCode::NO_CONTENT);

    // A reader's comment is pending until approved, then counted and announced.
    let comment = app
        .request(
            "POST",
            &format!("/community/posts/{}/comments", post_id),
            Some(&reader),
            Some(json!({ "content": "Welcome!" })),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);
    assert_eq!(comment.body["approved"], false);
    let comment_id = comment.body["id"].as_str().unwrap().to_string();

    let before = app
        .request("GET", &format!("/community/posts/{}", post_id), Some(&reader), None)
        .await;
    assert_eq!(before.body["post"]["comments_count"], 0);

    let approved = app
        .request(
            "POST",
            &format!("/admin/moderation/comments/{}/approve", comment_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["comments_count"], 1);

    let unread = app
        .request("GET", "/notifications/unread-count", Some(&author), None)
        .await;
    assert_eq!(unread.body["unread"], 1);
    let inbox = app.request("GET", "/notifications", Some(&author), None).await;
    assert_eq!(inbox.body[0]["kind"], "comment");
}

#[tokio::test]
async fn test_members_cannot_post_under_another_name() {
    let app = create_test_app();
    let (_, member) = app.signup("member@example.com").await;
    let (_, admin) = app.admin("admin@example.com").await;

    let denied = app
        .request(
            "POST",
            "/community/posts",
            Some(&member),
            Some(json!({ "content": "hi", "display_name": "Support Team" })),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let allowed = app
        .request(
            "POST",
            "/community/posts",
            Some(&admin),
            Some(json!({ "content": "hi", "display_name": "Support Team" })),
        )
        .await;
    assert_eq!(allowed.status, StatusCode::CREATED);

    let feed = app.request("GET", "/community/posts", Some(&member), None).await;
    assert_eq!(feed.body[0]["author"]["name"], "Support Team");
}

#[tokio::test]
async fn test_like_toggles_and_reconcile_finds_nothing_to_fix() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, member) = app.signup("member@example.com").await;

    let post = app
        .request("POST", "/community/posts", Some(&admin), Some(json!({ "content": "News" })))
        .await;
    let post_id = post.body["id"].as_str().unwrap().to_string();
    let like_uri = format!("/community/posts/{}/like", post_id);

    let liked = app.request("POST", &like_uri, Some(&member), None).await;
    assert_eq!(liked.body["liked"], true);
    assert_eq!(liked.body["likes_count"], 1);

    let feed = app.request("GET", "/community/posts", Some(&member), None).await;
    assert_eq!(feed.body[0]["liked_by_me"], true);

    let unliked = app.request("POST", &like_uri, Some(&member), None).await;
    assert_eq!(unliked.body["liked"], false);
    assert_eq!(unliked.body["likes_count"], 0);

    let reconcile = app
        .request("POST", "/admin/moderation/reconcile", Some(&admin), None)
        .await;
    assert_eq!(reconcile.status, StatusCode::OK);
    assert_eq!(reconcile.body["posts_corrected"], 0);
}

#[tokio::test]
async fn test_broadcast_reaches_every_member() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, first) = app.signup("first@example.com").await;
    let (_, second) = app.signup("second@example.com").await;

    let missing_title = app
        .request(
            "POST",
            "/admin/notifications",
            Some(&admin),
            Some(json!({ "recipient": "all", "title": " ", "message": "Body" })),
        )
        .await;
    assert_eq!(missing_title.status, StatusCode::BAD_REQUEST);

    let sent = app
        .request(
            "POST",
            "/admin/notifications",
            Some(&admin),
            Some(json!({ "recipient": "all", "title": "Live class", "message": "Tonight at 8pm" })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body["delivered"], 3);

    for token in [&first, &second] {
        let unread = app
            .request("GET", "/notifications/unread-count", Some(token), None)
            .await;
        assert_eq!(unread.body["unread"], 1);
    }

    let read_all = app
        .request("POST", "/notifications/read-all", Some(&first), None)
        .await;
    assert_eq!(read_all.body["updated"], 1);
    let after = app
        .request("GET", "/notifications/unread-count", Some(&first), None)
        .await;
    assert_eq!(after.body["unread"], 0);

    let history = app
        .request("GET", "/admin/notifications/history", Some(&admin), None)
        .await;
    assert_eq!(history.body[0]["recipients"], 3);

    let member_history = app
        .request("GET", "/admin/notifications/history", Some(&second), None)
        .await;
    assert_eq!(member_history.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_store_outage_is_reported_as_retryable() {
    let app = create_test_app();
    let (_, member) = app.signup("member@example.com").await;

    app.store.set_unavailable(true);
    let response = app.request("GET", "/products", Some(&member), None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["retryable"], true);
}

#[tokio::test]
async fn test_admin_writes_to_unknown_users_are_not_found() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let ghost = uuid::Uuid::new_v4();

    let product = app
        .request("POST", "/admin/products", Some(&admin), Some(json!({ "name": "Course" })))
        .await;
    let product_id = product.body["id"].as_str().unwrap().to_string();

    let grant = app
        .request(
            "PUT",
            &format!("/admin/users/{}/products/{}", ghost, product_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(grant.status, StatusCode::NOT_FOUND, "{}", grant.text);

    let promote = app
        .request("PUT", &format!("/admin/users/{}/admin", ghost), Some(&admin), None)
        .await;
    assert_eq!(promote.status, StatusCode::NOT_FOUND);

    let notify = app
        .request(
            "POST",
            "/admin/notifications",
            Some(&admin),
            Some(json!({ "recipient": ghost.to_string(), "title": "Hi", "message": "there" })),
        )
        .await;
    assert_eq!(notify.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_someone_elses_pending_post_is_not_found() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, author) = app.signup("author@example.com").await;
    let (_, other) = app.signup("other@example.com").await;

    app.request(
        "PUT",
        "/admin/settings/require_comment_approval",
        Some(&admin),
        Some(json!({ "value": "true" })),
    )
    .await;
    let post = app
        .request("POST", "/community/posts", Some(&author), Some(json!({ "content": "pending" })))
        .await;
    assert_eq!(post.status, StatusCode::CREATED);
    let post_id = post.body["id"].as_str().unwrap().to_string();

    let delete = app
        .request("DELETE", &format!("/community/posts/{}", post_id), Some(&other), None)
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let own = app
        .request("DELETE", &format!("/community/posts/{}", post_id), Some(&author), None)
        .await;
    assert_eq!(own.status, StatusCode::NO_CONTENT);
}
