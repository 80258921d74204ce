//! Banner carousel and updates feed through the router.

mod common;

use axum::http::StatusCode;
use common::create_test_app;
use serde_json::json;

#[tokio::test]
async fn test_banner_lifecycle() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, member) = app.signup("member@example.com").await;

    let created = app
        .request(
            "POST",
            "/admin/banners",
            Some(&admin),
            Some(json!({ "image_url": "https://cdn.example.com/a.png", "title": "Launch", "sort_order": 1 })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.body["active"], true);
    let banner_id = created.body["id"].as_str().unwrap().to_string();

    let second = app
        .request(
            "POST",
            "/admin/banners",
            Some(&admin),
            Some(json!({ "image_url": "https://cdn.example.com/b.png", "sort_order": 0 })),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);

    let visible = app.request("GET", "/banners", Some(&member), None).await;
    assert_eq!(visible.status, StatusCode::OK);
    let images: Vec<&str> = visible
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["image_url"].as_str().unwrap())
        .collect();
    assert_eq!(images, vec!["https://cdn.example.com/b.png", "https://cdn.example.com/a.png"]);

    // Hiding a banner removes it from the member carousel but not the admin list.
    let hidden = app
        .request(
            "PUT",
            &format!("/admin/banners/{}/active", banner_id),
            Some(&admin),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(hidden.status, StatusCode::OK);
    assert_eq!(hidden.body["active"], false);

    let visible = app.request("GET", "/banners", Some(&member), None).await;
    assert_eq!(visible.body.as_array().unwrap().len(), 1);
    let all = app.request("GET", "/admin/banners", Some(&admin), None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let deleted = app
        .request("DELETE", &format!("/admin/banners/{}", banner_id), Some(&admin), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let again = app
        .request("DELETE", &format!("/admin/banners/{}", banner_id), Some(&admin), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_banner_requires_an_image_and_an_admin() {
    let app = create_test_app();
    let (_, admin) = app.admin("admin@example.com").await;
    let (_, member) = app.signup("member@example.com").await;

    let blank = app
        .request("POST", "/admin/banners", Some(&admin), Some(json!({ "image_url": " " })))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let forbidden = app
        .request(
            "POST",
            "/admin/banners",
            Some(&member),
            Some(json!({ "image_url": "https://cdn.example.com/a.png" })),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let anonymous = app.request("GET", "/banners", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_feed_posts_are_published_by_admins() {
    let app = create_test_app();
    let (admin_id, admin) = app.admin("admin@example.com").await;
    let (_, member) = app.signup("member@example.com").await;

    for content in ["First update", "Second update"] {
        let post = app
            .request("POST", "/admin/feed", Some(&admin), Some(json!({ "content": content })))
            .await;
        assert_eq!(post.status, StatusCode::CREATED, "{}", post.text);
    }

    let feed = app.request("GET", "/feed", Some(&member), None).await;
    assert_eq!(feed.status, StatusCode::OK);
    let posts = feed.body.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["content"], "Second update");
    assert_eq!(posts[0]["author_id"], admin_id.to_string());

    let member_post = app
        .request("POST", "/admin/feed", Some(&member), Some(json!({ "content": "Hi" })))
        .await;
    assert_eq!(member_post.status, StatusCode::FORBIDDEN);

    let oldest = posts[1]["id"].as_str().unwrap().to_string();
    let deleted = app
        .request("DELETE", &format!("/admin/feed/{}", oldest), Some(&admin), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let feed = app.request("GET", "/feed", Some(&member), None).await;
    assert_eq!(feed.body.as_array().unwrap().len(), 1);
}
