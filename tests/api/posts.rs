use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::TestApp;

async fn create_post(app: &TestApp, access_token: &str, title: &str) -> Value {
    let res = app
        .dashboard_post(
            "/dashboard/posts",
            access_token,
            &json!({
                "title": title,
                "content": "Welcome to inkpress!",
                "is_active": true,
            }),
        )
        .await;

    assert_eq!(
        res.status(),
        StatusCode::CREATED,
        "Create post response status is not 201 CREATED, response={}",
        res.text().await.expect("Failed to recv res body")
    );

    res.json().await.expect("Failed to receive post json")
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn colliding_titles_get_numbered_slugs() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let first = create_post(&app, &credentials.access_token, "Hello World!").await;
    let second = create_post(&app, &credentials.access_token, "Hello World!").await;
    let third = create_post(&app, &credentials.access_token, "hello   world").await;

    assert_eq!(first["slug"], "hello-world");
    assert_eq!(second["slug"], "hello-world-1");
    assert_eq!(third["slug"], "hello-world-2");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn post_owner_comes_from_the_token() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let post = create_post(&app, &credentials.access_token, "Owned").await;

    assert_eq!(post["user_id"], credentials.body["user"]["id"]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn updating_a_post_keeps_its_own_slug() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let post = create_post(&app, &credentials.access_token, "Hello World!").await;
    let id = post["id"].as_str().expect("No post id");

    let res = app
        .dashboard_put(
            &format!("/dashboard/posts/{id}"),
            &credentials.access_token,
            &json!({
                "title": "Hello World!",
                "content": "Edited content",
                "is_active": true,
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.expect("Failed to receive post json");
    assert_eq!(body["slug"], "hello-world");
    assert_eq!(body["content"], "Edited content");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn deleted_post_frees_its_slug() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let post = create_post(&app, &credentials.access_token, "Hello World!").await;
    let id = post["id"].as_str().expect("No post id");

    let res = app
        .authorized(
            app.http_client.delete(app.url(&format!("/dashboard/posts/{id}"))),
            &credentials.access_token,
        )
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(res.status(), StatusCode::OK);

    let again = create_post(&app, &credentials.access_token, "Hello World!").await;
    assert_eq!(again["slug"], "hello-world");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn destroy_is_soft_and_only_once() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let post = create_post(&app, &credentials.access_token, "Short lived").await;
    let path = format!("/dashboard/posts/{}", post["id"].as_str().expect("No post id"));

    let destroy = || {
        app.authorized(app.http_client.delete(app.url(&path)), &credentials.access_token)
            .send()
    };

    let res = destroy().await.expect("Failed to send delete request");
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.expect("Failed to receive post json");
    assert!(body["deleted_at"].is_string(), "response={body}");

    let res = destroy().await.expect("Failed to send delete request");
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app.dashboard_get(&path, &credentials.access_token).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // the row is still there
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM posts")
        .fetch_one(&app.db)
        .await
        .expect("Failed to count posts");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn listing_searches_and_pages() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    for title in ["Rust tips", "Cooking pasta", "More rust tricks"] {
        create_post(&app, &credentials.access_token, title).await;
    }

    let res = app
        .dashboard_get(
            "/dashboard/posts?search=RUST&per_page=1&sort_by=title",
            &credentials.access_token,
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.expect("Failed to receive list json");
    assert_eq!(body["total"], 2);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["title"], "More rust tricks");
    assert_eq!(
        body["data"][0]["author_username"],
        app.test_user.username.as_str()
    );
}
