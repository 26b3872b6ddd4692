use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::TestApp;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn tag_slugs_are_unique_per_table() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let mut slugs = Vec::new();
    for name in ["Café Society", "cafe society"] {
        let res = app
            .dashboard_post(
                "/dashboard/tags",
                &credentials.access_token,
                &json!({ "name": name }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let body: Value = res.json().await.expect("Failed to receive tag json");
        slugs.push(body["slug"].clone());
    }

    assert_eq!(slugs, vec![json!("cafe-society"), json!("cafe-society-1")]);

    // posts keep their own slug namespace
    let res = app
        .dashboard_post(
            "/dashboard/posts",
            &credentials.access_token,
            &json!({ "title": "Cafe Society", "content": "Espresso" }),
        )
        .await;
    let body: Value = res.json().await.expect("Failed to receive post json");
    assert_eq!(body["slug"], "cafe-society");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn tag_name_without_letters_is_rejected() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let res = app
        .dashboard_post(
            "/dashboard/tags",
            &credentials.access_token,
            &json!({ "name": "!!!" }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn updating_a_missing_tag_conflicts() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let res = app
        .dashboard_put(
            &format!("/dashboard/tags/{}", uuid::Uuid::new_v4()),
            &credentials.access_token,
            &json!({ "name": "Ghost" }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
}
