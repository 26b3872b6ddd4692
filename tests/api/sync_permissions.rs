use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::helpers::TestApp;

async fn create_role(app: &TestApp, access_token: &str, name: &str) -> Uuid {
    let res = app
        .dashboard_post("/dashboard/roles", access_token, &json!({ "name": name }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = res.json().await.expect("Failed to receive role json");
    body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("No role id in response")
}

fn permission_names(body: &Value) -> Vec<String> {
    body["permissions"]
        .as_array()
        .expect("permissions is not an array")
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn sync_replaces_the_whole_set() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;
    let role_id = create_role(&app, &credentials.access_token, "Editor").await;
    let path = format!("/dashboard/sync-permissions/{role_id}");

    let first = json!({
        "permission_ids": [
            app.permission_id("post-index").await,
            app.permission_id("post-store").await,
        ]
    });
    let res = app
        .dashboard_put(&path, &credentials.access_token, &first)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let second = json!({ "permission_ids": [app.permission_id("tags-index").await] });
    let res = app
        .dashboard_put(&path, &credentials.access_token, &second)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.expect("Failed to receive sync json");
    assert_eq!(body["name"], "Editor");
    assert_eq!(permission_names(&body), vec!["tags-index"]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn sync_with_an_unknown_permission_changes_nothing() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;
    let role_id = create_role(&app, &credentials.access_token, "Editor").await;
    let path = format!("/dashboard/sync-permissions/{role_id}");

    let initial = json!({ "permission_ids": [app.permission_id("post-index").await] });
    let res = app
        .dashboard_put(&path, &credentials.access_token, &initial)
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let broken = json!({
        "permission_ids": [
            app.permission_id("post-store").await,
            Uuid::new_v4(),
            app.permission_id("post-update").await,
        ]
    });
    let res = app
        .dashboard_put(&path, &credentials.access_token, &broken)
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app.dashboard_get(&path, &credentials.access_token).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.expect("Failed to receive role json");
    assert_eq!(permission_names(&body), vec!["post-index"]);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn sync_of_a_missing_role_is_not_found() {
    let app = TestApp::new().await;
    let credentials = app.auth_test_user().await;

    let res = app
        .dashboard_put(
            &format!("/dashboard/sync-permissions/{}", Uuid::new_v4()),
            &credentials.access_token,
            &json!({ "permission_ids": [] }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
