use reqwest::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_livez() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/livez", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_ok() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok", "store": "ok", "transport": "ok" }));
}

#[tokio::test]
async fn test_readyz_reports_unverifiable_transport() {
    let app = common::TestApp::spawn().await;
    app.transport.set_verify_fails(true);

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["store"], "ok");
    assert_eq!(body["transport"], "error");
}

#[tokio::test]
async fn test_management_routes_are_not_on_api_port() {
    let app = common::TestApp::spawn().await;

    let resp = app.authed_get("/readyz").header("Accept", "application/json").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
