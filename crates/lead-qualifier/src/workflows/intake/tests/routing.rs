use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::intake::{
    status_router, DirectoryJurisdictions, JurisdictionCatalog, OperationMode, ProcessingHistory,
    ShutdownSignal,
};

fn router_with_history(history: Arc<ProcessingHistory>) -> axum::Router {
    status_router(history, Arc::new(JurisdictionCatalog::bundled()))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn jurisdiction_route_serves_reference_data() {
    let router = router_with_history(Arc::new(ProcessingHistory::default()));

    let response = router
        .oneshot(get("/api/v1/jurisdictions/sc"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["code"], json!("SC"));
    assert_eq!(body["sol_duration"]["years"], json!(3));
    assert_eq!(body["counties"].as_array().map(Vec::len), Some(46));
}

#[tokio::test]
async fn unknown_jurisdiction_lists_available_codes() {
    let router = router_with_history(Arc::new(ProcessingHistory::default()));

    let response = router
        .oneshot(get("/api/v1/jurisdictions/TX"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["available"], json!(["SC", "WA"]));
}

#[tokio::test]
async fn path_like_jurisdiction_codes_are_not_found() {
    let router = router_with_history(Arc::new(ProcessingHistory::default()));

    let response = router
        .oneshot(get("/api/v1/jurisdictions/..%2Fsc"))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreadable_jurisdiction_data_is_a_server_error() {
    let root = std::env::temp_dir().join(format!("malformed-jurisdictions-{}", std::process::id()));
    std::fs::create_dir_all(&root).expect("temp dir");
    std::fs::write(root.join("sc.json"), "{ not json").expect("write profile");
    let catalog = JurisdictionCatalog::new(Box::new(DirectoryJurisdictions::new(&root)));
    let router = status_router(Arc::new(ProcessingHistory::default()), Arc::new(catalog));

    let response = router
        .oneshot(get("/api/v1/jurisdictions/sc"))
        .await
        .expect("route responds");
    std::fs::remove_dir_all(&root).ok();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().is_some_and(|error| error.contains("SC")));
}

#[tokio::test]
async fn history_and_stats_reflect_processed_leads() {
    let mut texas = lead("texas");
    texas.jurisdiction = "TX".to_string();
    let h = harness(
        config(OperationMode::Starter),
        vec![lead("accept"), texas],
        ScriptedCompletions::scoring(90.0),
    );
    h.processor
        .process_pending(&ShutdownSignal::new())
        .expect("cycle runs");
    let router = router_with_history(h.history.clone());

    let response = router
        .clone()
        .oneshot(get("/api/v1/leads/history?limit=1"))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let entries = body["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["lead_id"], json!("texas"));
    assert_eq!(entries[0]["status"], json!("FAILED"));

    let response = router
        .oneshot(get("/api/v1/leads/stats"))
        .await
        .expect("route responds");
    let body = read_json_body(response).await;
    assert_eq!(body["processed"], json!(2));
    assert_eq!(body["auto_accepted"], json!(1));
    assert_eq!(body["failed"], json!(1));
    assert_eq!(body["average_score"], json!(90.0));
}
