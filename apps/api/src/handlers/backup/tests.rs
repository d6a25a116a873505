use axum::body::{Bytes, to_bytes};
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use doctero_domain::BackupTier;
use serde_json::Value;

use super::{backup_dashboard_handler, create_backup_handler, list_backups_handler};
use crate::test_support::test_state;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|_| unreachable!());
    serde_json::from_slice(&bytes).unwrap_or_else(|_| unreachable!())
}

fn request(tier: &str) -> Result<Bytes, BytesRejection> {
    Ok(Bytes::from(format!(r#"{{"tier":"{tier}"}}"#)))
}

#[tokio::test]
async fn create_without_body_writes_manual_backup() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);

    let response = create_backup_handler(State(state), Ok(Bytes::new()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["artifact"]["tier"], "manual");
    assert_eq!(body["artifact"]["size_bytes"], 5);
    let file_name = body["artifact"]["file_name"].as_str().unwrap_or_default();
    assert!(file_name.starts_with("manual_"));
    assert!(file_name.ends_with("Z.dump"));
    assert!(root.path().join("manual").join(file_name).is_file());
}

#[tokio::test]
async fn create_accepts_named_tier() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);

    let response = create_backup_handler(State(state), request("Weekly"))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["artifact"]["tier"], "weekly");
    assert_eq!(body["message"], "weekly backup created");
}

#[tokio::test]
async fn create_rejects_unknown_tier() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);

    let response = create_backup_handler(State(state), request("hourly"))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn failed_export_returns_error_and_leaves_no_file() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, true);

    let response = create_backup_handler(State(state), request("daily"))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "export_failed");
    let leftovers = std::fs::read_dir(root.path().join("daily"))
        .map(|entries| entries.count())
        .unwrap_or_default();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn overlapping_manual_backup_is_conflict() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);
    let _permit = state
        .backup_service
        .try_acquire(BackupTier::Manual)
        .unwrap_or_else(|_| unreachable!());

    let response = create_backup_handler(State(state.clone()), Ok(Bytes::new()))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "skipped_overlap");
}

#[tokio::test]
async fn list_contains_every_tier_newest_first() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let daily = root.path().join("daily");
    std::fs::create_dir_all(&daily).unwrap_or_else(|_| unreachable!());
    std::fs::write(daily.join("daily_20261015T020000.000Z.dump"), b"a")
        .unwrap_or_else(|_| unreachable!());
    std::fs::write(daily.join("daily_20261016T020000.000Z.dump"), b"bb")
        .unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);

    let response = list_backups_handler(State(state)).await.into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let tiers = body["tiers"].as_array().cloned().unwrap_or_default();
    let names: Vec<&str> = tiers
        .iter()
        .filter_map(|tier| tier["tier"].as_str())
        .collect();
    assert_eq!(names, vec!["daily", "weekly", "monthly", "manual"]);
    assert_eq!(
        tiers[0]["artifacts"][0]["file_name"],
        "daily_20261016T020000.000Z.dump"
    );
    assert_eq!(
        tiers[0]["artifacts"][0]["created_at"],
        "2026-10-16T02:00:00.000Z"
    );
    assert_eq!(
        tiers[0]["artifacts"][1]["file_name"],
        "daily_20261015T020000.000Z.dump"
    );
    assert_eq!(tiers[1]["artifacts"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn dashboard_reports_totals_and_retention() {
    let root = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
    let state = test_state(&root, false);
    let created = create_backup_handler(State(state.clone()), request("monthly"))
        .await
        .into_response();
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = backup_dashboard_handler(State(state)).await.into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["scheduler_running"], false);
    assert_eq!(body["total_artifacts"], 1);
    assert_eq!(body["total_size_bytes"], 5);
    assert_eq!(body["tiers"][0]["retention"], "30 days");
    assert_eq!(body["tiers"][2]["artifact_count"], 1);
    assert_eq!(body["tiers"][2]["retention"], "24 months");
    assert_eq!(body["tiers"][3]["retention"], Value::Null);
    assert_eq!(body["tiers"][2]["next_run_at"], Value::Null);
}
