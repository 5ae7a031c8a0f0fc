use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::credentials::repository::CredentialRepository;
use crate::workflows::credentials::service::CredentialService;
use crate::workflows::fleet::FleetRepository;

#[tokio::test]
async fn driver_credentials_route_returns_resolved_rows() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    repository
        .insert_type(admin_verified_type())
        .expect("seed admin");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/drivers/driver-1/credentials")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["credentials"].as_array().expect("array").len(), 2);
    assert_eq!(payload["credentials"][0]["display_status"], "not_submitted");
    assert_eq!(payload["credentials"][1]["display_status"], "awaiting");
    assert_eq!(payload["progress"]["total"], 2);
    assert_eq!(payload["progress"]["percentage"], 0);
}

#[tokio::test]
async fn vehicle_credentials_route_returns_resolved_rows() {
    let (service, repository, _, _) = build_service();
    repository
        .insert_type(vehicle_inspection_type())
        .expect("seed inspection");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/vehicles/vehicle-1/credentials")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["credentials"].as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn unknown_subjects_return_not_found() {
    let (service, _, _, _) = build_service();
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/drivers/driver-404/credentials")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "driver not found");
}

#[tokio::test]
async fn ensure_route_is_idempotent() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let router = credential_router_with_service(service);
    let uri = "/api/v1/drivers/driver-1/credentials/ctype-license/ensure";

    let first = router
        .clone()
        .oneshot(
            axum::http::Request::post(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);
    let first_payload = read_json_body(first).await;

    let second = router
        .oneshot(
            axum::http::Request::post(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::OK);
    let second_payload = read_json_body(second).await;

    assert_eq!(first_payload["id"], second_payload["id"]);
    assert_eq!(second_payload["status"], "not_submitted");
}

#[tokio::test]
async fn submit_route_accepts_documents() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::post(format!("/api/v1/credentials/{}/submit", record.id.0))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "kind": "document",
                        "path": "driver-1/credentials/x/1.pdf",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "pending_review");
    assert_eq!(payload["submission_version"], 1);
}

#[tokio::test]
async fn submit_route_rejects_mechanism_mismatches() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::post(format!("/api/v1/credentials/{}/submit", record.id.0))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "kind": "form",
                        "form_data": {"field": "value"},
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upload_route_stores_bytes_under_the_credential() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::post(format!(
                "/api/v1/credentials/{}/documents?filename=insurance.pdf",
                record.id.0
            ))
            .header(axum::http::header::CONTENT_TYPE, "application/pdf")
            .body(axum::body::Body::from(vec![1u8, 2, 3]))
            .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let path = payload["path"].as_str().expect("path");
    assert!(path.starts_with(&format!("driver-1/credentials/{}/", record.id.0)));
    assert!(path.ends_with(".pdf"));
    assert_eq!(payload["content_type"], "application/pdf");
    assert_eq!(payload["size_bytes"], 3);
}

#[tokio::test]
async fn signed_url_route_round_trips_stored_paths() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    let stored = service
        .store_document(&record.id, "card.pdf", vec![1], mime::APPLICATION_PDF)
        .expect("store");
    let router = credential_router_with_service(service);

    let found = router
        .clone()
        .oneshot(
            axum::http::Request::get(format!(
                "/api/v1/documents/signed-url?path={}",
                stored.path
            ))
            .body(axum::body::Body::empty())
            .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(found.status(), StatusCode::OK);
    let payload = read_json_body(found).await;
    let url = payload["url"].as_str().expect("url");
    let token = payload["token"].as_str().expect("token");
    assert!(url.contains(token));

    let missing = router
        .oneshot(
            axum::http::Request::get("/api/v1/documents/signed-url?path=driver-1/none.pdf")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_route_approves_pending_rows() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    service
        .submit(
            &record.id,
            serde_json::from_value(json!({
                "kind": "document",
                "path": "a/1.pdf",
            }))
            .expect("submission"),
        )
        .expect("submit");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::post(format!("/api/v1/credentials/{}/review", record.id.0))
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "reviewer": "reviewer-1",
                        "action": "approve",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "approved");
    assert_eq!(payload["reviewed_by"], "reviewer-1");
}

#[tokio::test]
async fn history_route_lists_newest_first() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    service
        .submit(
            &record.id,
            serde_json::from_value(json!({
                "kind": "document",
                "path": "a/1.pdf",
            }))
            .expect("submission"),
        )
        .expect("submit");
    service
        .review(
            &record.id,
            "reviewer-1",
            serde_json::from_value(json!({"action": "approve"})).expect("action"),
        )
        .expect("approve");
    let router = credential_router_with_service(service);

    let response = router
        .oneshot(
            axum::http::Request::get(format!("/api/v1/credentials/{}/history", record.id.0))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let entries = payload.as_array().expect("array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "approved");
    assert_eq!(entries[1]["action"], "submitted");
}

#[tokio::test]
async fn review_queue_routes_expose_the_workload() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    service
        .submit(
            &record.id,
            serde_json::from_value(json!({
                "kind": "document",
                "path": "a/1.pdf",
            }))
            .expect("submission"),
        )
        .expect("submit");
    let router = credential_router_with_service(service);

    let queue = router
        .clone()
        .oneshot(
            axum::http::Request::get("/api/v1/review-queue")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(queue.status(), StatusCode::OK);
    let queue_payload = read_json_body(queue).await;
    let entries = queue_payload.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["subject_name"], "Jordan Avery");
    assert_eq!(entries[0]["credential"]["display_status"], "pending_review");

    let stats = router
        .oneshot(
            axum::http::Request::get("/api/v1/review-queue/stats")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(stats.status(), StatusCode::OK);
    let stats_payload = read_json_body(stats).await;
    assert_eq!(stats_payload["pending_review"], 1);
    assert_eq!(stats_payload["total"], 1);
}

#[tokio::test]
async fn handlers_surface_repository_outages() {
    let fleet = Arc::new(MemoryFleet::default());
    fleet.insert_driver(driver()).expect("seed driver");
    let service = Arc::new(CredentialService::new(
        Arc::new(UnavailableCredentials),
        fleet,
        Arc::new(MemoryStore::default()),
    ));

    let response = crate::workflows::credentials::router::driver_credentials_handler::<
        UnavailableCredentials,
        MemoryFleet,
        MemoryStore,
    >(
        State(service),
        axum::extract::Path("driver-1".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "repository unavailable: database offline");
}

#[tokio::test]
async fn review_handler_rejects_unreviewable_rows() {
    let (service, repository, _, _) = build_service();
    repository.insert_type(document_type()).expect("seed doc");
    let record = service
        .ensure(driver_subject(), &document_type().id)
        .expect("ensure");
    let service = Arc::new(service);

    let response = crate::workflows::credentials::router::review_handler::<
        MemoryCredentials,
        MemoryFleet,
        MemoryStore,
    >(
        State(service),
        axum::extract::Path(record.id.0.clone()),
        axum::Json(
            serde_json::from_value(json!({
                "reviewer": "reviewer-1",
                "action": "approve",
            }))
            .expect("request"),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
