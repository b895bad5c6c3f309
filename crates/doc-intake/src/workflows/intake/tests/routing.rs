use super::common::*;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::intake::domain::ApplicationStatus;
use crate::workflows::intake::router::{
    checklist_handler, create_handler, CreateApplicationRequest, LocaleQuery,
};
use crate::workflows::intake::transport::TransportFailure;
use crate::workflows::intake::upload::UploadConstraints;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn create_handler_opens_a_draft() {
    let fixture = build_fixture();
    let request = CreateApplicationRequest {
        client_id: client(),
        service_id: service_id(),
    };

    let response = create_handler(State(fixture.service.clone()), axum::Json(request)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "draft");
    assert!(payload["id"].as_str().is_some_and(|id| id.starts_with("app-")));
}

#[tokio::test]
async fn checklist_handler_localizes_labels() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.upload(&application, "passport", "passport.pdf");

    let response = checklist_handler(
        State(fixture.service.clone()),
        Path(application.id.0.clone()),
        Query(LocaleQuery {
            locale: Some("ru".to_string()),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["locale"], "ru");
    assert_eq!(payload["checklist"].as_array().map(Vec::len), Some(3));
    assert_eq!(payload["checklist"][0]["label"], "Паспорт");
    assert!(payload["checklist"][0]["uploaded_document"].is_object());
    assert!(payload["checklist"][1]["uploaded_document"].is_null());
    assert_eq!(payload["readiness"]["ok"], false);
    assert_eq!(payload["readiness"]["missing"], json!(["Фотография"]));
}

#[tokio::test]
async fn create_route_rejects_unknown_services() {
    let fixture = build_fixture();
    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/applications",
            json!({ "client_id": "client-ana", "service_id": "notary" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("notary")));
}

#[tokio::test]
async fn upload_route_returns_the_file_url() {
    let fixture = build_fixture();
    let application = fixture.open_application();

    let response = router_for(&fixture)
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!(
                    "/api/v1/applications/{}/documents/passport?file_name=passport.pdf",
                    application.id
                ))
                .header(header::CONTENT_TYPE, "application/pdf")
                .body(Body::from(vec![b'%'; 512]))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let file_url = payload["file_url"].as_str().expect("file url");
    assert!(file_url.starts_with("memory://applications/"));
    assert_eq!(payload["document"]["size_bytes"], 512);
    assert_eq!(fixture.documents.calls(), 1);
}

#[tokio::test]
async fn upload_route_maps_local_rejections_to_unprocessable() {
    let fixture = build_fixture_with(UploadConstraints::default().with_max_bytes(64));
    let application = fixture.open_application();

    let response = router_for(&fixture)
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!(
                    "/api/v1/applications/{}/documents/photo?file_name=photo.jpg",
                    application.id
                ))
                .body(Body::from(vec![0_u8; 65]))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(fixture.documents.calls(), 0);
}

#[tokio::test]
async fn upload_route_maps_store_failures_to_bad_gateway() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.documents.fail_with(TransportFailure::Server {
        status: 503,
        message: "storage maintenance".to_string(),
    });

    let response = router_for(&fixture)
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!(
                    "/api/v1/applications/{}/documents/photo?file_name=photo.jpg",
                    application.id
                ))
                .body(Body::from(vec![1_u8; 32]))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("storage maintenance")));
}

#[tokio::test]
async fn submit_route_lists_missing_documents() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.upload(&application, "passport", "passport.pdf");
    let snapshot = fixture.snapshot(&application.id);

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{}/submit", application.id),
            serde_json::to_value(&snapshot).expect("snapshot serializes"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["missing"], json!(["Photo"]));
    assert_eq!(fixture.intake.calls(), 0);
}

#[tokio::test]
async fn submit_route_accepts_complete_checklists() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.complete(&application);
    let snapshot = fixture.snapshot(&application.id);

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{}/submit", application.id),
            serde_json::to_value(&snapshot).expect("snapshot serializes"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "pending");
}

#[tokio::test]
async fn clear_route_empties_the_slot() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.upload(&application, "cv", "cv.pdf");

    let response = router_for(&fixture)
        .oneshot(empty_request(
            Method::DELETE,
            &format!("/api/v1/applications/{}/documents/cv", application.id),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(fixture.store.document_count().expect("count"), 0);
}

#[tokio::test]
async fn staff_routes_list_and_decide_applications() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    fixture.complete(&application);
    let snapshot = fixture.snapshot(&application.id);
    fixture
        .service
        .submit(&application.id, &snapshot)
        .expect("submitted");
    fixture.open_application();

    let response = router_for(&fixture)
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/staff/applications?status=pending&client_id=client-ana",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let listed = payload.as_array().expect("array payload");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], application.id.0.as_str());

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/staff/applications/{}/status", application.id),
            json!({ "status": "rejected" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        fixture.status_of(&application.id),
        ApplicationStatus::Rejected
    );

    let response = router_for(&fixture)
        .oneshot(empty_request(
            Method::GET,
            "/api/v1/staff/applications?status=archived",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn staff_cannot_approve_drafts_over_http() {
    let fixture = build_fixture();
    let application = fixture.open_application();

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/staff/applications/{}/status", application.id),
            json!({ "status": "approved" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_route_is_not_repeatable() {
    let fixture = build_fixture();
    let application = fixture.open_application();
    let uri = format!("/api/v1/staff/applications/{}", application.id);

    let response = router_for(&fixture)
        .oneshot(empty_request(Method::DELETE, &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router_for(&fixture)
        .oneshot(empty_request(Method::DELETE, &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slot_routes_manage_the_service_checklist() {
    let fixture = build_fixture();
    let uri = format!("/api/v1/staff/services/{VISA}/slots");

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::POST,
            &uri,
            json!({
                "id": "medical",
                "name": { "en": "Medical certificate", "ru": "Медицинская справка" },
                "required": true
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router_for(&fixture)
        .oneshot(json_request(
            Method::POST,
            &uri,
            json!({ "id": "medical", "name": { "en": "Duplicate" } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router_for(&fixture)
        .oneshot(empty_request(Method::GET, &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(4));

    let response = router_for(&fixture)
        .oneshot(empty_request(Method::DELETE, &format!("{uri}/medical")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router_for(&fixture)
        .oneshot(empty_request(Method::DELETE, &format!("{uri}/medical")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_maps_to_service_unavailable() {
    let router = crate::workflows::intake::intake_router(std::sync::Arc::new(
        unavailable_service(),
    ));

    let response = router
        .oneshot(empty_request(Method::GET, "/api/v1/staff/applications"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
