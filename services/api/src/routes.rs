use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use doc_intake::workflows::intake::{intake_router, ApplicationIntakeService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_intake_routes(service: Arc<ApplicationIntakeService>) -> axum::Router {
    intake_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::seed_catalog;
    use axum::body::Body;
    use axum::http::Request;
    use doc_intake::workflows::intake::{
        InMemoryDocumentStore, InMemoryIntakeStore, IntakeBackends, RecordingIntakeEndpoint,
        UploadConstraints,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let store = InMemoryIntakeStore::default();
        store.load_catalog(seed_catalog()).expect("seed loads");
        let backends = IntakeBackends {
            catalog: Arc::new(store.clone()),
            applications: Arc::new(store.clone()),
            documents: Arc::new(store),
            store: Arc::new(InMemoryDocumentStore::default()),
            intake: Arc::new(RecordingIntakeEndpoint::default()),
        };
        let service = Arc::new(ApplicationIntakeService::new(
            backends,
            UploadConstraints::default(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_intake_routes(service).layer(Extension(state))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    #[tokio::test]
    async fn readiness_reflects_the_startup_flag() {
        let response = app(false).oneshot(get("/ready")).await.expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true).oneshot(get("/ready")).await.expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn intake_routes_are_mounted_beside_health() {
        let router = app(true);
        let response = router
            .clone()
            .oneshot(get("/health"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(get("/api/v1/staff/services/work-visa/slots"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let slots: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(slots.as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = app(true).oneshot(get("/metrics")).await.expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
