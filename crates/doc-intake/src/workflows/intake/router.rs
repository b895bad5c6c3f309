use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ClientId, FileUpload, ServiceId, SlotDraft,
    SlotId, UploadedDocument, DEFAULT_LOCALE,
};
use super::error::{IntakeError, ValidationError};
use super::repository::{ApplicationFilter, RepositoryError};
use super::service::ApplicationIntakeService;
use super::submission::{can_submit_in, ChecklistSnapshot, SubmissionReadiness};

const MIN_UPLOAD_BODY_LIMIT: usize = 1024 * 1024;

/// Router builder exposing the client and staff intake endpoints.
pub fn intake_router(service: Arc<ApplicationIntakeService>) -> Router {
    let body_limit = usize::try_from(service.upload_constraints().max_bytes().saturating_mul(2))
        .unwrap_or(usize::MAX)
        .max(MIN_UPLOAD_BODY_LIMIT);

    Router::new()
        .route("/api/v1/applications", post(create_handler))
        .route(
            "/api/v1/applications/:application_id/checklist",
            get(checklist_handler),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:slot_id",
            put(upload_handler)
                .layer(DefaultBodyLimit::max(body_limit))
                .delete(clear_handler),
        )
        .route(
            "/api/v1/applications/:application_id/submit",
            post(submit_handler),
        )
        .route("/api/v1/staff/applications", get(list_handler))
        .route(
            "/api/v1/staff/applications/:application_id",
            delete(delete_handler),
        )
        .route(
            "/api/v1/staff/applications/:application_id/status",
            put(status_handler),
        )
        .route(
            "/api/v1/staff/services/:service_id/slots",
            get(slots_handler).post(add_slot_handler),
        )
        .route(
            "/api/v1/staff/services/:service_id/slots/:slot_id",
            delete(remove_slot_handler),
        )
        .with_state(service)
}

type IntakeState = State<Arc<ApplicationIntakeService>>;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateApplicationRequest {
    pub(crate) client_id: ClientId,
    pub(crate) service_id: ServiceId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LocaleQuery {
    #[serde(default)]
    pub(crate) locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    pub(crate) file_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) client_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeRequest {
    pub(crate) status: ApplicationStatus,
}

/// Checklist item with its label resolved for the requested locale.
#[derive(Debug, Serialize)]
pub struct ChecklistItemView {
    pub slot_id: SlotId,
    pub label: String,
    pub description: String,
    pub required: bool,
    pub uploaded_document: Option<UploadedDocument>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistResponse {
    pub application: Application,
    pub locale: String,
    pub checklist: Vec<ChecklistItemView>,
    pub readiness: SubmissionReadiness,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_url: String,
    pub document: UploadedDocument,
}

pub(crate) async fn create_handler(
    State(service): IntakeState,
    Json(request): Json<CreateApplicationRequest>,
) -> Response {
    match service.create_application(request.client_id, request.service_id) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn checklist_handler(
    State(service): IntakeState,
    Path(application_id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Response {
    let locale = query
        .locale
        .filter(|locale| !locale.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    match service.checklist(&ApplicationId(application_id)) {
        Ok(view) => {
            let readiness = can_submit_in(&view.items, &locale);
            let checklist = view
                .items
                .into_iter()
                .map(|item| ChecklistItemView {
                    label: item.label.resolve(&locale).to_string(),
                    description: item.description.resolve(&locale).to_string(),
                    slot_id: item.input_slot_id,
                    required: item.required,
                    uploaded_document: item.uploaded_document,
                })
                .collect();
            let body = ChecklistResponse {
                application: view.application,
                locale,
                checklist,
                readiness,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upload_handler(
    State(service): IntakeState,
    Path((application_id, slot_id)): Path<(String, String)>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut file = FileUpload::new(query.file_name, body.to_vec());
    if let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    {
        file = file.with_content_type(content_type);
    }

    let application_id = ApplicationId(application_id);
    let slot_id = SlotId(slot_id);
    let result = tokio::task::spawn_blocking(move || {
        service.upload(&application_id, &slot_id, file)
    })
    .await;

    match result {
        Ok(Ok(document)) => {
            let body = UploadResponse {
                file_url: document.file_reference.clone(),
                document,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(err)) => error_response(err),
        Err(join_error) => internal_error(join_error.to_string()),
    }
}

pub(crate) async fn clear_handler(
    State(service): IntakeState,
    Path((application_id, slot_id)): Path<(String, String)>,
) -> Response {
    match service.clear(&ApplicationId(application_id), &SlotId(slot_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler(
    State(service): IntakeState,
    Path(application_id): Path<String>,
    Json(snapshot): Json<ChecklistSnapshot>,
) -> Response {
    let application_id = ApplicationId(application_id);
    let result =
        tokio::task::spawn_blocking(move || service.submit(&application_id, &snapshot)).await;

    match result {
        Ok(Ok(application)) => (StatusCode::ACCEPTED, Json(application)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => internal_error(join_error.to_string()),
    }
}

pub(crate) async fn list_handler(
    State(service): IntakeState,
    Query(query): Query<ListQuery>,
) -> Response {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match ApplicationStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                let payload = json!({ "error": format!("unknown status '{raw}'") });
                return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
            }
        },
    };
    let filter = ApplicationFilter {
        client_id: query
            .client_id
            .filter(|client| !client.trim().is_empty())
            .map(ClientId),
        status,
    };

    match service.list_applications(&filter) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler(
    State(service): IntakeState,
    Path(application_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Response {
    match service.change_status(&ApplicationId(application_id), request.status) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler(
    State(service): IntakeState,
    Path(application_id): Path<String>,
) -> Response {
    match service.delete_application(&ApplicationId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn slots_handler(
    State(service): IntakeState,
    Path(service_id): Path<String>,
) -> Response {
    match service.slots(&ServiceId(service_id)) {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_slot_handler(
    State(service): IntakeState,
    Path(service_id): Path<String>,
    Json(draft): Json<SlotDraft>,
) -> Response {
    match service.add_slot(&ServiceId(service_id), draft) {
        Ok(slot) => (StatusCode::CREATED, Json(slot)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_slot_handler(
    State(service): IntakeState,
    Path((service_id, slot_id)): Path<(String, String)>,
) -> Response {
    match service.remove_slot(&ServiceId(service_id), &SlotId(slot_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// Map workflow errors onto HTTP statuses with a `{"error": ...}` body.
pub fn error_response(err: IntakeError) -> Response {
    let status = match &err {
        IntakeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeError::NotFound(_) | IntakeError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        IntakeError::Repository(RepositoryError::Conflict | RepositoryError::StatusMoved { .. }) => {
            StatusCode::CONFLICT
        }
        IntakeError::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        IntakeError::UploadFailed(_) | IntakeError::SubmitFailed(_) => StatusCode::BAD_GATEWAY,
    };

    let payload = match &err {
        IntakeError::Validation(ValidationError::MissingDocuments { missing }) => json!({
            "error": err.to_string(),
            "missing": missing,
        }),
        _ => json!({ "error": err.to_string() }),
    };

    (status, Json(payload)).into_response()
}

fn internal_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
