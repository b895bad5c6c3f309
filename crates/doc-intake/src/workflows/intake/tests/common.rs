use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::intake::catalog_import::ImportedCatalog;
use crate::workflows::intake::domain::{
    Application, ApplicationId, ApplicationStatus, ClientId, FileUpload, InputSlot,
    LocalizedText, Service, ServiceId, SlotId,
};
use crate::workflows::intake::memory::{
    InMemoryDocumentStore, InMemoryIntakeStore, RecordingIntakeEndpoint,
};
use crate::workflows::intake::repository::{
    ApplicationFilter, ApplicationRepository, RepositoryError,
};
use crate::workflows::intake::service::{ApplicationIntakeService, IntakeBackends};
use crate::workflows::intake::submission::{ChecklistSubmission, IntakeEndpoint};
use crate::workflows::intake::transport::TransportFailure;
use crate::workflows::intake::upload::{DocumentStore, UploadConstraints};
use crate::workflows::intake::{intake_router, ChecklistSnapshot};

pub(super) const VISA: &str = "work-visa";

pub(super) fn service_id() -> ServiceId {
    ServiceId(VISA.to_string())
}

pub(super) fn slot(id: &str) -> SlotId {
    SlotId(id.to_string())
}

pub(super) fn client() -> ClientId {
    ClientId("client-ana".to_string())
}

/// Work visa with two required slots and one optional slot.
pub(super) fn visa_catalog() -> ImportedCatalog {
    let service = Service {
        id: service_id(),
        title: LocalizedText::new("en", "Work visa").with("ru", "Рабочая виза"),
        description: LocalizedText::new("en", "Document package for a work visa"),
        price: 45_000,
        slot_order: vec![slot("passport"), slot("photo"), slot("cv")],
    };

    let slots = vec![
        input_slot("passport", "Passport", "Паспорт", true),
        input_slot("photo", "Photo", "Фотография", true),
        input_slot("cv", "CV", "Резюме", false),
    ];

    ImportedCatalog {
        services: vec![service],
        slots,
    }
}

fn input_slot(id: &str, en: &str, ru: &str, required: bool) -> InputSlot {
    InputSlot {
        id: slot(id),
        service_id: service_id(),
        name: LocalizedText::new("en", en).with("ru", ru),
        description: LocalizedText::default(),
        required,
    }
}

pub(super) fn pdf(name: &str, size: usize) -> FileUpload {
    FileUpload::new(name, vec![b'%'; size])
}

/// Service wired to in-memory backends plus handles on every fake it uses.
pub(super) struct Fixture {
    pub(super) service: Arc<ApplicationIntakeService>,
    pub(super) store: InMemoryIntakeStore,
    pub(super) documents: Arc<ScriptedDocumentStore>,
    pub(super) intake: Arc<ScriptedIntakeEndpoint>,
}

impl Fixture {
    pub(super) fn open_application(&self) -> Application {
        self.service
            .create_application(client(), service_id())
            .expect("application created")
    }

    pub(super) fn upload(&self, application: &Application, slot_id: &str, name: &str) {
        self.service
            .upload(&application.id, &slot(slot_id), pdf(name, 256))
            .expect("upload succeeds");
    }

    pub(super) fn complete(&self, application: &Application) {
        self.upload(application, "passport", "passport.pdf");
        self.upload(application, "photo", "photo.jpg");
    }

    pub(super) fn snapshot(&self, application_id: &ApplicationId) -> ChecklistSnapshot {
        let view = self
            .service
            .checklist(application_id)
            .expect("checklist resolves");
        ChecklistSnapshot::from_items(&view.items)
    }

    pub(super) fn status_of(&self, application_id: &ApplicationId) -> ApplicationStatus {
        self.service
            .application(application_id)
            .expect("application exists")
            .status
    }
}

pub(super) fn build_fixture() -> Fixture {
    build_fixture_with(UploadConstraints::default())
}

pub(super) fn build_fixture_with(constraints: UploadConstraints) -> Fixture {
    let store = InMemoryIntakeStore::default();
    store
        .load_catalog(visa_catalog())
        .expect("catalog loads");
    let documents = Arc::new(ScriptedDocumentStore::default());
    let intake = Arc::new(ScriptedIntakeEndpoint::default());

    let backends = IntakeBackends {
        catalog: Arc::new(store.clone()),
        applications: Arc::new(store.clone()),
        documents: Arc::new(store.clone()),
        store: documents.clone(),
        intake: intake.clone(),
    };

    Fixture {
        service: Arc::new(ApplicationIntakeService::new(backends, constraints)),
        store,
        documents,
        intake,
    }
}

pub(super) fn router_for(fixture: &Fixture) -> axum::Router {
    intake_router(fixture.service.clone())
}

/// Object store that counts transmissions and can be told to fail the next ones.
#[derive(Default)]
pub(super) struct ScriptedDocumentStore {
    pub(super) objects: InMemoryDocumentStore,
    calls: AtomicUsize,
    failure: Mutex<Option<TransportFailure>>,
    during_put: Mutex<Option<Interleaved>>,
}

/// Action run once while a transmission is in flight.
type Interleaved = Box<dyn FnOnce() + Send>;

fn run_interleaved(slot: &Mutex<Option<Interleaved>>) {
    let action = slot.lock().expect("interleave mutex").take();
    if let Some(action) = action {
        action();
    }
}

impl ScriptedDocumentStore {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn fail_with(&self, failure: TransportFailure) {
        *self.failure.lock().expect("failure mutex") = Some(failure);
    }

    pub(super) fn recover(&self) {
        *self.failure.lock().expect("failure mutex") = None;
    }

    pub(super) fn during_next_put(&self, action: impl FnOnce() + Send + 'static) {
        *self.during_put.lock().expect("interleave mutex") = Some(Box::new(action));
    }
}

impl DocumentStore for ScriptedDocumentStore {
    fn put(
        &self,
        key: &str,
        file: &FileUpload,
        content_type: &str,
    ) -> Result<String, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        run_interleaved(&self.during_put);
        if let Some(failure) = self.failure.lock().expect("failure mutex").clone() {
            return Err(failure);
        }
        self.objects.put(key, file, content_type)
    }
}

/// Intake endpoint that records submissions and can be told to fail.
#[derive(Default)]
pub(super) struct ScriptedIntakeEndpoint {
    pub(super) recorder: RecordingIntakeEndpoint,
    calls: AtomicUsize,
    failure: Mutex<Option<TransportFailure>>,
    during_submit: Mutex<Option<Interleaved>>,
}

impl ScriptedIntakeEndpoint {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn fail_with(&self, failure: TransportFailure) {
        *self.failure.lock().expect("failure mutex") = Some(failure);
    }

    pub(super) fn submissions(&self) -> Vec<ChecklistSubmission> {
        self.recorder.submissions()
    }

    pub(super) fn during_next_submit(&self, action: impl FnOnce() + Send + 'static) {
        *self.during_submit.lock().expect("interleave mutex") = Some(Box::new(action));
    }
}

impl IntakeEndpoint for ScriptedIntakeEndpoint {
    fn submit(&self, submission: &ChecklistSubmission) -> Result<(), TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        run_interleaved(&self.during_submit);
        if let Some(failure) = self.failure.lock().expect("failure mutex").clone() {
            return Err(failure);
        }
        self.recorder.submit(submission)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _id: &ApplicationId,
        _from: ApplicationStatus,
        _to: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ApplicationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn unavailable_service() -> ApplicationIntakeService {
    let store = InMemoryIntakeStore::default();
    store
        .load_catalog(visa_catalog())
        .expect("catalog loads");
    let backends = IntakeBackends {
        catalog: Arc::new(store.clone()),
        applications: Arc::new(UnavailableRepository),
        documents: Arc::new(store),
        store: Arc::new(InMemoryDocumentStore::default()),
        intake: Arc::new(RecordingIntakeEndpoint::default()),
    };
    ApplicationIntakeService::new(backends, UploadConstraints::default())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
