use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::checklist::{ChecklistResolver, ChecklistView};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, ClientId, FileUpload, InputSlot, ServiceId,
    SlotDraft, SlotId, UploadedDocument,
};
use super::error::{IntakeError, NotFoundError, ValidationError};
use super::repository::{
    ApplicationFilter, ApplicationRepository, DocumentRepository, RepositoryError, ServiceCatalog,
};
use super::session::{ChecklistSession, SessionError};
use super::status::StaffStatusAuthority;
use super::submission::{
    can_submit_in, ChecklistSnapshot, IntakeEndpoint, SubmissionReadiness, SubmissionValidator,
};
use super::upload::{DocumentStore, DocumentUploadGateway, UploadConstraints};

/// Backing store and remote collaborators the intake service is assembled from.
#[derive(Clone)]
pub struct IntakeBackends {
    pub catalog: Arc<dyn ServiceCatalog>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub store: Arc<dyn DocumentStore>,
    pub intake: Arc<dyn IntakeEndpoint>,
}

/// Client- and staff-facing surface over the checklist, upload, submission, and status
/// components.
pub struct ApplicationIntakeService {
    catalog: Arc<dyn ServiceCatalog>,
    applications: Arc<dyn ApplicationRepository>,
    documents: Arc<dyn DocumentRepository>,
    resolver: ChecklistResolver,
    uploads: DocumentUploadGateway,
    submissions: SubmissionValidator,
    staff: StaffStatusAuthority,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Outcome of a session-driven upload or clear.
#[derive(Debug)]
pub enum SessionOutcome {
    Confirmed,
    RolledBack(IntakeError),
}

impl ApplicationIntakeService {
    pub fn new(backends: IntakeBackends, constraints: UploadConstraints) -> Self {
        let IntakeBackends {
            catalog,
            applications,
            documents,
            store,
            intake,
        } = backends;

        let resolver =
            ChecklistResolver::new(catalog.clone(), applications.clone(), documents.clone());
        let uploads = DocumentUploadGateway::new(
            catalog.clone(),
            applications.clone(),
            documents.clone(),
            store,
            constraints,
        );
        let submissions = SubmissionValidator::new(applications.clone(), intake);
        let staff = StaffStatusAuthority::new(applications.clone());

        Self {
            catalog,
            applications,
            documents,
            resolver,
            uploads,
            submissions,
            staff,
        }
    }

    pub fn upload_constraints(&self) -> &UploadConstraints {
        self.uploads.constraints()
    }

    // Client surface.

    /// Open a new draft application for `service_id`.
    pub fn create_application(
        &self,
        client_id: ClientId,
        service_id: ServiceId,
    ) -> Result<Application, IntakeError> {
        if self.catalog.service(&service_id)?.is_none() {
            return Err(NotFoundError::Service(service_id).into());
        }

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            client_id,
            service_id,
            status: ApplicationStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        let stored = self.applications.insert(application)?;
        info!(application_id = %stored.id, service_id = %stored.service_id, "application created");
        Ok(stored)
    }

    pub fn application(&self, application_id: &ApplicationId) -> Result<Application, IntakeError> {
        self.applications
            .fetch(application_id)?
            .ok_or_else(|| NotFoundError::Application(application_id.clone()).into())
    }

    pub fn checklist(&self, application_id: &ApplicationId) -> Result<ChecklistView, IntakeError> {
        self.resolver.resolve(application_id)
    }

    pub fn upload(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
        file: FileUpload,
    ) -> Result<UploadedDocument, IntakeError> {
        self.uploads.upload(application_id, slot_id, file)
    }

    pub fn upload_with(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
        file: FileUpload,
        constraints: &UploadConstraints,
    ) -> Result<UploadedDocument, IntakeError> {
        self.uploads
            .upload_with(application_id, slot_id, file, constraints)
    }

    pub fn clear(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
    ) -> Result<Option<UploadedDocument>, IntakeError> {
        self.uploads.clear(application_id, slot_id)
    }

    /// Derived "ready to submit" flag for the current checklist.
    pub fn readiness(
        &self,
        application_id: &ApplicationId,
        locale: &str,
    ) -> Result<SubmissionReadiness, IntakeError> {
        let view = self.resolver.resolve(application_id)?;
        Ok(can_submit_in(&view.items, locale))
    }

    /// Submit the full checklist the client last saw.
    ///
    /// The snapshot must name every slot of the freshly resolved checklist with the same
    /// document references; anything else is rejected as stale before the gate runs.
    pub fn submit(
        &self,
        application_id: &ApplicationId,
        snapshot: &ChecklistSnapshot,
    ) -> Result<Application, IntakeError> {
        let view = self.resolver.resolve(application_id)?;
        if !snapshot.matches(&view.items) {
            return Err(ValidationError::StaleChecklist.into());
        }
        self.submissions.submit(&view)
    }

    pub fn open_session(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ChecklistSession, IntakeError> {
        Ok(ChecklistSession::new(self.resolver.resolve(application_id)?))
    }

    /// Upload through a session: mark the slot pending, then confirm or roll back.
    pub fn upload_into_session(
        &self,
        session: &mut ChecklistSession,
        slot_id: &SlotId,
        file: FileUpload,
    ) -> Result<SessionOutcome, SessionError> {
        session.begin_upload(slot_id, file.file_name.clone())?;
        let application_id = session.application().id.clone();
        match self.uploads.upload(&application_id, slot_id, file) {
            Ok(document) => {
                session.confirm(slot_id, Some(document))?;
                Ok(SessionOutcome::Confirmed)
            }
            Err(err) => {
                session.roll_back(slot_id)?;
                Ok(SessionOutcome::RolledBack(err))
            }
        }
    }

    pub fn clear_in_session(
        &self,
        session: &mut ChecklistSession,
        slot_id: &SlotId,
    ) -> Result<SessionOutcome, SessionError> {
        session.begin_clear(slot_id)?;
        let application_id = session.application().id.clone();
        match self.uploads.clear(&application_id, slot_id) {
            Ok(_) => {
                session.confirm(slot_id, None)?;
                Ok(SessionOutcome::Confirmed)
            }
            Err(err) => {
                session.roll_back(slot_id)?;
                Ok(SessionOutcome::RolledBack(err))
            }
        }
    }

    // Staff surface.

    pub fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, IntakeError> {
        Ok(self.applications.list(filter)?)
    }

    /// Staff override; does not consult the checklist.
    pub fn change_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, IntakeError> {
        self.staff.change_status(application_id, status)
    }

    /// Hard-delete an application and its document rows.
    pub fn delete_application(&self, application_id: &ApplicationId) -> Result<(), IntakeError> {
        self.applications
            .delete(application_id)
            .map_err(|err| match err {
                RepositoryError::NotFound => {
                    IntakeError::from(NotFoundError::Application(application_id.clone()))
                }
                other => IntakeError::from(other),
            })?;
        let removed = self.documents.remove_all(application_id)?;
        info!(%application_id, documents = removed, "application deleted");
        Ok(())
    }

    pub fn slots(&self, service_id: &ServiceId) -> Result<Vec<InputSlot>, IntakeError> {
        self.ensure_service(service_id)?;
        Ok(self.catalog.slots(service_id)?)
    }

    pub fn add_slot(
        &self,
        service_id: &ServiceId,
        draft: SlotDraft,
    ) -> Result<InputSlot, IntakeError> {
        self.ensure_service(service_id)?;
        let slot = self.catalog.add_slot(service_id, draft)?;
        info!(%service_id, slot_id = %slot.id, required = slot.required, "input slot added");
        Ok(slot)
    }

    pub fn remove_slot(&self, service_id: &ServiceId, slot_id: &SlotId) -> Result<(), IntakeError> {
        self.ensure_service(service_id)?;
        self.catalog
            .remove_slot(service_id, slot_id)
            .map_err(|err| match err {
                RepositoryError::NotFound => IntakeError::from(NotFoundError::Slot {
                    service_id: service_id.clone(),
                    slot_id: slot_id.clone(),
                }),
                other => IntakeError::from(other),
            })?;
        info!(%service_id, %slot_id, "input slot removed");
        Ok(())
    }

    fn ensure_service(&self, service_id: &ServiceId) -> Result<(), IntakeError> {
        match self.catalog.service(service_id)? {
            Some(_) => Ok(()),
            None => Err(NotFoundError::Service(service_id.clone()).into()),
        }
    }
}
