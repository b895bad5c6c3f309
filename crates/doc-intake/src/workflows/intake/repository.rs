use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ClientId, InputSlot, Service, ServiceId,
    SlotDraft, SlotId, UploadedDocument,
};

/// Read/write access to services and their document slots.
///
/// Slot management always names the owning service explicitly.
pub trait ServiceCatalog: Send + Sync {
    fn service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError>;
    /// Every slot currently attached to `service_id`, in catalog order.
    fn slots(&self, service_id: &ServiceId) -> Result<Vec<InputSlot>, RepositoryError>;
    fn add_slot(&self, service_id: &ServiceId, draft: SlotDraft)
        -> Result<InputSlot, RepositoryError>;
    fn remove_slot(&self, service_id: &ServiceId, slot_id: &SlotId)
        -> Result<(), RepositoryError>;
}

/// Storage abstraction for application records.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Compare-and-set status write: `to` is applied only while the stored status is still
    /// `from`. `StatusMoved` carries the status found instead; `NotFound` when the record is gone.
    fn transition(
        &self,
        id: &ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;
    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
}

/// Uploaded document rows, unique per (application, slot).
pub trait DocumentRepository: Send + Sync {
    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<UploadedDocument>, RepositoryError>;
    /// Insert or overwrite the row for the document's (application, slot) pair.
    /// `NotFound` when the owning application no longer exists.
    fn upsert(&self, document: UploadedDocument) -> Result<UploadedDocument, RepositoryError>;
    fn remove(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
    ) -> Result<Option<UploadedDocument>, RepositoryError>;
    fn remove_all(&self, application_id: &ApplicationId) -> Result<usize, RepositoryError>;
}

/// Equality filters for the staff listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        let client_matches = self
            .client_id
            .as_ref()
            .map_or(true, |client| client == &application.client_id);
        let status_matches = self
            .status
            .map_or(true, |status| status == application.status);
        client_matches && status_matches
    }
}

/// Error enumeration for backing store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("application status changed to {current}")]
    StatusMoved { current: ApplicationStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
