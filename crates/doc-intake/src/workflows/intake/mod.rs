//! Document intake for service applications.
//!
//! Clients open an application against a catalog service, fill its checklist of input slots
//! with uploaded files, and submit once every required slot holds a document. Staff review
//! submitted applications, override their status, and maintain the slots each service asks for.

pub mod catalog_import;
pub mod checklist;
pub mod domain;
pub mod error;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub(crate) mod status;
pub mod submission;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod tests;

pub use catalog_import::{CatalogImportError, CatalogImporter, ImportedCatalog};
pub use checklist::{join_checklist, ChecklistResolver, ChecklistView};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ChecklistItem, ClientId, DocumentId,
    FileUpload, InputSlot, LocalizedText, Service, ServiceId, SlotDraft, SlotId,
    UploadedDocument, DEFAULT_LOCALE,
};
pub use error::{IntakeError, NotFoundError, ValidationError};
pub use memory::{InMemoryDocumentStore, InMemoryIntakeStore, RecordingIntakeEndpoint};
pub use repository::{
    ApplicationFilter, ApplicationRepository, DocumentRepository, RepositoryError, ServiceCatalog,
};
pub use router::{error_response, intake_router};
pub use service::{ApplicationIntakeService, IntakeBackends, SessionOutcome};
pub use session::{ChecklistSession, PendingChange, SessionError, SlotState};
pub use status::{Actor, ApplicationStatusMachine};
pub use submission::{
    can_submit, can_submit_in, ChecklistSnapshot, ChecklistSubmission, IntakeEndpoint,
    SnapshotItem, SubmissionReadiness,
};
pub use transport::{HttpDocumentStore, HttpIntakeEndpoint, TransportFailure};
pub use upload::{
    storage_key, DocumentStore, DocumentUploadGateway, UploadConstraints,
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES,
};
