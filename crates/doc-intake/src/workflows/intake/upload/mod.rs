mod constraints;

pub use constraints::{UploadConstraints, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationId, DocumentId, FileUpload, SlotId, UploadedDocument,
};
use super::error::{IntakeError, NotFoundError};
use super::repository::{
    ApplicationRepository, DocumentRepository, RepositoryError, ServiceCatalog,
};
use super::transport::TransportFailure;

/// Object storage receiving document bytes and handing back a canonical reference.
pub trait DocumentStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        file: &FileUpload,
        content_type: &str,
    ) -> Result<String, TransportFailure>;
}

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

/// Storage key for one slot of one application.
pub fn storage_key(application_id: &ApplicationId, slot_id: &SlotId, file_name: &str) -> String {
    let sanitized: String = file_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    format!("applications/{}/{}/{}", application_id.0, slot_id.0, sanitized)
}

/// Validates a file locally, transmits it, then records it against its slot.
pub struct DocumentUploadGateway {
    catalog: Arc<dyn ServiceCatalog>,
    applications: Arc<dyn ApplicationRepository>,
    documents: Arc<dyn DocumentRepository>,
    store: Arc<dyn DocumentStore>,
    constraints: UploadConstraints,
}

impl DocumentUploadGateway {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        applications: Arc<dyn ApplicationRepository>,
        documents: Arc<dyn DocumentRepository>,
        store: Arc<dyn DocumentStore>,
        constraints: UploadConstraints,
    ) -> Self {
        Self {
            catalog,
            applications,
            documents,
            store,
            constraints,
        }
    }

    pub fn constraints(&self) -> &UploadConstraints {
        &self.constraints
    }

    /// Upload against the gateway's configured constraints.
    pub fn upload(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
        file: FileUpload,
    ) -> Result<UploadedDocument, IntakeError> {
        self.upload_with(application_id, slot_id, file, &self.constraints)
    }

    /// Upload against caller-supplied constraints.
    ///
    /// Nothing is transmitted unless the file passes `constraints`, and the slot's previous
    /// document is only replaced once the store has accepted the new one.
    pub fn upload_with(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
        file: FileUpload,
        constraints: &UploadConstraints,
    ) -> Result<UploadedDocument, IntakeError> {
        if let Err(violation) = constraints.check(&file) {
            warn!(%application_id, %slot_id, file = %file.file_name, %violation, "upload rejected locally");
            return Err(violation.into());
        }

        let application = self.application(application_id)?;
        self.ensure_slot(&application, slot_id)?;

        let key = storage_key(application_id, slot_id, &file.file_name);
        let content_type = file
            .content_type
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&file.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        let file_reference = self
            .store
            .put(&key, &file, &content_type)
            .map_err(|failure| {
                warn!(%application_id, %slot_id, error = %failure, "document transmission failed");
                IntakeError::UploadFailed(failure)
            })?;

        let existing_id = self
            .documents
            .for_application(application_id)?
            .into_iter()
            .find(|document| &document.input_slot_id == slot_id)
            .map(|document| document.id);
        let replaced = existing_id.is_some();

        let document = UploadedDocument {
            id: existing_id.unwrap_or_else(next_document_id),
            application_id: application_id.clone(),
            input_slot_id: slot_id.clone(),
            file_reference,
            file_name: file.file_name.trim().to_string(),
            size_bytes: file.size(),
            uploaded_at: Utc::now(),
        };
        let stored = self.documents.upsert(document).map_err(|err| match err {
            RepositoryError::NotFound => {
                warn!(%application_id, %slot_id, "application deleted during upload");
                IntakeError::from(NotFoundError::Application(application_id.clone()))
            }
            other => IntakeError::from(other),
        })?;

        info!(%application_id, %slot_id, document = %stored.id, replaced, "document uploaded");
        Ok(stored)
    }

    /// Remove the document reference held by one slot; an empty slot is left as is.
    pub fn clear(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
    ) -> Result<Option<UploadedDocument>, IntakeError> {
        self.application(application_id)?;
        let removed = self.documents.remove(application_id, slot_id)?;
        if removed.is_some() {
            info!(%application_id, %slot_id, "document cleared");
        }
        Ok(removed)
    }

    fn application(&self, application_id: &ApplicationId) -> Result<Application, IntakeError> {
        self.applications
            .fetch(application_id)?
            .ok_or_else(|| NotFoundError::Application(application_id.clone()).into())
    }

    fn ensure_slot(&self, application: &Application, slot_id: &SlotId) -> Result<(), IntakeError> {
        let known = self
            .catalog
            .slots(&application.service_id)?
            .iter()
            .any(|slot| &slot.id == slot_id);
        if known {
            Ok(())
        } else {
            Err(NotFoundError::Slot {
                service_id: application.service_id.clone(),
                slot_id: slot_id.clone(),
            }
            .into())
        }
    }
}
