//! In-process backing store and collaborators for development, demos, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::catalog_import::ImportedCatalog;
use super::domain::{
    Application, ApplicationId, ApplicationStatus, FileUpload, InputSlot, Service, ServiceId,
    SlotDraft, SlotId, UploadedDocument,
};
use super::repository::{
    ApplicationFilter, ApplicationRepository, DocumentRepository, RepositoryError, ServiceCatalog,
};
use super::submission::{ChecklistSubmission, IntakeEndpoint};
use super::transport::TransportFailure;
use super::upload::DocumentStore;

#[derive(Debug, Default)]
struct StoreState {
    services: Vec<Service>,
    slots: Vec<InputSlot>,
    applications: BTreeMap<ApplicationId, Application>,
    documents: HashMap<(ApplicationId, SlotId), UploadedDocument>,
}

/// Catalog, applications, and document rows behind one lock; every call is one keyed write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIntakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryIntakeStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn load_catalog(&self, catalog: ImportedCatalog) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        for service in catalog.services {
            state.slots.retain(|slot| slot.service_id != service.id);
            state.services.retain(|existing| existing.id != service.id);
            state.services.push(service);
        }
        state.slots.extend(catalog.slots);
        Ok(())
    }

    pub fn services(&self) -> Result<Vec<Service>, RepositoryError> {
        Ok(self.lock()?.services.clone())
    }

    pub fn document_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.documents.len())
    }
}

impl ServiceCatalog for InMemoryIntakeStore {
    fn service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.services.iter().find(|service| &service.id == id).cloned())
    }

    fn slots(&self, service_id: &ServiceId) -> Result<Vec<InputSlot>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .slots
            .iter()
            .filter(|slot| &slot.service_id == service_id)
            .cloned()
            .collect())
    }

    fn add_slot(
        &self,
        service_id: &ServiceId,
        draft: SlotDraft,
    ) -> Result<InputSlot, RepositoryError> {
        let mut state = self.lock()?;
        if state
            .slots
            .iter()
            .any(|slot| &slot.service_id == service_id && slot.id == draft.id)
        {
            return Err(RepositoryError::Conflict);
        }

        let service = state
            .services
            .iter_mut()
            .find(|service| &service.id == service_id)
            .ok_or(RepositoryError::NotFound)?;
        service.slot_order.push(draft.id.clone());

        let slot = draft.into_slot(service_id.clone());
        state.slots.push(slot.clone());
        Ok(slot)
    }

    fn remove_slot(&self, service_id: &ServiceId, slot_id: &SlotId) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let before = state.slots.len();
        state
            .slots
            .retain(|slot| !(&slot.service_id == service_id && &slot.id == slot_id));
        if state.slots.len() == before {
            return Err(RepositoryError::NotFound);
        }

        if let Some(service) = state
            .services
            .iter_mut()
            .find(|service| &service.id == service_id)
        {
            service.slot_order.retain(|id| id != slot_id);
        }
        Ok(())
    }
}

impl ApplicationRepository for InMemoryIntakeStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn transition(
        &self,
        id: &ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;
        let application = state
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != from {
            return Err(RepositoryError::StatusMoved {
                current: application.status,
            });
        }
        application.status = to;
        application.updated_at = Utc::now();
        Ok(application.clone())
    }

    fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        self.lock()?
            .applications
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl DocumentRepository for InMemoryIntakeStore {
    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<UploadedDocument>, RepositoryError> {
        let state = self.lock()?;
        let mut documents: Vec<UploadedDocument> = state
            .documents
            .values()
            .filter(|document| &document.application_id == application_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.input_slot_id.cmp(&b.input_slot_id));
        Ok(documents)
    }

    fn upsert(&self, document: UploadedDocument) -> Result<UploadedDocument, RepositoryError> {
        let mut state = self.lock()?;
        if !state.applications.contains_key(&document.application_id) {
            return Err(RepositoryError::NotFound);
        }
        let key = (
            document.application_id.clone(),
            document.input_slot_id.clone(),
        );
        state.documents.insert(key, document.clone());
        Ok(document)
    }

    fn remove(
        &self,
        application_id: &ApplicationId,
        slot_id: &SlotId,
    ) -> Result<Option<UploadedDocument>, RepositoryError> {
        let mut state = self.lock()?;
        Ok(state
            .documents
            .remove(&(application_id.clone(), slot_id.clone())))
    }

    fn remove_all(&self, application_id: &ApplicationId) -> Result<usize, RepositoryError> {
        let mut state = self.lock()?;
        let before = state.documents.len();
        state
            .documents
            .retain(|(owner, _), _| owner != application_id);
        Ok(before - state.documents.len())
    }
}

/// Object store keeping bytes in memory and answering with `memory://` references.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl InMemoryDocumentStore {
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(
        &self,
        key: &str,
        file: &FileUpload,
        content_type: &str,
    ) -> Result<String, TransportFailure> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| TransportFailure::Network("object store unavailable".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes: file.bytes.clone(),
            },
        );
        Ok(format!("memory://{key}"))
    }
}

/// Intake endpoint that records every accepted submission.
#[derive(Debug, Default, Clone)]
pub struct RecordingIntakeEndpoint {
    submissions: Arc<Mutex<Vec<ChecklistSubmission>>>,
}

impl RecordingIntakeEndpoint {
    pub fn submissions(&self) -> Vec<ChecklistSubmission> {
        self.submissions
            .lock()
            .map(|submissions| submissions.clone())
            .unwrap_or_default()
    }
}

impl IntakeEndpoint for RecordingIntakeEndpoint {
    fn submit(&self, submission: &ChecklistSubmission) -> Result<(), TransportFailure> {
        self.submissions
            .lock()
            .map_err(|_| TransportFailure::Network("intake recorder unavailable".to_string()))?
            .push(submission.clone());
        Ok(())
    }
}
