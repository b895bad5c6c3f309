use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::domain::{
    Application, ApplicationId, ChecklistItem, InputSlot, Service, SlotId, UploadedDocument,
};
use super::error::{IntakeError, NotFoundError};
use super::repository::{ApplicationRepository, DocumentRepository, ServiceCatalog};

/// An application together with its freshly derived checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistView {
    pub application: Application,
    pub items: Vec<ChecklistItem>,
}

/// Joins a service's live slot set with an application's uploaded documents.
pub struct ChecklistResolver {
    catalog: Arc<dyn ServiceCatalog>,
    applications: Arc<dyn ApplicationRepository>,
    documents: Arc<dyn DocumentRepository>,
}

impl ChecklistResolver {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        applications: Arc<dyn ApplicationRepository>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            catalog,
            applications,
            documents,
        }
    }

    pub fn resolve(&self, application_id: &ApplicationId) -> Result<ChecklistView, IntakeError> {
        let application = self
            .applications
            .fetch(application_id)?
            .ok_or_else(|| NotFoundError::Application(application_id.clone()))?;
        let service = self
            .catalog
            .service(&application.service_id)?
            .ok_or_else(|| NotFoundError::Service(application.service_id.clone()))?;
        let slots = self.catalog.slots(&service.id)?;
        let documents = self.documents.for_application(application_id)?;

        let items = join_checklist(&service, slots, documents);
        debug!(%application_id, items = items.len(), "checklist resolved");

        Ok(ChecklistView { application, items })
    }
}

/// Left-join slots with documents in the service's declared slot order.
///
/// Slots missing from `slot_order` follow the ordered ones in catalog order; order entries
/// without a slot record are skipped, as are documents for slots that no longer exist.
pub fn join_checklist(
    service: &Service,
    slots: Vec<InputSlot>,
    documents: Vec<UploadedDocument>,
) -> Vec<ChecklistItem> {
    let position: HashMap<&SlotId, usize> = service
        .slot_order
        .iter()
        .enumerate()
        .rev()
        .map(|(index, slot_id)| (slot_id, index))
        .collect();

    let mut ordered: Vec<(usize, usize, InputSlot)> = slots
        .into_iter()
        .filter(|slot| slot.service_id == service.id)
        .enumerate()
        .map(|(catalog_index, slot)| {
            let rank = position.get(&slot.id).copied().unwrap_or(usize::MAX);
            (rank, catalog_index, slot)
        })
        .collect();
    ordered.sort_by_key(|(rank, catalog_index, _)| (*rank, *catalog_index));

    let mut by_slot: HashMap<SlotId, UploadedDocument> = documents
        .into_iter()
        .map(|document| (document.input_slot_id.clone(), document))
        .collect();

    ordered
        .into_iter()
        .map(|(_, _, slot)| {
            let document = by_slot.remove(&slot.id);
            ChecklistItem::from_slot(&slot, document)
        })
        .collect()
}
