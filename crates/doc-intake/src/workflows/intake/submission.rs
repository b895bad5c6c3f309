use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::checklist::ChecklistView;
use super::domain::{
    Application, ApplicationId, ChecklistItem, ClientId, ServiceId, SlotId, DEFAULT_LOCALE,
};
use super::error::{IntakeError, ValidationError};
use super::repository::ApplicationRepository;
use super::status::{status_write_error, ApplicationStatusMachine};
use super::transport::TransportFailure;

/// Outcome of the completeness check behind the submit action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReadiness {
    pub ok: bool,
    pub missing: Vec<String>,
}

/// Completeness of a checklist, labelled in the default locale.
pub fn can_submit(checklist: &[ChecklistItem]) -> SubmissionReadiness {
    can_submit_in(checklist, DEFAULT_LOCALE)
}

/// Every required item without a document is reported, in checklist order.
pub fn can_submit_in(checklist: &[ChecklistItem], locale: &str) -> SubmissionReadiness {
    let missing: Vec<String> = checklist
        .iter()
        .filter(|item| item.required && !item.is_satisfied())
        .map(|item| item.label.resolve(locale).to_string())
        .collect();

    SubmissionReadiness {
        ok: missing.is_empty(),
        missing,
    }
}

/// Checklist state as the client last saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSnapshot {
    pub items: Vec<SnapshotItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub slot_id: SlotId,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl ChecklistSnapshot {
    pub fn from_items(items: &[ChecklistItem]) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| SnapshotItem {
                    slot_id: item.input_slot_id.clone(),
                    file_url: item
                        .uploaded_document
                        .as_ref()
                        .map(|document| document.file_reference.clone()),
                })
                .collect(),
        }
    }

    /// True when the snapshot names every current slot exactly once with the same reference.
    pub fn matches(&self, items: &[ChecklistItem]) -> bool {
        if self.items.len() != items.len() {
            return false;
        }

        let mut seen: HashMap<&SlotId, Option<&str>> = HashMap::with_capacity(self.items.len());
        for entry in &self.items {
            let reference = entry
                .file_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty());
            if seen.insert(&entry.slot_id, reference).is_some() {
                return false;
            }
        }

        items.iter().all(|item| {
            let current = item
                .uploaded_document
                .as_ref()
                .map(|document| document.file_reference.trim())
                .filter(|url| !url.is_empty());
            seen.get(&item.input_slot_id) == Some(&current)
        })
    }
}

/// Full checklist payload handed to the intake endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSubmission {
    pub application_id: ApplicationId,
    pub client_id: ClientId,
    pub service_id: ServiceId,
    pub submitted_at: DateTime<Utc>,
    pub items: Vec<SubmittedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedItem {
    pub slot_id: SlotId,
    pub label: String,
    pub required: bool,
    pub file_reference: Option<String>,
    pub file_name: Option<String>,
}

impl ChecklistSubmission {
    pub fn from_view(view: &ChecklistView) -> Self {
        Self {
            application_id: view.application.id.clone(),
            client_id: view.application.client_id.clone(),
            service_id: view.application.service_id.clone(),
            submitted_at: Utc::now(),
            items: view
                .items
                .iter()
                .map(|item| SubmittedItem {
                    slot_id: item.input_slot_id.clone(),
                    label: item.label.primary().to_string(),
                    required: item.required,
                    file_reference: item
                        .uploaded_document
                        .as_ref()
                        .map(|document| document.file_reference.clone()),
                    file_name: item
                        .uploaded_document
                        .as_ref()
                        .map(|document| document.file_name.clone()),
                })
                .collect(),
        }
    }
}

/// Downstream receiver of completed checklists.
pub trait IntakeEndpoint: Send + Sync {
    fn submit(&self, submission: &ChecklistSubmission) -> Result<(), TransportFailure>;
}

/// Client-side gate: only complete checklists reach the intake endpoint.
pub struct SubmissionValidator {
    applications: Arc<dyn ApplicationRepository>,
    intake: Arc<dyn IntakeEndpoint>,
}

impl SubmissionValidator {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        intake: Arc<dyn IntakeEndpoint>,
    ) -> Self {
        Self {
            applications,
            intake,
        }
    }

    /// Send a complete checklist and move the application to `pending`.
    ///
    /// Not retried on failure: a transport error may still have reached the endpoint, so
    /// callers re-read the application before trying again.
    pub fn submit(&self, checklist: &ChecklistView) -> Result<Application, IntakeError> {
        let application_id = &checklist.application.id;
        let readiness = can_submit(&checklist.items);
        if !readiness.ok {
            warn!(%application_id, missing = ?readiness.missing, "submission blocked");
            return Err(ValidationError::MissingDocuments {
                missing: readiness.missing,
            }
            .into());
        }

        let next = ApplicationStatusMachine::client_submit(checklist.application.status)?;
        let submission = ChecklistSubmission::from_view(checklist);

        self.intake.submit(&submission).map_err(|failure| {
            warn!(%application_id, error = %failure, "intake endpoint rejected submission");
            IntakeError::SubmitFailed(failure)
        })?;

        let updated = self
            .applications
            .transition(application_id, checklist.application.status, next)
            .map_err(|err| {
                warn!(%application_id, error = %err, "status changed while submitting");
                status_write_error(application_id, next, err)
            })?;
        info!(%application_id, status = %updated.status, items = submission.items.len(), "application submitted");
        Ok(updated)
    }
}
