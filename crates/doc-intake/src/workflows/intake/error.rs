use super::domain::{ApplicationId, ApplicationStatus, ServiceId, SlotId};
use super::repository::RepositoryError;
use super::transport::TransportFailure;

/// Local rejections raised before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file type .{extension} is not allowed (accepted: {allowed})")]
    DisallowedExtension { extension: String, allowed: String },
    #[error("file name has no extension (accepted: {allowed})")]
    MissingExtension { allowed: String },
    #[error("file is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("file is empty")]
    EmptyFile,
    #[error("required documents missing: {}", .missing.join(", "))]
    MissingDocuments { missing: Vec<String> },
    #[error("checklist snapshot is out of date; reload the checklist before submitting")]
    StaleChecklist,
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Terminal lookups that should not be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    #[error("application {0} not found")]
    Application(ApplicationId),
    #[error("service {0} not found")]
    Service(ServiceId),
    #[error("input slot {slot_id} not found for service {service_id}")]
    Slot {
        service_id: ServiceId,
        slot_id: SlotId,
    },
}

/// Error raised by the intake workflow components.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("upload failed: {0}")]
    UploadFailed(TransportFailure),
    #[error("submission failed: {0}")]
    SubmitFailed(TransportFailure),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntakeError {
    /// Missing required labels when the error is a completeness rejection.
    pub fn missing_documents(&self) -> Option<&[String]> {
        match self {
            IntakeError::Validation(ValidationError::MissingDocuments { missing }) => {
                Some(missing.as_slice())
            }
            _ => None,
        }
    }
}
