use std::sync::Arc;

use tracing::info;

use super::domain::{Application, ApplicationId, ApplicationStatus};
use super::error::{IntakeError, NotFoundError, ValidationError};
use super::repository::{ApplicationRepository, RepositoryError};

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Client,
    Staff,
}

/// Transition table for application status.
///
/// The client edge is gated on checklist completeness by the submission validator. Staff
/// edges never consult the checklist.
pub struct ApplicationStatusMachine;

impl ApplicationStatusMachine {
    pub fn permits(actor: Actor, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        match actor {
            Actor::Client => matches!((from, to), (Draft | Pending, Pending)),
            Actor::Staff => matches!(
                (from, to),
                (Pending | Approved | Rejected, Approved | Rejected)
            ),
        }
    }

    pub fn transition(
        actor: Actor,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<ApplicationStatus, ValidationError> {
        if Self::permits(actor, from, to) {
            Ok(to)
        } else {
            Err(ValidationError::InvalidTransition { from, to })
        }
    }

    /// Status after a client submission from `current`.
    pub fn client_submit(current: ApplicationStatus) -> Result<ApplicationStatus, ValidationError> {
        Self::transition(Actor::Client, current, ApplicationStatus::Pending)
    }
}

/// Map a failed compare-and-set status write onto workflow errors; a status that moved since
/// it was read is reported from the status actually stored.
pub(crate) fn status_write_error(
    application_id: &ApplicationId,
    to: ApplicationStatus,
    err: RepositoryError,
) -> IntakeError {
    match err {
        RepositoryError::StatusMoved { current } => {
            ValidationError::InvalidTransition { from: current, to }.into()
        }
        RepositoryError::NotFound => NotFoundError::Application(application_id.clone()).into(),
        other => other.into(),
    }
}

/// Staff override path: keyed by application id and target status, independent of
/// document completeness.
pub struct StaffStatusAuthority {
    applications: Arc<dyn ApplicationRepository>,
}

impl StaffStatusAuthority {
    pub fn new(applications: Arc<dyn ApplicationRepository>) -> Self {
        Self { applications }
    }

    pub fn change_status(
        &self,
        application_id: &ApplicationId,
        target: ApplicationStatus,
    ) -> Result<Application, IntakeError> {
        let current = self
            .applications
            .fetch(application_id)?
            .ok_or_else(|| NotFoundError::Application(application_id.clone()))?;

        ApplicationStatusMachine::transition(Actor::Staff, current.status, target)?;

        let updated = self
            .applications
            .transition(application_id, current.status, target)
            .map_err(|err| status_write_error(application_id, target, err))?;

        info!(%application_id, from = %current.status, to = %updated.status, "staff status change");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    const ALL: [ApplicationStatus; 4] = [Draft, Pending, Approved, Rejected];

    #[test]
    fn nothing_returns_to_draft() {
        for actor in [Actor::Client, Actor::Staff] {
            for from in ALL {
                assert!(
                    !ApplicationStatusMachine::permits(actor, from, Draft),
                    "{actor:?} moved {from} back to draft"
                );
            }
        }
    }

    #[test]
    fn client_only_submits_open_applications() {
        assert_eq!(ApplicationStatusMachine::client_submit(Draft), Ok(Pending));
        assert_eq!(ApplicationStatusMachine::client_submit(Pending), Ok(Pending));
        assert_eq!(
            ApplicationStatusMachine::client_submit(Approved),
            Err(ValidationError::InvalidTransition {
                from: Approved,
                to: Pending
            })
        );
        assert!(!ApplicationStatusMachine::permits(Actor::Client, Pending, Approved));
    }

    #[test]
    fn staff_decides_submitted_applications() {
        assert!(ApplicationStatusMachine::permits(Actor::Staff, Pending, Approved));
        assert!(ApplicationStatusMachine::permits(Actor::Staff, Pending, Rejected));
        assert!(ApplicationStatusMachine::permits(Actor::Staff, Approved, Rejected));
        assert!(!ApplicationStatusMachine::permits(Actor::Staff, Draft, Approved));
        assert!(!ApplicationStatusMachine::permits(Actor::Staff, Pending, Pending));
    }
}
