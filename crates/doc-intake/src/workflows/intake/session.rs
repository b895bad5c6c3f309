//! Client-side checklist state with explicit pending/confirmed pairs per slot.
//!
//! A slot's confirmed item only changes when the server confirms an operation; a failed
//! operation drops the pending marker and leaves the confirmed item exactly as it was.

use serde::Serialize;

use super::checklist::ChecklistView;
use super::domain::{Application, ChecklistItem, SlotId, UploadedDocument, DEFAULT_LOCALE};
use super::submission::{can_submit_in, ChecklistSnapshot, SubmissionReadiness};

/// Operation awaiting server confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    Uploading { file_name: String },
    Clearing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotState {
    pub confirmed: ChecklistItem,
    pub pending: Option<PendingChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("slot {0} is not part of this checklist")]
    UnknownSlot(SlotId),
    #[error("slot {0} already has an operation in flight")]
    SlotBusy(SlotId),
    #[error("slot {0} has no operation in flight")]
    NothingPending(SlotId),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistSession {
    application: Application,
    slots: Vec<SlotState>,
}

impl ChecklistSession {
    pub fn new(view: ChecklistView) -> Self {
        let slots = view
            .items
            .into_iter()
            .map(|item| SlotState {
                confirmed: item,
                pending: None,
            })
            .collect();
        Self {
            application: view.application,
            slots,
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    pub fn slot(&self, slot_id: &SlotId) -> Option<&SlotState> {
        self.slots
            .iter()
            .find(|state| &state.confirmed.input_slot_id == slot_id)
    }

    fn slot_mut(&mut self, slot_id: &SlotId) -> Result<&mut SlotState, SessionError> {
        self.slots
            .iter_mut()
            .find(|state| &state.confirmed.input_slot_id == slot_id)
            .ok_or_else(|| SessionError::UnknownSlot(slot_id.clone()))
    }

    fn begin(&mut self, slot_id: &SlotId, change: PendingChange) -> Result<(), SessionError> {
        let state = self.slot_mut(slot_id)?;
        if state.pending.is_some() {
            return Err(SessionError::SlotBusy(slot_id.clone()));
        }
        state.pending = Some(change);
        Ok(())
    }

    pub fn begin_upload(
        &mut self,
        slot_id: &SlotId,
        file_name: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.begin(
            slot_id,
            PendingChange::Uploading {
                file_name: file_name.into(),
            },
        )
    }

    pub fn begin_clear(&mut self, slot_id: &SlotId) -> Result<(), SessionError> {
        self.begin(slot_id, PendingChange::Clearing)
    }

    /// Apply the server's answer for the slot's pending operation.
    ///
    /// `Some(document)` confirms an upload, `None` confirms a clear.
    pub fn confirm(
        &mut self,
        slot_id: &SlotId,
        document: Option<UploadedDocument>,
    ) -> Result<(), SessionError> {
        let state = self.slot_mut(slot_id)?;
        if state.pending.take().is_none() {
            return Err(SessionError::NothingPending(slot_id.clone()));
        }
        state.confirmed.uploaded_document = document;
        Ok(())
    }

    /// Drop the pending operation after a failure; the confirmed item is untouched.
    pub fn roll_back(&mut self, slot_id: &SlotId) -> Result<PendingChange, SessionError> {
        let state = self.slot_mut(slot_id)?;
        state
            .pending
            .take()
            .ok_or_else(|| SessionError::NothingPending(slot_id.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.slots.iter().any(|state| state.pending.is_some())
    }

    pub fn confirmed_items(&self) -> Vec<ChecklistItem> {
        self.slots
            .iter()
            .map(|state| state.confirmed.clone())
            .collect()
    }

    pub fn readiness(&self, locale: &str) -> SubmissionReadiness {
        can_submit_in(&self.confirmed_items(), locale)
    }

    /// Ready only when the confirmed checklist is complete and nothing is in flight.
    pub fn ready_to_submit(&self) -> bool {
        !self.is_busy() && self.readiness(DEFAULT_LOCALE).ok
    }

    pub fn snapshot(&self) -> ChecklistSnapshot {
        ChecklistSnapshot::from_items(&self.confirmed_items())
    }

    /// Replace the session with a fresh server view, e.g. after submit.
    pub fn refresh(&mut self, view: ChecklistView) {
        *self = Self::new(view);
    }
}
