//! Import Preview Session — one open/close cycle of the import preview.
//!
//! States: reviewing (default) and editing exactly one entry. The closed state is the
//! session being consumed by `confirm`, `cancel` or `retry`, so a closed session cannot
//! be operated on again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::import::editor::{apply_edit, canonical_field, disabled_fields, EditError, FieldEdit};
use crate::import::reconcile::{ConfirmBlocker, ReconcileMode, ReconciliationPolicy};
use crate::import::uncertainty::UncertaintyTracker;
use crate::import::EntryId;
use crate::models::entry::{ParsedEntry, SectionType, Uncertainty};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Import session {0} not found")]
    NotFound(Uuid),

    #[error("Entry {0} is not part of this import")]
    UnknownEntry(EntryId),

    #[error("Entry {0} is not in edit mode")]
    NotEditing(EntryId),

    #[error("Parsed entry {index} is a {found} entry but the import targets {expected}")]
    SectionMismatch {
        index: usize,
        expected: SectionType,
        found: SectionType,
    },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Cannot confirm: {0}")]
    ConfirmBlocked(ConfirmBlocker),
}

/// Everything a parse step hands over when the preview opens.
#[derive(Debug, Clone)]
pub struct OpenParams {
    pub user_id: Uuid,
    pub section: SectionType,
    pub entries: Vec<ParsedEntry>,
    pub uncertainties: Vec<Uncertainty>,
    pub existing_count: usize,
    /// Raw text the entries were parsed from, handed back on retry.
    pub source_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewState {
    Reviewing,
    #[serde(rename_all = "camelCase")]
    EditingEntry { entry_id: EntryId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewAction {
    Edit,
    DoneEditing,
    Remove,
    ChooseMode,
    ConfirmReplace,
    Confirm,
    Cancel,
    Retry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertaintyNote {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: EntryId,
    /// Current position in the working copy.
    pub index: usize,
    pub editing: bool,
    pub entry: ParsedEntry,
    pub disabled_fields: Vec<&'static str>,
    /// Any field of this entry still carries an unresolved warning.
    pub needs_review: bool,
    pub uncertainties: Vec<UncertaintyNote>,
}

/// Render snapshot of an open session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewView {
    pub session_id: Uuid,
    pub section: SectionType,
    pub state: PreviewState,
    pub opened_at: DateTime<Utc>,
    pub entries: Vec<EntryView>,
    pub parsed_count: usize,
    pub active_uncertainties: usize,
    pub mode: ReconcileMode,
    pub existing_count: usize,
    pub show_replace_confirmation: bool,
    pub replace_confirmed: bool,
    pub can_confirm: bool,
    pub confirm_blocker: Option<ConfirmBlocker>,
    pub actions: Vec<PreviewAction>,
}

/// Emitted on confirm: the staged entries and how to merge them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedImport {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub section: SectionType,
    pub mode: ReconcileMode,
    pub entries: Vec<ParsedEntry>,
}

/// Emitted on retry: what the caller needs to run the parse step again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRequest {
    pub user_id: Uuid,
    pub section: SectionType,
    pub source_text: Option<String>,
}

#[derive(Debug, Clone)]
struct StagedEntry {
    id: EntryId,
    entry: ParsedEntry,
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    id: Uuid,
    user_id: Uuid,
    section: SectionType,
    original: Vec<ParsedEntry>,
    working: Vec<StagedEntry>,
    tracker: UncertaintyTracker,
    editing: Option<EntryId>,
    policy: ReconciliationPolicy,
    source_text: Option<String>,
    opened_at: DateTime<Utc>,
}

impl ImportSession {
    /// Stages a parse result. Every entry must belong to `params.section`.
    pub fn open(params: OpenParams) -> Result<Self, SessionError> {
        let OpenParams {
            user_id,
            section,
            entries,
            uncertainties,
            existing_count,
            source_text,
        } = params;

        if let Some((index, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.section() != section)
        {
            return Err(SessionError::SectionMismatch {
                index,
                expected: section,
                found: entry.section(),
            });
        }

        let uncertainties = uncertainties
            .into_iter()
            .map(|mut u| {
                if let Some(canonical) = canonical_field(section, &u.field) {
                    u.field = canonical.to_string();
                }
                u
            })
            .collect();
        let tracker = UncertaintyTracker::stage(uncertainties, entries.len());

        let working = entries
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, entry)| StagedEntry {
                id: EntryId(i),
                entry,
            })
            .collect();

        let session = Self {
            id: Uuid::new_v4(),
            user_id,
            section,
            original: entries,
            working,
            tracker,
            editing: None,
            policy: ReconciliationPolicy::new(existing_count),
            source_text,
            opened_at: Utc::now(),
        };

        info!(
            "Opened import session {} for user {}: {} {} entries, {} flagged fields, {} existing",
            session.id,
            user_id,
            session.original.len(),
            section,
            session.tracker.flagged().len(),
            existing_count
        );

        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn section(&self) -> SectionType {
        self.section
    }

    pub fn state(&self) -> PreviewState {
        match self.editing {
            Some(entry_id) => PreviewState::EditingEntry { entry_id },
            None => PreviewState::Reviewing,
        }
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    fn position(&self, id: EntryId) -> Result<usize, SessionError> {
        self.working
            .iter()
            .position(|s| s.id == id)
            .ok_or(SessionError::UnknownEntry(id))
    }

    /// Puts `id` in edit mode. Any other entry being edited leaves edit mode; its edits
    /// were already committed to the working copy.
    pub fn begin_edit(&mut self, id: EntryId) -> Result<(), SessionError> {
        self.position(id)?;
        if let Some(previous) = self.editing.replace(id) {
            if previous != id {
                debug!("Session {}: edit moved from entry {previous} to {id}", self.id);
            }
        }
        Ok(())
    }

    pub fn done_editing(&mut self) {
        self.editing = None;
    }

    /// Applies one field edit to the entry in edit mode and resolves its uncertainty.
    pub fn apply_edit(&mut self, id: EntryId, edit: FieldEdit) -> Result<(), SessionError> {
        let pos = self.position(id)?;
        if self.editing != Some(id) {
            return Err(SessionError::NotEditing(id));
        }

        let field = edit.field_name();
        apply_edit(&mut self.working[pos].entry, edit)?;

        let was_flagged = self.tracker.has_field(id, field);
        self.tracker.resolve(id, field);
        if was_flagged {
            debug!(
                "Session {}: resolved uncertainty on entry {id} field '{field}'",
                self.id
            );
        }
        Ok(())
    }

    /// Deletes an entry from the working copy. No undo.
    pub fn remove_entry(&mut self, id: EntryId) -> Result<ParsedEntry, SessionError> {
        let pos = self.position(id)?;
        let removed = self.working.remove(pos);
        if self.editing == Some(id) {
            self.editing = None;
        }
        debug!(
            "Session {}: removed entry {id} ({}), {} left",
            self.id,
            removed.entry.label(),
            self.working.len()
        );
        Ok(removed.entry)
    }

    pub fn set_mode(&mut self, mode: ReconcileMode) {
        self.policy.set_mode(mode);
    }

    pub fn set_replace_confirmed(&mut self, confirmed: bool) {
        self.policy.set_replace_confirmed(confirmed);
    }

    pub fn set_existing_count(&mut self, existing_count: usize) {
        self.policy.set_existing_count(existing_count);
    }

    pub fn confirm_blocker(&self) -> Option<ConfirmBlocker> {
        self.policy.blocker(self.len())
    }

    pub fn can_confirm(&self) -> bool {
        self.policy.can_confirm(self.len())
    }

    pub fn ensure_confirmable(&self) -> Result<(), SessionError> {
        match self.confirm_blocker() {
            Some(blocker) => Err(SessionError::ConfirmBlocked(blocker)),
            None => Ok(()),
        }
    }

    /// Closes the session, emitting the working copy and the chosen mode.
    pub fn confirm(self) -> Result<ConfirmedImport, SessionError> {
        self.ensure_confirmable()?;
        let mode = self.policy.mode();
        info!(
            "Confirmed import session {}: {} {} entries, mode {:?}",
            self.id,
            self.working.len(),
            self.section,
            mode
        );
        Ok(ConfirmedImport {
            session_id: self.id,
            user_id: self.user_id,
            section: self.section,
            mode,
            entries: self.working.into_iter().map(|s| s.entry).collect(),
        })
    }

    /// Closes the session, discarding all staged edits.
    pub fn cancel(self) {
        info!(
            "Cancelled import session {} ({} staged entries discarded)",
            self.id,
            self.working.len()
        );
    }

    /// Closes the session, discarding staged edits, and asks the caller to parse again.
    pub fn retry(self) -> RetryRequest {
        info!("Retry requested for import session {}", self.id);
        RetryRequest {
            user_id: self.user_id,
            section: self.section,
            source_text: self.source_text,
        }
    }

    pub fn view(&self) -> PreviewView {
        let entries: Vec<EntryView> = self
            .working
            .iter()
            .enumerate()
            .map(|(index, staged)| EntryView {
                id: staged.id,
                index,
                editing: self.editing == Some(staged.id),
                entry: staged.entry.clone(),
                disabled_fields: disabled_fields(&staged.entry),
                needs_review: self.tracker.has_entry(staged.id),
                uncertainties: self
                    .tracker
                    .active_for(staged.id)
                    .into_iter()
                    .map(|f| UncertaintyNote {
                        field: f.field.clone(),
                        reason: f.reason.clone(),
                    })
                    .collect(),
            })
            .collect();

        let active_uncertainties = entries.iter().map(|e| e.uncertainties.len()).sum();
        let confirm_blocker = self.confirm_blocker();

        PreviewView {
            session_id: self.id,
            section: self.section,
            state: self.state(),
            opened_at: self.opened_at,
            parsed_count: self.original.len(),
            active_uncertainties,
            mode: self.policy.mode(),
            existing_count: self.policy.existing_count(),
            show_replace_confirmation: self.policy.requires_confirmation(),
            replace_confirmed: self.policy.replace_confirmed(),
            can_confirm: self.can_confirm(),
            confirm_blocker,
            actions: self.actions(),
            entries,
        }
    }

    fn actions(&self) -> Vec<PreviewAction> {
        // Nothing left to import: a dead end whose only way forward is parsing again.
        if self.is_empty() {
            return vec![PreviewAction::Retry];
        }

        let mut actions = vec![PreviewAction::Edit];
        if self.editing.is_some() {
            actions.push(PreviewAction::DoneEditing);
        }
        actions.push(PreviewAction::Remove);
        actions.push(PreviewAction::ChooseMode);
        if self.policy.requires_confirmation() {
            actions.push(PreviewAction::ConfirmReplace);
        }
        actions.extend([
            PreviewAction::Confirm,
            PreviewAction::Cancel,
            PreviewAction::Retry,
        ]);
        actions
    }
}
