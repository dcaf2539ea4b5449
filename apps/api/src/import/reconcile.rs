//! Reconciliation Policy — add to or replace the stored section, with a destructive-action gate.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Staged entries first, then everything already stored.
    #[default]
    Add,
    /// Staged entries only; stored entries are discarded.
    Replace,
}

/// Why confirm is currently unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmBlocker {
    NothingToImport,
    ReplaceNotConfirmed,
}

impl fmt::Display for ConfirmBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmBlocker::NothingToImport => f.write_str("there are no entries to import"),
            ConfirmBlocker::ReplaceNotConfirmed => {
                f.write_str("replacing existing entries has not been confirmed")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationPolicy {
    mode: ReconcileMode,
    replace_confirmed: bool,
    existing_count: usize,
}

impl ReconciliationPolicy {
    pub fn new(existing_count: usize) -> Self {
        Self {
            mode: ReconcileMode::default(),
            replace_confirmed: false,
            existing_count,
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    pub fn replace_confirmed(&self) -> bool {
        self.replace_confirmed
    }

    pub fn existing_count(&self) -> usize {
        self.existing_count
    }

    /// Any actual mode change unchecks the replace confirmation.
    pub fn set_mode(&mut self, mode: ReconcileMode) {
        if self.mode != mode {
            self.mode = mode;
            self.replace_confirmed = false;
        }
    }

    pub fn set_replace_confirmed(&mut self, confirmed: bool) {
        self.replace_confirmed = confirmed;
    }

    /// The stored section may have changed since the session opened.
    pub fn set_existing_count(&mut self, existing_count: usize) {
        self.existing_count = existing_count;
    }

    /// True when the destructive-action checkbox must be shown and checked.
    pub fn requires_confirmation(&self) -> bool {
        self.mode == ReconcileMode::Replace && self.existing_count > 0
    }

    pub fn blocker(&self, staged_count: usize) -> Option<ConfirmBlocker> {
        if staged_count == 0 {
            Some(ConfirmBlocker::NothingToImport)
        } else if self.requires_confirmation() && !self.replace_confirmed {
            Some(ConfirmBlocker::ReplaceNotConfirmed)
        } else {
            None
        }
    }

    pub fn can_confirm(&self, staged_count: usize) -> bool {
        self.blocker(staged_count).is_none()
    }
}

/// Produces the stored section after an import.
pub fn reconcile<T>(mode: ReconcileMode, staged: Vec<T>, existing: Vec<T>) -> Vec<T> {
    match mode {
        ReconcileMode::Add => {
            let mut merged = staged;
            merged.extend(existing);
            merged
        }
        ReconcileMode::Replace => staged,
    }
}
