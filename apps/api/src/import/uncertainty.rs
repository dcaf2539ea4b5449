//! Uncertainty Tracker — which parsed fields the AI flagged, and which the user has since fixed.
//!
//! The flagged list is fixed when the session is staged. Edits only ever add to the
//! resolved set, so a warning that disappeared can never come back within a session.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::import::EntryId;
use crate::models::entry::Uncertainty;

/// A parser uncertainty re-keyed from its original index to the entry's session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedField {
    pub entry: EntryId,
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct UncertaintyTracker {
    flagged: Vec<FlaggedField>,
    resolved: HashSet<(EntryId, String)>,
}

impl UncertaintyTracker {
    /// Stages parser uncertainties against a parse result of `entry_count` entries.
    ///
    /// Entry `i` of the parse result is staged as `EntryId(i)`. Uncertainties pointing past
    /// the end of the parse result cannot be attached to anything and are dropped.
    pub fn stage(uncertainties: Vec<Uncertainty>, entry_count: usize) -> Self {
        let flagged = uncertainties
            .into_iter()
            .filter_map(|u| {
                if u.entry_index >= entry_count {
                    warn!(
                        "Dropping uncertainty on '{}' for entry {} (only {} entries parsed)",
                        u.field, u.entry_index, entry_count
                    );
                    return None;
                }
                Some(FlaggedField {
                    entry: EntryId(u.entry_index),
                    field: u.field,
                    reason: u.reason,
                })
            })
            .collect();

        Self {
            flagged,
            resolved: HashSet::new(),
        }
    }

    /// Marks `(entry, field)` resolved. Returns true the first time only.
    pub fn resolve(&mut self, entry: EntryId, field: &str) -> bool {
        self.resolved.insert((entry, field.to_string()))
    }

    pub fn is_resolved(&self, entry: EntryId, field: &str) -> bool {
        self.resolved.contains(&(entry, field.to_string()))
    }

    /// Flagged fields not yet resolved, in parser order.
    pub fn active(&self) -> impl Iterator<Item = &FlaggedField> + '_ {
        self.flagged
            .iter()
            .filter(|f| !self.is_resolved(f.entry, &f.field))
    }

    pub fn active_for(&self, entry: EntryId) -> Vec<&FlaggedField> {
        self.active().filter(|f| f.entry == entry).collect()
    }

    pub fn has_field(&self, entry: EntryId, field: &str) -> bool {
        self.active().any(|f| f.entry == entry && f.field == field)
    }

    pub fn has_entry(&self, entry: EntryId) -> bool {
        self.active().any(|f| f.entry == entry)
    }

    /// Everything the parser flagged, resolved or not.
    pub fn flagged(&self) -> &[FlaggedField] {
        &self.flagged
    }
}
