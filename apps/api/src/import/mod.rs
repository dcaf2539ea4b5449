// Import preview workflow: stages AI-parsed CV sections, lets the user fix them,
// then reconciles the result with the stored profile.
// The session core (uncertainty, editor, reconcile, session) performs no I/O.

pub mod editor;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod uncertainty;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-session synthetic identity of a staged entry.
///
/// Assigned once at staging time from the entry's position in the parse result and never
/// reassigned, so removing an entry does not move any other entry's identity or warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use reconcile::ReconcileMode;
pub use session::{ImportSession, OpenParams, PreviewView};
