//! Session Registry — the service-side owner of open import sessions.
//!
//! Each request holds the lock only for a synchronous session operation. Sessions nobody
//! touched for longer than the TTL are treated as closed and swept.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::import::session::{ImportSession, PreviewView, SessionError};

struct Slot {
    session: ImportSession,
    touched: Instant,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Slot>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Registers a freshly opened session and returns its first view.
    pub async fn insert(&self, session: ImportSession) -> PreviewView {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);

        let view = session.view();
        sessions.insert(
            session.id(),
            Slot {
                session,
                touched: Instant::now(),
            },
        );
        view
    }

    pub async fn view(&self, id: Uuid) -> Result<PreviewView, SessionError> {
        self.update(id, |_| Ok(())).await.map(|(_, view)| view)
    }

    /// Runs `f` against an open session and returns its result with the refreshed view.
    pub async fn update<T, F>(&self, id: Uuid, f: F) -> Result<(T, PreviewView), SessionError>
    where
        F: FnOnce(&mut ImportSession) -> Result<T, SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        let slot = self.live_slot(&mut sessions, id)?;
        let out = f(&mut slot.session)?;
        slot.touched = Instant::now();
        Ok((out, slot.session.view()))
    }

    /// Removes a session so it can be closed. `check` runs first; if it fails the session
    /// stays open.
    pub async fn take_if<F>(&self, id: Uuid, check: F) -> Result<ImportSession, SessionError>
    where
        F: FnOnce(&mut ImportSession) -> Result<(), SessionError>,
    {
        let mut sessions = self.sessions.write().await;
        let slot = self.live_slot(&mut sessions, id)?;
        check(&mut slot.session)?;
        sessions
            .remove(&id)
            .map(|slot| slot.session)
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn take(&self, id: Uuid) -> Result<ImportSession, SessionError> {
        self.take_if(id, |_| Ok(())).await
    }

    /// Open sessions, not counting any that have idled past the TTL.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);
        sessions.len()
    }

    fn live_slot<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, Slot>,
        id: Uuid,
    ) -> Result<&'a mut Slot, SessionError> {
        let expired = match sessions.get(&id) {
            Some(slot) => slot.touched.elapsed() > self.ttl,
            None => return Err(SessionError::NotFound(id)),
        };
        if expired {
            sessions.remove(&id);
            info!("Import session {id} expired");
            return Err(SessionError::NotFound(id));
        }
        sessions.get_mut(&id).ok_or(SessionError::NotFound(id))
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Slot>) {
        let before = sessions.len();
        sessions.retain(|_, slot| slot.touched.elapsed() <= self.ttl);
        let swept = before - sessions.len();
        if swept > 0 {
            info!("Swept {swept} idle import sessions");
        }
    }
}
