//! Read-only view of the authentication collaborator.

use std::sync::Arc;

use shared::domain::SessionState;
use tokio::sync::watch;

/// Supplies the session as it is at the moment of a submission.
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> SessionState;
}

impl SessionProvider for SessionState {
    fn current(&self) -> SessionState {
        self.clone()
    }
}

/// Session slot the authentication layer writes and controllers read.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionHandle {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(SessionState::Loading)
    }
}

impl SessionProvider for SessionHandle {
    fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }
}
