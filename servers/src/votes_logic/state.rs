//! Shared handle to the live feed connection.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// The one live feed connection, shared across tasks.
///
/// The supervisor is the sole registrar; everyone else may only ask for a
/// close. `request_close` takes the registered token out before cancelling
/// it, so each registration is closed at most once no matter how many tasks
/// race on it.
#[derive(Clone, Default)]
pub struct FeedConn {
    live: Arc<Mutex<Option<CancellationToken>>>,
}

impl FeedConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh connection, returning the token its read loop
    /// watches for forced closes. Replaces any stale registration.
    pub fn register(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        *live = Some(token.clone());
        token
    }

    /// Asks the current connection, if any, to close. Returns whether a
    /// live connection was told to go.
    pub fn request_close(&self) -> bool {
        let token = self.live.lock().unwrap_or_else(|e| e.into_inner()).take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
