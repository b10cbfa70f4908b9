//! Session maintenance hook

use futures::future::BoxFuture;

/// Keeps the scanner logged in to the target
pub trait Session: Send + Sync {
    /// Re-establish the login if it was lost; `Ok(false)` means the session
    /// could not be restored and the audit continues unauthenticated
    fn ensure_logged_in(&self) -> BoxFuture<'_, anyhow::Result<bool>>;
}

/// Session for unauthenticated scans
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

impl Session for NoSession {
    fn ensure_logged_in(&self) -> BoxFuture<'_, anyhow::Result<bool>> {
        Box::pin(async { Ok(true) })
    }
}
