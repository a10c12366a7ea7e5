use async_trait::async_trait;

use crate::error::Result;

/// Best-effort message delivery to a user by opaque id. Callers treat
/// failures as non-fatal: log and move on, never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: &str, text: &str, disable_link_preview: bool) -> Result<()>;
}
