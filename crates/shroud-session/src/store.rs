//! Session store trait

use crate::error::SessionResult;
use crate::session::SessionId;
use async_trait::async_trait;
use shroud_pii::Mapping;

/// Persists one mapping per session
///
/// Implementations own confidentiality of the stored mapping. They must not
/// log mapping contents.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the mapping stored for a session, if any
    async fn load(&self, session_id: &SessionId) -> SessionResult<Option<Mapping>>;

    /// Store (replace) the mapping for a session
    async fn store(&self, session_id: &SessionId, mapping: &Mapping) -> SessionResult<()>;

    /// Remove a session's mapping; returns whether one existed
    async fn remove(&self, session_id: &SessionId) -> SessionResult<bool>;
}
