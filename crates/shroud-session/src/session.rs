//! Session identity and per-session anonymization context

use crate::error::{SessionError, SessionResult};
use crate::store::SessionStore;
use shroud_pii::{
    AnonymizationEngine, AnonymizeError, AnonymizeResult, Anonymized, Mapping, TagRegistry,
    merge_canonical, revert,
};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_SESSION_ID_LEN: usize = 255;

/// Identifier of one logical session
///
/// Ids double as file names in [`crate::EncryptedFileSessionStore`], so only
/// alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random id (UUID v4)
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(id: &str) -> SessionResult<Self> {
        if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
            return Err(SessionError::InvalidSessionId(
                "Invalid session ID length".to_string(),
            ));
        }

        if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(SessionError::InvalidSessionId(format!(
                "{}: only alphanumeric, dash, and underscore allowed",
                id
            )));
        }

        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Registry plus accumulated mapping for one session
///
/// Every anonymize call goes through the same registry, so an original keeps
/// its tag for the lifetime of the session, and the accumulated mapping can
/// revert any response produced in it.
pub struct Session {
    id: SessionId,
    registry: TagRegistry,
    mapping: Mapping,
}

impl Session {
    /// Empty session with a fresh id
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            registry: TagRegistry::new(),
            mapping: Mapping::new(),
        }
    }

    /// Continue a session from its stored mapping
    pub fn resume(id: SessionId, mapping: Mapping) -> Self {
        Self {
            registry: TagRegistry::from_mapping(&mapping),
            id,
            mapping,
        }
    }

    /// Load a session from `store`, or start it empty if nothing is stored
    pub async fn open(store: &dyn SessionStore, id: SessionId) -> SessionResult<Self> {
        match store.load(&id).await? {
            Some(mapping) => {
                debug!(session_id = %id, entries = mapping.len(), "Resumed session");
                Ok(Self::resume(id, mapping))
            }
            None => {
                debug!(session_id = %id, "Starting new session");
                Ok(Self::with_id(id))
            }
        }
    }

    /// Persist the accumulated mapping
    pub async fn save(&self, store: &dyn SessionStore) -> SessionResult<()> {
        store.store(&self.id, &self.mapping).await
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Anonymize `text` and fold the result into the session mapping
    ///
    /// If the recognizer fails, the partial output is still folded in, since
    /// its tags are already assigned in the registry.
    pub fn anonymize<S: AsRef<str>>(
        &mut self,
        engine: &AnonymizationEngine,
        text: &str,
        user_terms: &[S],
    ) -> AnonymizeResult<Anonymized> {
        match engine.anonymize(&mut self.registry, text, user_terms) {
            Ok(result) => Ok(self.absorb(result)),
            Err(AnonymizeError::Recognizer { partial, source }) => {
                let partial = self.absorb(*partial);
                Err(AnonymizeError::Recognizer {
                    partial: Box::new(partial),
                    source,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Restore every tag this session has issued
    pub fn revert(&self, text: &str, highlight: bool) -> String {
        revert(text, &self.mapping, highlight)
    }

    /// Forget all tags; numbering restarts at 1
    pub fn reset(&mut self) {
        self.registry.reset();
        self.mapping = Mapping::new();
        info!(session_id = %self.id, "Session reset");
    }

    /// Rename tags for originals the session already knows, then merge
    fn absorb(&mut self, result: Anonymized) -> Anonymized {
        merge_canonical(&mut self.mapping, result)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mapping", &self.mapping)
            .finish()
    }
}
