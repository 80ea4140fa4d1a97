//! In-process session store

use crate::error::SessionResult;
use crate::session::SessionId;
use crate::store::SessionStore;
use async_trait::async_trait;
use shroud_pii::Mapping;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps mappings in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Mapping>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> SessionResult<Option<Mapping>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn store(&self, session_id: &SessionId, mapping: &Mapping) -> SessionResult<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), mapping.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &SessionId) -> SessionResult<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_pii::Tag;

    fn mapping(original: &str, tag: &str) -> Mapping {
        [(original, Tag::parse(tag).unwrap())].into_iter().collect()
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let store = MemorySessionStore::new();
        let id = SessionId::parse("s1").unwrap();

        assert!(store.load(&id).await.unwrap().is_none());

        store.store(&id, &mapping("John", "PERSON-1")).await.unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, mapping("John", "PERSON-1"));
    }

    #[tokio::test]
    async fn test_store_replaces_previous_mapping() {
        let store = MemorySessionStore::new();
        let id = SessionId::parse("s1").unwrap();

        store.store(&id, &mapping("John", "PERSON-1")).await.unwrap();
        store.store(&id, &mapping("Jane", "PERSON-2")).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert!(loaded.get("John").is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let a = SessionId::parse("a").unwrap();
        let b = SessionId::parse("b").unwrap();

        store.store(&a, &mapping("John", "PERSON-1")).await.unwrap();
        store.store(&b, &mapping("Jane", "PERSON-1")).await.unwrap();

        assert_eq!(
            store.load(&a).await.unwrap().unwrap().original_for(&Tag::parse("PERSON-1").unwrap()),
            Some("John")
        );
        assert_eq!(
            store.load(&b).await.unwrap().unwrap().original_for(&Tag::parse("PERSON-1").unwrap()),
            Some("Jane")
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemorySessionStore::new();
        let id = SessionId::parse("s1").unwrap();

        assert!(!store.remove(&id).await.unwrap());
        store.store(&id, &Mapping::new()).await.unwrap();
        assert!(store.remove(&id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
