//! Sessions persisted through the encrypted file store

use shroud_pii::{AnonymizationEngine, DetectorConfig};
use shroud_session::{
    EncryptedFileSessionStore, Session, SessionError, SessionId, SessionKey, SessionStore,
};
use tempfile::TempDir;

const NO_TERMS: &[&str] = &[];

fn engine() -> AnonymizationEngine {
    AnonymizationEngine::new(DetectorConfig::default()).unwrap()
}

#[tokio::test]
async fn test_resumed_session_reverts_earlier_responses() {
    let dir = TempDir::new().unwrap();
    let key = SessionKey::generate();
    let store = EncryptedFileSessionStore::new(dir.path(), key.clone())
        .await
        .unwrap();
    let id = SessionId::new();

    let mut session = Session::open(&store, id.clone()).await.unwrap();
    let first = session
        .anonymize(&engine(), "Contact jane@example.com about Apollo", &["Apollo"])
        .unwrap();
    assert_eq!(first.text, "Contact [EMAIL-1] about [ADDITIONAL-1]");
    session.save(&store).await.unwrap();
    drop(session);

    // a second process with the same key picks the session up
    let store = EncryptedFileSessionStore::new(dir.path(), key)
        .await
        .unwrap();
    let mut session = Session::open(&store, id.clone()).await.unwrap();
    let second = session
        .anonymize(&engine(), "Also cc bob@example.com", NO_TERMS)
        .unwrap();
    assert_eq!(second.text, "Also cc [EMAIL-2]");
    session.save(&store).await.unwrap();

    let response = "I wrote to [EMAIL-1] and [EMAIL-2] about [ADDITIONAL-1] and [PERSON-3].";
    assert_eq!(
        session.revert(response, false),
        "I wrote to jane@example.com and bob@example.com about Apollo and [PERSON-3]."
    );
}

#[tokio::test]
async fn test_reset_removes_stored_mapping() {
    let dir = TempDir::new().unwrap();
    let store = EncryptedFileSessionStore::new(dir.path(), SessionKey::generate())
        .await
        .unwrap();
    let id = SessionId::parse("team-chat").unwrap();

    let mut session = Session::open(&store, id.clone()).await.unwrap();
    session
        .anonymize(&engine(), "a@example.com", NO_TERMS)
        .unwrap();
    session.save(&store).await.unwrap();

    session.reset();
    assert!(store.remove(&id).await.unwrap());

    let session = Session::open(&store, id).await.unwrap();
    assert!(session.mapping().is_empty());
}

#[tokio::test]
async fn test_wrong_key_cannot_open_session() {
    let dir = TempDir::new().unwrap();
    let id = SessionId::parse("locked").unwrap();

    let store = EncryptedFileSessionStore::new(dir.path(), SessionKey::generate())
        .await
        .unwrap();
    let mut session = Session::with_id(id.clone());
    session
        .anonymize(&engine(), "a@example.com", NO_TERMS)
        .unwrap();
    session.save(&store).await.unwrap();

    let intruder = EncryptedFileSessionStore::new(dir.path(), SessionKey::generate())
        .await
        .unwrap();
    assert!(matches!(
        Session::open(&intruder, id).await,
        Err(SessionError::Crypto(_))
    ));
}
