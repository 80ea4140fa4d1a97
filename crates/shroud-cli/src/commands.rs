//! Subcommand implementations, kept free of stdin/stdout so they can be tested

use crate::config::ShroudConfig;
use anyhow::{Context, Result, anyhow, bail};
use shroud_pii::{AnonymizationEngine, Mapping};
use shroud_session::{EncryptedFileSessionStore, Session, SessionId, SessionKey, SessionStore};
use tracing::{debug, info};

/// Result of one `anonymize` invocation
#[derive(Debug)]
pub struct AnonymizeOutcome {
    pub session_id: SessionId,
    pub text: String,
    pub hidden: usize,
}

/// Open the encrypted store the config points at
pub async fn open_store(config: &ShroudConfig) -> Result<EncryptedFileSessionStore> {
    let Some(key) = config.session_key()? else {
        bail!(
            "No session key configured. Generate one with `shroud keygen` and set SHROUD_SESSION_KEY"
        );
    };

    let directory = config.sessions_dir();
    debug!(directory = %directory.display(), "Opening session store");
    EncryptedFileSessionStore::new(&directory, key)
        .await
        .with_context(|| format!("Failed to open session directory {}", directory.display()))
}

pub fn parse_session_id(id: &str) -> Result<SessionId> {
    SessionId::parse(id).context("Invalid --session value")
}

/// Anonymize `text` within a session (new unless `session_id` is given) and
/// store the session's updated mapping
pub async fn anonymize(
    engine: &AnonymizationEngine,
    store: &dyn SessionStore,
    session_id: Option<SessionId>,
    text: &str,
    terms: &[String],
) -> Result<AnonymizeOutcome> {
    let session_id = session_id.unwrap_or_else(SessionId::new);
    let mut session = Session::open(store, session_id)
        .await
        .context("Failed to load session")?;

    let result = session
        .anonymize(engine, text, terms)
        .context("Anonymization failed")?;
    session
        .save(store)
        .await
        .context("Failed to store session mapping")?;

    info!(
        session_id = %session.id(),
        hidden = result.mapping.len(),
        "Anonymized input"
    );
    Ok(AnonymizeOutcome {
        session_id: session.id().clone(),
        text: result.text,
        hidden: result.mapping.len(),
    })
}

/// Restore the tags a stored session has issued
pub async fn revert(
    store: &dyn SessionStore,
    session_id: &SessionId,
    text: &str,
    highlight: bool,
) -> Result<String> {
    let mapping = store
        .load(session_id)
        .await
        .context("Failed to load session")?
        .ok_or_else(|| anyhow!("Unknown session {}", session_id))?;

    Ok(shroud_pii::revert(text, &mapping, highlight))
}

/// Drop a stored session; returns whether it existed
pub async fn reset(store: &dyn SessionStore, session_id: &SessionId) -> Result<bool> {
    let removed = store
        .remove(session_id)
        .await
        .context("Failed to remove session")?;
    info!(session_id = %session_id, removed, "Session reset");
    Ok(removed)
}

pub fn keygen() -> String {
    SessionKey::generate().to_base64()
}

/// Comma-separated list of hidden originals, in the order they were tagged
pub fn removed_summary(mapping: &Mapping) -> String {
    mapping.originals().collect::<Vec<_>>().join(", ")
}
