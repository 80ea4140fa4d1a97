//! Encrypted file-backed session store
//!
//! One file per session at `<directory>/<session id>.mapping`. The file holds
//! the mapping JSON encrypted with AES-256-GCM, nonce first.

use crate::encryption::{SessionKey, decrypt, encrypt};
use crate::error::{SessionError, SessionResult};
use crate::session::SessionId;
use crate::store::SessionStore;
use async_trait::async_trait;
use shroud_pii::Mapping;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const MAPPING_EXTENSION: &str = "mapping";

pub struct EncryptedFileSessionStore {
    directory: PathBuf,
    key: SessionKey,
}

impl EncryptedFileSessionStore {
    /// Create a store rooted at `directory`, creating it if needed
    pub async fn new<P: AsRef<Path>>(directory: P, key: SessionKey) -> SessionResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).await?;
        Ok(Self { directory, key })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn session_path(&self, session_id: &SessionId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", session_id.as_str(), MAPPING_EXTENSION))
    }

    /// Write via a temp file and rename so readers never see a torn file
    async fn write_atomic(path: &Path, data: &[u8]) -> SessionResult<()> {
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp_path = PathBuf::from(temp);

        let result = Self::write_and_rename(&temp_path, path, data).await;
        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        result.map_err(SessionError::from)
    }

    async fn write_and_rename(
        temp_path: &Path,
        path: &Path,
        data: &[u8],
    ) -> std::io::Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, path).await
    }
}

impl std::fmt::Debug for EncryptedFileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileSessionStore")
            .field("directory", &self.directory)
            .field("key", &self.key)
            .finish()
    }
}

#[async_trait]
impl SessionStore for EncryptedFileSessionStore {
    async fn load(&self, session_id: &SessionId) -> SessionResult<Option<Mapping>> {
        let path = self.session_path(session_id);
        let encrypted = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let plaintext = decrypt(&encrypted, &self.key)?;
        let json = String::from_utf8(plaintext)
            .map_err(|e| SessionError::Crypto(format!("Mapping is not UTF-8: {}", e)))?;
        let mapping = Mapping::from_json(&json)?;

        debug!(session_id = %session_id, entries = mapping.len(), "Loaded session mapping");
        Ok(Some(mapping))
    }

    async fn store(&self, session_id: &SessionId, mapping: &Mapping) -> SessionResult<()> {
        let json = mapping.to_json()?;
        let encrypted = encrypt(json.as_bytes(), &self.key)?;
        Self::write_atomic(&self.session_path(session_id), &encrypted).await?;

        debug!(session_id = %session_id, entries = mapping.len(), "Stored session mapping");
        Ok(())
    }

    async fn remove(&self, session_id: &SessionId) -> SessionResult<bool> {
        match fs::remove_file(self.session_path(session_id)).await {
            Ok(()) => {
                debug!(session_id = %session_id, "Removed session mapping");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
