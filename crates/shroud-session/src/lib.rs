//! Shroud session storage
//!
//! This crate keeps one mapping per logical session:
//! - Session ids and the per-session anonymization context
//! - In-memory and encrypted file-backed mapping stores
//! - AES-256-GCM encryption of mappings at rest

pub mod encryption;
pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod session;
pub mod store;

pub use encryption::SessionKey;
pub use error::{SessionError, SessionResult};
pub use file_store::EncryptedFileSessionStore;
pub use memory_store::MemorySessionStore;
pub use session::{Session, SessionId};
pub use store::SessionStore;
