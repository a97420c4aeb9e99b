//! Authenticated principal and bearer credential

pub mod credential;
pub mod store;

pub use credential::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenSlot};
pub use store::{Principal, SessionStore};
