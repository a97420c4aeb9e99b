use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::error::ClientError;

/// Bearer credential issued by the token exchange endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub saved_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            saved_at: Utc::now(),
        }
    }

    /// Expiry from the token's `exp` claim.
    ///
    /// The signature is not checked; the backend remains the authority on
    /// validity. Returns `None` for opaque tokens or tokens without `exp`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<ExpiryClaims>(&self.access_token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        data.claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Process-wide holder of the current credential.
///
/// Only the session store writes it; the API client reads it per request
/// and the live channel per connection attempt.
#[derive(Clone, Default)]
pub struct TokenSlot {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl TokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Credential> {
        self.inner.read().await.clone()
    }

    pub async fn bearer(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|c| c.access_token.clone())
    }

    pub async fn is_present(&self) -> bool {
        self.inner.read().await.is_some()
    }

    pub(crate) async fn replace(&self, credential: Option<Credential>) {
        *self.inner.write().await = credential;
    }
}

/// Persistence for the single credential that survives restarts
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, ClientError>;
    fn save(&self, credential: &Credential) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file in the CLI configuration directory
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub const FILE_NAME: &'static str = "credential.json";

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, ClientError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Credential>(&content) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                // A corrupt file is treated as "no credential" rather than blocking startup
                tracing::warn!("Ignoring unreadable credential file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| ClientError::Persistence(e.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Non-persistent store for embedding and tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Credential>>, ClientError> {
        self.slot
            .lock()
            .map_err(|_| ClientError::Internal("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, ClientError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        *self.lock()? = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.lock()? = None;
        Ok(())
    }
}
