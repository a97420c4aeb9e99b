use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Query};
use crate::error::ClientError;
use crate::models::{LoginResponse, RoleTag, User};

use super::credential::{Credential, CredentialStore, TokenSlot};

const TOKEN_PATH: &str = "/api/auth/token";
const ME_PATH: &str = "/api/auth/me";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// Identity of the signed-in operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: RoleTag,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.full_name.clone(),
            role: user.role_tag(),
        }
    }
}

/// Owner of the session: the only writer of the credential.
///
/// A principal is held only while a credential is held. Every path that
/// fails to produce a principal clears the credential again.
pub struct SessionStore {
    api: ApiClient,
    credentials: Arc<dyn CredentialStore>,
    tokens: TokenSlot,
    principal: RwLock<Option<Principal>>,
    loading: AtomicBool,
}

impl SessionStore {
    pub fn new(api: ApiClient, credentials: Arc<dyn CredentialStore>) -> Self {
        let tokens = api.tokens().clone();
        Self {
            api,
            credentials,
            tokens,
            principal: RwLock::new(None),
            loading: AtomicBool::new(true),
        }
    }

    pub fn tokens(&self) -> &TokenSlot {
        &self.tokens
    }

    pub async fn principal(&self) -> Option<Principal> {
        self.principal.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.principal.read().await.is_some()
    }

    /// True until the first restore, login or sign-out settles
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn credential_expiry(&self) -> Option<DateTime<Utc>> {
        self.tokens.current().await.and_then(|c| c.expires_at())
    }

    /// Exchange username and password for a credential, then load the principal.
    pub async fn login(&self, username: &str, password: &str) -> Result<Principal, ClientError> {
        let result = self.login_inner(username, password).await;
        if result.is_err() {
            self.clear_local().await;
        }
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn login_inner(&self, username: &str, password: &str) -> Result<Principal, ClientError> {
        let response: LoginResponse = self
            .api
            .post_form(TOKEN_PATH, &[("username", username), ("password", password)])
            .await?;

        let credential = Credential::new(response.access_token, response.token_type);
        self.credentials.save(&credential)?;
        self.tokens.replace(Some(credential)).await;

        let principal = self.fetch_principal().await?;
        *self.principal.write().await = Some(principal.clone());
        info!(user = %principal.username, role = principal.role.as_str(), "signed in");
        Ok(principal)
    }

    /// Best-effort server sign-out followed by an unconditional local clear
    pub(crate) async fn logout(&self) {
        if self.tokens.is_present().await {
            if let Err(e) = self.api.post_query::<Value>(LOGOUT_PATH, &Query::new()).await {
                warn!("server sign-out failed, clearing local session anyway: {}", e);
            }
        }
        self.clear_local().await;
        info!("signed out");
    }

    /// Drop the session without contacting the server
    pub(crate) async fn clear_local(&self) {
        self.tokens.replace(None).await;
        *self.principal.write().await = None;
        if let Err(e) = self.credentials.clear() {
            warn!("failed to remove persisted credential: {}", e);
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Silent restoration from the persisted credential.
    ///
    /// Never fails: any problem leaves the session unauthenticated with the
    /// credential removed, and the loading flag resolved.
    pub async fn restore(&self) -> Option<Principal> {
        self.loading.store(true, Ordering::SeqCst);
        let restored = self.restore_inner().await;
        self.loading.store(false, Ordering::SeqCst);
        restored
    }

    async fn restore_inner(&self) -> Option<Principal> {
        let credential = match self.credentials.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => return None,
            Err(e) => {
                warn!("could not read persisted credential: {}", e);
                return None;
            }
        };

        if credential.is_expired_at(Utc::now()) {
            debug!("persisted credential has expired, discarding");
            self.clear_local().await;
            return None;
        }

        self.tokens.replace(Some(credential)).await;
        match self.fetch_principal().await {
            Ok(principal) => {
                *self.principal.write().await = Some(principal.clone());
                info!(user = %principal.username, "session restored");
                Some(principal)
            }
            Err(e) => {
                debug!("session restore failed: {}", e);
                self.clear_local().await;
                None
            }
        }
    }

    async fn fetch_principal(&self) -> Result<Principal, ClientError> {
        let user: User = self.api.get(ME_PATH, &Query::new()).await?;
        Ok(Principal::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::MemoryCredentialStore;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    // Nothing listens on the discard port
    fn unreachable_api() -> ApiClient {
        let mut config = ClientConfig::for_backend("http://127.0.0.1:9", "ws://127.0.0.1:9/api/ws");
        config.api.timeout_secs = 2;
        ApiClient::new(&config, TokenSlot::new()).unwrap()
    }

    fn token_expiring_at(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({"sub": "oshpaz1", "exp": exp}),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_restore_discards_expired_credential() {
        let expired = Credential::new(token_expiring_at(Utc::now().timestamp() - 10), "bearer");
        let persisted = Arc::new(MemoryCredentialStore::with_credential(expired));
        let store = SessionStore::new(unreachable_api(), persisted.clone());
        assert!(store.is_loading());

        assert!(store.restore().await.is_none());
        assert!(!store.is_loading());
        assert!(!store.is_authenticated().await);
        assert!(persisted.load().unwrap().is_none());
        assert!(!store.tokens().is_present().await);
    }

    #[tokio::test]
    async fn test_restore_clears_credential_when_backend_unreachable() {
        let valid = Credential::new(token_expiring_at(Utc::now().timestamp() + 3600), "bearer");
        let persisted = Arc::new(MemoryCredentialStore::with_credential(valid));
        let store = SessionStore::new(unreachable_api(), persisted.clone());

        assert!(store.restore().await.is_none());
        assert!(!store.is_loading());
        assert!(persisted.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_credential_resolves_loading() {
        let store = SessionStore::new(unreachable_api(), Arc::new(MemoryCredentialStore::new()));
        assert!(store.restore().await.is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_nothing_behind() {
        let persisted = Arc::new(MemoryCredentialStore::new());
        let store = SessionStore::new(unreachable_api(), persisted.clone());
        let err = store.login("admin", "admin123").await.unwrap_err();
        assert!(err.is_network());
        assert!(!store.is_authenticated().await);
        assert!(persisted.load().unwrap().is_none());
    }
}
