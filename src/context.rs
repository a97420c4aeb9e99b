//! Process-wide client state, passed explicitly to every screen.
//!
//! The live channel is started when a session is established and stopped
//! whenever it ends, whether by sign-out or by an authorization failure.

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::cache::QueryCache;
use crate::channel::{Connector, LiveChannel, WsConnector};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::RoleTag;
use crate::navigation::{self, Capability};
use crate::notice::{Locale, Notice, Operation};
use crate::session::{CredentialStore, Principal, SessionStore, TokenSlot};

pub struct AppContext {
    config: ClientConfig,
    api: ApiClient,
    session: SessionStore,
    cache: QueryCache,
    channel: LiveChannel,
}

impl AppContext {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        Self::with_connector(config, credentials, Arc::new(WsConnector))
    }

    pub fn with_connector(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        let tokens = TokenSlot::new();
        let api = ApiClient::new(&config, tokens.clone())?;
        let cache = QueryCache::new(config.cache.max_superseded_refetches);
        let channel = LiveChannel::new(&config.channel, config.reconnect_policy(), connector, tokens, cache.clone());
        let session = SessionStore::new(api.clone(), credentials);

        Ok(Self {
            config,
            api,
            session,
            cache,
            channel,
        })
    }

    /// Silent restore of a persisted session; starts the channel on success
    pub async fn bootstrap(&self) -> Option<Principal> {
        let principal = self.session.restore().await;
        if principal.is_some() {
            self.channel.start().await;
        }
        principal
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Principal, Notice> {
        match self.session.login(username, password).await {
            Ok(principal) => {
                // Nothing cached under a previous identity survives
                self.cache.clear().await;
                self.channel.start().await;
                Ok(principal)
            }
            Err(e) => {
                // A failed attempt has already dropped any earlier credential
                self.channel.stop().await;
                self.cache.clear().await;
                Err(Notice::from_error(self.locale(), Operation::Login, &e))
            }
        }
    }

    pub async fn logout(&self) {
        self.channel.stop().await;
        self.session.logout().await;
        self.cache.clear().await;
    }

    /// Stop background work without touching the session
    pub async fn shutdown(&self) {
        self.channel.stop().await;
    }

    /// Screen boundary: turn a failure into a notice.
    ///
    /// An authorization failure ends the session first, tearing down the
    /// live channel and dropping everything cached.
    pub async fn settle<T>(&self, result: Result<T, ClientError>, operation: Operation) -> Result<T, Notice> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_auth() {
                    self.force_sign_out().await;
                }
                Err(Notice::from_error(self.locale(), operation, &err))
            }
        }
    }

    async fn force_sign_out(&self) {
        if !self.session.is_authenticated().await && !self.session.tokens().is_present().await {
            return;
        }
        warn!("authorization rejected, ending session");
        self.channel.stop().await;
        self.session.clear_local().await;
        self.cache.clear().await;
        info!("session cleared after authorization failure");
    }

    pub fn success(&self, description: impl Into<String>) -> Notice {
        Notice::success(self.locale(), description)
    }

    pub fn locale(&self) -> Locale {
        self.config.ui.locale
    }

    /// Role of the signed-in principal; `Unknown` without a session
    pub async fn role(&self) -> RoleTag {
        self.session.principal().await.map(|p| p.role).unwrap_or(RoleTag::Unknown)
    }

    pub async fn can(&self, capability: Capability) -> bool {
        navigation::can(self.role().await, capability)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn channel(&self) -> &LiveChannel {
        &self.channel
    }
}
