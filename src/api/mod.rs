//! HTTP client for the kitchen inventory backend.
//!
//! Attaches the bearer credential from the shared [`TokenSlot`] on every
//! request and normalizes every failure into a [`ClientError`].

pub mod query;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::TokenSlot;

pub use query::{Page, Query};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenSlot,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenSlot) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        // Validate once so request paths can be appended blindly
        url::Url::parse(&config.api.base_url)?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenSlot {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T, ClientError> {
        let builder = self.http.get(self.url(path)).query(query.pairs());
        self.execute(Method::GET, path, builder).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let builder = self.http.post(self.url(path)).json(body);
        self.execute(Method::POST, path, builder).await
    }

    /// POST without a body, parameters in the query string
    pub async fn post_query<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T, ClientError> {
        let builder = self.http.post(self.url(path)).query(query.pairs());
        self.execute(Method::POST, path, builder).await
    }

    /// `application/x-www-form-urlencoded` POST, used by the token exchange
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T, ClientError> {
        let builder = self.http.post(self.url(path)).form(form);
        self.execute(Method::POST, path, builder).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let builder = self.http.put(self.url(path)).json(body);
        self.execute(Method::PUT, path, builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let builder = self.http.delete(self.url(path));
        self.execute(Method::DELETE, path, builder).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let request_id = Uuid::new_v4();
        let mut builder = builder.header("X-Request-Id", request_id.to_string());
        if let Some(token) = self.tokens.bearer().await {
            builder = builder.bearer_auth(token);
        }

        debug!(%request_id, %method, path, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(%request_id, status = status.as_u16(), path, "request failed");
            return Err(ClientError::from_status(status.as_u16(), &body));
        }

        decode_body(&body)
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    if body.trim().is_empty() {
        return serde_json::from_value(Value::Null).map_err(ClientError::from);
    }
    serde_json::from_str(body).map_err(ClientError::from)
}
