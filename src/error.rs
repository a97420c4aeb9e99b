// Client error taxonomy
use serde_json::Value;
use thiserror::Error;

/// Failure of any backend interaction, normalized from HTTP status codes,
/// transport errors and local persistence problems.
///
/// `Clone` because a single in-flight fetch can be awaited by several
/// deduplicated callers, each receiving the same outcome.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    // 401 Unauthorized: bad credentials or expired/missing token
    #[error("Authentication failed: {}", detail_or(.detail, "not authenticated"))]
    Auth { detail: Option<String> },

    // 403 Forbidden
    #[error("Forbidden: {}", detail_or(.detail, "insufficient permissions"))]
    Forbidden { detail: Option<String> },

    // 404 Not Found
    #[error("Not found: {}", detail_or(.detail, "resource does not exist"))]
    NotFound { detail: Option<String> },

    // 400 / 422 malformed input
    #[error("Validation error: {}", detail_or(.detail, "request was rejected"))]
    Validation { status: u16, detail: Option<String> },

    // Any other 4xx (409 Conflict, 429 Too Many Requests, ...)
    #[error("Request rejected ({status}): {}", detail_or(.detail, "no detail"))]
    Rejected { status: u16, detail: Option<String> },

    // 5xx
    #[error("Server error ({status})")]
    Server { status: u16, detail: Option<String> },

    // Backend unreachable, timeouts, TLS failures
    #[error("Network error: {0}")]
    Network(String),

    // Live-update handshake or runtime failure
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Credential persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn detail_or<'a>(detail: &'a Option<String>, fallback: &'a str) -> &'a str {
    detail.as_deref().unwrap_or(fallback)
}

impl ClientError {
    /// Build an error from an HTTP status and the raw response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            401 => ClientError::Auth { detail },
            403 => ClientError::Forbidden { detail },
            404 => ClientError::NotFound { detail },
            400 | 422 => ClientError::Validation { status, detail },
            500..=599 => ClientError::Server { status, detail },
            _ => ClientError::Rejected { status, detail },
        }
    }

    /// HTTP status code, if the error came from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Auth { .. } => Some(401),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Validation { status, .. }
            | ClientError::Rejected { status, .. }
            | ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided detail text suitable for showing to an operator.
    ///
    /// 5xx details are withheld; those are shown as a generic failure.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            ClientError::Auth { detail }
            | ClientError::Forbidden { detail }
            | ClientError::NotFound { detail }
            | ClientError::Validation { detail, .. }
            | ClientError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Auth { .. } => "AUTH_ERROR",
            ClientError::Forbidden { .. } => "FORBIDDEN",
            ClientError::NotFound { .. } => "NOT_FOUND",
            ClientError::Validation { .. } => "VALIDATION_ERROR",
            ClientError::Rejected { .. } => "REJECTED",
            ClientError::Server { .. } => "SERVER_ERROR",
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Channel(_) => "CHANNEL_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::Persistence(_) => "PERSISTENCE_ERROR",
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

/// Pull a human-readable `detail` out of a backend error body.
///
/// The backend answers `{"detail": "..."}` for most failures and
/// `{"detail": [{"loc": [...], "msg": "..."}]}` for schema validation.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{}: {}", field, msg),
                        None => msg.to_string(),
                    })
                })
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

// Convert transport errors to ClientError
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ClientError::from_status(status.as_u16(), "");
        }
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Persistence(err.to_string())
    }
}
