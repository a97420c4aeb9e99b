#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify};

use kitchen_client::config::ClientConfig;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

/// Mint a token the way the backend does; only `exp` matters to the client
pub fn token_expiring_in(seconds: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + seconds;
    encode(
        &Header::default(),
        &json!({"sub": USERNAME, "exp": exp}),
        &EncodingKey::from_secret(b"mock-backend-secret"),
    )
    .expect("failed to sign token")
}

/// In-process stand-in for the kitchen backend
pub struct MockBackend {
    pub base_url: String,
    pub ws_url: String,
    pub token: String,
    /// Every token a live channel connected with
    pub ws_tokens: Mutex<Vec<String>>,
    /// Text frames sent by clients
    pub ws_received: Mutex<Vec<String>>,
    pub live_sockets: AtomicUsize,
    pub hits: Mutex<HashMap<&'static str, usize>>,
    /// Answer every authorized route with 401
    pub revoked: AtomicBool,
    /// Answer sign-out with 500
    pub fail_logout: AtomicBool,
    pub portions: AtomicI64,
    /// When set, the next available-meals request blocks until notified
    pub gate: Mutex<Option<Arc<Notify>>>,
    outbound: broadcast::Sender<String>,
}

impl MockBackend {
    pub async fn start() -> Result<Arc<Self>> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let (outbound, _) = broadcast::channel(32);

        let backend = Arc::new(Self {
            ws_url: format!("ws://127.0.0.1:{}/api/ws", port),
            base_url,
            token: token_expiring_in(3600),
            ws_tokens: Mutex::new(Vec::new()),
            ws_received: Mutex::new(Vec::new()),
            live_sockets: AtomicUsize::new(0),
            hits: Mutex::new(HashMap::new()),
            revoked: AtomicBool::new(false),
            fail_logout: AtomicBool::new(false),
            portions: AtomicI64::new(10),
            gate: Mutex::new(None),
            outbound,
        });

        let app = Router::new()
            .route("/api/auth/token", post(issue_token))
            .route("/api/auth/me", get(current_user))
            .route("/api/auth/logout", post(logout))
            .route("/api/products/", get(list_products).post(create_product))
            .route("/api/products/deliveries/", post(create_delivery))
            .route("/api/products/:id", delete(delete_product))
            .route("/api/meals/available-for-serving", get(available_meals))
            .route("/api/ws", get(live_updates))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(backend)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_backend(&self.base_url, &self.ws_url)
    }

    pub fn hits(&self, route: &'static str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    /// Push a frame to every connected live channel
    pub fn broadcast(&self, message: Value) {
        let _ = self.outbound.send(message.to_string());
    }

    pub fn hold_next_available(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub async fn wait_for_sockets(&self, count: usize, timeout: Duration) -> Result<()> {
        let backend = self;
        wait_until(timeout, || async move { backend.live_sockets.load(Ordering::SeqCst) == count }).await
    }

    fn count(&self, route: &'static str) {
        *self.hits.lock().unwrap().entry(route).or_insert(0) += 1;
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.revoked.load(Ordering::SeqCst) {
            return false;
        }
        let expected = format!("Bearer {}", self.token);
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false)
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, condition: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return Ok(());
        }
        if Instant::now() > deadline {
            anyhow::bail!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

#[derive(Deserialize)]
struct TokenForm {
    username: String,
    password: String,
}

async fn issue_token(State(backend): State<Arc<MockBackend>>, Form(form): Form<TokenForm>) -> Response {
    backend.count("token");
    if form.username != USERNAME || form.password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        )
            .into_response();
    }
    Json(json!({"access_token": backend.token, "token_type": "bearer"})).into_response()
}

async fn current_user(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    backend.count("me");
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": 1,
        "username": USERNAME,
        "full_name": "Bosh Administrator",
        "role": {"id": 1, "name": "admin", "description": null, "created_at": "2024-01-01T00:00:00"},
        "is_active": true,
        "last_login": "2024-05-01T08:00:00",
        "created_at": "2024-01-01T00:00:00"
    }))
    .into_response()
}

async fn logout(State(backend): State<Arc<MockBackend>>) -> Response {
    backend.count("logout");
    if backend.fail_logout.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "session store unavailable"})),
        )
            .into_response();
    }
    Json(json!({"message": "Successfully logged out"})).into_response()
}

async fn list_products(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    backend.count("products");
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {
            "id": 1,
            "name": "Guruch",
            "unit_id": 1,
            "min_quantity": 5.0,
            "unit": {"id": 1, "name": "kilogramm", "short_name": "kg", "created_at": "2024-01-01T00:00:00"},
            "current_quantity": 42.5,
            "created_at": "2024-01-02T09:00:00"
        }
    ]))
    .into_response()
}

async fn create_product(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    backend.count("create_product");
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    let name = input["name"].as_str().unwrap_or_default();
    if name.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]})),
        )
            .into_response();
    }
    Json(json!({
        "id": 2,
        "name": name,
        "unit_id": input["unit_id"],
        "min_quantity": input["min_quantity"],
        "unit": {"id": 1, "name": "kilogramm", "short_name": "kg", "created_at": "2024-01-01T00:00:00"},
        "current_quantity": 0,
        "created_at": "2024-06-01T10:00:00"
    }))
    .into_response()
}

async fn create_delivery(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> Response {
    backend.count("create_delivery");
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": 11,
        "product_id": input["product_id"],
        "quantity": input["quantity"],
        "delivery_date": "2024-06-01T10:00:00",
        "supplier": input["supplier"],
        "product_name": "Guruch",
        "product_unit_short_name": "kg",
        "created_at": "2024-06-01T10:00:00"
    }))
    .into_response()
}

async fn delete_product(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    backend.count("delete_product");
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": format!("Product with ID {} not found", id)})),
    )
        .into_response()
}

async fn available_meals(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    backend.count("available");
    if !backend.authorized(&headers) {
        return unauthorized();
    }

    // Stock is read before the gate so a held request answers with old data
    let portions = backend.portions.load(Ordering::SeqCst);
    let gate = backend.gate.lock().unwrap().take();
    if let Some(gate) = gate {
        gate.notified().await;
    }

    Json(json!([
        {
            "meal_id": 3,
            "meal_name": "Palov",
            "possible_portions": portions,
            "limiting_ingredient_name": "Guruch",
            "limiting_ingredient_unit": "kg"
        }
    ]))
    .into_response()
}

async fn live_updates(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(backend): State<Arc<MockBackend>>,
) -> Response {
    let token = params.get("token").cloned().unwrap_or_default();
    if token != backend.token || backend.revoked.load(Ordering::SeqCst) {
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| serve_socket(socket, backend, token))
}

async fn serve_socket(mut socket: WebSocket, backend: Arc<MockBackend>, token: String) {
    let mut outbound = backend.outbound.subscribe();
    backend.ws_tokens.lock().unwrap().push(token);
    backend.live_sockets.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => backend.ws_received.lock().unwrap().push(text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    backend.live_sockets.fetch_sub(1, Ordering::SeqCst);
}
