//! Live-update channel.
//!
//! One background task per authenticated session keeps a WebSocket open to
//! the backend, reconnecting after every close it did not initiate. Each
//! parsed message is kept in a small buffer, turned into cache
//! invalidations and fanned out to subscribers.

pub mod buffer;
pub mod message;
pub mod state;
pub mod transport;

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{affected_kinds, QueryCache};
use crate::config::ChannelConfig;
use crate::session::TokenSlot;

pub use buffer::MessageBuffer;
pub use message::{InboundMessage, MessageKind};
pub use state::{ChannelAction, ChannelEvent, ChannelStateMachine, ConnectionState, ReconnectPolicy};
pub use transport::{connection_url, ChannelError, Connector, Frame, FrameSink, FrameStream, WsConnector, NORMAL_CLOSURE};

/// Result of [`LiveChannel::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Channel was not connected; the message was dropped
    NotConnected,
}

struct Shared {
    ws_url: String,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    tokens: TokenSlot,
    cache: QueryCache,
    state: watch::Sender<ConnectionState>,
    buffer: RwLock<MessageBuffer>,
    events: broadcast::Sender<InboundMessage>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum SessionEnd {
    Lost(String),
    Shutdown,
}

pub struct LiveChannel {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl LiveChannel {
    pub fn new(
        config: &ChannelConfig,
        policy: ReconnectPolicy,
        connector: Arc<dyn Connector>,
        tokens: TokenSlot,
        cache: QueryCache,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (events, _) = broadcast::channel(config.subscriber_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                ws_url: config.ws_url.clone(),
                policy,
                connector,
                tokens,
                cache,
                state,
                buffer: RwLock::new(MessageBuffer::new(config.buffer_capacity)),
                events,
                outbound: Mutex::new(None),
            }),
            running: Mutex::new(None),
        }
    }

    /// Begin connecting. A no-op while a connection task is already alive.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                return;
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move { run(shared, shutdown_rx).await });
        *running = Some(Running { shutdown, handle });
    }

    /// Tear down: cancel any pending reconnect, close the socket normally
    /// and return to Idle. The message buffer is emptied.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(Running { shutdown, handle }) = running {
            let _ = shutdown.send(true);
            if let Err(e) = handle.await {
                warn!("live channel task ended abnormally: {}", e);
            }
        }
        self.shared.state.send_replace(ConnectionState::Idle);
        self.shared.buffer.write().await.clear();
    }

    /// Send a text frame. Never fails; reports `NotConnected` instead.
    pub async fn send(&self, text: impl Into<String>) -> SendOutcome {
        if *self.shared.state.borrow() != ConnectionState::Connected {
            return SendOutcome::NotConnected;
        }
        match self.shared.outbound.lock().await.as_ref() {
            Some(tx) if tx.send(text.into()).is_ok() => SendOutcome::Sent,
            _ => SendOutcome::NotConnected,
        }
    }

    /// Liveness check; the backend answers with a `pong` message
    pub async fn ping(&self) -> SendOutcome {
        self.send("ping").await
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.shared.events.subscribe()
    }

    /// Most recent messages, oldest first
    pub async fn recent_messages(&self) -> Vec<InboundMessage> {
        self.shared.buffer.read().await.snapshot()
    }
}

impl Shared {
    fn publish(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "channel state changed");
        }
    }

    async fn handle_text(&self, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping live frame: {}", e);
                return;
            }
        };

        self.buffer.write().await.push(message.clone());
        let kinds = affected_kinds(&message.kind);
        if !kinds.is_empty() {
            let matched = self.cache.invalidate_kinds(kinds).await;
            debug!(kind = %message.kind, matched, "live message invalidated cache");
        }
        // No subscribers is fine
        let _ = self.events.send(message);
    }
}

async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut machine = ChannelStateMachine::new(shared.policy);
    let mut action = machine.handle(ChannelEvent::Start);

    loop {
        match action {
            ChannelAction::Connect => {
                let Some(token) = shared.tokens.bearer().await else {
                    debug!("no credential, live channel stays idle");
                    machine.handle(ChannelEvent::CredentialMissing);
                    shared.publish(machine.state());
                    return;
                };
                shared.publish(machine.state());
                let url = match connection_url(&shared.ws_url, &token) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("{}", e);
                        action = machine.handle(ChannelEvent::ConnectionLost);
                        continue;
                    }
                };

                let attempt = tokio::select! {
                    result = shared.connector.connect(&url) => result,
                    _ = shutdown.changed() => {
                        machine.handle(ChannelEvent::Teardown);
                        shared.publish(machine.state());
                        return;
                    }
                };

                match attempt {
                    Ok((sink, stream)) => {
                        machine.handle(ChannelEvent::HandshakeSucceeded);
                        info!("live channel connected");
                        match pump(&shared, sink, stream, &mut shutdown).await {
                            SessionEnd::Shutdown => {
                                machine.handle(ChannelEvent::Teardown);
                                shared.publish(machine.state());
                                return;
                            }
                            SessionEnd::Lost(reason) => {
                                info!("live channel lost: {}", reason);
                                action = machine.handle(ChannelEvent::ConnectionLost);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("live channel connect failed: {}", e);
                        action = machine.handle(ChannelEvent::ConnectionLost);
                    }
                }
            }
            ChannelAction::ScheduleReconnect(delay) => {
                shared.publish(machine.state());
                info!(delay_ms = delay.as_millis() as u64, "live channel reconnect scheduled");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        action = machine.handle(ChannelEvent::ReconnectTimerFired);
                    }
                    _ = shutdown.changed() => {
                        machine.handle(ChannelEvent::Teardown);
                        shared.publish(machine.state());
                        return;
                    }
                }
            }
            ChannelAction::Shutdown | ChannelAction::Nothing => return,
        }
    }
}

/// Drive one open connection until it closes or the channel is torn down
async fn pump(
    shared: &Shared,
    mut sink: FrameSink,
    mut stream: FrameStream,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    // Fresh queue per connection; anything queued for an older socket is dropped
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    *shared.outbound.lock().await = Some(out_tx);
    shared.publish(ConnectionState::Connected);

    let end = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => shared.handle_text(&text).await,
                Some(Ok(Frame::Close { code, reason })) => {
                    break SessionEnd::Lost(format!("closed by server (code {:?}, {})", code, reason));
                }
                Some(Ok(Frame::Control)) => {}
                Some(Err(e)) => break SessionEnd::Lost(e.to_string()),
                None => break SessionEnd::Lost("stream ended".to_string()),
            },
            Some(text) = out_rx.recv() => {
                if let Err(e) = sink.send(Frame::Text(text)).await {
                    break SessionEnd::Lost(e.to_string());
                }
            }
            _ = shutdown.changed() => {
                let close = Frame::Close { code: Some(NORMAL_CLOSURE), reason: "client shutdown".to_string() };
                if let Err(e) = sink.send(close).await {
                    debug!("close frame not delivered: {}", e);
                }
                let _ = sink.close().await;
                break SessionEnd::Shutdown;
            }
        }
    };

    *shared.outbound.lock().await = None;
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, EntityKind};
    use crate::config::ClientConfig;
    use crate::error::ClientError;
    use crate::session::Credential;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    /// Server half of one mock connection
    struct ServerEnd {
        url: Url,
        to_client: fmpsc::UnboundedSender<Result<Frame, ChannelError>>,
        from_client: fmpsc::UnboundedReceiver<Frame>,
    }

    struct MockConnector {
        attempts: std::sync::Mutex<Vec<Instant>>,
        accepted: mpsc::UnboundedSender<ServerEnd>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self, url: &Url) -> Result<(FrameSink, FrameStream), ChannelError> {
            self.attempts.lock().unwrap().push(Instant::now());
            let (to_client, client_rx) = fmpsc::unbounded();
            let (client_tx, from_client) = fmpsc::unbounded();
            self.accepted
                .send(ServerEnd {
                    url: url.clone(),
                    to_client,
                    from_client,
                })
                .map_err(|_| ChannelError::Handshake("test server gone".to_string()))?;
            let sink = client_tx.sink_map_err(|e| ChannelError::Transport(e.to_string()));
            Ok((Box::pin(sink), Box::pin(client_rx)))
        }
    }

    struct Harness {
        channel: LiveChannel,
        connector: Arc<MockConnector>,
        servers: mpsc::UnboundedReceiver<ServerEnd>,
        cache: QueryCache,
        tokens: TokenSlot,
    }

    async fn harness() -> Harness {
        let config = ClientConfig::for_backend("http://kitchen.test", "ws://kitchen.test/api/ws");
        let (accepted, servers) = mpsc::unbounded_channel();
        let connector = Arc::new(MockConnector {
            attempts: std::sync::Mutex::new(Vec::new()),
            accepted,
        });
        let tokens = TokenSlot::new();
        tokens.replace(Some(Credential::new("tok-1", "bearer"))).await;
        let cache = QueryCache::new(3);
        let channel = LiveChannel::new(
            &config.channel,
            config.reconnect_policy(),
            connector.clone(),
            tokens.clone(),
            cache.clone(),
        );
        Harness {
            channel,
            connector,
            servers,
            cache,
            tokens,
        }
    }

    async fn wait_for(channel: &LiveChannel, wanted: ConnectionState) {
        let mut rx = channel.watch_state();
        rx.wait_for(|s| *s == wanted).await.unwrap();
    }

    fn text(json: &str) -> Result<Frame, ChannelError> {
        Ok(Frame::Text(json.to_string()))
    }

    #[tokio::test]
    async fn test_connects_with_token_and_buffers_messages() {
        let mut h = harness().await;
        h.channel.start().await;
        let server = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        assert_eq!(server.url.query(), Some("token=tok-1"));

        let mut events = h.channel.subscribe();
        server
            .to_client
            .unbounded_send(text(r#"{"type": "connection_ack", "payload": {"user_id": 1}}"#))
            .unwrap();
        server.to_client.unbounded_send(text("not json")).unwrap();
        server
            .to_client
            .unbounded_send(text(r#"{"type": "test_broadcast", "payload": {}}"#))
            .unwrap();

        assert_eq!(events.recv().await.unwrap().kind, MessageKind::ConnectionAck);
        assert_eq!(events.recv().await.unwrap().kind, MessageKind::TestBroadcast);
        let recent = h.channel.recent_messages().await;
        assert_eq!(recent.len(), 2);

        h.channel.stop().await;
    }

    #[tokio::test]
    async fn test_stock_updated_marks_serving_views_stale() {
        let mut h = harness().await;
        let keys = [
            CacheKey::new(EntityKind::AvailableMeals),
            CacheKey::new(EntityKind::Servings),
            CacheKey::new(EntityKind::Products),
            CacheKey::new(EntityKind::Users),
        ];
        for key in &keys {
            h.cache.fetch(key.clone(), || async { Ok::<_, ClientError>(0_u32) }).await.unwrap();
        }

        h.channel.start().await;
        let server = h.servers.recv().await.unwrap();
        let mut events = h.channel.subscribe();
        wait_for(&h.channel, ConnectionState::Connected).await;
        server
            .to_client
            .unbounded_send(text(r#"{"type": "stock_updated", "data": {"product_id": 2}}"#))
            .unwrap();
        events.recv().await.unwrap();

        assert_eq!(h.cache.is_stale(&keys[0]).await, Some(true));
        assert_eq!(h.cache.is_stale(&keys[1]).await, Some(true));
        assert_eq!(h.cache.is_stale(&keys[2]).await, Some(true));
        assert_eq!(h.cache.is_stale(&keys[3]).await, Some(false));
        h.channel.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_kind_invalidates_nothing() {
        let mut h = harness().await;
        let key = CacheKey::new(EntityKind::Products);
        h.cache.fetch(key.clone(), || async { Ok::<_, ClientError>(1_u8) }).await.unwrap();

        h.channel.start().await;
        let server = h.servers.recv().await.unwrap();
        let mut events = h.channel.subscribe();
        wait_for(&h.channel, ConnectionState::Connected).await;
        server
            .to_client
            .unbounded_send(text(r#"{"type": "inventory_sync", "data": {}}"#))
            .unwrap();
        events.recv().await.unwrap();

        assert_eq!(h.cache.is_stale(&key).await, Some(false));
        h.channel.stop().await;
    }

    #[tokio::test]
    async fn test_send_when_not_connected_is_reported_noop() {
        let h = harness().await;
        assert_eq!(h.channel.send("ping").await, SendOutcome::NotConnected);
        assert_eq!(h.channel.ping().await, SendOutcome::NotConnected);
        h.channel.stop().await;
        assert_eq!(h.channel.send("ping").await, SendOutcome::NotConnected);
    }

    #[tokio::test]
    async fn test_send_reaches_server_when_connected() {
        let mut h = harness().await;
        h.channel.start().await;
        let mut server = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        assert_eq!(h.channel.ping().await, SendOutcome::Sent);
        assert_eq!(server.from_client.next().await, Some(Frame::Text("ping".to_string())));
        h.channel.stop().await;
    }

    #[tokio::test]
    async fn test_stop_closes_with_normal_code() {
        let mut h = harness().await;
        h.channel.start().await;
        let mut server = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        h.channel.stop().await;
        assert_eq!(h.channel.state(), ConnectionState::Idle);
        match server.from_client.next().await {
            Some(Frame::Close { code, .. }) => assert_eq!(code, Some(NORMAL_CLOSURE)),
            other => panic!("expected close frame, got {:?}", other),
        }
        assert!(h.channel.recent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_credential_stays_idle() {
        let h = harness().await;
        h.tokens.replace(None).await;
        h.channel.start().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.channel.state(), ConnectionState::Idle);
        assert!(h.connector.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_close_reconnects_after_five_seconds() {
        let mut h = harness().await;
        h.channel.start().await;
        let first = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        first
            .to_client
            .unbounded_send(Ok(Frame::Close {
                code: Some(1011),
                reason: "restart".to_string(),
            }))
            .unwrap();
        wait_for(&h.channel, ConnectionState::Disconnected).await;

        let second = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        // Dropping the server half ends the stream: another remote close
        drop(second);
        wait_for(&h.channel, ConnectionState::Disconnected).await;
        let _third = h.servers.recv().await.unwrap();

        let attempts = h.connector.attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(5), "{:?}", gap);
            assert!(gap < Duration::from_millis(5_010), "{:?}", gap);
        }
        h.channel.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_reconnect() {
        let mut h = harness().await;
        h.channel.start().await;
        let first = h.servers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Connected).await;

        drop(first);
        wait_for(&h.channel, ConnectionState::Disconnected).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        h.channel.stop().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.connector.attempts.lock().unwrap().len(), 1);
        assert_eq!(h.channel.state(), ConnectionState::Idle);
    }
}
