use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::ClientError;

/// Normal closure, sent on local teardown
pub const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("invalid channel URL: {0}")]
    InvalidUrl(String),
}

impl From<ChannelError> for ClientError {
    fn from(err: ChannelError) -> Self {
        ClientError::Channel(err.to_string())
    }
}

/// Transport-neutral WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: Option<u16>, reason: String },
    /// Ping, pong, binary; ignored by the channel
    Control,
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = ChannelError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, ChannelError>> + Send>>;

/// Opens one live connection. The channel calls it once per attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<(FrameSink, FrameStream), ChannelError>;
}

/// Append the bearer token as the `token` query parameter
pub fn connection_url(base: &str, token: &str) -> Result<Url, ChannelError> {
    let mut url = Url::parse(base).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// WebSocket connector over tokio-tungstenite
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<(FrameSink, FrameStream), ChannelError> {
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(|e| ChannelError::Transport(e.to_string()))
            .with(|frame: Frame| futures::future::ready(Ok::<_, ChannelError>(into_message(frame))));
        let stream = stream.map(|msg| msg.map(from_message).map_err(|e| ChannelError::Transport(e.to_string())));

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Close { code, reason } => Message::Close(code.map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        })),
        Frame::Control => Message::Ping(Vec::new()),
    }
}

fn from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text),
        Message::Close(frame) => match frame {
            Some(frame) => Frame::Close {
                code: Some(u16::from(frame.code)),
                reason: frame.reason.into_owned(),
            },
            None => Frame::Close {
                code: None,
                reason: String::new(),
            },
        },
        _ => Frame::Control,
    }
}
