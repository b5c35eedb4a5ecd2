// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The push channel's wire.
//!
//! [`PushTransport`] is the seam the connection controller drives; the
//! engine never sees socket frames, only decoded [`PushMessage`]s.
//! [`WebSocketTransport`] speaks JSON text frames over tokio-tungstenite.

use std::future::Future;
use std::pin::Pin;

use tally_core::{PushMessage, PushRequest};
use tokio_tungstenite::tungstenite::Message;

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A bidirectional push channel to the server.
pub trait PushTransport: Send + Sync {
    /// Open the channel to `url`.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Close the channel. Closing an already-closed channel is a no-op.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send one request frame.
    fn send(&mut self, msg: PushRequest) -> TransportFuture<'_, ()>;

    /// Wait for the next push message.
    ///
    /// Returns `None` once the server closes the channel. Frames that
    /// cannot be parsed are skipped.
    fn recv(&mut self) -> TransportFuture<'_, Option<PushMessage>>;

    /// Whether the channel is open.
    fn is_connected(&self) -> bool;
}

/// What a single socket frame means to the push channel.
#[derive(Debug, PartialEq)]
pub(crate) enum Inbound {
    Push(PushMessage),
    Closed,
    Skip,
}

/// Decode one WebSocket frame.
///
/// Text frames carry JSON push messages; control and binary frames carry
/// nothing for the engine.
pub(crate) fn decode_frame(frame: Message) -> Inbound {
    match frame {
        Message::Text(text) => match PushMessage::from_json(&text) {
            Ok(msg) => Inbound::Push(msg),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparsable push frame");
                Inbound::Skip
            }
        },
        Message::Close(_) => Inbound::Closed,
        Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {
            Inbound::Skip
        }
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Push channel over a WebSocket.
pub struct WebSocketTransport {
    ws: Option<OpenSocket>,
}

struct OpenSocket {
    sink: futures_util::stream::SplitSink<WsStream, Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PushTransport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            use futures_util::StreamExt;

            let (socket, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            tracing::debug!(url = %url, "push channel open");

            let (sink, stream) = socket.split();
            self.ws = Some(OpenSocket { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                use futures_util::SinkExt;
                if let Err(e) = ws.sink.close().await {
                    tracing::debug!(error = %e, "error closing push channel");
                }
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: PushRequest) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            use futures_util::SinkExt;

            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // Flushing per frame surfaces a dead socket on this send.
            let sent = match ws.sink.send(Message::Text(json.into())).await {
                Ok(()) => ws.sink.flush().await,
                Err(e) => Err(e),
            };
            sent.map_err(|e| {
                self.ws = None;
                TransportError::SendFailed(e.to_string())
            })
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<PushMessage>> {
        Box::pin(async move {
            use futures_util::StreamExt;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;
            loop {
                let frame = match ws.stream.next().await {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        self.ws = None;
                        return Ok(None);
                    }
                };
                match decode_frame(frame) {
                    Inbound::Push(msg) => return Ok(Some(msg)),
                    Inbound::Closed => {
                        self.ws = None;
                        return Ok(None);
                    }
                    Inbound::Skip => {}
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
