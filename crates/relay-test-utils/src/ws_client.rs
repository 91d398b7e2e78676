//! Small WebSocket client for driving a relay session in tests.

use anyhow::{anyhow, Context};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default timeout when waiting for a frame.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// One client-side signaling session.
pub struct TestWsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    /// Connect to a relay's `/ws` endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self, anyhow::Error> {
        let (stream, _response) = connect_async(ws_url)
            .await
            .context("WebSocket connect failed")?;
        Ok(Self { stream })
    }

    /// Send raw text.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), anyhow::Error> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .context("WebSocket send failed")
    }

    /// Send a JSON value as text.
    pub async fn send_json(&mut self, value: &Value) -> Result<(), anyhow::Error> {
        self.send_text(value.to_string()).await
    }

    /// Receive the next text frame, skipping transport control frames.
    pub async fn recv_text(&mut self) -> Result<String, anyhow::Error> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for frame")?
                .ok_or_else(|| anyhow!("Connection closed"))?
                .context("WebSocket receive failed")?;

            match message {
                Message::Text(text) => return Ok(text),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Err(anyhow!("Connection closed")),
                other => return Err(anyhow!("Unexpected frame: {other:?}")),
            }
        }
    }

    /// Receive the next text frame and parse it as JSON.
    pub async fn recv_json(&mut self) -> Result<Value, anyhow::Error> {
        let text = self.recv_text().await?;
        serde_json::from_str(&text).context("Frame is not valid JSON")
    }

    /// Send an `auth` frame and return the server's reply.
    pub async fn authenticate(&mut self, token: &str) -> Result<Value, anyhow::Error> {
        self.send_json(&serde_json::json!({
            "type": "auth",
            "data": {"token": token}
        }))
        .await?;
        self.recv_json().await
    }

    /// Assert no frame arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) -> Result<(), anyhow::Error> {
        match tokio::time::timeout(wait, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => Err(anyhow!("Unexpected frame: {text}")),
            Ok(Some(Ok(_))) => Ok(()),
            Ok(Some(Err(e))) => Err(anyhow!("WebSocket error: {e}")),
            Ok(None) => Err(anyhow!("Connection closed")),
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.stream
            .close(None)
            .await
            .context("WebSocket close failed")
    }
}
