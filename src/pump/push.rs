//! Push-channel transport: the WebSocket connection itself.

use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push channel connect to {url} failed: {message}")]
    Connect { url: String, message: String },
}

pub async fn connect(url: &str) -> Result<WsStream, PushError> {
    let (stream, response) = connect_async(url).await.map_err(|e| PushError::Connect {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    debug!(%url, status = %response.status(), "push channel connected");
    Ok(stream)
}
