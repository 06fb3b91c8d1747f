//! TCP server for handling query connections.
//!
//! Accepts incoming connections, greets each one with the usage banner and
//! then answers JSON queries against the shared record store until the
//! client disconnects or sends something that is not a valid request.

use crate::config::Config;
use crate::matcher;
use crate::protocol::{decode_request, encode_response, DecodeResult, QueryResponse, BANNER};
use crate::storage::RecordStore;
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace, warn};

/// Read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

/// Server instance
pub struct Server {
    listener: TcpListener,
    store: Arc<RecordStore>,
}

impl Server {
    /// Bind the configured listen address
    pub async fn bind(config: &Config, store: Arc<RecordStore>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.listen).await?;
        info!(
            address = %listener.local_addr()?,
            records = store.len(),
            "Server listening"
        );

        Ok(Server { listener, store })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task per client
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(peer = %addr, "Client connected");

                    let store = Arc::clone(&self.store);

                    tokio::spawn(async move {
                        match handle_connection(stream, store).await {
                            Ok(()) => debug!(peer = %addr, "Connection closed by client"),
                            Err(e) => warn!(peer = %addr, error = %e, "Closing connection"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// The stream is owned here and dropped on every return path, which closes
/// the socket.
pub async fn handle_connection<S>(
    mut stream: S,
    store: Arc<RecordStore>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(BANNER.as_bytes()).await?;
    serve_requests(&mut stream, &store).await
}

/// Request/response loop run after the banner has been sent
async fn serve_requests<S>(stream: &mut S, store: &RecordStore) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        match decode_request(&buffer) {
            DecodeResult::Complete(request, consumed) => {
                buffer.advance(consumed);

                let query = request.into_query();
                trace!(region = query.region(), date = query.date(), "Processing query");

                let response = QueryResponse {
                    response: matcher::find(store, query.region(), query.date()),
                };
                let data = encode_response(&response).map_err(ConnectionError::Encode)?;
                stream.write_all(&data).await?;
            }

            DecodeResult::Incomplete => {
                let n = stream.read_buf(&mut buffer).await?;
                if n == 0 {
                    if buffer.iter().all(u8::is_ascii_whitespace) {
                        return Ok(());
                    }
                    return Err(ConnectionError::UnexpectedEof);
                }
            }

            DecodeResult::Error(e) => return Err(ConnectionError::Malformed(e)),
        }
    }
}

/// Errors that end a client connection
#[derive(Debug)]
pub enum ConnectionError {
    Io(std::io::Error),
    Malformed(serde_json::Error),
    Encode(serde_json::Error),
    UnexpectedEof,
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::Io(e) => write!(f, "I/O error: {}", e),
            ConnectionError::Malformed(e) => write!(f, "Failed to decode request: {}", e),
            ConnectionError::Encode(e) => write!(f, "Failed to encode response: {}", e),
            ConnectionError::UnexpectedEof => write!(f, "Connection closed mid-request"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::Io(e)
    }
}
