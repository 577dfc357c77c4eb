//! Connection Handler
//!
//! Each client connection is served by its own task running a simple loop:
//!
//! ```text
//!   AwaitingRequest ──read──> Decoding ──> Dispatching ──> Replying
//!         ▲                                                   │
//!         └───────────────────────────────────────────────────┘
//! ```
//!
//! The loop ends when the peer closes the socket (a read of zero bytes), when
//! a read or write fails, or when a request cannot be decoded. A decode
//! failure gets a best-effort `-ERR` reply before the connection is closed.
//! Errors only ever end the connection they happened on.
//!
//! ## Buffer
//!
//! Reads go into a fixed [`READ_BUFFER_SIZE`] buffer. Every complete request
//! in it is answered in order; an unfinished request stays at the front
//! of the buffer until the next read completes it. A request that still is
//! not complete once the buffer is full is rejected, so it is never
//! executed in part.

use crate::commands::CommandHandler;
use crate::protocol::{decode_frame, DecodeError, Reply};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Size of the per-connection read buffer, and so the largest request accepted.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections closed because of a malformed request
    pub malformed_requests: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_request(&self) {
        self.malformed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the loop can run on a `TcpStream` or on any
/// other duplex byte stream.
pub struct ConnectionHandler<S> {
    /// The client stream, writes buffered
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Fixed-size read buffer
    buffer: Box<[u8; READ_BUFFER_SIZE]>,

    /// Bytes of `buffer` holding data not yet decoded
    filled: usize,

    /// The command handler (shares the store with every other connection)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: Box::new([0u8; READ_BUFFER_SIZE]),
            filled: 0,
            command_handler,
            stats,
        }
    }

    /// Runs the connection loop until the peer disconnects or an error occurs.
    ///
    /// A clean close by the peer returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Closing connection"),
        }

        result
    }

    /// The read-decode-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Answer every complete request already buffered, in order
            let mut start = 0;
            while start < self.filled {
                let (command, consumed) = match decode_frame(&self.buffer[start..self.filled]) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => return Err(self.reject(e).await),
                };
                start += consumed;

                trace!(client = %self.addr, command = command.name(), "Dispatching");
                let reply = self.command_handler.execute(command);
                self.stats.command_processed();

                self.send_reply(&reply).await?;
            }

            // Move the unfinished request to the front
            self.buffer.copy_within(start..self.filled, 0);
            self.filled -= start;

            if self.filled == READ_BUFFER_SIZE {
                let e = DecodeError::RequestTooLarge {
                    max: READ_BUFFER_SIZE,
                };
                return Err(self.reject(e).await);
            }

            let n = self
                .stream
                .get_mut()
                .read(&mut self.buffer[self.filled..])
                .await?;
            if n == 0 {
                if self.filled == 0 {
                    return Ok(());
                }
                return Err(ConnectionError::UnexpectedEof);
            }
            self.filled += n;
            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, buffered = self.filled, "Read data");
        }
    }

    /// Sends a best-effort `-ERR` reply for a malformed request.
    async fn reject(&mut self, e: DecodeError) -> ConnectionError {
        self.stats.malformed_request();
        let reply = Reply::error(format!("ERR {}", e));
        if let Err(write_err) = self.send_reply(&reply).await {
            debug!(
                client = %self.addr,
                error = %write_err,
                "Failed to send error reply"
            );
        }
        ConnectionError::Malformed(e)
    }

    /// Writes a reply and flushes it to the client.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, reply = %reply, "Sent reply");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent a request that could not be decoded
    #[error("malformed command: {0}")]
    Malformed(#[from] DecodeError),

    /// The peer closed the connection in the middle of a request
    #[error("unexpected end of stream")]
    UnexpectedEof,
}

impl<S> Drop for ConnectionHandler<S> {
    fn drop(&mut self) {
        self.stats.connection_closed();
    }
}

/// Handles a client connection to completion.
///
/// Errors are logged by the handler and go no further, so one bad client
/// cannot affect the listener or other connections.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    let _ = handler.run().await;
}
