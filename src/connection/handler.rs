//! Per-client session
//!
//! Every accepted socket is driven by one `ConnectionHandler` on its own
//! task. The session reads bytes, cuts them into request lines, runs each
//! line through the dispatcher and writes the answer back before looking at
//! the next line.
//!
//! ```text
//!   accept ──> Session ──┐
//!                        ▼
//!        ┌──── fill buffer from socket <────────┐
//!        │               │                      │
//!        │               ▼                      │
//!        │     cut complete lines ──(none)──────┘
//!        │               │
//!        │               ▼
//!        │     dispatch, write reply, flush
//!        │               │
//!        └───────────────┘
//!
//!   EOF, I/O failure or undecodable line  ──>  session ends
//! ```
//!
//! A single read may carry part of a line or several lines at once. Bytes
//! that do not yet form a full line stay in the `BytesMut` buffer until the
//! next read completes them.

use crate::commands::CommandHandler;
use crate::protocol::{protocol_error_frame, FrameParser, ParseError, ReplyFormat, Response};
use bytes::{Buf, BytesMut};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

const READ_CHUNK: usize = 4096;

/// Server-wide counters, shared by every session
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
    /// Sessions ended by an undecodable request line
    pub protocol_errors: AtomicU64,
    pub bytes_read: AtomicU64,
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

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// One client's session state.
///
/// Replies are written in request order; a request is only dispatched once
/// the reply to the previous one has been flushed.
pub struct ConnectionHandler {
    socket: BufWriter<TcpStream>,
    peer: SocketAddr,
    pending: BytesMut,
    dispatcher: CommandHandler,
    framer: FrameParser,
    reply_format: ReplyFormat,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Wraps an accepted socket. Counts the connection as opened.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        dispatcher: CommandHandler,
        reply_format: ReplyFormat,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            socket: BufWriter::new(stream),
            peer,
            pending: BytesMut::with_capacity(READ_CHUNK),
            dispatcher,
            framer: FrameParser::new(),
            reply_format,
            stats,
        }
    }

    /// Serves the client until it hangs up or the session fails.
    ///
    /// A clean hang-up between requests is reported as
    /// [`ConnectionError::ClientDisconnected`].
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.peer, "Client connected");

        let outcome = self.serve().await;

        match &outcome {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.peer, "Client disconnected")
            }
            Err(ConnectionError::IoError(e)) if e.kind() == ErrorKind::ConnectionReset => {
                debug!(client = %self.peer, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.peer, error = %e, "Session ended with error"),
        }

        self.stats.connection_closed();
        outcome
    }

    async fn serve(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.next_line().await? {
                let response = self.dispatcher.execute(&line);
                self.stats.command_processed();

                debug!(
                    client = %self.peer,
                    command = %line,
                    outcome = response.kind(),
                    "Executed command"
                );

                self.reply(&response).await?;
            }

            self.fill_buffer().await?;
        }
    }

    /// Cuts the next complete request line out of the pending bytes.
    ///
    /// An undecodable line is answered with a `-PROTOCOL` frame and then
    /// ends the session.
    async fn next_line(&mut self) -> Result<Option<String>, ConnectionError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        match self.framer.parse(&self.pending) {
            Ok(Some((line, used))) => {
                self.pending.advance(used);
                trace!(client = %self.peer, used, left = self.pending.len(), "Cut request line");
                Ok(Some(line))
            }
            Ok(None) => {
                trace!(client = %self.peer, pending = self.pending.len(), "Waiting for rest of line");
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.peer, error = %e, "Undecodable request");
                self.stats.protocol_error();
                self.write_bytes(&protocol_error_frame(&e.to_string())).await?;
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    async fn fill_buffer(&mut self) -> Result<(), ConnectionError> {
        if self.pending.capacity() - self.pending.len() < READ_CHUNK / 4 {
            self.pending.reserve(READ_CHUNK);
        }

        let n = self.socket.get_mut().read_buf(&mut self.pending).await?;
        if n == 0 {
            return Err(if self.pending.is_empty() {
                ConnectionError::ClientDisconnected
            } else {
                ConnectionError::UnexpectedEof
            });
        }

        self.stats.bytes_read(n);
        trace!(client = %self.peer, bytes = n, "Read from socket");
        Ok(())
    }

    async fn reply(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let frame = response.encode(self.reply_format);
        self.write_bytes(&frame).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.socket.write_all(bytes).await?;
        self.socket.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.peer, bytes = bytes.len(), "Wrote reply");
        Ok(())
    }
}

/// Why a session ended.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A request line could not be decoded
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// The client hung up between requests
    #[error("Client disconnected")]
    ClientDisconnected,

    /// The client hung up halfway through a request line
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Runs a session for `stream` to completion.
///
/// Whatever goes wrong only ends this client's session; the error has
/// already been logged by [`ConnectionHandler::run`].
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: CommandHandler,
    reply_format: ReplyFormat,
    stats: Arc<ConnectionStats>,
) {
    let session = ConnectionHandler::new(stream, peer, dispatcher, reply_format, stats);
    let _ = session.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpListener;

    async fn create_test_server(
        reply_format: ReplyFormat,
    ) -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());

        let storage_clone = Arc::clone(&storage);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&storage_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    reply_format,
                    stats,
                ));
            }
        });

        (addr, storage, stats)
    }

    struct TestClient {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (reader, writer) = stream.into_split();
            Self {
                reader: BufReader::new(reader),
                writer,
            }
        }

        async fn send_raw(&mut self, bytes: &[u8]) {
            self.writer.write_all(bytes).await.unwrap();
        }

        async fn read_line(&mut self) -> String {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            line
        }

        async fn request(&mut self, command: &str) -> String {
            self.send_raw(format!("{}\n", command).as_bytes()).await;
            self.read_line().await
        }
    }

    #[tokio::test]
    async fn test_text_scenario() {
        let (addr, _, _) = create_test_server(ReplyFormat::Text).await;
        let mut client = TestClient::connect(addr).await;

        assert_eq!(
            client.request("HSET abc 123").await,
            "Элемент добавлен в хеш-таблицу\n"
        );
        assert_eq!(client.request("HGET abc").await, "123\n");
        assert_eq!(
            client.request("HDEL abc").await,
            "Элемент удалён из хеш-таблицы\n"
        );
        assert_eq!(client.request("HGET abc").await, "Error\n");
    }

    #[tokio::test]
    async fn test_tagged_scenario() {
        let (addr, _, _) = create_test_server(ReplyFormat::Tagged).await;
        let mut client = TestClient::connect(addr).await;

        assert_eq!(client.request("HSET abc 123").await, "+INSERTED\n");
        assert_eq!(client.request("HGET abc").await, "+VALUE 123\n");
        assert_eq!(client.request("HDEL abc").await, "+REMOVED\n");
        assert_eq!(client.request("HGET abc").await, "-NOT_FOUND not found\n");
        assert_eq!(client.request("QPOP").await, "-QUEUE_EMPTY\n");
        assert_eq!(client.request("FLY").await, "-UNKNOWN_COMMAND FLY\n");
    }

    #[tokio::test]
    async fn test_split_frame_is_reassembled() {
        let (addr, storage, _) = create_test_server(ReplyFormat::Tagged).await;
        let mut client = TestClient::connect(addr).await;

        client.send_raw(b"HSET sp").await;
        client.writer.flush().await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        client.send_raw(b"lit value\r\n").await;

        assert_eq!(client.read_line().await, "+INSERTED\n");
        assert_eq!(storage.hget("split"), Ok("value".to_string()));
    }

    #[tokio::test]
    async fn test_pipelined_frames() {
        let (addr, _, _) = create_test_server(ReplyFormat::Tagged).await;
        let mut client = TestClient::connect(addr).await;

        client
            .send_raw(b"SPUSH a\nSPUSH b\nSPOP\nSPOP\nSPOP\n")
            .await;

        assert_eq!(client.read_line().await, "+STACKED\n");
        assert_eq!(client.read_line().await, "+STACKED\n");
        assert_eq!(client.read_line().await, "+POPPED b\n");
        assert_eq!(client.read_line().await, "+POPPED a\n");
        assert_eq!(client.read_line().await, "-STACK_EMPTY\n");
    }

    #[tokio::test]
    async fn test_escaped_values_roundtrip() {
        let (addr, _, _) = create_test_server(ReplyFormat::Tagged).await;
        let mut client = TestClient::connect(addr).await;

        assert_eq!(client.request("QPUSH one\\ntwo").await, "+QUEUED\n");
        assert_eq!(client.request("QPOP").await, "+POPPED one\\ntwo\n");
    }

    #[tokio::test]
    async fn test_protocol_error_closes_connection() {
        let (addr, _, stats) = create_test_server(ReplyFormat::Tagged).await;
        let mut client = TestClient::connect(addr).await;

        let line = client.request("HGET \\q").await;
        // The message itself is escaped on the wire
        assert_eq!(line, "-PROTOCOL invalid escape sequence: \\\\q\n");

        // Server side is gone
        assert_eq!(client.read_line().await, "");
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert_eq!(stats.protocol_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_other_connections_survive_a_failed_one() {
        let (addr, _, _) = create_test_server(ReplyFormat::Tagged).await;
        let mut good = TestClient::connect(addr).await;
        let mut bad = TestClient::connect(addr).await;

        assert_eq!(good.request("SADD k").await, "+ADDED\n");
        bad.request("SADD \\").await;
        drop(bad);

        assert_eq!(good.request("SISMEMBER k").await, "+PRESENT k\n");
    }

    #[tokio::test]
    async fn test_concurrent_clients_insert_distinct_keys() {
        let (addr, storage, _) = create_test_server(ReplyFormat::Tagged).await;

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                tokio::spawn(async move {
                    let mut client = TestClient::connect(addr).await;
                    client.request(&format!("HSET key{} value{}", i, i)).await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "+INSERTED\n");
        }

        for i in 0..32 {
            assert_eq!(storage.hget(&format!("key{}", i)), Ok(format!("value{}", i)));
        }
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(ReplyFormat::Tagged).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TestClient::connect(addr).await;

        // Give the server time to accept the connection
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.request("QPUSH x").await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 8);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 8);

        // Close connection
        drop(client);

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
