use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::client::options::ClientOptions;
use crate::client::params::Params;
use crate::client::result::ResultStream;
use crate::column::Column;
use crate::compress::frame::CompressionMethod;
use crate::error::{Error, Result};
use crate::protocol::block::Block;
use crate::protocol::client_msg::{
    write_cancel, write_data, write_hello, write_ping, write_query, QueryKind, QueryMessage,
};
use crate::protocol::revision::MIN_REVISION_WITH_SETTINGS_SERIALIZED_AS_STRINGS;
use crate::protocol::server_msg::{read_hello, read_message, ServerMessage};
use crate::protocol::ServerInfo;
use crate::wire::reader::ProtocolReader;
use crate::wire::writer::ProtocolWriter;
use crate::wire::with_deadline;

/// Session lifecycle. Handshake states are transient inside
/// [`Session::handshake_over`]; `Broken` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    SendingQuery,
    SendingData,
    ReceivingResult,
    Broken,
    Closed,
}

/// One connection to a ClickHouse server. Exclusively owned: every
/// operation takes `&mut self` and the protocol admits no interleaving.
pub struct Session<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) reader: ProtocolReader<ReadHalf<S>>,
    pub(crate) writer: ProtocolWriter<WriteHalf<S>>,
    pub(crate) server: ServerInfo,
    pub(crate) state: SessionState,
    options: ClientOptions,
    hostname: String,
}

impl Session<TcpStream> {
    /// Connects and performs the Hello exchange.
    pub async fn open(options: ClientOptions) -> Result<Self> {
        let addr = (options.host.as_str(), options.port);
        let stream = with_deadline(options.connect_deadline(), TcpStream::connect(addr)).await?;
        stream.set_nodelay(true)?;
        Self::handshake_over(stream, options).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Runs the handshake over an already-established duplex stream.
    pub async fn handshake_over(stream: S, options: ClientOptions) -> Result<Self> {
        let (read_half, write_half) = split(stream);
        let mut reader =
            ProtocolReader::new(read_half, options.buffer_limit, options.receive_deadline());
        let mut writer =
            ProtocolWriter::new(write_half, options.buffer_limit, options.send_deadline());

        write_hello(
            &mut writer,
            &options.client_name,
            &options.database,
            &options.user,
            &options.password,
        )?;
        writer.flush().await?;

        let server = read_hello(&mut reader).await?;
        if server.revision < MIN_REVISION_WITH_SETTINGS_SERIALIZED_AS_STRINGS {
            return Err(Error::NotSupported(format!(
                "server revision {} is older than the oldest supported ({})",
                server.revision, MIN_REVISION_WITH_SETTINGS_SERIALIZED_AS_STRINGS
            )));
        }
        debug!(
            server = %server.name,
            display_name = %server.display_name,
            revision = server.revision,
            timezone = ?server.timezone,
            "handshake complete"
        );

        let hostname = std::env::var("HOSTNAME").unwrap_or_default();
        Ok(Self {
            reader,
            writer,
            server,
            state: SessionState::Ready,
            options,
            hostname,
        })
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn compression(&self) -> Option<(CompressionMethod, usize)> {
        self.options
            .compression
            .then_some((CompressionMethod::Lz4, self.options.compression_block_size))
    }

    fn require_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            other => Err(Error::Internal(format!(
                "session is {other:?}, not ready for a new operation"
            ))),
        }
    }

    /// Marks the session broken when `err` is a protocol or transport
    /// failure; caller-attributable errors leave it usable.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if err.is_fatal() {
            warn!(error = %err, "session broken");
            self.state = SessionState::Broken;
        }
        err
    }

    pub(crate) async fn next_message(&mut self) -> Result<ServerMessage> {
        let compressed = self.options.compression;
        match read_message(&mut self.reader, self.server.revision, compressed).await {
            Ok(msg) => Ok(msg),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn send_query_message(&mut self, query: &str, settings: &[(String, String)]) -> Result<()> {
        let compression = self.compression();
        let msg = QueryMessage {
            kind: QueryKind::Initial,
            query,
            settings,
            client_name: &self.options.client_name,
            client_hostname: &self.hostname,
            compression_enabled: self.options.compression,
        };
        let encoded = write_query(&mut self.writer, self.server.revision, &msg)
            .and_then(|()| write_data(&mut self.writer, &Block::new(), compression));
        if let Err(e) = encoded {
            self.writer.abort_pending();
            return Err(e);
        }
        self.writer.flush().await.map_err(|e| self.fail(e))
    }

    /// Submits a query and returns the lazy stream of result blocks.
    /// Parameters are substituted textually before submission.
    pub async fn execute(&mut self, query: &str, params: &Params) -> Result<ResultStream<'_, S>> {
        self.execute_with_settings(query, params, &[]).await
    }

    pub async fn execute_with_settings(
        &mut self,
        query: &str,
        params: &Params,
        settings: &[(String, String)],
    ) -> Result<ResultStream<'_, S>> {
        self.require_ready()?;
        let query = params.substitute(query)?;
        debug!(query = %query, "executing");

        self.state = SessionState::SendingQuery;
        if let Err(e) = self.send_query_message(&query, settings).await {
            if !e.is_fatal() {
                self.state = SessionState::Ready;
            }
            return Err(e);
        }
        self.state = SessionState::ReceivingResult;
        Ok(ResultStream::new(self))
    }

    /// Bulk insert: submits `INSERT INTO … VALUES`, waits for the server's
    /// structure sample, streams the block plus the empty terminator, and
    /// drains to end-of-stream.
    pub async fn insert(&mut self, table: &str, columns: Vec<(&str, Column)>) -> Result<()> {
        self.require_ready()?;
        let mut block = Block::new();
        let mut names = Vec::with_capacity(columns.len());
        for (name, column) in columns {
            names.push(name.to_string());
            block.push_column(name, column)?;
        }
        let query = format!("INSERT INTO {table} ({}) VALUES", names.join(", "));
        debug!(query = %query, rows = block.row_count(), "inserting");

        self.state = SessionState::SendingQuery;
        if let Err(e) = self.send_query_message(&query, &[]).await {
            if !e.is_fatal() {
                self.state = SessionState::Ready;
            }
            return Err(e);
        }

        // The server answers with the destination structure before it will
        // accept data.
        loop {
            match self.next_message().await? {
                ServerMessage::Data(sample) => {
                    debug!(columns = sample.column_count(), "insert structure sample");
                    break;
                }
                ServerMessage::TableColumns { .. }
                | ServerMessage::Progress(_)
                | ServerMessage::ProfileEvents(_) => continue,
                ServerMessage::Exception(e) => {
                    self.state = SessionState::Ready;
                    return Err(Error::Server(e));
                }
                other => {
                    return Err(self.fail(Error::UnexpectedResponse(format!(
                        "{other:?} while waiting for insert structure"
                    ))))
                }
            }
        }

        self.state = SessionState::SendingData;
        let compression = self.compression();
        let encoded = write_data(&mut self.writer, &block, compression)
            .and_then(|()| write_data(&mut self.writer, &Block::new(), compression));
        if let Err(e) = encoded {
            self.writer.abort_pending();
            self.state = SessionState::Ready;
            return Err(e);
        }
        self.writer.flush().await.map_err(|e| self.fail(e))?;

        self.state = SessionState::ReceivingResult;
        loop {
            match self.next_message().await? {
                ServerMessage::EndOfStream => {
                    self.state = SessionState::Ready;
                    return Ok(());
                }
                ServerMessage::Exception(e) => {
                    self.state = SessionState::Ready;
                    return Err(Error::Server(e));
                }
                ServerMessage::Progress(_)
                | ServerMessage::ProfileEvents(_)
                | ServerMessage::ProfileInfo(_)
                | ServerMessage::Data(_) => continue,
                other => {
                    return Err(self.fail(Error::UnexpectedResponse(format!(
                        "{other:?} while completing insert"
                    ))))
                }
            }
        }
    }

    /// Ping/Pong health check. Stale progress notifications queued from a
    /// previous query are tolerated and drained.
    pub async fn ping(&mut self) -> Result<()> {
        self.require_ready()?;
        write_ping(&mut self.writer)?;
        self.writer.flush().await.map_err(|e| self.fail(e))?;
        loop {
            match self.next_message().await? {
                ServerMessage::Pong => return Ok(()),
                ServerMessage::Progress(_) | ServerMessage::ProfileEvents(_) => continue,
                other => {
                    return Err(self.fail(Error::UnexpectedResponse(format!(
                        "{other:?} in response to ping"
                    ))))
                }
            }
        }
    }

    /// Requests cancellation of the in-flight query. The caller must keep
    /// draining the result stream afterwards.
    pub(crate) async fn send_cancel(&mut self) -> Result<()> {
        write_cancel(&mut self.writer)?;
        self.writer.flush().await.map_err(|e| self.fail(e))
    }

    /// Graceful close. Dropping the session closes the socket too; this
    /// variant flushes the FIN under the configured deadline.
    pub async fn dispose(mut self) -> Result<()> {
        self.state = SessionState::Closed;
        self.writer.shutdown().await
    }

    /// True when no unconsumed bytes sit in the transport buffers.
    pub fn is_drained(&self) -> bool {
        self.reader.is_drained()
    }
}
