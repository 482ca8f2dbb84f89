//! Server-side message decoders.

use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::error::{Error, Result, ServerException};
use crate::protocol::block::{read_block, Block};
use crate::protocol::revision::*;
use crate::wire::reader::ProtocolReader;

pub const SERVER_HELLO: u64 = 0;
pub const SERVER_DATA: u64 = 1;
pub const SERVER_EXCEPTION: u64 = 2;
pub const SERVER_PROGRESS: u64 = 3;
pub const SERVER_PONG: u64 = 4;
pub const SERVER_END_OF_STREAM: u64 = 5;
pub const SERVER_PROFILE_INFO: u64 = 6;
pub const SERVER_TOTALS: u64 = 7;
pub const SERVER_EXTREMES: u64 = 8;
pub const SERVER_TABLES_STATUS_RESPONSE: u64 = 9;
pub const SERVER_LOG: u64 = 10;
pub const SERVER_TABLE_COLUMNS: u64 = 11;
pub const SERVER_PART_UUIDS: u64 = 12;
pub const SERVER_READ_TASK_REQUEST: u64 = 13;
pub const SERVER_PROFILE_EVENTS: u64 = 14;
pub const SERVER_MERGE_TREE_ALL_RANGES: u64 = 15;
pub const SERVER_MERGE_TREE_READ_TASK: u64 = 16;
pub const SERVER_TIMEZONE_UPDATE: u64 = 17;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
    pub written_rows: u64,
    pub written_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
}

#[derive(Debug)]
pub enum ServerMessage {
    Hello(ServerInfo),
    Data(Block),
    Totals(Block),
    Extremes(Block),
    Exception(ServerException),
    Progress(Progress),
    Pong,
    EndOfStream,
    ProfileInfo(ProfileInfo),
    TableColumns { table: String, description: String },
    ProfileEvents(Block),
    TimezoneUpdate(String),
}

/// Reads the server Hello that answers ours. Latches the negotiated
/// revision; any other opcode at this point is fatal, and an Exception is
/// surfaced as-is (bad credentials arrive this way).
pub async fn read_hello<S>(r: &mut ProtocolReader<S>) -> Result<ServerInfo>
where
    S: AsyncRead + Unpin + Send,
{
    let opcode = r.read_varint().await?;
    match opcode {
        SERVER_HELLO => {}
        SERVER_EXCEPTION => return Err(read_exception(r).await?.into()),
        other => {
            return Err(Error::UnexpectedResponse(format!(
                "expected server hello, got opcode {other}"
            )))
        }
    }

    let name = r.read_string().await?;
    let major = r.read_varint().await?;
    let minor = r.read_varint().await?;
    let server_revision = r.read_varint().await?;
    let revision = server_revision.min(DBMS_TCP_PROTOCOL_VERSION);

    let timezone = if revision >= MIN_REVISION_WITH_SERVER_TIMEZONE {
        let tz = r.read_string().await?;
        Some(tz.parse().map_err(|_| {
            Error::UnexpectedResponse(format!("server sent unknown time zone `{tz}`"))
        })?)
    } else {
        None
    };
    let display_name = if revision >= MIN_REVISION_WITH_SERVER_DISPLAY_NAME {
        r.read_string().await?
    } else {
        String::new()
    };
    let patch = if revision >= MIN_REVISION_WITH_VERSION_PATCH {
        r.read_varint().await?
    } else {
        server_revision
    };

    Ok(ServerInfo {
        name,
        display_name,
        major,
        minor,
        patch,
        revision,
        timezone,
    })
}

async fn read_exception<S>(r: &mut ProtocolReader<S>) -> Result<ServerException>
where
    S: AsyncRead + Unpin + Send,
{
    // The nesting chain arrives outermost-first.
    let mut chain: Vec<ServerException> = Vec::new();
    loop {
        let code = r.read_i32().await?;
        let name = r.read_string().await?;
        let message = r.read_string().await?;
        let stack_trace = r.read_string().await?;
        let has_nested = r.read_bool().await?;
        chain.push(ServerException {
            code,
            name,
            message,
            stack_trace,
            nested: None,
        });
        if !has_nested {
            break;
        }
    }
    let mut result = None;
    while let Some(mut e) = chain.pop() {
        e.nested = result.map(Box::new);
        result = Some(e);
    }
    result.ok_or_else(|| Error::UnexpectedResponse("empty exception chain".into()))
}

async fn read_progress<S>(r: &mut ProtocolReader<S>, revision: u64) -> Result<Progress>
where
    S: AsyncRead + Unpin + Send,
{
    let mut progress = Progress {
        rows: r.read_varint().await?,
        bytes: r.read_varint().await?,
        ..Progress::default()
    };
    if revision >= MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS {
        progress.total_rows = r.read_varint().await?;
    }
    if revision >= MIN_REVISION_WITH_CLIENT_WRITE_INFO {
        progress.written_rows = r.read_varint().await?;
        progress.written_bytes = r.read_varint().await?;
    }
    Ok(progress)
}

async fn read_profile_info<S>(r: &mut ProtocolReader<S>) -> Result<ProfileInfo>
where
    S: AsyncRead + Unpin + Send,
{
    Ok(ProfileInfo {
        rows: r.read_varint().await?,
        blocks: r.read_varint().await?,
        bytes: r.read_varint().await?,
        applied_limit: r.read_bool().await?,
        rows_before_limit: r.read_varint().await?,
        calculated_rows_before_limit: r.read_bool().await?,
    })
}

/// Reads a block-carrying message body: temporary-table name, then the
/// block, through the decompression stage when the session negotiated one.
async fn read_block_body<S>(
    r: &mut ProtocolReader<S>,
    compressed: bool,
    skip_names: &[&str],
) -> Result<Block>
where
    S: AsyncRead + Unpin + Send,
{
    let _temp_table = r.read_str_bytes().await?;
    if compressed {
        r.begin_decompress();
        let block = read_block(r, skip_names).await;
        r.end_decompress();
        block
    } else {
        read_block(r, skip_names).await
    }
}

/// Reads the next server message. `Log` blocks (always uncompressed) are
/// decoded and dropped here rather than failing the session; the other
/// unimplemented opcodes are protocol errors.
pub async fn read_message<S>(
    r: &mut ProtocolReader<S>,
    revision: u64,
    compressed: bool,
) -> Result<ServerMessage>
where
    S: AsyncRead + Unpin + Send,
{
    loop {
        let opcode = r.read_varint().await?;
        trace!(opcode, "server message");
        match opcode {
            SERVER_HELLO => {
                return Err(Error::UnexpectedResponse(
                    "server hello outside handshake".into(),
                ))
            }
            SERVER_DATA => return Ok(ServerMessage::Data(read_block_body(r, compressed, &[]).await?)),
            SERVER_TOTALS => {
                return Ok(ServerMessage::Totals(
                    read_block_body(r, compressed, &[]).await?,
                ))
            }
            SERVER_EXTREMES => {
                return Ok(ServerMessage::Extremes(
                    read_block_body(r, compressed, &[]).await?,
                ))
            }
            SERVER_EXCEPTION => return Ok(ServerMessage::Exception(read_exception(r).await?)),
            SERVER_PROGRESS => {
                return Ok(ServerMessage::Progress(read_progress(r, revision).await?))
            }
            SERVER_PONG => return Ok(ServerMessage::Pong),
            SERVER_END_OF_STREAM => return Ok(ServerMessage::EndOfStream),
            SERVER_PROFILE_INFO => {
                return Ok(ServerMessage::ProfileInfo(read_profile_info(r).await?))
            }
            SERVER_TABLE_COLUMNS => {
                let table = r.read_string().await?;
                let description = r.read_string().await?;
                return Ok(ServerMessage::TableColumns { table, description });
            }
            SERVER_PROFILE_EVENTS => {
                return Ok(ServerMessage::ProfileEvents(
                    read_block_body(r, compressed, &[]).await?,
                ))
            }
            SERVER_TIMEZONE_UPDATE => {
                return Ok(ServerMessage::TimezoneUpdate(r.read_string().await?))
            }
            SERVER_LOG => {
                let log = read_block_body(r, false, &[]).await?;
                debug!(rows = log.row_count(), "discarding server log block");
            }
            SERVER_TABLES_STATUS_RESPONSE
            | SERVER_PART_UUIDS
            | SERVER_READ_TASK_REQUEST
            | SERVER_MERGE_TREE_ALL_RANGES
            | SERVER_MERGE_TREE_READ_TASK => {
                return Err(Error::UnexpectedResponse(format!(
                    "unsupported server message {opcode}"
                )))
            }
            other => {
                return Err(Error::UnexpectedResponse(format!(
                    "unknown server opcode {other}"
                )))
            }
        }
    }
}
