//! Client-side message encoders. Only `Query` is revision-sensitive; its
//! field order is fixed by the protocol and gated by the negotiated
//! revision latched at handshake.

use tokio::io::AsyncWrite;

use crate::compress::frame::CompressionMethod;
use crate::error::{Error, Result};
use crate::protocol::block::{write_block, Block};
use crate::protocol::revision::*;
use crate::wire::writer::ProtocolWriter;

pub const CLIENT_HELLO: u64 = 0;
pub const CLIENT_QUERY: u64 = 1;
pub const CLIENT_DATA: u64 = 2;
pub const CLIENT_CANCEL: u64 = 3;
pub const CLIENT_PING: u64 = 4;

/// Query processing stage requested from the server.
const STAGE_COMPLETE: u64 = 2;

/// The distributed fan-out kind is deliberately unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Initial,
    Secondary,
}

pub fn write_hello<S>(
    w: &mut ProtocolWriter<S>,
    client_name: &str,
    database: &str,
    user: &str,
    password: &str,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    w.write_varint(CLIENT_HELLO)?;
    w.write_string(client_name)?;
    w.write_varint(CLIENT_VERSION_MAJOR)?;
    w.write_varint(CLIENT_VERSION_MINOR)?;
    w.write_varint(DBMS_TCP_PROTOCOL_VERSION)?;
    w.write_string(database)?;
    w.write_string(user)?;
    w.write_string(password)
}

pub struct QueryMessage<'a> {
    pub kind: QueryKind,
    pub query: &'a str,
    pub settings: &'a [(String, String)],
    pub client_name: &'a str,
    pub client_hostname: &'a str,
    pub compression_enabled: bool,
}

pub fn write_query<S>(w: &mut ProtocolWriter<S>, revision: u64, msg: &QueryMessage<'_>) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    if msg.kind != QueryKind::Initial {
        return Err(Error::NotSupported(
            "only initial queries are supported".into(),
        ));
    }

    w.write_varint(CLIENT_QUERY)?;
    // Query id: empty, the server allocates one.
    w.write_string("")?;

    // Client-info section.
    w.write_varint(1)?; // kind: initial query
    w.write_string("")?; // initial user
    w.write_string("")?; // initial query id
    w.write_string("0.0.0.0:0")?; // initial address
    if revision >= MIN_REVISION_WITH_INITIAL_QUERY_START_TIME {
        w.write_bytes(&[0u8; 8])?; // start time, filled in by the server
    }
    w.write_varint(1)?; // interface: TCP
    w.write_string("")?; // os user
    w.write_string(msg.client_hostname)?;
    w.write_string(msg.client_name)?;
    w.write_varint(CLIENT_VERSION_MAJOR)?;
    w.write_varint(CLIENT_VERSION_MINOR)?;
    w.write_varint(DBMS_TCP_PROTOCOL_VERSION)?;
    if revision >= MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO {
        w.write_string("")?; // quota key
    }
    if revision >= MIN_REVISION_WITH_DISTRIBUTED_DEPTH {
        w.write_varint(0)?;
    }
    if revision >= MIN_REVISION_WITH_VERSION_PATCH {
        w.write_varint(DBMS_TCP_PROTOCOL_VERSION)?; // client build
    }
    if revision >= MIN_REVISION_WITH_OPENTELEMETRY {
        w.write_u8(0)?; // no trace context
    }
    if revision >= MIN_REVISION_WITH_PARALLEL_REPLICAS {
        w.write_varint(0)?; // collaborate_with_initiator
        w.write_varint(0)?; // count_participating_replicas
        w.write_varint(0)?; // number_of_current_replica
    }

    // Settings as (key, flags, value) strings; empty key terminates.
    for (key, value) in msg.settings {
        w.write_string(key)?;
        w.write_varint(1)?; // important
        w.write_string(value)?;
    }
    w.write_string("")?;

    if revision >= MIN_REVISION_WITH_INTERSERVER_SECRET {
        w.write_string("")?;
    }
    w.write_varint(STAGE_COMPLETE)?;
    w.write_u8(msg.compression_enabled as u8)?;
    w.write_string(msg.query)
}

/// A data message: opcode and temporary-table name travel raw; the block
/// itself goes through the compression stage when one is negotiated.
pub fn write_data<S>(
    w: &mut ProtocolWriter<S>,
    block: &Block,
    compression: Option<(CompressionMethod, usize)>,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    w.write_varint(CLIENT_DATA)?;
    w.write_string("")?; // temporary table name
    match compression {
        Some((method, block_size)) => {
            w.begin_compress(method, block_size)?;
            let res = write_block(w, block);
            if res.is_err() {
                w.abort_pending();
                return res;
            }
            w.end_compress()
        }
        None => write_block(w, block),
    }
}

pub fn write_cancel<S>(w: &mut ProtocolWriter<S>) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    w.write_varint(CLIENT_CANCEL)
}

pub fn write_ping<S>(w: &mut ProtocolWriter<S>) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    w.write_varint(CLIENT_PING)
}
