//! Protocol revision constants and the server identity latched at
//! handshake. The negotiated revision is `min(client, server)` and gates
//! every optional wire field for the life of the session.

use chrono_tz::Tz;

/// Revision this client advertises in its Hello.
pub const DBMS_TCP_PROTOCOL_VERSION: u64 = 54453;

pub const MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS: u64 = 51554;
pub const MIN_REVISION_WITH_SERVER_TIMEZONE: u64 = 54058;
pub const MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;
pub const MIN_REVISION_WITH_SERVER_DISPLAY_NAME: u64 = 54372;
pub const MIN_REVISION_WITH_VERSION_PATCH: u64 = 54401;
pub const MIN_REVISION_WITH_CLIENT_WRITE_INFO: u64 = 54420;
pub const MIN_REVISION_WITH_SETTINGS_SERIALIZED_AS_STRINGS: u64 = 54429;
pub const MIN_REVISION_WITH_INTERSERVER_SECRET: u64 = 54441;
pub const MIN_REVISION_WITH_OPENTELEMETRY: u64 = 54442;
pub const MIN_REVISION_WITH_DISTRIBUTED_DEPTH: u64 = 54448;
pub const MIN_REVISION_WITH_INITIAL_QUERY_START_TIME: u64 = 54449;
pub const MIN_REVISION_WITH_INCREMENTAL_PROFILE_EVENTS: u64 = 54451;
pub const MIN_REVISION_WITH_PARALLEL_REPLICAS: u64 = 54453;

pub const CLIENT_VERSION_MAJOR: u64 = 1;
pub const CLIENT_VERSION_MINOR: u64 = 0;

/// Identity and capabilities the server announced in its Hello.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub display_name: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Negotiated revision: `min(server, client)`.
    pub revision: u64,
    pub timezone: Option<Tz>,
}
