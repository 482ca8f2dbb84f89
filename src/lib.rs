//! Native-protocol ClickHouse client core.
//!
//! Speaks the binary TCP protocol: revisioned handshake, varint-framed
//! messages, per-block LZ4 compression with CityHash-128 integrity checks,
//! and columnar data blocks decoded through a typed codec registry.
//!
//! ```no_run
//! use ch_native::{ClientOptions, Params, Session};
//!
//! # async fn demo() -> ch_native::Result<()> {
//! let mut session = Session::open(ClientOptions::default()).await?;
//! let mut result = session.execute("SELECT currentUser()", &Params::new()).await?;
//! while let Some(block) = result.next_block().await? {
//!     println!("{:?}", block.column_at(0).map(|c| c.value_at(0)));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod column;
pub mod compress;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod types;
pub mod wire;

pub use client::{BlockingSession, ClientOptions, Params, ResultStream, Session, SessionState};
pub use column::{Column, ColumnData, DbType, Value};
pub use error::{Error, Result, ServerException};
pub use protocol::{Block, BlockInfo, ServerInfo};
pub use types::{parse_type, TypeInfo};
