//! Synchronous facade. One suspendable implementation exists; this wrapper
//! drives it to completion on a private current-thread runtime so callers
//! without an async executor get mirrored ordering guarantees.

use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};

use crate::client::options::ClientOptions;
use crate::client::params::Params;
use crate::client::session::Session;
use crate::column::Column;
use crate::error::Result;
use crate::protocol::block::Block;
use crate::protocol::ServerInfo;

pub struct BlockingSession {
    runtime: Runtime,
    inner: Session<TcpStream>,
}

impl BlockingSession {
    pub fn open(options: ClientOptions) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(Session::open(options))?;
        Ok(Self { runtime, inner })
    }

    pub fn server_info(&self) -> &ServerInfo {
        self.inner.server_info()
    }

    pub fn ping(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.ping())
    }

    /// Executes a query and collects every result block.
    pub fn execute(&mut self, query: &str, params: &Params) -> Result<Vec<Block>> {
        let inner = &mut self.inner;
        self.runtime.block_on(async {
            let stream = inner.execute(query, params).await?;
            stream.collect().await
        })
    }

    pub fn insert(&mut self, table: &str, columns: Vec<(&str, Column)>) -> Result<()> {
        self.runtime.block_on(self.inner.insert(table, columns))
    }

    pub fn dispose(self) -> Result<()> {
        let Self { runtime, inner } = self;
        runtime.block_on(inner.dispose())
    }
}
