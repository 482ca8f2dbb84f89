use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::client::session::{Session, SessionState};
use crate::error::{Error, Result};
use crate::protocol::block::Block;
use crate::protocol::server_msg::{ProfileInfo, Progress, ServerMessage};

/// Lazy sequence of result blocks for one query. Progress, profile and
/// totals/extremes side channels accumulate here while [`next_block`]
/// yields only row-bearing data.
///
/// [`next_block`]: ResultStream::next_block
pub struct ResultStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    session: &'a mut Session<S>,
    finished: bool,
    progress: Progress,
    profile: Option<ProfileInfo>,
    totals: Option<Block>,
    extremes: Option<Block>,
}

impl<'a, S> ResultStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(session: &'a mut Session<S>) -> Self {
        Self {
            session,
            finished: false,
            progress: Progress::default(),
            profile: None,
            totals: None,
            extremes: None,
        }
    }

    /// Next row-bearing block, or `None` once the server signalled
    /// end-of-stream (after which the session is ready again). Header
    /// blocks with zero rows are consumed silently.
    pub async fn next_block(&mut self) -> Result<Option<Block>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.session.next_message().await? {
                ServerMessage::Data(block) => {
                    if block.row_count() == 0 {
                        continue;
                    }
                    return Ok(Some(block));
                }
                ServerMessage::Progress(p) => {
                    self.progress.rows += p.rows;
                    self.progress.bytes += p.bytes;
                    self.progress.total_rows = self.progress.total_rows.max(p.total_rows);
                    self.progress.written_rows += p.written_rows;
                    self.progress.written_bytes += p.written_bytes;
                }
                ServerMessage::ProfileInfo(info) => self.profile = Some(info),
                ServerMessage::Totals(block) => self.totals = Some(block),
                ServerMessage::Extremes(block) => self.extremes = Some(block),
                ServerMessage::ProfileEvents(_) | ServerMessage::TableColumns { .. } => {}
                ServerMessage::TimezoneUpdate(tz) => {
                    debug!(timezone = %tz, "server timezone update");
                    if let Ok(parsed) = tz.parse() {
                        self.session.server.timezone = Some(parsed);
                    }
                }
                ServerMessage::Exception(e) => {
                    self.finished = true;
                    self.session.state = SessionState::Ready;
                    return Err(Error::Server(e));
                }
                ServerMessage::EndOfStream => {
                    self.finished = true;
                    self.session.state = SessionState::Ready;
                    return Ok(None);
                }
                other => {
                    return Err(self.session.fail(Error::UnexpectedResponse(format!(
                        "{other:?} inside a result stream"
                    ))))
                }
            }
        }
    }

    /// Drains the stream into memory.
    pub async fn collect(mut self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block().await? {
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Sends a Cancel and drains whatever the server still produces. An
    /// exception racing the cancellation is not an error here.
    pub async fn cancel(mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.session.send_cancel().await?;
        loop {
            match self.next_block().await {
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(()),
                Err(Error::Server(e)) => {
                    debug!(code = e.code, "server exception while cancelling");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn profile(&self) -> Option<&ProfileInfo> {
        self.profile.as_ref()
    }

    pub fn totals(&self) -> Option<&Block> {
        self.totals.as_ref()
    }

    pub fn extremes(&self) -> Option<&Block> {
        self.extremes.as_ref()
    }
}
