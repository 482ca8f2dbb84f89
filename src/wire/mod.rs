pub mod buffer;
pub mod reader;
pub mod writer;

use std::future::Future;
use std::io;
use std::time::Duration;

use crate::error::{Error, Result};

#[cfg(test)]
mod buffer_test;
#[cfg(test)]
mod writer_test;

/// Runs one I/O future under an optional deadline. A fired deadline surfaces
/// as [`Error::Timeout`] carrying the configured value in milliseconds.
pub(crate) async fn with_deadline<F, T>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        Some(d) => match tokio::time::timeout(d, fut).await {
            Ok(res) => res.map_err(Error::from),
            Err(_) => Err(Error::Timeout(d.as_millis() as u64)),
        },
        None => fut.await.map_err(Error::from),
    }
}
