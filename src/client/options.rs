use std::time::Duration;

use serde::Deserialize;

use crate::compress::frame::DEFAULT_BLOCK_SIZE;

/// Connection settings. Deserializable so embedding applications can lift
/// the driver section straight out of their own configuration files; a
/// zero timeout means unbounded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub client_name: String,
    pub compression: bool,
    pub compression_block_size: usize,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    /// Hard cap on transport buffer growth.
    pub buffer_limit: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
            client_name: "ch-native".to_string(),
            compression: false,
            compression_block_size: DEFAULT_BLOCK_SIZE,
            connect_timeout_ms: 10_000,
            send_timeout_ms: 30_000,
            receive_timeout_ms: 30_000,
            buffer_limit: 1 << 28,
        }
    }
}

fn deadline(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl ClientOptions {
    pub fn connect_deadline(&self) -> Option<Duration> {
        deadline(self.connect_timeout_ms)
    }

    pub fn send_deadline(&self) -> Option<Duration> {
        deadline(self.send_timeout_ms)
    }

    pub fn receive_deadline(&self) -> Option<Duration> {
        deadline(self.receive_timeout_ms)
    }
}
