pub mod block;
pub mod client_msg;
pub mod revision;
pub mod server_msg;

pub use block::{block_of, Block, BlockInfo};
pub use revision::ServerInfo;
pub use server_msg::{ProfileInfo, Progress, ServerMessage};

#[cfg(test)]
mod block_test;
