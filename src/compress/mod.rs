pub mod cityhash;
pub mod frame;

pub use frame::{CompressionMethod, DEFAULT_BLOCK_SIZE};

#[cfg(test)]
mod cityhash_test;
#[cfg(test)]
mod frame_test;
