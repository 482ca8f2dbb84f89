pub mod blocking;
pub mod options;
pub mod params;
pub mod result;
pub mod session;

pub use blocking::BlockingSession;
pub use options::ClientOptions;
pub use params::Params;
pub use result::ResultStream;
pub use session::{Session, SessionState};

#[cfg(test)]
mod params_test;
