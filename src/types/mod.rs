pub mod info;
pub mod parser;

pub use info::{parse_type, TypeArg, TypeInfo};
