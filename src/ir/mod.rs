//! SSA IR: data model, builder, text format and verifier.

pub mod builder;
pub mod format;
pub mod parse;
pub mod types;
pub mod verify;

pub use builder::FunctionBuilder;
pub use format::{format_func, format_module};
pub use parse::{ParseError, parse_func, parse_module};
pub use types::*;
pub use verify::{VerifyError, verify_function, verify_module};
