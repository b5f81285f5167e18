//! Command construction and dispatch
//!
//! This module handles:
//! - Validating command line arguments into typed commands
//! - Choosing the response policy for each command
//! - Encoding, sending and collecting replies over a session

mod dispatcher;
mod parse;

pub use dispatcher::dispatch;
pub use parse::{parse, UsageError};
