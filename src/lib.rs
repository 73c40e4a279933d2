//! execgate - human-approved command execution for AI assistants
//!
//! Every command an assistant asks to run passes through an approval step,
//! is started without a shell under a timeout, and is recorded in an audit log.

pub mod approval;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod server;

pub use error::{GatewayError, Result};
