pub mod app;
pub mod commands;
pub mod context;

pub use app::{AuditFormat, Cli, Commands, LogLevel};
pub use context::GatewayContext;
