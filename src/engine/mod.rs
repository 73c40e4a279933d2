//! Execution engine: process spawning, audit trail, request orchestration

pub mod audit;
pub mod command_executor;
pub mod gateway;
pub mod response;

pub use command_executor::{Command, CommandExecutor, CommandRunner, ExecutionResult};
pub use gateway::{ExecutionRequest, Gateway, GatewayOutcome, VenvRequest};
pub use response::ToolOutput;
