//! Approval system - human-granted trust for external programs
//!
//! A program is either approved (a durable record exists) or unknown. Unknown
//! programs are put to the human, who may allow once, allow and remember, or
//! deny. Approval is keyed by program name only: approving `git` once permits
//! every later `git` invocation, whatever its arguments.

pub mod cli;
pub mod engine;
pub mod identity;
pub mod prompt;
pub mod store;

pub use cli::ApprovalsCommand;
pub use engine::{ApprovalEngine, Decision};
pub use identity::{split_command, CommandIdentity};
pub use prompt::{ApprovalChoice, ApprovalPrompter, DenyPrompter, TerminalPrompter};
pub use store::{ApprovalMap, ApprovalRecord, ApprovalStatus, ApprovalStore};
