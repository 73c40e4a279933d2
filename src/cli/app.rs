use crate::approval::ApprovalsCommand;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// execgate: approval-gated command execution for AI assistants
#[derive(Parser, Debug)]
#[clap(
    name = "execgate",
    about = "Approval-gated command execution for AI assistants",
    version
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Directory holding approvals, audit log and config.yml
    #[clap(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Settings file (defaults to <config-dir>/config.yml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Default command timeout in seconds
    #[clap(long, global = true)]
    pub timeout: Option<u64>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the execute_command tools over MCP stdio
    Serve,

    /// Run one command through the approval gateway
    Exec {
        /// Program, optionally followed by leading arguments
        command: String,

        /// Arguments passed to the program verbatim
        #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Manage remembered approvals
    Approvals {
        #[clap(subcommand)]
        command: ApprovalsCommand,
    },

    /// Views the audit log
    Audit {
        /// Number of recent entries to show
        #[clap(short, long)]
        tail: Option<usize>,

        /// Output format
        #[clap(long, value_enum, default_value = "text")]
        format: AuditFormat,
    },
}

impl Commands {
    /// Get the command name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Serve => "serve",
            Commands::Exec { .. } => "exec",
            Commands::Approvals { .. } => "approvals",
            Commands::Audit { .. } => "audit",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AuditFormat {
    Text,
    Json,
}

/// Log levels
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalsCommand;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["execgate", "serve"]);
        assert!(matches!(cli.command, Commands::Serve));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(!cli.log_json);
        assert!(cli.config_dir.is_none());
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_exec_keeps_hyphenated_args() {
        let cli = Cli::parse_from(["execgate", "exec", "ls", "-la", "/tmp"]);

        match cli.command {
            Commands::Exec { command, args } => {
                assert_eq!(command, "ls");
                assert_eq!(args, vec!["-la", "/tmp"]);
            }
            _ => panic!("Wrong command parsed"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "execgate",
            "serve",
            "--config-dir",
            "/tmp/state",
            "--timeout",
            "15",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(cli.timeout, Some(15));
        assert_eq!(cli.log_level.to_filter_directive(), "debug");
    }

    #[test]
    fn test_approvals_revoke() {
        let cli = Cli::parse_from(["execgate", "approvals", "revoke", "git"]);

        match cli.command {
            Commands::Approvals {
                command: ApprovalsCommand::Revoke { command },
            } => assert_eq!(command, "git"),
            _ => panic!("Wrong command parsed"),
        }
    }

    #[test]
    fn test_audit_command() {
        let cli = Cli::parse_from(["execgate", "audit", "--tail", "5", "--format", "json"]);

        match cli.command {
            Commands::Audit { tail, format } => {
                assert_eq!(tail, Some(5));
                assert_eq!(format, AuditFormat::Json);
            }
            _ => panic!("Wrong command parsed"),
        }
        assert_eq!(Commands::Serve.name(), "serve");
    }
}
