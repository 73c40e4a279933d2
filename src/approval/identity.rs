//! Command identity: the authorization key.
//!
//! Trust is granted per program, never per invocation. `git status` and `git`
//! with args `["status"]` both resolve to the identity `git`.

use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized program name used as the approval store key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandIdentity(String);

impl CommandIdentity {
    /// Derive the identity from a raw command string.
    ///
    /// Leading words beyond the program are ignored. Case is preserved and
    /// paths are not canonicalized, so `/usr/bin/git` and `git` stay distinct.
    pub fn from_command(command: &str) -> Result<Self> {
        let (program, _) = split_command(command)?;
        Ok(Self::from_program(&program))
    }

    /// Identity for a program token that has already been split out
    pub fn from_program(program: &str) -> Self {
        Self(program.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a raw command into its program and any leading arguments.
///
/// This is word splitting only (quotes and backslashes are honoured); no
/// expansion, globbing or operator handling takes place, so `;` or `|` are
/// returned as ordinary words.
pub fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidCommand(
            "command cannot be empty".to_string(),
        ));
    }

    let mut words = shell_words::split(trimmed)
        .map_err(|e| GatewayError::InvalidCommand(format!("{trimmed}: {e}")))?
        .into_iter();

    let program = words
        .next()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GatewayError::InvalidCommand("command cannot be empty".to_string()))?;

    Ok((program, words.collect()))
}
