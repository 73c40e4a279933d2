//! Approval decision engine.
//!
//! Classifies an identity as approved (fast path) or unknown (ask the human),
//! and records "allow and remember" answers durably before reporting them.

use super::identity::CommandIdentity;
use super::prompt::{ApprovalChoice, ApprovalPrompter};
use super::store::{ApprovalRecord, ApprovalStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Trust decision for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "allowed-once")]
    AllowOnce,
    #[serde(rename = "allowed-persistent")]
    AllowPersistent,
    #[serde(rename = "denied")]
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny)
    }

    /// Same spelling as the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::AllowOnce => "allowed-once",
            Decision::AllowPersistent => "allowed-persistent",
            Decision::Deny => "denied",
        }
    }
}

pub struct ApprovalEngine {
    store: Arc<ApprovalStore>,
    prompter: Arc<dyn ApprovalPrompter>,
}

impl ApprovalEngine {
    pub fn new(store: Arc<ApprovalStore>, prompter: Arc<dyn ApprovalPrompter>) -> Self {
        Self { store, prompter }
    }

    /// Decide whether `identity` may run.
    ///
    /// Errors come from the prompter (no answer could be obtained) or from
    /// persisting an "allow and remember" answer; both mean nothing was granted.
    pub async fn decide(
        &self,
        identity: &CommandIdentity,
        command: &str,
        args: &[String],
    ) -> Result<Decision> {
        if self.store.get(identity).is_some() {
            debug!("'{}' is already approved", identity);
            return Ok(Decision::AllowPersistent);
        }

        let choice = self.prompter.request_approval(command, args).await?;
        debug!("Approval answer for '{}': {:?}", identity, choice);

        match choice {
            ApprovalChoice::AllowOnce => Ok(Decision::AllowOnce),
            ApprovalChoice::AllowAlways => {
                self.store
                    .put_async(identity.clone(), ApprovalRecord::approved_now())
                    .await?;
                Ok(Decision::AllowPersistent)
            }
            ApprovalChoice::Deny => {
                info!(target: "security", "Execution of '{}' denied", identity);
                Ok(Decision::Deny)
            }
        }
    }
}
