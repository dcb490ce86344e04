//! Reconciliation of a local manifest against remote declared state.
//!
//! One algorithm serves every delivery domain: probe each artifact,
//! classify it, present the plan, optionally confirm, open a transaction if
//! the domain needs one, apply writes in [`Action`] order, then publish.
//! Domains plug in through [`DeliveryTarget`].

pub mod engine;
pub mod plan;

use std::fmt;

use crate::error::DeliverError;
use crate::http::Session;

pub use engine::{AssumeYes, Interaction, ReconcileOptions, Reconciler, RunReport, RunStatus};
pub use plan::{Action, Plan, PlannedItem};

/// A unit of content named in a manifest.
pub trait Artifact {
    /// Identity, unique within a manifest.
    fn name(&self) -> &str;

    fn digest(&self) -> &str;

    /// Bytes that would be transferred.
    fn size(&self) -> u64 {
        0
    }
}

/// Progress marker for a run; failures after mutation began report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Probing,
    OpeningTransaction,
    Attaching,
    Uploading,
    Creating,
    Updating,
    Publishing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Probing => "probing",
            Phase::OpeningTransaction => "opening a data version",
            Phase::Attaching => "attaching",
            Phase::Uploading => "uploading",
            Phase::Creating => "creating",
            Phase::Updating => "updating",
            Phase::Publishing => "publishing",
        };
        f.write_str(s)
    }
}

impl From<Action> for Phase {
    fn from(action: Action) -> Self {
        match action {
            Action::Attach => Phase::Attaching,
            Action::Upload => Phase::Uploading,
            Action::Create => Phase::Creating,
            Action::Update | Action::Skip => Phase::Updating,
        }
    }
}

/// Remote side of one delivery domain.
pub trait DeliveryTarget {
    type Artifact: Artifact;

    /// Noun used in messages, e.g. "function" or "bundle".
    fn kind(&self) -> &'static str;

    /// Classify one artifact against remote state. Must not write.
    fn probe(&self, session: &Session, artifact: &Self::Artifact) -> Result<Action, DeliverError>;

    /// Question to ask before writing, or `None` when no confirmation is needed.
    fn confirmation(&self, _plan: &Plan) -> Option<String> {
        None
    }

    /// Whether writes must happen inside a published transaction.
    fn uses_transaction(&self) -> bool {
        false
    }

    /// Open the run's transaction and return its id.
    fn open_transaction(&self, _session: &Session) -> Result<String, DeliverError> {
        Err(DeliverError::Config(format!(
            "{} delivery does not use transactions",
            self.kind()
        )))
    }

    /// Perform one planned write.
    fn apply(
        &self,
        session: &Session,
        transaction: Option<&str>,
        action: Action,
        artifact: &Self::Artifact,
    ) -> Result<(), DeliverError>;

    /// Make the transaction's content visible.
    fn publish(&self, _session: &Session, _transaction: &str) -> Result<(), DeliverError> {
        Ok(())
    }
}
