//! The reconciliation run loop.

use std::collections::HashSet;

use tracing::{info, warn};

use super::{Action, Artifact, DeliveryTarget, Phase, Plan, PlannedItem};
use crate::error::DeliverError;
use crate::http::Session;

/// Operator-facing side of a run.
pub trait Interaction {
    /// Show the plan before anything is written.
    fn present(&mut self, plan: &Plan);

    /// Ask a yes/no question.
    fn confirm(&mut self, question: &str) -> Result<bool, DeliverError>;
}

/// Non-interactive runs: shows nothing and answers yes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Interaction for AssumeYes {
    fn present(&mut self, _plan: &Plan) {}

    fn confirm(&mut self, _question: &str) -> Result<bool, DeliverError> {
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Skip the confirmation question.
    pub force: bool,
    /// Stop after presenting the plan.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Remote state already matched; nothing was written.
    NothingToDo,
    DryRun,
    /// The operator answered no; nothing was written.
    Declined,
    Delivered,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub plan: Plan,
    /// Id of the published transaction, if one was opened.
    pub transaction: Option<String>,
}

/// Drives one run of a [`DeliveryTarget`] over a manifest.
pub struct Reconciler<'a, T> {
    session: &'a Session,
    target: T,
    options: ReconcileOptions,
}

impl<'a, T: DeliveryTarget> Reconciler<'a, T> {
    pub fn new(session: &'a Session, target: T, options: ReconcileOptions) -> Self {
        Self {
            session,
            target,
            options,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Probe every artifact and classify it. Performs no writes.
    ///
    /// Any probe failure aborts planning.
    pub fn plan(&self, artifacts: &[T::Artifact]) -> Result<Plan, DeliverError> {
        let mut seen = HashSet::new();
        for artifact in artifacts {
            if !seen.insert(artifact.name()) {
                return Err(DeliverError::Config(format!(
                    "{} {} is declared more than once",
                    self.target.kind(),
                    artifact.name()
                )));
            }
        }

        let items = artifacts
            .iter()
            .enumerate()
            .map(|(index, artifact)| {
                let action = self.target.probe(self.session, artifact)?;
                Ok(PlannedItem {
                    index,
                    name: artifact.name().to_string(),
                    digest: artifact.digest().to_string(),
                    size: artifact.size(),
                    action,
                })
            })
            .collect::<Result<Vec<_>, DeliverError>>()?;

        Ok(Plan::new(items))
    }

    /// Plan, present, confirm and execute.
    pub fn run(
        &self,
        artifacts: &[T::Artifact],
        interaction: &mut dyn Interaction,
    ) -> Result<RunReport, DeliverError> {
        let plan = self.plan(artifacts)?;
        interaction.present(&plan);

        if plan.has_no_writes() {
            info!("Nothing to deliver, exiting!");
            return Ok(report(RunStatus::NothingToDo, plan, None));
        }
        if self.options.dry_run {
            return Ok(report(RunStatus::DryRun, plan, None));
        }
        if !self.options.force
            && let Some(question) = self.target.confirmation(&plan)
            && !interaction.confirm(&question)?
        {
            info!("Exiting!");
            return Ok(report(RunStatus::Declined, plan, None));
        }

        let transaction = self.execute(&plan, artifacts)?;
        Ok(report(RunStatus::Delivered, plan, transaction))
    }

    /// Apply a confirmed plan. Returns the published transaction id, if any.
    pub fn execute(
        &self,
        plan: &Plan,
        artifacts: &[T::Artifact],
    ) -> Result<Option<String>, DeliverError> {
        let transaction = if self.target.uses_transaction() {
            let id = self
                .target
                .open_transaction(self.session)
                .map_err(|e| halted(Phase::OpeningTransaction, None, e))?;
            info!(data_id = %id, "opened data version");
            Some(id)
        } else {
            None
        };

        for action in Action::WRITES {
            for item in plan.with_action(action) {
                let artifact = &artifacts[item.index];
                info!(action = %action, name = %item.name, kind = self.target.kind(), "applying");
                self.target
                    .apply(self.session, transaction.as_deref(), action, artifact)
                    .map_err(|e| halted(action.into(), transaction.clone(), e))?;
            }
        }

        if let Some(id) = &transaction {
            info!(data_id = %id, "publishing");
            self.target
                .publish(self.session, id)
                .map_err(|e| halted(Phase::Publishing, Some(id.clone()), e))?;
        }

        Ok(transaction)
    }
}

fn report(status: RunStatus, plan: Plan, transaction: Option<String>) -> RunReport {
    RunReport {
        status,
        plan,
        transaction,
    }
}

fn halted(phase: Phase, transaction: Option<String>, source: DeliverError) -> DeliverError {
    if let Some(id) = &transaction {
        warn!(data_id = %id, %phase, "run halted with an unpublished data version");
    }
    DeliverError::Halted {
        phase,
        transaction,
        source: Box::new(source),
    }
}
