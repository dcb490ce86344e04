//! Bundle deploy against the `dlc` service.
//!
//! Every run that writes opens a new data version, attaches bundles the
//! service already holds, uploads the rest and publishes the version.

use serde_json::json;
use tracing::info;

use super::{json_text, step};
use crate::app::Credentials;
use crate::context::DeliveryContext;
use crate::error::DeliverError;
use crate::fs::format_size;
use crate::http::{Body, Params, Session};
use crate::manifest::{Bundle, BundleSpec};
use crate::reconcile::{
    Action, DeliveryTarget, Interaction, Plan, ReconcileOptions, Reconciler, RunReport,
};
use crate::services::{AdminClient, PutOutcome, Service, ids};

pub const SCOPES: [&str; 3] = ["admin", "dlc", "dlc_admin"];
pub const ROLE: &str = "deployer";

/// `dlc` answer for a bundle hash it does not hold.
pub const NOT_DECLARED: u16 = 404;

pub const CONFIRM_UPLOAD: &str = "Proceed?";
pub const CONFIRM_ATTACH_ONLY: &str =
    "***** There's nothing to upload, are you sure you want to create new data entry?";

pub struct BundleDeploy<'a> {
    admin: &'a AdminClient,
    dlc: &'a dyn Service,
    app_id: &'a str,
}

impl<'a> BundleDeploy<'a> {
    pub fn new(admin: &'a AdminClient, dlc: &'a dyn Service, app_id: &'a str) -> Self {
        Self { admin, dlc, app_id }
    }

    fn attach(&self, session: &Session, data_id: &str, bundle: &Bundle) -> Result<(), DeliverError> {
        info!(bundle = %bundle.name, "Attaching bundle");
        self.admin
            .api_post(
                session,
                ids::DLC,
                "attach_bundle",
                "attach",
                &json!({ "app_id": self.app_id, "data_id": data_id }),
                Params::new()
                    .with("bundle_name", bundle.name.as_str())
                    .with("bundle_hash", bundle.hash.as_str()),
            )
            .map_err(step("attach bundle", &bundle.name))?;
        Ok(())
    }

    fn upload(&self, session: &Session, data_id: &str, bundle: &Bundle) -> Result<(), DeliverError> {
        info!(bundle = %bundle.name, size = %format_size(bundle.size), "Uploading bundle");
        let created = self
            .admin
            .api_post(
                session,
                ids::DLC,
                "new_bundle",
                "create",
                &json!({ "app_id": self.app_id, "data_id": data_id }),
                Params::new()
                    .with("bundle_name", bundle.name.as_str())
                    .with("bundle_payload", json_text(&bundle.properties))
                    .with("bundle_filters", json_text(&bundle.filters)),
            )
            .map_err(step("create bundle", &bundle.name))?;

        let bundle_id = created
            .context_id("bundle_id")
            .ok_or(DeliverError::MissingContext("bundle_id"))?;
        info!(bundle = %bundle.name, bundle_id = %bundle_id, "New bundle created");

        let outcome = self
            .admin
            .api_put(
                session,
                ids::DLC,
                "bundle",
                &json!({ "app_id": self.app_id, "data_id": data_id, "bundle_id": bundle_id }),
                Body::File(bundle.path.clone()),
                None,
                Params::new(),
            )
            .map_err(step("upload bundle", &bundle.name))?;

        if let PutOutcome::AlreadyHandled { code, .. } = outcome {
            info!(bundle = %bundle.name, code, "Bundle content already uploaded");
        }
        Ok(())
    }
}

impl DeliveryTarget for BundleDeploy<'_> {
    type Artifact = Bundle;

    fn kind(&self) -> &'static str {
        "bundle"
    }

    fn probe(&self, session: &Session, bundle: &Bundle) -> Result<Action, DeliverError> {
        let params = Params::new()
            .with("bundle_name", bundle.name.as_str())
            .with("bundle_hash", bundle.hash.as_str());

        match self.dlc.get(session, "bundle", params) {
            Ok(_) => Ok(Action::Attach),
            Err(e) if e.code() == NOT_DECLARED => Ok(Action::Upload),
            Err(source) => Err(DeliverError::Probe {
                kind: "bundle",
                name: bundle.name.clone(),
                source,
            }),
        }
    }

    fn confirmation(&self, plan: &Plan) -> Option<String> {
        let question = if plan.has(Action::Upload) {
            CONFIRM_UPLOAD
        } else {
            CONFIRM_ATTACH_ONLY
        };
        Some(question.to_string())
    }

    fn uses_transaction(&self) -> bool {
        true
    }

    fn open_transaction(&self, session: &Session) -> Result<String, DeliverError> {
        info!("Creating new data version");
        let response = self
            .admin
            .api_post(
                session,
                ids::DLC,
                "app",
                "new_data_version",
                &json!({ "app_id": self.app_id }),
                Params::new(),
            )
            .map_err(step("create data version for", self.app_id))?;

        response
            .context_id("data_id")
            .ok_or(DeliverError::MissingContext("data_id"))
    }

    fn apply(
        &self,
        session: &Session,
        transaction: Option<&str>,
        action: Action,
        bundle: &Bundle,
    ) -> Result<(), DeliverError> {
        let data_id = transaction.ok_or(DeliverError::MissingContext("data_id"))?;
        match action {
            Action::Attach => self.attach(session, data_id, bundle),
            Action::Upload => self.upload(session, data_id, bundle),
            other => Err(DeliverError::Config(format!(
                "bundle deploy cannot {other} {}",
                bundle.name
            ))),
        }
    }

    fn publish(&self, session: &Session, data_id: &str) -> Result<(), DeliverError> {
        self.admin
            .api_post(
                session,
                ids::DLC,
                "data_version",
                "publish",
                &json!({ "app_id": self.app_id, "data_id": data_id }),
                Params::new(),
            )
            .map_err(step("publish data version", data_id))?;
        info!(data_id, "Publish process started!");
        Ok(())
    }
}

/// Hash every declared bundle, authenticate and reconcile.
///
/// `context` must have resolved the `dlc` service.
pub fn deploy_bundles(
    context: &DeliveryContext,
    credentials: &Credentials,
    bundles: &[BundleSpec],
    options: ReconcileOptions,
    interaction: &mut dyn Interaction,
) -> Result<RunReport, DeliverError> {
    let dlc = context.service(ids::DLC)?;
    let bundles = bundles
        .iter()
        .map(Bundle::load)
        .collect::<Result<Vec<_>, _>>()?;

    context.authenticate(credentials, &SCOPES, ROLE)?;

    info!(count = bundles.len(), "Gathering bundles...");
    let target = BundleDeploy::new(context.admin(), dlc, &context.app().app_name);
    Reconciler::new(context.session(), target, options).run(&bundles, interaction)
}
