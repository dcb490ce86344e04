//! Function sync against the `exec` service.

use serde_json::{Value, json};
use tracing::info;

use super::step;
use crate::app::Credentials;
use crate::context::DeliveryContext;
use crate::error::DeliverError;
use crate::fs::text_digest;
use crate::http::{Params, Session};
use crate::manifest::{FunctionSpec, Script};
use crate::reconcile::{
    Action, Artifact, DeliveryTarget, Interaction, ReconcileOptions, Reconciler, RunReport,
};
use crate::services::{AdminClient, ids};

pub const SCOPES: [&str; 2] = ["admin", "exec_admin"];
pub const ROLE: &str = "synchronizer";

/// `exec` answer for a function that has never been declared.
pub const NOT_DECLARED: u16 = 445;

pub struct FunctionSync<'a> {
    admin: &'a AdminClient,
}

impl<'a> FunctionSync<'a> {
    pub fn new(admin: &'a AdminClient) -> Self {
        Self { admin }
    }

    fn form(script: &Script) -> Params {
        Params::new()
            .with("name", script.name.as_str())
            .with("imports", script.imports_joined())
            .with("code", script.code.as_str())
    }
}

impl DeliveryTarget for FunctionSync<'_> {
    type Artifact = Script;

    fn kind(&self) -> &'static str {
        "function"
    }

    fn probe(&self, session: &Session, script: &Script) -> Result<Action, DeliverError> {
        let context = json!({ "function_name": script.name });
        let probe_error = |source| DeliverError::Probe {
            kind: "function",
            name: script.name.clone(),
            source,
        };

        let response = match self.admin.api_get(session, ids::EXEC, "function", &context) {
            Ok(response) => response,
            Err(e) if e.code() == NOT_DECLARED => return Ok(Action::Create),
            Err(e) => return Err(probe_error(e)),
        };
        let entries: Value = response.json().map_err(probe_error)?;

        // A declared function without a readable record is left alone.
        let Some(entry) = AdminClient::find_entry(&entries, "function") else {
            return Ok(Action::Skip);
        };
        let fields = &entry["fields"];
        let code = fields["code"]["value"].as_str().unwrap_or_default();
        let imports = fields["imports"]["value"].as_str().unwrap_or_default();

        if text_digest(code) == script.digest() && imports == script.imports_joined() {
            Ok(Action::Skip)
        } else {
            Ok(Action::Update)
        }
    }

    fn apply(
        &self,
        session: &Session,
        _transaction: Option<&str>,
        action: Action,
        script: &Script,
    ) -> Result<(), DeliverError> {
        match action {
            Action::Create => {
                info!(function = %script.name, "Creating function");
                self.admin
                    .api_post(
                        session,
                        ids::EXEC,
                        "new_function",
                        "create",
                        &json!({}),
                        Self::form(script),
                    )
                    .map_err(step("create function", &script.name))?;
            }
            Action::Update => {
                info!(function = %script.name, "Updating function");
                self.admin
                    .api_post(
                        session,
                        ids::EXEC,
                        "function",
                        "update",
                        &json!({ "function_name": script.name }),
                        Self::form(script),
                    )
                    .map_err(step("update function", &script.name))?;
            }
            other => {
                return Err(DeliverError::Config(format!(
                    "function sync cannot {other} {}",
                    script.name
                )));
            }
        }
        Ok(())
    }
}

/// Load every declared script, authenticate and reconcile.
pub fn sync_functions(
    context: &DeliveryContext,
    credentials: &Credentials,
    functions: &[FunctionSpec],
    options: ReconcileOptions,
    interaction: &mut dyn Interaction,
) -> Result<RunReport, DeliverError> {
    let scripts = functions
        .iter()
        .map(Script::load)
        .collect::<Result<Vec<_>, _>>()?;

    context.authenticate(credentials, &SCOPES, ROLE)?;

    info!(count = scripts.len(), "Syncing functions...");
    Reconciler::new(context.session(), FunctionSync::new(context.admin()), options)
        .run(&scripts, interaction)
}
