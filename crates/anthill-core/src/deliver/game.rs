//! Game server build deploy.

use std::path::PathBuf;

use serde_json::json;
use tracing::info;

use super::step;
use crate::app::Credentials;
use crate::context::DeliveryContext;
use crate::error::DeliverError;
use crate::http::{Body, Params};
use crate::services::{PutOutcome, ids};

pub const SCOPES: [&str; 2] = ["admin", "game_deploy_admin"];
pub const ROLE: &str = "deployer";

/// A packaged server build for the application version in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameBuild {
    pub path: PathBuf,
    /// Make the deployed version current once it is processed.
    pub switch_to_new: bool,
}

impl GameBuild {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            switch_to_new: true,
        }
    }

    fn file_name(&self) -> Result<String, DeliverError> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DeliverError::Config(format!("{} is not a file name", self.path.display()))
            })
    }
}

/// Upload `build` as the server for the context's application version.
///
/// An "already handled" answer from the backend counts as success.
pub fn deploy_game(
    context: &DeliveryContext,
    credentials: &Credentials,
    build: &GameBuild,
) -> Result<PutOutcome, DeliverError> {
    if !build.path.is_file() {
        return Err(DeliverError::Config(format!(
            "Game build {} cannot be found!",
            build.path.display()
        )));
    }
    let file_name = build.file_name()?;
    let app = context.app();

    context.authenticate(credentials, &SCOPES, ROLE)?;

    info!(file = %file_name, version = %app.app_version, "Deploying...");
    let outcome = context
        .admin()
        .api_put(
            context.session(),
            ids::GAME,
            "deploy",
            &json!({ "game_name": app.app_name, "game_version": app.app_version }),
            Body::File(build.path.clone()),
            Some(&json!({ "switch_to_new": build.switch_to_new.to_string() })),
            Params::new().with("X-File-Name", file_name.as_str()),
        )
        .map_err(step("deploy", &file_name))?;

    match &outcome {
        PutOutcome::Completed(_) => info!("Deployed!"),
        PutOutcome::AlreadyHandled { code, .. } => info!(code, "Build already deployed"),
    }
    Ok(outcome)
}
