//! Delivery workflows built on the reconciler.
//!
//! - [`functions`]: server-side scripts on the `exec` service, no transaction.
//! - [`bundles`]: downloadable content on the `dlc` service, inside a
//!   published data version.
//! - [`game`]: a single game server build upload.

pub mod bundles;
pub mod functions;
pub mod game;

pub use bundles::{BundleDeploy, deploy_bundles};
pub use functions::{FunctionSync, sync_functions};
pub use game::{GameBuild, deploy_game};

use serde_json::{Map, Value};

use crate::error::{DeliverError, ServiceError};

/// Map a failed write to [`DeliverError::Step`].
pub(crate) fn step(step: &'static str, name: &str) -> impl FnOnce(ServiceError) -> DeliverError {
    let name = name.to_string();
    move |source| DeliverError::Step { step, name, source }
}

/// JSON text of an object field, as the admin forms expect it.
pub(crate) fn json_text(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}
