//! Anthill Core Library
//!
//! Service discovery, authenticated admin RPC and manifest reconciliation
//! for delivering functions, content bundles and game builds to an Anthill
//! backend.

pub mod app;
pub mod context;
pub mod deliver;
pub mod error;
pub mod fs;
pub mod http;
pub mod manifest;
pub mod reconcile;
pub mod services;

/// Re-exports of commonly used types
pub mod prelude {
    // Application
    pub use crate::app::{ApplicationInfo, Credentials};
    pub use crate::context::DeliveryContext;

    // Errors
    pub use crate::error::{DeliverError, ServiceError};

    // Transport
    pub use crate::http::{ReqwestTransport, Session, Transport, TransportConfig};

    // Services
    pub use crate::services::{
        AdminClient, ApiResponse, PutOutcome, Service, ServiceClient, ServiceDirectory,
        ServiceLocation, ServiceRegistry, ids,
    };

    // Manifests
    pub use crate::manifest::{Bundle, Manifest, Script, parse_manifest};

    // Reconciliation
    pub use crate::reconcile::{
        Action, AssumeYes, Interaction, Plan, ReconcileOptions, Reconciler, RunReport, RunStatus,
    };

    // Workflows
    pub use crate::deliver::{GameBuild, deploy_bundles, deploy_game, sync_functions};

    // Filesystem
    pub use crate::fs::format_size;
}
