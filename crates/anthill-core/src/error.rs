//! Error types for remote calls and delivery runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpResponse;
use crate::reconcile::Phase;

/// Status code reserved for "the transport could not reach the service".
pub const CONNECTION_FAILURE: u16 = 599;

/// Failure of a single remote call.
///
/// Every variant carries a numeric code so callers can decide which
/// outcomes they expect (for example "not declared") and which are fatal.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The transport never got a response.
    #[error("Error 599: {0}")]
    Connection(String),

    /// The service answered with a status of 300 or above.
    #[error("Error {code}: {message}")]
    Remote {
        code: u16,
        message: String,
        response: Box<HttpResponse>,
    },

    /// A service identity could not be resolved through discovery.
    #[error("Error 404: service '{0}' is not registered in discovery")]
    NotFound(String),

    /// The call was rejected locally before reaching the wire.
    #[error("Error 400: {0}")]
    InvalidRequest(String),

    /// The service answered successfully but the payload was unusable.
    #[error("Error 500: {0}")]
    InvalidResponse(String),

    /// A local request body could not be read.
    #[error("failed to read request body {path}: {source}")]
    Body {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Connection(_) => CONNECTION_FAILURE,
            ServiceError::Remote { code, .. } => *code,
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidRequest(_) => 400,
            ServiceError::InvalidResponse(_) => 500,
            ServiceError::Body { .. } => 400,
        }
    }

    /// Human-readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            ServiceError::Remote { message, .. } => message.clone(),
            ServiceError::Connection(message)
            | ServiceError::InvalidRequest(message)
            | ServiceError::InvalidResponse(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Raw response for remote errors.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ServiceError::Remote { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Consume the error, returning the raw response for remote errors.
    pub fn into_response(self) -> Result<HttpResponse, ServiceError> {
        match self {
            ServiceError::Remote { response, .. } => Ok(*response),
            other => Err(other),
        }
    }
}

/// Failure of a delivery run.
#[derive(Debug, Error)]
pub enum DeliverError {
    /// The manifest or local setup is malformed.
    #[error("{0}")]
    Config(String),

    /// A local artifact could not be read.
    #[error("{kind} {path} cannot be read: {source}")]
    Io {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Probing remote state failed with an unexpected code.
    #[error("Failed to check {kind} {name}: {}", .source.message())]
    Probe {
        kind: &'static str,
        name: String,
        #[source]
        source: ServiceError,
    },

    /// A mutation failed.
    #[error("Failed to {step} {name}: {}", .source.message())]
    Step {
        step: &'static str,
        name: String,
        #[source]
        source: ServiceError,
    },

    /// A mutation succeeded but its side-channel context lacked an id.
    #[error("Failed to get data context: missing '{0}'")]
    MissingContext(&'static str),

    /// Bootstrap, discovery or authentication failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The run stopped after mutations had begun.
    #[error("{source} (halted while {phase}{})", dangling_suffix(.transaction))]
    Halted {
        phase: Phase,
        transaction: Option<String>,
        #[source]
        source: Box<DeliverError>,
    },
}

fn dangling_suffix(transaction: &Option<String>) -> String {
    match transaction {
        Some(id) => format!("; data version {id} was left unpublished"),
        None => String::new(),
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
