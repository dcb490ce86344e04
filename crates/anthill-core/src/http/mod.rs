//! HTTP plumbing: the transport seam and the authenticated session.

pub mod reqwest_transport;
pub mod session;
pub mod transport;

pub use reqwest_transport::{ReqwestTransport, TransportConfig};
pub use session::{Params, Session};
pub use transport::{Body, HttpRequest, HttpResponse, Method, Transport, TransportError};
