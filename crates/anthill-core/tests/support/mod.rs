//! Shared fixtures: an in-memory transport and fake platform services.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anthill_core::app::{ApplicationInfo, Credentials};
use anthill_core::context::DeliveryContext;
use anthill_core::fs::md5_file;
use anthill_core::http::{Body, HttpRequest, HttpResponse, Method, Transport, TransportError};
use serde_json::{Value, json};

pub const ENVIRONMENT: &str = "http://env.test";
pub const DISCOVERY: &str = "http://discovery.test";
pub const LOGIN: &str = "http://login.test";
pub const ADMIN: &str = "http://admin.test";
pub const DLC: &str = "http://dlc.test";
pub const GAME: &str = "http://game.test";

pub const APP_NAME: &str = "shooter";
pub const APP_VERSION: &str = "1.0";
pub const TOKEN: &str = "token-1";

type Responder = Box<dyn Fn(&HttpRequest) -> Option<HttpResponse> + Send + Sync>;

/// Routes requests through registered responders and records every request.
///
/// Responders registered later take precedence. A request no responder
/// claims fails like an unreachable host.
#[derive(Default)]
pub struct ScriptedTransport {
    responders: Mutex<Vec<Responder>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(
        &self,
        responder: impl Fn(&HttpRequest) -> Option<HttpResponse> + Send + Sync + 'static,
    ) {
        self.responders.lock().unwrap().push(Box::new(responder));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&HttpRequest) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|r| predicate(r)).count()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Admin calls in order, as `service.action.method`.
    pub fn admin_calls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(admin_call)
            .map(|(service, action, method)| format!("{service}.{action}.{method}"))
            .collect()
    }

    /// Number of requests that could modify remote state.
    pub fn writes(&self) -> usize {
        self.admin_calls()
            .iter()
            .filter(|call| !call.ends_with(".get"))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());
        let responders = self.responders.lock().unwrap();
        responders
            .iter()
            .rev()
            .find_map(|responder| responder(&request))
            .ok_or_else(|| {
                TransportError::Connection(format!("no route for {} {}", request.method, request.url))
            })
    }
}

pub fn ok(value: Value) -> HttpResponse {
    HttpResponse::new(200, value.to_string().into_bytes())
}

pub fn error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(status, message.as_bytes().to_vec())
}

/// `(service, action, method)` of a request to the admin service. Reads are
/// reported with method `get`, uploads with method `put`.
pub fn admin_call(request: &HttpRequest) -> Option<(String, String, String)> {
    let method = match request.method {
        Method::Get if request.url == format!("{ADMIN}/api") => "get".to_string(),
        Method::Post if request.url == format!("{ADMIN}/api") => request.param("method")?.to_string(),
        Method::Put if request.url == format!("{ADMIN}/service/upload") => "put".to_string(),
        _ => return None,
    };
    Some((
        request.param("service")?.to_string(),
        request.param("action")?.to_string(),
        method,
    ))
}

/// Decoded `context` field of an admin request.
pub fn context_of(request: &HttpRequest) -> Value {
    request
        .param("context")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null)
}

pub fn app() -> ApplicationInfo {
    ApplicationInfo::new(APP_NAME, APP_VERSION, "gs-1")
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "deployer".to_string(),
        password: "secret".to_string(),
    }
}

/// Environment, discovery and login for a well-formed platform.
pub fn platform() -> Arc<ScriptedTransport> {
    let transport = ScriptedTransport::new();
    let directory: BTreeMap<&'static str, &'static str> = [
        ("login", LOGIN),
        ("admin", ADMIN),
        ("dlc", DLC),
        ("game", GAME),
    ]
    .into_iter()
    .collect();

    transport.on(|r| {
        (r.method == Method::Get && r.url == format!("{ENVIRONMENT}/{APP_NAME}/{APP_VERSION}"))
            .then(|| ok(json!({ "discovery": DISCOVERY, "region": "eu" })))
    });

    let batch = directory.clone();
    transport.on(move |r| {
        let prefix = format!("{DISCOVERY}/services/");
        let ids = r.url.strip_prefix(prefix.as_str())?;
        let found: BTreeMap<&str, &str> = ids
            .split(',')
            .filter_map(|id| batch.get(id).map(|location| (id, *location)))
            .collect();
        Some(ok(json!(found)))
    });

    transport.on(move |r| {
        let prefix = format!("{DISCOVERY}/service/");
        let id = r.url.strip_prefix(prefix.as_str())?;
        Some(match directory.get(id) {
            Some(location) => HttpResponse::new(200, location.as_bytes().to_vec()),
            None => error(404, "Service not found"),
        })
    });

    transport.on(|r| (r.url == format!("{LOGIN}/auth")).then(|| ok(json!({ "token": TOKEN }))));
    transport
}

pub fn connect(transport: &Arc<ScriptedTransport>, extra: &[&str]) -> DeliveryContext {
    DeliveryContext::connect(transport.clone(), ENVIRONMENT, app(), extra).unwrap()
}

/// Fake `exec` function store behind the admin service.
#[derive(Default)]
pub struct ExecBackend {
    functions: Mutex<BTreeMap<String, (String, String)>>,
}

impl ExecBackend {
    pub fn install(transport: &ScriptedTransport) -> Arc<Self> {
        let backend = Arc::new(Self::default());
        let handler = Arc::clone(&backend);
        transport.on(move |r| handler.handle(r));
        backend
    }

    pub fn declare(&self, name: &str, code: &str, imports: &str) {
        self.functions
            .lock()
            .unwrap()
            .insert(name.to_string(), (code.to_string(), imports.to_string()));
    }

    /// Stored `(code, imports)` of a function.
    pub fn function(&self, name: &str) -> Option<(String, String)> {
        self.functions.lock().unwrap().get(name).cloned()
    }

    fn handle(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let (service, action, method) = admin_call(request)?;
        if service != "exec" {
            return None;
        }
        let mut functions = self.functions.lock().unwrap();
        match (action.as_str(), method.as_str()) {
            ("function", "get") => {
                let context = context_of(request);
                let name = context["function_name"].as_str()?;
                Some(match functions.get(name) {
                    Some((code, imports)) => ok(json!([
                        { "id": "breadcrumbs", "items": [] },
                        { "id": "function", "fields": {
                            "code": { "value": code },
                            "imports": { "value": imports },
                        }},
                    ])),
                    None => error(445, "No such function"),
                })
            }
            ("new_function", "create") | ("function", "update") => {
                functions.insert(
                    request.param("name")?.to_string(),
                    (
                        request.param("code")?.to_string(),
                        request.param("imports")?.to_string(),
                    ),
                );
                Some(ok(json!({})))
            }
            _ => None,
        }
    }
}

/// Fake `dlc` content store: bundle probes plus the admin data version flow.
#[derive(Default)]
pub struct DlcBackend {
    state: Mutex<DlcState>,
}

#[derive(Default)]
pub struct DlcState {
    /// Bundle hashes the service holds.
    pub hashes: BTreeSet<String>,
    pub published: Vec<String>,
    pub attached: Vec<(String, String)>,
    /// Leave `data_id` out of the new data version's context header.
    pub omit_data_id: bool,
    next_id: u64,
}

impl DlcBackend {
    pub fn install(transport: &ScriptedTransport) -> Arc<Self> {
        let backend = Arc::new(Self::default());
        let handler = Arc::clone(&backend);
        transport.on(move |r| handler.handle(r));
        backend
    }

    pub fn hold(&self, hash: &str) {
        self.state.lock().unwrap().hashes.insert(hash.to_string());
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut DlcState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn handle(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let mut state = self.state.lock().unwrap();

        if request.method == Method::Get && request.url == format!("{DLC}/bundle") {
            let hash = request.param("bundle_hash")?;
            return Some(if state.hashes.contains(hash) {
                ok(json!({ "bundle_name": request.param("bundle_name") }))
            } else {
                error(404, "No such bundle")
            });
        }

        let (service, action, method) = admin_call(request)?;
        if service != "dlc" {
            return None;
        }
        let context = context_of(request);
        match (action.as_str(), method.as_str()) {
            ("app", "new_data_version") => {
                state.next_id += 1;
                let header = if state.omit_data_id {
                    json!({})
                } else {
                    json!({ "data_id": state.next_id })
                };
                Some(ok(json!({})).with_header("X-Api-Context", header.to_string()))
            }
            ("attach_bundle", "attach") => {
                let data_id = context["data_id"].as_str()?.to_string();
                state
                    .attached
                    .push((data_id, request.param("bundle_name")?.to_string()));
                Some(ok(json!({})))
            }
            ("new_bundle", "create") => {
                state.next_id += 1;
                let header = json!({ "bundle_id": format!("b{}", state.next_id) });
                Some(ok(json!({})).with_header("X-Api-Context", header.to_string()))
            }
            ("bundle", "put") => {
                let Some(Body::File(path)) = &request.body else {
                    return Some(error(400, "Expected a file body"));
                };
                let (hash, _) = md5_file(path).ok()?;
                state.hashes.insert(hash);
                Some(ok(json!({})))
            }
            ("data_version", "publish") => {
                state
                    .published
                    .push(context["data_id"].as_str()?.to_string());
                Some(ok(json!({})))
            }
            _ => None,
        }
    }
}

pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
