//! Function sync against a fake `exec` store.

mod support;

use std::sync::Arc;

use anthill_core::deliver::sync_functions;
use anthill_core::error::DeliverError;
use anthill_core::http::Method;
use anthill_core::manifest::{FunctionSpec, parse_manifest};
use anthill_core::reconcile::{Action, AssumeYes, ReconcileOptions, RunStatus};
use serde_json::json;
use support::{
    ExecBackend, ScriptedTransport, connect, credentials, error, ok, platform, write_file,
};
use tempfile::TempDir;

const SOURCE: &str = "function main(args) { return args.level + 1; }";

fn spec(dir: &TempDir, name: &str, code: &str, imports: &[&str]) -> FunctionSpec {
    FunctionSpec {
        name: name.to_string(),
        path: write_file(dir.path(), &format!("{name}.js"), code.as_bytes()),
        imports: imports.iter().map(|s| s.to_string()).collect(),
    }
}

fn setup() -> (Arc<ScriptedTransport>, Arc<ExecBackend>) {
    let transport = platform();
    let exec = ExecBackend::install(&transport);
    (transport, exec)
}

#[test]
fn undeclared_function_is_created_with_literal_source() {
    let dir = TempDir::new().unwrap();
    let (transport, exec) = setup();
    let context = connect(&transport, &[]);
    let functions = vec![spec(&dir, "level_up", SOURCE, &["utils", "math"])];

    let report = sync_functions(
        &context,
        &credentials(),
        &functions,
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::Delivered);
    assert_eq!(report.plan.count(Action::Create), 1);
    assert!(report.transaction.is_none());
    assert_eq!(
        exec.function("level_up"),
        Some((SOURCE.to_string(), "utils,math".to_string()))
    );

    let create = transport
        .requests()
        .into_iter()
        .find(|r| r.param("method") == Some("create"))
        .unwrap();
    assert_eq!(create.param("action"), Some("new_function"));
    assert_eq!(create.param("context"), Some("{}"));
    assert_eq!(create.param("code"), Some(SOURCE));
}

#[test]
fn second_run_has_nothing_to_do() {
    let dir = TempDir::new().unwrap();
    let functions = vec![
        spec(&dir, "a", SOURCE, &[]),
        spec(&dir, "b", "function b() {}", &["a"]),
    ];
    let (transport, _exec) = setup();

    let first = connect(&transport, &[]);
    sync_functions(&first, &credentials(), &functions, ReconcileOptions::default(), &mut AssumeYes)
        .unwrap();
    transport.clear_log();

    let second = connect(&transport, &[]);
    let report = sync_functions(
        &second,
        &credentials(),
        &functions,
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(report.plan.count(Action::Skip), 2);
    assert_eq!(transport.writes(), 0);
}

#[test]
fn changed_imports_alone_classify_as_update() {
    let dir = TempDir::new().unwrap();
    let (transport, exec) = setup();
    exec.declare("a", SOURCE, "utils");
    let context = connect(&transport, &[]);

    let report = sync_functions(
        &context,
        &credentials(),
        &[spec(&dir, "a", SOURCE, &["utils", "math"])],
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.plan.count(Action::Update), 1);
    assert_eq!(exec.function("a").unwrap().1, "utils,math");
    assert!(transport.admin_calls().contains(&"exec.function.update".to_string()));
}

#[test]
fn creates_run_before_updates() {
    let dir = TempDir::new().unwrap();
    let (transport, exec) = setup();
    exec.declare("old", "stale", "");
    let context = connect(&transport, &[]);

    sync_functions(
        &context,
        &credentials(),
        &[spec(&dir, "old", SOURCE, &[]), spec(&dir, "new", SOURCE, &[])],
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    let writes: Vec<_> = transport
        .admin_calls()
        .into_iter()
        .filter(|call| !call.ends_with(".get"))
        .collect();
    assert_eq!(writes, vec!["exec.new_function.create", "exec.function.update"]);
}

#[test]
fn unexpected_probe_failure_aborts_before_writes() {
    let dir = TempDir::new().unwrap();
    let (transport, _exec) = setup();
    transport.on(|r| {
        (r.method == Method::Get && r.param("context") == Some(r#"{"function_name":"broken"}"#))
        .then(|| error(500, "Internal error"))
    });
    let context = connect(&transport, &[]);

    let err = sync_functions(
        &context,
        &credentials(),
        &[spec(&dir, "fine", SOURCE, &[]), spec(&dir, "broken", SOURCE, &[])],
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap_err();

    match &err {
        DeliverError::Probe { kind, name, source } => {
            assert_eq!(*kind, "function");
            assert_eq!(name, "broken");
            assert_eq!(source.code(), 500);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "Failed to check function broken: Internal error");
    assert_eq!(transport.writes(), 0);
}

#[test]
fn answer_without_function_entry_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let (transport, exec) = setup();
    transport.on(|r| {
        (r.method == Method::Get && r.param("context") == Some(r#"{"function_name":"ghost"}"#))
            .then(|| ok(json!([{ "id": "breadcrumbs" }])))
    });
    let context = connect(&transport, &[]);

    let report = sync_functions(
        &context,
        &credentials(),
        &[spec(&dir, "ghost", SOURCE, &[])],
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(report.plan.count(Action::Skip), 1);
    assert_eq!(transport.admin_calls(), vec!["exec.function.get"]);
    assert!(exec.function("ghost").is_none());
}

#[test]
fn empty_manifest_writes_nothing() {
    let (transport, _exec) = setup();
    let context = connect(&transport, &[]);

    let report = sync_functions(
        &context,
        &credentials(),
        &[],
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::NothingToDo);
    assert_eq!(transport.writes(), 0);
}

#[test]
fn dry_run_probes_but_does_not_write() {
    let dir = TempDir::new().unwrap();
    let (transport, exec) = setup();
    let context = connect(&transport, &[]);
    let options = ReconcileOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = sync_functions(
        &context,
        &credentials(),
        &[spec(&dir, "a", SOURCE, &[])],
        options,
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(report.status, RunStatus::DryRun);
    assert_eq!(transport.writes(), 0);
    assert!(exec.function("a").is_none());
}

#[test]
fn missing_script_fails_before_login() {
    let (transport, _exec) = setup();
    let context = connect(&transport, &[]);
    let functions = vec![FunctionSpec {
        name: "ghost".to_string(),
        path: "/nonexistent/ghost.js".into(),
        imports: Vec::new(),
    }];

    let err = sync_functions(
        &context,
        &credentials(),
        &functions,
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap_err();

    assert!(matches!(err, DeliverError::Config(_)));
    assert_eq!(transport.count(|r| r.url.ends_with("/auth")), 0);
}

#[test]
fn manifest_file_drives_a_sync() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "greet.js", SOURCE.as_bytes());
    let manifest_path = write_file(
        dir.path(),
        "functions.json",
        br#"{"functions": {"greet": {"path": "greet.js", "imports": ["utils"]}}}"#,
    );
    let manifest = parse_manifest(&manifest_path).unwrap();
    let (transport, exec) = setup();
    let context = connect(&transport, &[]);

    sync_functions(
        &context,
        &credentials(),
        &manifest.functions,
        ReconcileOptions::default(),
        &mut AssumeYes,
    )
    .unwrap();

    assert_eq!(
        exec.function("greet"),
        Some((SOURCE.to_string(), "utils".to_string()))
    );
}
