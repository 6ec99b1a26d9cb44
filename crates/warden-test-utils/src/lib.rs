//! Testing utilities for the warden workspace
//!
//! Shared scratch-workspace builders, plan fixtures, and content samples.

#![allow(missing_docs)]

use tempfile::TempDir;

use warden_core::{GateConfig, Session};
use warden_plan::{approve_plan, Plan, PlanDocument, PlanRef, PlanStore};
use warden_workspace::WorkspaceRoot;

/// Initialize env-filtered tracing output for tests (idempotent)
pub fn init_test_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fresh workspace root in a temp directory, layout created
pub fn scratch_workspace() -> (TempDir, WorkspaceRoot) {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let root = WorkspaceRoot::discover(dir.path()).unwrap();
    root.ensure_layout().unwrap();
    (dir, root)
}

/// A session over a fresh workspace, context fetched, preflight disabled
///
/// Preflight is off so tests exercising the gate pipeline do not shell out
/// to the toolchain; preflight behavior is tested through explicit
/// `verify_command` configs instead.
pub fn armed_session() -> (TempDir, Session) {
    let (dir, root) = scratch_workspace();
    let config = GateConfig {
        preflight: false,
        ..GateConfig::default()
    };
    let session = Session::with_config(root, config);
    session.fetch_context().unwrap();
    (dir, session)
}

/// A session whose preflight runs exactly one workspace verify command
pub fn session_with_verify_command(command: &[&str]) -> (TempDir, Session) {
    let (dir, root) = scratch_workspace();
    let config = GateConfig {
        preflight: true,
        verify_command: command.iter().map(|s| (*s).to_string()).collect(),
        ..GateConfig::default()
    };
    let session = Session::with_config(root, config);
    session.fetch_context().unwrap();
    (dir, session)
}

/// Render a lint-clean plan authorizing writes to `paths`
pub fn plan_text(id: &str, paths: &[&str]) -> String {
    let path_list = paths
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
[approval]
status = "PENDING"

[metadata]
id = "{id}"
title = "Scoped change for {id}"
description = "Test plan covering a narrow slice of the tree"
created_at = "2026-08-20T09:00:00Z"

[scope]
objective = "Change only the listed paths"
paths = [{path_list}]

[[phases]]
id = "phase-1"
objective = "Apply the change"
allowed_ops = ["write"]
forbidden_ops = ["delete"]

[verification]
gates = ["cargo test"]

[rollback]
policy = "Restore previous file contents on any failed verification"
"#
    )
}

/// Persist and approve a plan authorizing writes to `paths`
pub fn approved_plan(root: &WorkspaceRoot, id: &str, paths: &[&str]) -> Plan {
    let store = PlanStore::new(root.clone());
    let document = PlanDocument::parse(&plan_text(id, paths)).unwrap();
    let saved = store.save(document).unwrap();
    approve_plan(root, &store, &PlanRef::Hash(saved.hash)).unwrap()
}

/// Markdown content that passes every analyzer
pub fn clean_markdown() -> String {
    "# Session notes\n\nRotation happens hourly.\n".to_string()
}

/// Rust content with a module header that passes every analyzer
pub fn clean_rust() -> String {
    "//! Session helpers.\n\npub fn rotate(n: u32) -> u32 {\n    n + 1\n}\n".to_string()
}

/// Rust content carrying an incomplete-work marker
pub fn marker_rust() -> String {
    "//! Session helpers.\n\npub fn rotate(n: u32) -> u32 {\n    // TODO finish rotation\n    n\n}\n"
        .to_string()
}
