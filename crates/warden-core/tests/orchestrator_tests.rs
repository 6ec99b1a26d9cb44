//! End-to-end gate pipeline tests

use pretty_assertions::assert_eq;

use warden_core::{
    read_audit_log, verify_workspace_integrity, write_file, GateError, WriteMetadata, WriteRequest,
};
use warden_plan::PlanRef;
use warden_test_utils::{
    approved_plan, armed_session, clean_markdown, clean_rust, marker_rust,
    session_with_verify_command,
};
use warden_workspace::ContentHash;

#[test]
fn approved_plan_allows_a_clean_write() {
    let (dir, session) = armed_session();
    let plan = approved_plan(session.root(), "notes-pass", &["notes/**"]);

    let receipt = write_file(
        &session,
        WriteRequest::new("notes/session.md", clean_markdown(), PlanRef::Hash(plan.hash)),
    )
    .unwrap();

    let on_disk = std::fs::read(dir.path().join("notes/session.md")).unwrap();
    assert_eq!(ContentHash::compute(&on_disk), receipt.new_hash);
    assert_eq!(receipt.plan_id, "notes-pass");
    assert_eq!(receipt.audit_seq, 1);

    let entries = read_audit_log(&session).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, "write_file");
    assert!(verify_workspace_integrity(&session).valid);
}

#[test]
fn bootstrap_then_write_anywhere() {
    let (dir, session) = armed_session();
    let plan = warden_core::bootstrap_plan(&session, "initial scaffolding", Vec::new()).unwrap();

    let receipt = write_file(
        &session,
        WriteRequest::new(
            "docs/readme.md",
            clean_markdown(),
            PlanRef::Id(plan.id().to_string()),
        ),
    )
    .unwrap();

    assert!(dir.path().join("docs/readme.md").is_file());
    // Bootstrap and the write itself, one chain.
    assert_eq!(receipt.audit_seq, 2);
    assert!(verify_workspace_integrity(&session).valid);
}

#[test]
fn marker_content_never_reaches_disk() {
    let (dir, session) = armed_session();
    let plan = approved_plan(session.root(), "auth-work", &["src/**"]);

    let err = write_file(
        &session,
        WriteRequest::new("src/auth.rs", marker_rust(), PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();

    assert_eq!(err.code(), "POLICY_VIOLATION");
    assert!(matches!(err, GateError::Policy { gate: "policy", .. }));
    assert!(!dir.path().join("src/auth.rs").exists());

    // The refusal is audited and the tripwire is engaged.
    let entries = read_audit_log(&session).unwrap();
    assert_eq!(entries[0].error_code.as_deref(), Some("POLICY_VIOLATION"));
    assert_eq!(session.tripwire().as_deref(), Some("POLICY_VIOLATION"));
}

#[test]
fn tripwire_suspends_mutation_until_reset() {
    let (_dir, session) = armed_session();
    let plan = approved_plan(session.root(), "auth-work", &["src/**"]);

    write_file(
        &session,
        WriteRequest::new("src/auth.rs", marker_rust(), PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();

    let err = write_file(
        &session,
        WriteRequest::new("src/auth.rs", clean_rust(), PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "TRIPWIRE_ENGAGED");

    session.reset_tripwire();
    write_file(
        &session,
        WriteRequest::new("src/auth.rs", clean_rust(), PlanRef::Hash(plan.hash)),
    )
    .unwrap();

    // Three attempts, three entries, one unbroken chain.
    let entries = read_audit_log(&session).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(verify_workspace_integrity(&session).valid);
}

#[test]
fn missing_plan_is_refused_and_audited() {
    let (_dir, session) = armed_session();
    let err = write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Id("ghost".to_string())),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PLAN_NOT_FOUND");
    assert!(session.tripwire().is_none());

    let entries = read_audit_log(&session).unwrap();
    assert_eq!(entries[0].error_code.as_deref(), Some("PLAN_NOT_FOUND"));
}

#[test]
fn out_of_scope_path_is_refused() {
    let (_dir, session) = armed_session();
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);
    let err = write_file(
        &session,
        WriteRequest::new("src/sneaky.md", clean_markdown(), PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PLAN_PATH_UNAUTHORIZED");
}

#[test]
fn expected_identity_is_checked_strictly() {
    let (_dir, session) = armed_session();
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);

    let err = write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Hash(plan.hash))
            .expecting("some-other-plan", plan.hash),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PLAN_ID_MISMATCH");

    let wrong = ContentHash::compute(b"not the plan");
    let err = write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Hash(plan.hash))
            .expecting("notes-only", wrong),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PLAN_HASH_MISMATCH");
}

#[test]
fn stale_previous_hash_is_content_drift() {
    let (dir, session) = armed_session();
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);

    let receipt = write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Hash(plan.hash)),
    )
    .unwrap();

    // Something else touches the file outside the gatekeeper.
    std::fs::write(dir.path().join("notes/a.md"), "# edited elsewhere\n").unwrap();

    let err = write_file(
        &session,
        WriteRequest::new("notes/a.md", "# update\n", PlanRef::Hash(plan.hash))
            .with_previous_hash(receipt.new_hash),
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONTENT_DRIFT");
    assert_eq!(session.tripwire().as_deref(), Some("CONTENT_DRIFT"));
}

#[test]
fn header_metadata_is_synthesized_into_the_file() {
    let (dir, session) = armed_session();
    let plan = approved_plan(session.root(), "auth-work", &["src/**"]);

    write_file(
        &session,
        WriteRequest::new(
            "src/rotate.rs",
            "pub fn rotate(n: u32) -> u32 {\n    n + 1\n}\n",
            PlanRef::Hash(plan.hash),
        )
        .with_metadata(WriteMetadata {
            role: "service".to_string(),
            purpose: "token rotation".to_string(),
            failure_modes: vec!["clock skew".to_string()],
        }),
    )
    .unwrap();

    let written = std::fs::read_to_string(dir.path().join("src/rotate.rs")).unwrap();
    assert!(written.starts_with("//! Role: service\n"));
    assert!(written.contains("//! Failure mode: clock skew"));
    assert!(written.ends_with("pub fn rotate(n: u32) -> u32 {\n    n + 1\n}\n"));
}

#[test]
fn metadata_never_touches_non_source_files() {
    let (dir, session) = armed_session();
    let plan = approved_plan(session.root(), "notes-pass", &["notes/**"]);

    write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Hash(plan.hash)).with_metadata(
            WriteMetadata {
                role: "notes".to_string(),
                purpose: "session notes".to_string(),
                failure_modes: Vec::new(),
            },
        ),
    )
    .unwrap();

    let written = std::fs::read_to_string(dir.path().join("notes/a.md")).unwrap();
    assert_eq!(written, clean_markdown());
}

#[test]
fn headerless_source_without_metadata_is_refused() {
    let (_dir, session) = armed_session();
    let plan = approved_plan(session.root(), "auth-work", &["src/**"]);
    let err = write_file(
        &session,
        WriteRequest::new(
            "src/rotate.rs",
            "pub fn rotate(n: u32) -> u32 {\n    n + 1\n}\n",
            PlanRef::Hash(plan.hash),
        ),
    )
    .unwrap_err();
    assert!(matches!(err, GateError::Policy { gate: "policy", .. }));
}

#[test]
fn failed_preflight_restores_prior_bytes() {
    let (dir, session) = session_with_verify_command(&["false"]);
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);

    let prior = "# original\n";
    std::fs::create_dir_all(dir.path().join("notes")).unwrap();
    std::fs::write(dir.path().join("notes/a.md"), prior).unwrap();

    let err = write_file(
        &session,
        WriteRequest::new("notes/a.md", "# replacement\n", PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PREFLIGHT_FAILED");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes/a.md")).unwrap(),
        prior
    );
}

#[test]
fn failed_preflight_removes_a_new_file() {
    let (dir, session) = session_with_verify_command(&["false"]);
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);

    let err = write_file(
        &session,
        WriteRequest::new("notes/new.md", clean_markdown(), PlanRef::Hash(plan.hash)),
    )
    .unwrap_err();
    assert_eq!(err.code(), "PREFLIGHT_FAILED");
    assert!(!dir.path().join("notes/new.md").exists());
}

#[test]
fn passing_preflight_commits_the_write() {
    let (dir, session) = session_with_verify_command(&["true"]);
    let plan = approved_plan(session.root(), "notes-only", &["notes/**"]);

    write_file(
        &session,
        WriteRequest::new("notes/a.md", clean_markdown(), PlanRef::Hash(plan.hash)),
    )
    .unwrap();
    assert!(dir.path().join("notes/a.md").is_file());
}
