// crates/repo-authz-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument resolution and bounded reads.
// Purpose: Ensure CLI inputs are validated before reaching the engine.
// Dependencies: repo-authz-cli main helpers
// ============================================================================

//! ## Overview
//! Validates actor resolution, identifier parsing, listing option mapping,
//! seed parsing, and `read_bytes_with_limit` size enforcement.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use repo_authz_core::ActorKind;
use repo_authz_core::UserId;

use super::ActorArg;
use super::ActorArgs;
use super::Cli;
use super::Commands;
use super::ReadLimitError;
use super::ReposCommand;
use super::list_options;
use super::parse_id;
use super::read_bytes_with_limit;
use super::read_seed;
use super::resolve_actor;

// ============================================================================
// SECTION: Actor Resolution
// ============================================================================

fn actor_args(actor: ActorArg, user_id: Option<u64>) -> ActorArgs {
    ActorArgs {
        actor,
        user_id,
    }
}

#[test]
fn actor_resolution_matches_kind() {
    let internal = resolve_actor(&actor_args(ActorArg::Internal, None)).expect("internal");
    assert_eq!(internal.kind(), ActorKind::Internal);
    let anonymous = resolve_actor(&actor_args(ActorArg::Anonymous, None)).expect("anonymous");
    assert_eq!(anonymous.kind(), ActorKind::Anonymous);
    let user = resolve_actor(&actor_args(ActorArg::User, Some(7))).expect("user");
    assert_eq!(user.authenticated_user(), UserId::from_raw(7));
}

#[test]
fn actor_resolution_rejects_inconsistent_flags() {
    let err = resolve_actor(&actor_args(ActorArg::User, None)).expect_err("missing id");
    assert!(err.to_string().contains("requires --user-id"));
    let err = resolve_actor(&actor_args(ActorArg::Anonymous, Some(1))).expect_err("stray id");
    assert!(err.to_string().contains("only valid with --actor user"));
    let err = resolve_actor(&actor_args(ActorArg::User, Some(0))).expect_err("zero id");
    assert!(err.to_string().contains("greater than zero"));
}

#[test]
fn zero_ids_are_rejected() {
    let err = parse_id(0, UserId::from_raw, "user id").expect_err("zero");
    assert_eq!(err.to_string(), "user id must be greater than zero");
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn repos_list_arguments_map_to_options() {
    let cli = Cli::try_parse_from([
        "repo-authz",
        "repos",
        "list",
        "--user-id",
        "3",
        "--name-contains",
        "api",
        "--org-id",
        "9",
        "--limit",
        "5",
        "--offset",
        "10",
    ])
    .expect("parse");
    let Some(Commands::Repos {
        command: ReposCommand::List(command),
    }) = cli.command
    else {
        panic!("expected repos list");
    };
    assert_eq!(command.actor.actor, ActorArg::User);
    let options = list_options(&command).expect("options");
    assert_eq!(options.name_contains.as_deref(), Some("api"));
    assert_eq!(options.org_id.map(|id| id.get()), Some(9));
    assert!(options.user_id.is_none());
    assert_eq!(options.limit, Some(5));
    assert_eq!(options.offset, 10);
}

#[test]
fn permission_ids_accept_comma_lists() {
    let cli = Cli::try_parse_from([
        "repo-authz",
        "permissions",
        "set",
        "--user-id",
        "1",
        "--repo-ids",
        "4,2,9",
    ])
    .expect("parse");
    let Some(Commands::Permissions {
        command: super::PermissionsCommand::Set(command),
    }) = cli.command
    else {
        panic!("expected permissions set");
    };
    assert_eq!(command.repo_ids, vec![4, 2, 9]);
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seed.json");
    fs::write(&path, vec![b'a'; 64]).expect("write");
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 64);
            assert_eq!(limit, 16);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(read_bytes_with_limit(&path, 64).expect("read").len(), 64);
}

#[test]
fn seed_documents_are_parsed_strictly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seed.json");
    fs::write(&path, r#"{"users": [], "unexpected": true}"#).expect("write");
    let err = read_seed(&path).expect_err("unknown field");
    assert!(err.to_string().contains("invalid seed document"));

    fs::write(&path, r#"{"permissions": [{"user_id": 1, "repo_ids": [3, 2]}]}"#)
        .expect("write");
    let seed = read_seed(&path).expect("seed");
    assert_eq!(seed.permissions.len(), 1);
    assert_eq!(seed.permissions[0].repo_ids.len(), 2);
}

#[test]
fn seed_rows_reject_misspelled_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seed.json");
    for document in [
        r#"{"repos": [{"id": 1, "name": "a", "private": true, "sources": [
            {"external_service_id": 1, "repo_id": 1, "unrestricted": false,
             "namspace": {"kind": "org", "id": 5}}]}]}"#,
        r#"{"repos": [{"id": 1, "name": "a", "privat": true}]}"#,
        r#"{"users": [{"id": 1, "username": "a", "site_admin": false, "admin": true}]}"#,
        r#"{"external_services": [{"id": 1, "kind": "github", "display_name": "GitHub",
            "unrestricted": false, "restricted": true}]}"#,
    ] {
        fs::write(&path, document).expect("write");
        let err = read_seed(&path).expect_err("misspelled field");
        assert!(err.to_string().contains("invalid seed document"), "accepted: {document}");
    }
}
