// crates/repo-authz-core/tests/condition.rs
// ============================================================================
// Module: Repo Condition Tests
// Description: Evaluation, simplification, and serialization of conditions.
// Purpose: Validate Boolean identities and leaf semantics of the condition tree.
// Dependencies: repo-authz-core, proptest, serde_json
// ============================================================================
//! ## Overview
//! Checks leaf predicates against concrete repositories, the empty-group
//! identities, trivial-outcome detection, and De Morgan equivalence over
//! generated trees.

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

mod common;

use proptest::prelude::*;
use repo_authz_core::Repo;
use repo_authz_core::RepoCondition;
use repo_authz_core::RepoPredicate;
use repo_authz_core::SourceNamespace;

use crate::common::fixture_repos;
use crate::common::ids;
use crate::common::repo;
use crate::common::source;

// ============================================================================
// SECTION: Leaves
// ============================================================================

#[test]
fn public_predicate_matches_non_private_repos() {
    assert!(RepoCondition::public().eval(&repo(1, "a", false, Vec::new())));
    assert!(!RepoCondition::public().eval(&repo(2, "b", true, Vec::new())));
}

#[test]
fn unrestricted_predicate_needs_any_unrestricted_source() {
    let mixed = repo(
        1,
        "a",
        true,
        vec![
            source(1, 1, false, SourceNamespace::Site),
            source(2, 1, true, SourceNamespace::Site),
        ],
    );
    let restricted = repo(2, "b", true, vec![source(1, 2, false, SourceNamespace::Site)]);
    let orphan = repo(3, "c", true, Vec::new());

    let condition = RepoCondition::unrestricted_source();
    assert!(condition.eval(&mixed));
    assert!(!condition.eval(&restricted));
    assert!(!condition.eval(&orphan));
}

#[test]
fn id_in_predicate_checks_membership() {
    let condition = RepoCondition::id_in(ids(&[7, 9]));
    assert!(condition.eval(&repo(7, "a", true, Vec::new())));
    assert!(!condition.eval(&repo(8, "b", true, Vec::new())));
    assert!(!RepoCondition::id_in(ids(&[])).eval(&repo(7, "a", true, Vec::new())));
}

// ============================================================================
// SECTION: Identities
// ============================================================================

#[test]
fn empty_and_holds_and_empty_or_fails() {
    let target = repo(1, "a", true, Vec::new());
    let empty_and = RepoCondition::and(Vec::new());
    let empty_or = RepoCondition::or(Vec::new());
    assert!(empty_and.eval(&target));
    assert!(!empty_or.eval(&target));
    assert!(empty_and.is_trivially_true());
    assert!(empty_or.is_trivially_false());
    assert_eq!(empty_and.to_string(), "TRUE");
    assert_eq!(empty_or.to_string(), "FALSE");
}

#[test]
fn trivial_detection_ignores_predicate_leaves() {
    let either = RepoCondition::or(vec![RepoCondition::public(), RepoCondition::allow_all()]);
    assert!(either.is_trivially_true());

    let both = RepoCondition::and(vec![RepoCondition::public(), RepoCondition::deny_all()]);
    assert!(both.is_trivially_false());

    let leaf = RepoCondition::public();
    assert!(!leaf.is_trivially_true());
    assert!(!leaf.is_trivially_false());
    assert!((!RepoCondition::deny_all()).is_trivially_true());
}

#[test]
fn complexity_counts_nodes() {
    let condition = RepoCondition::or(vec![
        RepoCondition::public(),
        RepoCondition::unrestricted_source(),
        RepoCondition::negate(RepoCondition::id_in(ids(&[1]))),
    ]);
    assert_eq!(condition.complexity(), 5);
}

#[test]
fn display_renders_readable_tree() {
    let condition = RepoCondition::or(vec![
        RepoCondition::public(),
        RepoCondition::unrestricted_source(),
        RepoCondition::id_in(ids(&[3, 1])),
    ]);
    assert_eq!(
        condition.to_string(),
        "(private = false OR source.unrestricted = true OR repo.id IN {1, 3})"
    );
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

#[test]
fn condition_survives_json_for_request_caching() {
    let condition = RepoCondition::and(vec![
        RepoCondition::or(vec![RepoCondition::public(), RepoCondition::id_in(ids(&[2, 4]))]),
        !RepoCondition::unrestricted_source(),
    ]);
    let payload = serde_json::to_string(&condition).expect("serialize");
    let parsed: RepoCondition = serde_json::from_str(&payload).expect("deserialize");
    assert_eq!(parsed, condition);
}

#[test]
fn predicate_json_is_tagged_by_kind() {
    let value = serde_json::to_value(RepoPredicate::IdIn(ids(&[5]))).expect("serialize");
    assert_eq!(value, serde_json::json!({ "kind": "id_in", "ids": [5] }));
    let value = serde_json::to_value(RepoPredicate::Public).expect("serialize");
    assert_eq!(value, serde_json::json!({ "kind": "public" }));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

fn arb_condition() -> impl Strategy<Value = RepoCondition> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(RepoCondition::Const),
        Just(RepoCondition::public()),
        Just(RepoCondition::unrestricted_source()),
        prop::collection::btree_set(1_u64..=6, 0..4)
            .prop_map(|raw| RepoCondition::id_in(raw.into_iter().map(crate::common::repo_id))),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(RepoCondition::and),
            prop::collection::vec(inner.clone(), 0..4).prop_map(RepoCondition::or),
            inner.prop_map(RepoCondition::negate),
        ]
    })
}

fn eval_all(condition: &RepoCondition, repos: &[Repo]) -> Vec<bool> {
    repos.iter().map(|repo| condition.eval(repo)).collect()
}

proptest! {
    #[test]
    fn de_morgan_holds_for_generated_trees(left in arb_condition(), right in arb_condition()) {
        let repos = fixture_repos();
        let negated_and = !RepoCondition::and(vec![left.clone(), right.clone()]);
        let or_of_negations = RepoCondition::or(vec![!left, !right]);
        prop_assert_eq!(eval_all(&negated_and, &repos), eval_all(&or_of_negations, &repos));
    }

    #[test]
    fn trivial_outcomes_agree_with_evaluation(condition in arb_condition()) {
        let repos = fixture_repos();
        if condition.is_trivially_true() {
            prop_assert!(repos.iter().all(|repo| condition.eval(repo)));
        }
        if condition.is_trivially_false() {
            prop_assert!(repos.iter().all(|repo| !condition.eval(repo)));
        }
    }
}
