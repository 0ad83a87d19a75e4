//! Config defaults and state reload tests for repo-authz-config.
// crates/repo-authz-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Reload Tests
// Description: Validate default behavior and publication into policy state.
// Purpose: Ensure a minimal config is valid and reloads swap policy atomically.
// =============================================================================

use repo_authz_config::AuditSinkKind;
use repo_authz_config::RepoAuthzConfig;
use repo_authz_core::AuthzState;
use repo_authz_core::BindId;
use repo_authz_core::PolicyConfig;
use repo_authz_store_sqlite::SqliteStoreMode;
use repo_authz_store_sqlite::SqliteSyncMode;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::config_from_toml;
use crate::common::minimal_config;
use crate::common::provider;

#[test]
fn default_config_validates() -> TestResult {
    let config = minimal_config()?;
    config.validate().map_err(|err| err.to_string())?;
    if config != RepoAuthzConfig::default() {
        return Err("empty toml should equal the default config".to_string());
    }
    Ok(())
}

#[test]
fn defaults_allow_access_without_providers() -> TestResult {
    let config = minimal_config()?;
    if config.policy() != PolicyConfig::default() {
        return Err("unexpected default policy".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("audit sink should default to stderr".to_string());
    }
    let store = config.store.sqlite_config();
    if store.busy_timeout_ms != 5_000
        || store.journal_mode != SqliteStoreMode::Wal
        || store.sync_mode != SqliteSyncMode::Full
    {
        return Err("unexpected store defaults".to_string());
    }
    Ok(())
}

#[test]
fn full_config_parses_every_section() -> TestResult {
    let config = config_from_toml(
        r#"
        [authz]
        allow_access_by_default = false
        enforce_for_site_admins = true

        [permissions_user_mapping]
        enabled = false
        bind_id = "username"

        [[providers]]
        service_type = "github"
        service_id = "https://github.com/"

        [[providers]]
        service_type = "gitlab"
        service_id = "https://gitlab.example.com/"
        urn = "gitlab-internal"

        [store]
        path = "data/authz.db"
        busy_timeout_ms = 250
        journal_mode = "delete"
        sync_mode = "normal"

        [audit]
        sink = "file"
        path = "logs/decisions.jsonl"
        "#,
    )?;
    config.validate().map_err(|err| err.to_string())?;
    let policy = config.policy();
    if policy.default_allow || !policy.enforce_for_site_admins {
        return Err("authz flags not applied".to_string());
    }
    if policy.permissions_user_mapping.bind_id != BindId::Username {
        return Err("bind_id not applied".to_string());
    }
    let urns: Vec<String> =
        config.providers.iter().map(|provider| provider.urn().to_string()).collect();
    if urns != ["github:https://github.com/", "gitlab-internal"] {
        return Err(format!("unexpected urns: {}", urns.join(", ")));
    }
    if config.store.busy_timeout_ms != 250 || config.store.journal_mode != SqliteStoreMode::Delete
    {
        return Err("store section not applied".to_string());
    }
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    match config_from_toml("[authz]\nallow_everything = true\n") {
        Err(message) if message.contains("parse") => Ok(()),
        Err(message) => Err(format!("unexpected error: {message}")),
        Ok(_) => Err("unknown field should fail to parse".to_string()),
    }
}

#[test]
fn misspelled_mapping_flag_is_rejected() -> TestResult {
    match config_from_toml("[permissions_user_mapping]\nenabeld = true\n") {
        Err(message) if message.contains("parse") => Ok(()),
        Err(message) => Err(format!("unexpected error: {message}")),
        Ok(config) => Err(format!(
            "misspelled key accepted with mapping enabled = {}",
            config.permissions_user_mapping.enabled
        )),
    }
}

#[test]
fn apply_publishes_policy_and_providers_together() -> TestResult {
    let state = AuthzState::default();
    let mut config = minimal_config()?;
    config.authz.allow_access_by_default = false;
    config.providers = vec![provider("github", "https://github.com/")];
    config.apply(&state).map_err(|err| err.to_string())?;

    let snapshot = state.snapshot();
    if snapshot.policy.default_allow || snapshot.providers.len() != 1 {
        return Err("snapshot not published".to_string());
    }
    if !snapshot.enforcement_active() {
        return Err("providers should activate enforcement".to_string());
    }

    config.providers.clear();
    config.authz.allow_access_by_default = true;
    config.apply(&state).map_err(|err| err.to_string())?;
    let reloaded = state.snapshot();
    if !reloaded.policy.default_allow || !reloaded.providers.is_empty() {
        return Err("reload not published".to_string());
    }
    Ok(())
}

#[test]
fn invalid_config_leaves_state_untouched() -> TestResult {
    let state = AuthzState::default();
    let mut config = minimal_config()?;
    config.providers = vec![provider("github", "https://github.com/")];
    config.permissions_user_mapping.enabled = true;
    assert_invalid(config.apply(&state), "permissions_user_mapping")?;
    if state.snapshot().policy != PolicyConfig::default() {
        return Err("state changed after rejected config".to_string());
    }
    Ok(())
}
