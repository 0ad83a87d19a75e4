// crates/repo-authz-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for repo-authz-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use repo_authz_config::ConfigError;
use repo_authz_config::ProviderConfig;
use repo_authz_config::RepoAuthzConfig;

pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `RepoAuthzConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<RepoAuthzConfig, String> {
    RepoAuthzConfig::from_toml(toml_str).map_err(|err| err.to_string())
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<RepoAuthzConfig, String> {
    config_from_toml("")
}

/// Returns a provider registration without an explicit URN.
pub fn provider(service_type: &str, service_id: &str) -> ProviderConfig {
    ProviderConfig {
        service_type: service_type.to_string(),
        service_id: service_id.to_string(),
        urn: None,
    }
}

/// Asserts that `result` is invalid with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
