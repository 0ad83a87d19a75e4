// crates/repo-authz-config/src/config.rs
// ============================================================================
// Module: Repo Authz Configuration
// Description: Configuration loading and validation for repository visibility.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: repo-authz-core, repo-authz-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. A validated config is
//! published into [`AuthzState`] as one snapshot, so flags and providers
//! from a reload become visible to the next decision together.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use repo_authz_core::AuthzProvider;
use repo_authz_core::AuthzSnapshot;
use repo_authz_core::AuthzState;
use repo_authz_core::DecisionAuditSink;
use repo_authz_core::FileAuditSink;
use repo_authz_core::NoopAuditSink;
use repo_authz_core::PermissionsUserMapping;
use repo_authz_core::PolicyConfig;
use repo_authz_core::ProviderSet;
use repo_authz_core::ProviderUrn;
use repo_authz_core::ServiceId;
use repo_authz_core::ServiceType;
use repo_authz_core::StaticProvider;
use repo_authz_core::StderrAuditSink;
use repo_authz_store_sqlite::SqliteStoreConfig;
use repo_authz_store_sqlite::SqliteStoreMode;
use repo_authz_store_sqlite::SqliteSyncMode;
use repo_authz_store_sqlite::default_busy_timeout_ms;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "repo-authz.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "REPO_AUTHZ_CONFIG";
/// Default `SQLite` database path.
const DEFAULT_STORE_PATH: &str = "repo-authz.db";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured providers.
pub const MAX_PROVIDERS: usize = 256;
/// Maximum length of a provider service type, service id, or URN.
const MAX_PROVIDER_FIELD_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Repository visibility configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoAuthzConfig {
    /// Global policy flags.
    #[serde(default)]
    pub authz: AuthzSection,
    /// Permissions user mapping setting.
    #[serde(default)]
    pub permissions_user_mapping: PermissionsUserMapping,
    /// Registered authorization providers.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Permission and repository store.
    #[serde(default)]
    pub store: StoreConfig,
    /// Decision audit output.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl RepoAuthzConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a valid config.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.len() > MAX_PROVIDERS {
            return Err(ConfigError::Invalid(format!(
                "too many providers: {} (max {MAX_PROVIDERS})",
                self.providers.len()
            )));
        }
        let mut urns = BTreeSet::new();
        for provider in &self.providers {
            provider.validate()?;
            let urn = provider.urn();
            if !urns.insert(urn.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate provider urn: {urn}")));
            }
        }
        if self.permissions_user_mapping.enabled && !self.providers.is_empty() {
            return Err(ConfigError::Invalid(
                "permissions_user_mapping.enabled cannot be combined with [[providers]]"
                    .to_string(),
            ));
        }
        self.store.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the policy flags described by this config.
    #[must_use]
    pub const fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            default_allow: self.authz.allow_access_by_default,
            enforce_for_site_admins: self.authz.enforce_for_site_admins,
            permissions_user_mapping: self.permissions_user_mapping,
        }
    }

    /// Builds the configured provider registrations.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<dyn AuthzProvider>> {
        self.providers.iter().map(ProviderConfig::build).collect()
    }

    /// Builds the complete policy snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AuthzSnapshot {
        AuthzSnapshot {
            policy: self.policy(),
            providers: ProviderSet::new(self.providers()),
        }
    }

    /// Validates and publishes this config into `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid; `state` is left
    /// unchanged.
    pub fn apply(&self, state: &AuthzState) -> Result<(), ConfigError> {
        self.validate()?;
        state.replace(self.snapshot());
        Ok(())
    }
}

/// Global policy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthzSection {
    /// Visibility when no authorization source is configured.
    #[serde(default = "default_allow_access")]
    pub allow_access_by_default: bool,
    /// Whether site administrators are subject to permission checks.
    #[serde(default)]
    pub enforce_for_site_admins: bool,
}

impl Default for AuthzSection {
    fn default() -> Self {
        Self {
            allow_access_by_default: default_allow_access(),
            enforce_for_site_admins: false,
        }
    }
}

/// Authorization provider registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Code host kind (e.g. `github`).
    pub service_type: String,
    /// Code host base URL.
    pub service_id: String,
    /// Registry key; defaults to `service_type:service_id`.
    #[serde(default)]
    pub urn: Option<String>,
}

impl ProviderConfig {
    /// Returns the registry key for this provider.
    #[must_use]
    pub fn urn(&self) -> ProviderUrn {
        self.urn.as_deref().map_or_else(
            || {
                ProviderUrn::for_service(
                    &ServiceType::new(self.service_type.trim()),
                    &ServiceId::new(self.service_id.trim()),
                )
            },
            |urn| ProviderUrn::new(urn.trim()),
        )
    }

    /// Builds the provider registration.
    #[must_use]
    pub fn build(&self) -> Arc<dyn AuthzProvider> {
        Arc::new(
            StaticProvider::new(
                ServiceType::new(self.service_type.trim()),
                ServiceId::new(self.service_id.trim()),
            )
            .with_urn(self.urn()),
        )
    }

    /// Validates provider fields.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_provider_field("providers.service_type", &self.service_type)?;
        validate_provider_field("providers.service_id", &self.service_id)?;
        if let Some(urn) = &self.urn {
            validate_provider_field("providers.urn", urn)?;
        }
        Ok(())
    }
}

/// `SQLite` store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Decision audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines) for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink has no path or the file
    /// cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn DecisionAuditSink>, ConfigError> {
        match self.sink {
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::File => {
                let Some(path) = &self.path else {
                    return Err(ConfigError::Invalid(
                        "audit.sink=file requires audit.path".to_string(),
                    ));
                };
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        } else if self.sink == AuditSinkKind::File {
            return Err(ConfigError::Invalid("audit.sink=file requires audit.path".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default visibility when no authorization source is configured.
const fn default_allow_access() -> bool {
    true
}

/// Default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a provider string field.
fn validate_provider_field(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_PROVIDER_FIELD_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}
