// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

// Caseflow Configuration Manifest
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - HTTP server binding
// - Storage backend selection
// - Workflow groups and the external workflow runtime
// - Seeded users
// - Logging and metrics

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};
use crate::domain::user::{Role, User, UserId};

pub const API_VERSION: &str = "caseflow/v1";
pub const KIND: &str = "CaseflowConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseflowConfig {
    /// API version (must be "caseflow/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CaseflowConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: CaseflowConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseflowConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Users known to the directory at startup
    #[serde(default)]
    pub users: Vec<UserConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Candidate group offered case approval tasks
    #[serde(default = "default_approval_group")]
    pub approval_group: String,

    /// Candidate group offered investigation tasks after approval
    #[serde(default = "default_investigation_group")]
    pub investigation_group: String,

    #[serde(default = "default_case_number_prefix")]
    pub case_number_prefix: String,

    /// Process started in the external runtime when a case is approved
    #[serde(default = "default_process_definition_key")]
    pub process_definition_key: String,

    #[serde(default)]
    pub external_runtime: ExternalRuntimeConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            approval_group: default_approval_group(),
            investigation_group: default_investigation_group(),
            case_number_prefix: default_case_number_prefix(),
            process_definition_key: default_process_definition_key(),
            external_runtime: ExternalRuntimeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExternalRuntimeConfig {
    #[default]
    Disabled,
    InMemory,
    Http {
        base_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        /// Supports "env:VAR_NAME"
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub display_name: String,
    /// ANALYST or ADMIN, case-insensitive
    pub role: String,
}

impl UserConfig {
    pub fn to_user(&self) -> anyhow::Result<User> {
        Ok(User {
            id: UserId::parse(&self.id)?,
            display_name: self.display_name.clone(),
            role: self.role.parse::<Role>()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Prometheus exporter port; no exporter when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_approval_group() -> String {
    "Supervisors".to_string()
}

fn default_investigation_group() -> String {
    "Investigations".to_string()
}

fn default_case_number_prefix() -> String {
    "CASE".to_string()
}

fn default_process_definition_key() -> String {
    "caseInvestigationProcess".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_users() -> Vec<UserConfig> {
    [
        ("analyst1", "John Analyst", "ANALYST"),
        ("analyst2", "Jane Analyst", "ANALYST"),
        ("supervisor1", "Mike Supervisor", "ADMIN"),
        ("admin1", "Sarah Admin", "ADMIN"),
    ]
    .into_iter()
    .map(|(id, name, role)| UserConfig {
        id: id.to_string(),
        display_name: name.to_string(),
        role: role.to_string(),
    })
    .collect()
}

/// Resolve "env:VAR_NAME" indirections
pub fn resolve_secret(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("environment variable {} referenced by config is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl Default for CaseflowConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "caseflow-local".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: CaseflowConfigSpec {
                users: default_users(),
                ..Default::default()
            },
        }
    }
}

impl CaseflowConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CASEFLOW_CONFIG_PATH environment variable
    /// 2. ./caseflow-config.yaml (working directory)
    /// 3. ~/.caseflow/config.yaml (user home)
    /// 4. /etc/caseflow/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CASEFLOW_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./caseflow-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".caseflow").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/caseflow/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CASEFLOW_DATABASE_URL") {
            tracing::info!("Environment override: CASEFLOW_DATABASE_URL (postgres backend)");
            self.spec.storage.backend = StorageKind::Postgres;
            self.spec.storage.connection_string = Some(url);
        }

        if let Ok(val) = std::env::var("CASEFLOW_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: CASEFLOW_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for CASEFLOW_PORT: '{}'. Ignoring.", val);
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let workflow = &self.spec.workflow;
        if workflow.approval_group.trim().is_empty() {
            anyhow::bail!("spec.workflow.approval_group cannot be empty");
        }
        if workflow.investigation_group.trim().is_empty() {
            anyhow::bail!("spec.workflow.investigation_group cannot be empty");
        }
        if workflow.case_number_prefix.trim().is_empty() {
            anyhow::bail!("spec.workflow.case_number_prefix cannot be empty");
        }
        if let ExternalRuntimeConfig::Http { base_url, .. } = &workflow.external_runtime {
            if base_url.is_empty() {
                anyhow::bail!("spec.workflow.external_runtime.base_url cannot be empty");
            }
        }

        if self.spec.storage.backend == StorageKind::Postgres
            && self.spec.storage.connection_string.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }

        if self.spec.users.is_empty() {
            anyhow::bail!("spec.users must list at least one user");
        }
        let mut seen = HashSet::new();
        let mut has_admin = false;
        for entry in &self.spec.users {
            let user = entry
                .to_user()
                .map_err(|e| anyhow::anyhow!("Invalid user '{}': {}", entry.id, e))?;
            if !seen.insert(user.id.clone()) {
                anyhow::bail!("Duplicate user id: {}", user.id);
            }
            has_admin |= user.role == Role::Admin;
        }
        if !has_admin {
            anyhow::bail!("spec.users must include at least one ADMIN");
        }

        Ok(())
    }

    pub fn seed_users(&self) -> anyhow::Result<Vec<User>> {
        self.spec.users.iter().map(UserConfig::to_user).collect()
    }

    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageKind::InMemory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .connection_string
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("postgres backend selected without a connection_string"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_secret(raw)?,
                }))
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.spec.server.bind_address, self.spec.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_manifest_is_valid() {
        let config = CaseflowConfig::default();
        assert_eq!(config.api_version, "caseflow/v1");
        assert_eq!(config.spec.workflow.approval_group, "Supervisors");
        assert_eq!(config.spec.workflow.external_runtime, ExternalRuntimeConfig::Disabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_minimal_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
apiVersion: caseflow/v1
kind: CaseflowConfig
metadata:
  name: test
spec:
  workflow:
    investigation_group: FIU
    external_runtime:
      type: http
      base_url: http://flowable:8080/flowable-rest/service
      username: rest-admin
  users:
    - {{ id: admin1, display_name: Sarah Admin, role: admin }}
"#
        )
        .unwrap();

        let config = CaseflowConfig::from_yaml_file(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.server.port, 8080);
        assert_eq!(config.spec.workflow.investigation_group, "FIU");
        assert_eq!(config.spec.workflow.approval_group, "Supervisors");
        assert!(matches!(
            config.spec.workflow.external_runtime,
            ExternalRuntimeConfig::Http { ref username, .. } if username.as_deref() == Some("rest-admin")
        ));
        assert!(matches!(config.storage_backend().unwrap(), StorageBackend::InMemory));
    }

    #[test]
    fn test_validation() {
        let mut config = CaseflowConfig::default();

        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());
        config.kind = KIND.to_string();

        config.spec.storage.backend = StorageKind::Postgres;
        assert!(config.validate().is_err());
        config.spec.storage.connection_string = Some("postgres://localhost/caseflow".to_string());
        config.validate().unwrap();

        config.spec.users.push(UserConfig {
            id: "admin1".to_string(),
            display_name: "Again".to_string(),
            role: "ADMIN".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_supervisor_role_is_rejected_in_config() {
        let mut config = CaseflowConfig::default();
        config.spec.users = vec![
            UserConfig {
                id: "admin1".to_string(),
                display_name: "Sarah Admin".to_string(),
                role: "ADMIN".to_string(),
            },
            UserConfig {
                id: "supervisor1".to_string(),
                display_name: "Mike Supervisor".to_string(),
                role: "SUPERVISOR".to_string(),
            },
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_requires_an_admin() {
        let mut config = CaseflowConfig::default();
        config.spec.users.retain(|u| u.role == "ANALYST");
        assert!(config.validate().is_err());
    }
}
