//! Layered configuration.
//!
//! Values resolve with a fixed precedence: explicit runtime override >
//! environment variable > TOML config file > built-in default. Handlers
//! treat a missing required value as a configuration error for that
//! invocation, never a crash.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Layered settings reader.
///
/// Keys are lower_snake_case; the environment layer looks up the key
/// uppercased (`cluster_name` → `CLUSTER_NAME`).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    overrides: HashMap<String, String>,
    file: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the file layer from a TOML table of scalars.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: toml::Table = text.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut file = HashMap::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => other.to_string(),
            };
            file.insert(key, value);
        }

        Ok(Self {
            overrides: HashMap::new(),
            file,
        })
    }

    /// Set an explicit runtime override (highest precedence).
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }

    /// Resolve a key: override > environment > file.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        if let Ok(value) = std::env::var(key.to_ascii_uppercase()) {
            return Some(value);
        }
        self.file.get(key).cloned()
    }

    /// Resolve a boolean key ("true"/"1" are true, anything else false).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }

    /// Resolve an integer key; unparseable values resolve to None with a
    /// warning.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let raw = self.get(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "ignoring non-numeric config value");
                None
            }
        }
    }
}

/// What the rollback handler does when the advisory call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvisorFailurePolicy {
    /// Proceed as if a rollback was recommended — an active alarm is
    /// treated as sufficient signal on its own.
    #[default]
    FailOpen,
    /// Take no action until advice is available again.
    FailClosed,
}

impl AdvisorFailurePolicy {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "fail_closed" => AdvisorFailurePolicy::FailClosed,
            "fail_open" => AdvisorFailurePolicy::FailOpen,
            other => {
                warn!(value = other, "unknown advisor failure policy, using fail_open");
                AdvisorFailurePolicy::FailOpen
            }
        }
    }
}

/// Resolved controller configuration.
///
/// Required-per-handler values stay `Option` so that a handler can turn
/// absence into a 500 configuration error instead of failing at startup.
#[derive(Debug, Clone)]
pub struct CapstanConfig {
    pub cluster_name: Option<String>,
    pub image_repository: Option<String>,
    pub notify_topic: Option<String>,
    pub pipeline_name: Option<String>,
    pub control_plane_url: Option<String>,
    pub advisor_url: Option<String>,
    pub advisor_model_id: String,
    pub advisor_failure_policy: AdvisorFailurePolicy,
    pub notify_webhook_url: Option<String>,
    pub workload_name: String,
    pub deployment_manifest: PathBuf,
    pub service_manifest: PathBuf,
    pub rollout_timeout: Duration,
    /// Command rendered into the kubeconfig's exec credential plugin,
    /// space-separated. Empty means no exec credentials.
    pub credential_command: Vec<String>,
}

impl CapstanConfig {
    pub fn load(settings: &Settings) -> Self {
        Self {
            cluster_name: settings.get("cluster_name"),
            image_repository: settings.get("image_repository_url"),
            notify_topic: settings.get("notify_topic"),
            pipeline_name: settings.get("pipeline_name"),
            control_plane_url: settings.get("control_plane_url"),
            advisor_url: settings.get("advisor_url"),
            advisor_model_id: settings
                .get("advisor_model_id")
                .unwrap_or_else(|| "default".to_string()),
            advisor_failure_policy: settings
                .get("advisor_failure_policy")
                .map(|raw| AdvisorFailurePolicy::parse(&raw))
                .unwrap_or_default(),
            notify_webhook_url: settings.get("notify_webhook_url"),
            workload_name: settings
                .get("workload_name")
                .unwrap_or_else(|| "capstan-bank".to_string()),
            deployment_manifest: settings
                .get("deployment_manifest")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("crates/capstan-bank/deploy/deployment.yaml")),
            service_manifest: settings
                .get("service_manifest")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("crates/capstan-bank/deploy/service.yaml")),
            rollout_timeout: Duration::from_secs(
                settings.get_u64("rollout_timeout_secs").unwrap_or(300),
            ),
            credential_command: settings
                .get("cluster_credential_command")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}
