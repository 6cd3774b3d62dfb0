//! Configuration types for bqwatch.
//!
//! A deployment is described by a single [`BqwatchConfig`], loaded from a YAML
//! (`bqwatch.yaml`) or TOML (`bqwatch.toml`) file and validated once before
//! any call reaches the monitoring backend.
//!
//! ```yaml
//! project_id: acme-analytics
//! metric_name: bq_billed_bytes_rt
//! policy_name: BigQuery Billed Bytes (Real-time)
//! notification_email: data-platform@acme.example
//! threshold_bytes: 1TB
//! window_seconds: 3600
//! ```

pub mod bytes;
pub mod dashboard;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub use bytes::ByteSize;
pub use dashboard::DashboardConfig;

/// Value shipped in the starter config. Deploying with it is refused.
pub const PLACEHOLDER_EMAIL: &str = "your-email@example.com";

/// Longest alignment window accepted for the alert condition.
pub const MAX_WINDOW_SECONDS: u64 = 24 * 60 * 60;

const MAX_METRIC_NAME_LEN: usize = 100;

/// Complete deployment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BqwatchConfig {
    /// Target GCP project. When unset, the active `gcloud` project is used.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Log-based metric id.
    #[serde(default = "default_metric_name")]
    pub metric_name: String,

    /// Alerting policy display name.
    #[serde(default = "default_policy_name")]
    pub policy_name: String,

    /// Address notified when the policy fires.
    #[serde(default = "default_notification_email")]
    pub notification_email: String,

    /// Billed bytes per window above which the policy fires.
    #[serde(default = "default_threshold")]
    pub threshold_bytes: ByteSize,

    /// Aggregation window for the alert condition.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Display name of the email notification channel.
    #[serde(default = "default_channel_display_name")]
    pub channel_display_name: String,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// User labels attached to the alerting policy.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Default for BqwatchConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            metric_name: default_metric_name(),
            policy_name: default_policy_name(),
            notification_email: default_notification_email(),
            threshold_bytes: default_threshold(),
            window_seconds: default_window_seconds(),
            channel_display_name: default_channel_display_name(),
            dashboard: DashboardConfig::default(),
            labels: BTreeMap::new(),
        }
    }
}

fn default_metric_name() -> String {
    "bq_billed_bytes_rt".to_string()
}

fn default_policy_name() -> String {
    "BigQuery Billed Bytes (Real-time)".to_string()
}

fn default_notification_email() -> String {
    PLACEHOLDER_EMAIL.to_string()
}

fn default_threshold() -> ByteSize {
    ByteSize::terabytes(1)
}

fn default_window_seconds() -> u64 {
    3600
}

fn default_channel_display_name() -> String {
    "Email".to_string()
}

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(
        "notification_email is still the placeholder '{0}'; set it to a real address before deploying"
    )]
    PlaceholderEmail(String),

    #[error("no GCP project configured; set project_id or run `gcloud config set project <id>`")]
    MissingProject,
}

impl BqwatchConfig {
    /// Load configuration from a YAML or TOML file, chosen by extension.
    ///
    /// A relative `dashboard.layout_file` is rewritten against the file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            _ => Self::from_yaml(&content)?,
        };

        if let (Some(layout), Some(base_dir)) =
            (config.dashboard.layout_file.as_mut(), path.parent())
        {
            if layout.is_relative() {
                *layout = base_dir.join(&*layout);
            }
        }

        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The resolved project id.
    pub fn project(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingProject)
    }

    pub fn uses_placeholder_email(&self) -> bool {
        self.notification_email.trim().eq_ignore_ascii_case(PLACEHOLDER_EMAIL)
    }

    /// Fully-qualified metric type for monitoring filters.
    pub fn metric_type(&self) -> String {
        format!("logging.googleapis.com/user/{}", self.metric_name)
    }

    /// Check every field. Must pass before any mutating call is issued.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.project()?;
        self.validate_fields()
    }

    /// Everything [`validate`](Self::validate) checks except the project,
    /// which may still have to be resolved from the environment.
    pub fn validate_fields(&self) -> Result<(), ConfigError> {
        if self.uses_placeholder_email() {
            return Err(ConfigError::PlaceholderEmail(self.notification_email.clone()));
        }
        let email = self.notification_email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "notification_email '{email}' is not an email address"
                )));
            }
        }

        if self.metric_name.is_empty() || self.metric_name.len() > MAX_METRIC_NAME_LEN {
            return Err(ConfigError::Invalid(format!(
                "metric_name must be 1..={MAX_METRIC_NAME_LEN} characters"
            )));
        }
        if let Some(c) = self
            .metric_name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')))
        {
            return Err(ConfigError::Invalid(format!(
                "metric_name '{}' contains unsupported character '{c}'",
                self.metric_name
            )));
        }

        if self.policy_name.trim().is_empty() {
            return Err(ConfigError::Invalid("policy_name must not be empty".into()));
        }
        if self.channel_display_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "channel_display_name must not be empty".into(),
            ));
        }
        if self.dashboard.display_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dashboard.display_name must not be empty".into(),
            ));
        }

        if self.threshold_bytes.as_u64() == 0 {
            return Err(ConfigError::Invalid("threshold_bytes must be positive".into()));
        }
        if self.window_seconds == 0
            || self.window_seconds % 60 != 0
            || self.window_seconds > MAX_WINDOW_SECONDS
        {
            return Err(ConfigError::Invalid(format!(
                "window_seconds must be a positive multiple of 60 up to {MAX_WINDOW_SECONDS}, got {}",
                self.window_seconds
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> BqwatchConfig {
        BqwatchConfig {
            project_id: Some("acme-analytics".into()),
            notification_email: "oncall@acme.example".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_yaml_config() {
        let config = r#"
project_id: acme-analytics
metric_name: bq_billed_bytes_rt
policy_name: BQ cost
notification_email: oncall@acme.example
threshold_bytes: 2TB
window_seconds: 1800
dashboard:
  display_name: BQ spend
labels:
  team: data
"#;

        let config = BqwatchConfig::from_yaml(config).unwrap();
        assert_eq!(config.project().unwrap(), "acme-analytics");
        assert_eq!(config.policy_name, "BQ cost");
        assert_eq!(config.threshold_bytes, ByteSize::terabytes(2));
        assert_eq!(config.window_seconds, 1800);
        assert_eq!(config.dashboard.display_name, "BQ spend");
        assert_eq!(config.labels.get("team").map(String::as_str), Some("data"));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = BqwatchConfig::from_yaml("{}").unwrap();
        assert_eq!(config, BqwatchConfig::default());
        assert_eq!(config.metric_name, "bq_billed_bytes_rt");
        assert_eq!(config.threshold_bytes.as_u64(), 1_000_000_000_000);
        assert_eq!(config.window_seconds, 3600);
        assert_eq!(config.channel_display_name, "Email");
        assert!(config.uses_placeholder_email());
    }

    #[test]
    fn test_parse_toml_config() {
        let config = r#"
project_id = "acme-analytics"
notification_email = "oncall@acme.example"
threshold_bytes = 500000000000

[dashboard]
layout_file = "layout.json"
"#;

        let config = BqwatchConfig::from_toml(config).unwrap();
        assert_eq!(config.threshold_bytes.as_u64(), 500_000_000_000);
        assert_eq!(
            config.dashboard.layout_file.as_deref(),
            Some(Path::new("layout.json"))
        );
    }

    #[test]
    fn from_file_resolves_layout_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bqwatch.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "dashboard:\n  layout_file: layouts/custom.json").unwrap();

        let config = BqwatchConfig::from_file(&path).unwrap();
        assert_eq!(
            config.dashboard.layout_file,
            Some(dir.path().join("layouts/custom.json"))
        );
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = BqwatchConfig::load_or_default(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, BqwatchConfig::default());
    }

    #[test]
    fn placeholder_email_is_rejected() {
        let config = BqwatchConfig {
            notification_email: PLACEHOLDER_EMAIL.to_uppercase(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PlaceholderEmail(_))
        ));
    }

    #[test]
    fn field_validation_ignores_missing_project() {
        let config = BqwatchConfig {
            project_id: None,
            ..valid()
        };
        config.validate_fields().unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingProject)));
    }

    #[test]
    fn missing_project_is_rejected() {
        let config = BqwatchConfig {
            project_id: Some("   ".into()),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingProject)));
    }

    #[test]
    fn window_must_align_to_minutes() {
        for bad in [0, 90, MAX_WINDOW_SECONDS + 60] {
            let config = BqwatchConfig {
                window_seconds: bad,
                ..valid()
            };
            assert!(config.validate().is_err(), "window {bad} accepted");
        }
        let config = BqwatchConfig {
            window_seconds: 300,
            ..valid()
        };
        config.validate().unwrap();
    }

    #[test]
    fn metric_name_charset_is_checked() {
        let config = BqwatchConfig {
            metric_name: "billed bytes".into(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        for bad in ["oncall", "@acme.example", "oncall@localhost"] {
            let config = BqwatchConfig {
                notification_email: bad.into(),
                ..valid()
            };
            assert!(config.validate().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn metric_type_uses_user_namespace() {
        assert_eq!(
            valid().metric_type(),
            "logging.googleapis.com/user/bq_billed_bytes_rt"
        );
    }
}
