//! Command implementations for the `bqwatch` binary.

pub mod check;
pub mod deploy;
pub mod init;
pub mod render;

use anyhow::{Context, Result};
use bqwatch_adapter_gcloud::{CommandRunner, GcloudClient};
use bqwatch_core::BqwatchConfig;
use clap::Args;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "bqwatch.yaml";

/// Where the configuration comes from, plus per-run overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (YAML or TOML). Defaults to ./bqwatch.yaml when present.
    #[arg(long, env = "BQWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target GCP project. Defaults to the active gcloud project.
    #[arg(long, env = "BQWATCH_PROJECT")]
    pub project: Option<String>,

    /// Address that receives alert notifications.
    #[arg(long, env = "BQWATCH_NOTIFICATION_EMAIL")]
    pub email: Option<String>,
}

impl ConfigArgs {
    /// Load the file (or defaults) and apply flag/env overrides.
    ///
    /// An explicitly named file must exist; the default path is optional.
    pub fn load(&self) -> Result<BqwatchConfig> {
        let mut config = match &self.config {
            Some(path) => BqwatchConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => BqwatchConfig::load_or_default(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("Failed to load config from {DEFAULT_CONFIG_PATH}"))?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut BqwatchConfig) {
        if let Some(project) = &self.project {
            config.project_id = Some(project.clone());
        }
        if let Some(email) = &self.email {
            config.notification_email = email.clone();
        }
    }

    pub fn source(&self) -> &Path {
        self.config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
    }
}

/// Fill in `project_id` from gcloud when neither the file nor the flags set it.
pub async fn resolve_project<R: CommandRunner>(
    gcloud: &GcloudClient<R>,
    config: &mut BqwatchConfig,
) -> Result<()> {
    if config.project().is_ok() {
        return Ok(());
    }

    let active = gcloud
        .active_project()
        .await
        .context("Failed to read the active gcloud project")?;
    if let Some(project) = active {
        tracing::info!(project = %project, "Using active gcloud project");
        config.project_id = Some(project);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bqwatch.yaml");
        fs::write(
            &path,
            "project_id: from-file\nnotification_email: file@acme.example\nwindow_seconds: 1800\n",
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(path),
            project: Some("from-flag".into()),
            email: None,
        };
        let config = args.load().unwrap();

        assert_eq!(config.project_id.as_deref(), Some("from-flag"));
        assert_eq!(config.notification_email, "file@acme.example");
        assert_eq!(config.window_seconds, 1800);
    }

    #[test]
    fn named_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            config: Some(dir.path().join("missing.yaml")),
            ..Default::default()
        };

        let err = args.load().unwrap_err();
        assert!(format!("{err:#}").contains("missing.yaml"));
    }
}
