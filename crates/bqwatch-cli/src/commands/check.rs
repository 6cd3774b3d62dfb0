//! `bqwatch check` command implementation.
//!
//! Runs every check `deploy` would run before its first write and reports
//! all problems at once. Only read-only gcloud commands are issued.

use anyhow::Result;
use bqwatch_adapter_gcloud::{CommandRunner, GcloudClient};
use bqwatch_core::{BqwatchConfig, DashboardSpec};

use super::{ConfigArgs, resolve_project};

#[derive(Debug, Default)]
struct CheckReport {
    errors: usize,
}

impl CheckReport {
    fn pass(&self, message: impl AsRef<str>) {
        println!("   ✓ {}", message.as_ref());
    }

    fn fail(&mut self, message: impl AsRef<str>) {
        self.errors += 1;
        println!("   ✗ {}", message.as_ref());
    }
}

pub async fn run(args: &ConfigArgs) -> Result<()> {
    println!("🔍 Checking {}...", args.source().display());
    let mut config = args.load()?;
    let errors = check(&GcloudClient::new(), &mut config).await;

    println!();
    if errors > 0 {
        anyhow::bail!("Check failed with {errors} error(s)");
    }
    println!("✅ Ready to deploy");
    Ok(())
}

/// Print one line per check and return the number that failed.
async fn check<R: CommandRunner>(gcloud: &GcloudClient<R>, config: &mut BqwatchConfig) -> usize {
    let mut report = CheckReport::default();

    match config.validate_fields() {
        Ok(()) => report.pass("Configuration fields are valid"),
        Err(e) => report.fail(e.to_string()),
    }

    let installed = match gcloud.ensure_installed().await {
        Ok(()) => {
            report.pass("gcloud is installed");
            true
        }
        Err(e) => {
            report.fail(e.to_string());
            false
        }
    };

    if installed {
        if let Err(e) = resolve_project(gcloud, config).await {
            report.fail(format!("{e:#}"));
        }
    }
    match config.project() {
        Ok(project) => report.pass(format!("Target project: {project}")),
        Err(e) => report.fail(e.to_string()),
    }

    if config.project().is_ok() {
        match DashboardSpec::from_config(config) {
            Ok(dashboard) => report.pass(format!(
                "Dashboard layout has {} widget(s)",
                dashboard.widget_titles().len()
            )),
            Err(e) => report.fail(format!("Dashboard layout: {e}")),
        }
    }

    report.errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bqwatch_adapter_gcloud::CommandOutput;
    use bqwatch_runtime::ClientError;

    /// Answers `--version` and `config get-value project`.
    struct FakeGcloud {
        project: &'static str,
    }

    #[async_trait]
    impl CommandRunner for FakeGcloud {
        async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput, ClientError> {
            let stdout = if args.first().map(String::as_str) == Some("--version") {
                "Google Cloud SDK 480.0.0\n".to_string()
            } else {
                format!("{}\n", self.project)
            };
            Ok(CommandOutput {
                success: true,
                code: Some(0),
                stdout,
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn project_is_taken_from_gcloud() {
        let gcloud = GcloudClient::with_runner(FakeGcloud { project: "acme" });
        let mut config = BqwatchConfig {
            notification_email: "oncall@acme.example".into(),
            ..Default::default()
        };

        assert_eq!(check(&gcloud, &mut config).await, 0);
        assert_eq!(config.project_id.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn placeholder_and_unset_project_are_both_reported() {
        let gcloud = GcloudClient::with_runner(FakeGcloud { project: "(unset)" });
        let mut config = BqwatchConfig::default();

        assert_eq!(check(&gcloud, &mut config).await, 2);
    }
}
