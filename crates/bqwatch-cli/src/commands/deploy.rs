//! `bqwatch deploy` command implementation.
//!
//! Checks prerequisites, then reconciles the metric, notification channel,
//! alerting policy and dashboard in order. Nothing is written until the
//! configuration has been validated and gcloud has been found.

use anyhow::{Context, Result};
use bqwatch_adapter_gcloud::GcloudClient;
use bqwatch_core::BqwatchConfig;
use bqwatch_runtime::{DeploymentReport, FailurePolicy, MonitoringClient, Pipeline, Reconciler};
use clap::ValueEnum;

use super::{ConfigArgs, resolve_project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run(
    args: &ConfigArgs,
    dry_run: bool,
    continue_on_dashboard_error: bool,
    output: OutputFormat,
) -> Result<()> {
    let mut config = args.load()?;

    // Placeholder email and malformed fields are reported before gcloud is touched.
    config
        .validate_fields()
        .context("Invalid configuration")?;

    let gcloud = GcloudClient::new();
    gcloud
        .ensure_installed()
        .await
        .context("gcloud is required to deploy")?;
    resolve_project(&gcloud, &mut config).await?;

    let policy = FailurePolicy {
        abort_on_error: true,
        continue_past_dashboard_failure: continue_on_dashboard_error,
    };
    let report = execute(gcloud, &config, dry_run, policy).await?;

    print_report(&report, output)?;

    if !report.is_success() {
        let failed = report.failures().count();
        anyhow::bail!("Deployment failed: {failed} step(s) did not complete");
    }
    Ok(())
}

/// Run the pipeline against any backend.
pub async fn execute<C: MonitoringClient>(
    client: C,
    config: &BqwatchConfig,
    dry_run: bool,
    policy: FailurePolicy,
) -> Result<DeploymentReport> {
    let pipeline =
        Pipeline::new(Reconciler::new(client).with_dry_run(dry_run)).with_failure_policy(policy);
    pipeline.run(config).await.context("Invalid configuration")
}

fn print_report(report: &DeploymentReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            let mode = if report.dry_run { " (dry run)" } else { "" };
            println!("Project {}{mode}", report.project);
            for line in report.summary_lines() {
                println!("  {line}");
            }
            if report.is_success() {
                println!("Done. Run {}", report.run_id);
            }
        }
    }
    Ok(())
}
