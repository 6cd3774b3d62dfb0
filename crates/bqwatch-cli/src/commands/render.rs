//! `bqwatch render` command implementation.

use anyhow::{Context, Result};
use bqwatch_adapter_gcloud::GcloudClient;
use bqwatch_core::{
    AlertPolicySpec, BqwatchConfig, ChannelSpec, DashboardSpec, MetricSpec, ReconciliationSpec,
    ResourceDescriptor, ResourceHandle, ResourceKind,
};
use clap::ValueEnum;

use super::{ConfigArgs, resolve_project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderTarget {
    Metric,
    Channel,
    Policy,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Json,
    Yaml,
}

pub async fn run(args: &ConfigArgs, target: RenderTarget, format: RenderFormat) -> Result<()> {
    let mut config = args.load()?;
    if config.project().is_err() {
        // Rendering works offline; gcloud is only a fallback for the project id.
        if let Err(e) = resolve_project(&GcloudClient::new(), &mut config).await {
            tracing::warn!(error = %format!("{e:#}"), "Could not read the active gcloud project");
        }
    }

    let payload = build(&config, target)?.to_payload();
    let text = match format {
        RenderFormat::Json => serde_json::to_string_pretty(&payload)?,
        RenderFormat::Yaml => serde_yaml::to_string(&payload)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

/// What `deploy` would submit for `target`.
///
/// The policy references the channel by a pending handle, since the real
/// one is only known once the channel exists.
pub fn build(config: &BqwatchConfig, target: RenderTarget) -> Result<ReconciliationSpec> {
    let spec = match target {
        RenderTarget::Metric => MetricSpec::from_config(config).into(),
        RenderTarget::Channel => ChannelSpec::from_config(config).into(),
        RenderTarget::Policy => {
            let channel = ResourceDescriptor::new(
                ResourceKind::NotificationChannel,
                &config.channel_display_name,
                config.project()?,
            )?;
            AlertPolicySpec::from_config(
                config,
                config.metric_type(),
                ResourceHandle::pending(&channel),
            )
            .into()
        }
        RenderTarget::Dashboard => DashboardSpec::from_config(config)
            .context("Failed to build dashboard")?
            .into(),
    };
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BqwatchConfig {
        BqwatchConfig {
            project_id: Some("acme".into()),
            notification_email: "oncall@acme.example".into(),
            ..Default::default()
        }
    }

    #[test]
    fn policy_points_at_pending_channel() {
        let payload = build(&config(), RenderTarget::Policy).unwrap().to_payload();
        assert_eq!(
            payload["notificationChannels"][0],
            "<pending:notification_channel/Email>"
        );
    }

    #[test]
    fn dashboard_has_project_substituted() {
        let payload = build(&config(), RenderTarget::Dashboard).unwrap().to_payload();
        let text = payload.to_string();
        assert!(!text.contains("${PROJECT_ID}"));
        assert!(!text.contains("${METRIC_TYPE}"));
    }

    #[test]
    fn metric_renders_without_project() {
        let config = BqwatchConfig {
            project_id: None,
            ..config()
        };
        let spec = build(&config, RenderTarget::Metric).unwrap();
        assert_eq!(spec.kind(), ResourceKind::Metric);
        assert!(build(&config, RenderTarget::Policy).is_err());
    }
}
