//! Ordered reconciliation of the four bqwatch resources.
//!
//! metric -> notification channel -> alert policy (needs both) -> dashboard.
//! Steps run strictly one after another; there is no cross-run locking, so
//! two concurrent runs against one project can both create a resource.

use bqwatch_core::{
    AlertPolicySpec, BqwatchConfig, ChannelSpec, ConfigError, DashboardSpec, MetricSpec,
    ReconciliationSpec, ResourceDescriptor, ResourceKind,
};
use tracing::Instrument;

use crate::client::MonitoringClient;
use crate::reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::report::{DeploymentReport, StepReport, StepStatus};

/// What to do when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Stop at the first failing step.
    pub abort_on_error: bool,
    /// Report a dashboard failure without failing the run.
    pub continue_past_dashboard_failure: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            abort_on_error: true,
            continue_past_dashboard_failure: false,
        }
    }
}

pub struct Pipeline<C: MonitoringClient> {
    reconciler: Reconciler<C>,
    policy: FailurePolicy,
}

impl<C: MonitoringClient> Pipeline<C> {
    pub fn new(reconciler: Reconciler<C>) -> Self {
        Self {
            reconciler,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reconciler(&self) -> &Reconciler<C> {
        &self.reconciler
    }

    /// Validate `config` and reconcile every resource.
    ///
    /// Validation errors are returned before the backend is touched. Step
    /// failures are recorded in the report instead.
    pub async fn run(&self, config: &BqwatchConfig) -> Result<DeploymentReport, ConfigError> {
        config.validate()?;
        let project = config.project()?.to_string();

        let mut report = DeploymentReport::new(&project, self.reconciler.is_dry_run());
        report.tolerate_dashboard_failure = self.policy.continue_past_dashboard_failure;

        let span = tracing::info_span!(
            "deploy",
            run_id = %report.run_id,
            project = %project,
            dry_run = report.dry_run
        );
        self.run_steps(config, &project, &mut report)
            .instrument(span)
            .await?;

        report.finish();
        Ok(report)
    }

    async fn run_steps(
        &self,
        config: &BqwatchConfig,
        project: &str,
        report: &mut DeploymentReport,
    ) -> Result<(), ConfigError> {
        let metric_spec = MetricSpec::from_config(config);
        let metric_type = metric_spec.metric_type();
        let metric = self
            .step(
                report,
                ResourceDescriptor::new(ResourceKind::Metric, &config.metric_name, project)?,
                Ok(metric_spec.into()),
            )
            .await;
        if metric.is_none() && self.policy.abort_on_error {
            return Ok(());
        }

        let channel = self
            .step(
                report,
                ResourceDescriptor::new(
                    ResourceKind::NotificationChannel,
                    &config.channel_display_name,
                    project,
                )?,
                Ok(ChannelSpec::from_config(config).into()),
            )
            .await;
        if channel.is_none() && self.policy.abort_on_error {
            return Ok(());
        }

        let policy_descriptor =
            ResourceDescriptor::new(ResourceKind::AlertPolicy, &config.policy_name, project)?;
        let policy = match (&metric, &channel) {
            (Some(_), Some(channel)) => {
                let spec = AlertPolicySpec::from_config(config, metric_type, channel.handle.clone());
                self.step(report, policy_descriptor, Ok(spec.into())).await
            }
            (metric, _) => {
                let requires = if metric.is_none() {
                    ResourceKind::Metric
                } else {
                    ResourceKind::NotificationChannel
                };
                let err = ReconcileError::UnmetDependency {
                    kind: ResourceKind::AlertPolicy,
                    requires,
                };
                tracing::warn!(kind = %ResourceKind::AlertPolicy, error = %err, "Step not attempted");
                report.push(StepReport {
                    kind: ResourceKind::AlertPolicy,
                    name: policy_descriptor.name,
                    status: StepStatus::Skipped {
                        reason: err.to_string(),
                    },
                });
                None
            }
        };
        if policy.is_none() && self.policy.abort_on_error {
            return Ok(());
        }

        let dashboard_spec = DashboardSpec::from_config(config)
            .map(ReconciliationSpec::from)
            .map_err(|source| ReconcileError::Spec {
                kind: ResourceKind::Dashboard,
                source,
            });
        self.step(
            report,
            ResourceDescriptor::new(
                ResourceKind::Dashboard,
                &config.dashboard.display_name,
                project,
            )?,
            dashboard_spec,
        )
        .await;

        Ok(())
    }

    async fn step(
        &self,
        report: &mut DeploymentReport,
        descriptor: ResourceDescriptor,
        spec: Result<ReconciliationSpec, ReconcileError>,
    ) -> Option<ReconcileOutcome> {
        let result = match spec {
            Ok(spec) => self.reconciler.reconcile(&descriptor, &spec).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(outcome) => {
                report.push(StepReport::done(&outcome));
                Some(outcome)
            }
            Err(err) => {
                tracing::error!(
                    kind = %descriptor.kind,
                    name = %descriptor.name,
                    error = %error_chain(&err),
                    "Step failed"
                );
                report.push(StepReport {
                    kind: descriptor.kind,
                    name: descriptor.name,
                    status: StepStatus::Failed {
                        error: error_chain(&err),
                    },
                });
                None
            }
        }
    }
}

/// `err` and its sources joined with `": "`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOp;
    use crate::memory::InMemoryClient;
    use crate::reconciler::ReconcileAction;

    fn config() -> BqwatchConfig {
        BqwatchConfig {
            project_id: Some("acme".into()),
            notification_email: "oncall@acme.example".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn invalid_config_fails_before_any_call() {
        let client = InMemoryClient::new();
        let pipeline = Pipeline::new(Reconciler::new(client.clone()));
        let config = BqwatchConfig {
            project_id: Some("acme".into()),
            ..Default::default()
        };

        let err = pipeline.run(&config).await.unwrap_err();
        assert!(matches!(err, ConfigError::PlaceholderEmail(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn aborts_at_first_failure() {
        let client = InMemoryClient::new();
        client.fail_on(ResourceKind::NotificationChannel, ClientOp::Create, "permission denied");
        let pipeline = Pipeline::new(Reconciler::new(client.clone()));

        let report = pipeline.run(&config()).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.action(ResourceKind::Metric), Some(ReconcileAction::Created));
        match &report.step(ResourceKind::NotificationChannel).unwrap().status {
            StepStatus::Failed { error } => assert!(error.contains("permission denied"), "{error}"),
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(client.count(ResourceKind::AlertPolicy), 0);
        assert_eq!(client.count(ResourceKind::Dashboard), 0);
    }

    #[tokio::test]
    async fn continues_past_failures_when_not_aborting() {
        let client = InMemoryClient::new();
        client.fail_on(ResourceKind::Metric, ClientOp::Find, "unauthenticated");
        let pipeline = Pipeline::new(Reconciler::new(client.clone())).with_failure_policy(
            FailurePolicy {
                abort_on_error: false,
                continue_past_dashboard_failure: false,
            },
        );

        let report = pipeline.run(&config()).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.steps.len(), 4);
        assert!(matches!(
            report.step(ResourceKind::AlertPolicy).unwrap().status,
            StepStatus::Skipped { .. }
        ));
        assert_eq!(report.action(ResourceKind::Dashboard), Some(ReconcileAction::Overwritten));
        assert_eq!(client.count(ResourceKind::NotificationChannel), 1);
    }

    #[tokio::test]
    async fn tolerated_dashboard_failure_keeps_run_successful() {
        let client = InMemoryClient::new();
        client.fail_on(ResourceKind::Dashboard, ClientOp::Update, "invalid widget");
        let pipeline = Pipeline::new(Reconciler::new(client.clone())).with_failure_policy(
            FailurePolicy {
                abort_on_error: true,
                continue_past_dashboard_failure: true,
            },
        );

        let report = pipeline.run(&config()).await.unwrap();

        assert!(report.is_success());
        assert!(report.step(ResourceKind::Dashboard).unwrap().is_failure());
        assert_eq!(report.count(ReconcileAction::Created), 3);
    }

    #[tokio::test]
    async fn dashboard_failure_fails_run_by_default() {
        let client = InMemoryClient::new();
        client.fail_on(ResourceKind::Dashboard, ClientOp::Update, "invalid widget");
        let pipeline = Pipeline::new(Reconciler::new(client));

        let report = pipeline.run(&config()).await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn unreadable_layout_is_a_dashboard_step_failure() {
        let client = InMemoryClient::new();
        let pipeline = Pipeline::new(Reconciler::new(client.clone()));
        let mut config = config();
        config.dashboard.layout_file = Some("/nonexistent/bqwatch/layout.json".into());

        let report = pipeline.run(&config).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.count(ReconcileAction::Created), 3);
        assert!(report.step(ResourceKind::Dashboard).unwrap().is_failure());
        assert_eq!(client.calls_for(ClientOp::Update), 0);
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = ReconcileError::Spec {
            kind: ResourceKind::Dashboard,
            source: ConfigError::Invalid("bad".into()),
        };
        assert_eq!(
            error_chain(&err),
            "failed to build dashboard spec: invalid configuration: bad"
        );
    }
}
