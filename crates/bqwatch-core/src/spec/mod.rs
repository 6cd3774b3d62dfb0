//! Desired-state payloads for each managed resource.
//!
//! Every spec is built from a validated [`BqwatchConfig`](crate::BqwatchConfig)
//! and renders to the JSON document submitted to Cloud Monitoring / Logging.
//! Specs are immutable for the duration of a run.

pub mod channel;
pub mod dashboard;
pub mod metric;
pub mod policy;

use serde::Serialize;

pub use channel::ChannelSpec;
pub use dashboard::DashboardSpec;
pub use metric::MetricSpec;
pub use policy::AlertPolicySpec;

use crate::ResourceKind;

/// The desired state for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum ReconciliationSpec {
    Metric(MetricSpec),
    Channel(ChannelSpec),
    Policy(AlertPolicySpec),
    Dashboard(DashboardSpec),
}

impl ReconciliationSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReconciliationSpec::Metric(_) => ResourceKind::Metric,
            ReconciliationSpec::Channel(_) => ResourceKind::NotificationChannel,
            ReconciliationSpec::Policy(_) => ResourceKind::AlertPolicy,
            ReconciliationSpec::Dashboard(_) => ResourceKind::Dashboard,
        }
    }

    /// The identity the resource is matched by.
    pub fn name(&self) -> &str {
        match self {
            ReconciliationSpec::Metric(m) => &m.name,
            ReconciliationSpec::Channel(c) => &c.display_name,
            ReconciliationSpec::Policy(p) => &p.display_name,
            ReconciliationSpec::Dashboard(d) => &d.display_name,
        }
    }

    /// The API document for this resource.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            ReconciliationSpec::Metric(m) => m.to_payload(),
            ReconciliationSpec::Channel(c) => c.to_payload(),
            ReconciliationSpec::Policy(p) => p.to_payload(),
            ReconciliationSpec::Dashboard(d) => d.to_payload(),
        }
    }
}

impl From<MetricSpec> for ReconciliationSpec {
    fn from(spec: MetricSpec) -> Self {
        ReconciliationSpec::Metric(spec)
    }
}

impl From<ChannelSpec> for ReconciliationSpec {
    fn from(spec: ChannelSpec) -> Self {
        ReconciliationSpec::Channel(spec)
    }
}

impl From<AlertPolicySpec> for ReconciliationSpec {
    fn from(spec: AlertPolicySpec) -> Self {
        ReconciliationSpec::Policy(spec)
    }
}

impl From<DashboardSpec> for ReconciliationSpec {
    fn from(spec: DashboardSpec) -> Self {
        ReconciliationSpec::Dashboard(spec)
    }
}
