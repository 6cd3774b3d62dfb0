//! # bqwatch-core
//!
//! Shared types for bqwatch:
//! - [`config`]: the validated deployment configuration ([`BqwatchConfig`])
//! - [`spec`]: desired-state payloads for each monitoring resource
//! - resource identity types used by the reconciler ([`ResourceDescriptor`],
//!   [`ResourceHandle`])

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod spec;

pub use config::{BqwatchConfig, ByteSize, ConfigError, DashboardConfig};
pub use spec::{
    AlertPolicySpec, ChannelSpec, DashboardSpec, MetricSpec, ReconciliationSpec,
};

/// The kinds of Cloud Monitoring resources bqwatch manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Metric,
    NotificationChannel,
    AlertPolicy,
    Dashboard,
}

/// How a resource kind is brought to its desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create when absent, leave untouched when present.
    CreateOrSkip,
    /// Always write the declared document, replacing whatever exists.
    Overwrite,
}

impl ResourceKind {
    /// Pipeline order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Metric,
        ResourceKind::NotificationChannel,
        ResourceKind::AlertPolicy,
        ResourceKind::Dashboard,
    ];

    pub fn write_mode(self) -> WriteMode {
        match self {
            ResourceKind::Dashboard => WriteMode::Overwrite,
            _ => WriteMode::CreateOrSkip,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Metric => "metric",
            ResourceKind::NotificationChannel => "notification_channel",
            ResourceKind::AlertPolicy => "alert_policy",
            ResourceKind::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a target resource by `{kind, name, project}`.
///
/// `name` is the metric id for metrics and the display name for every other
/// kind. It is unique within `{kind, project}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    pub project: String,
}

impl ResourceDescriptor {
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        project: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let project = project.into();
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{kind} name must not be empty")));
        }
        if project.trim().is_empty() {
            return Err(ConfigError::MissingProject);
        }
        Ok(Self {
            kind,
            name,
            project,
        })
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' in project '{}'", self.kind, self.name, self.project)
    }
}

/// Opaque identifier handed back by the monitoring backend, e.g.
/// `projects/acme/notificationChannels/123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Placeholder handle used when a dry run skips a write.
    pub fn pending(descriptor: &ResourceDescriptor) -> Self {
        Self(format!("<pending:{}/{}>", descriptor.kind, descriptor.name))
    }

    pub fn is_pending(&self) -> bool {
        self.0.starts_with("<pending:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
