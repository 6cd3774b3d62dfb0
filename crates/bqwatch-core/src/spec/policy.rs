//! Alerting policy on the hourly sum of billed bytes.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::{BqwatchConfig, ByteSize, ResourceHandle};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPolicySpec {
    pub display_name: String,
    /// Fully-qualified metric type the condition watches.
    pub metric_type: String,
    pub threshold: ByteSize,
    pub window_seconds: u64,
    pub notification_channels: Vec<ResourceHandle>,
    pub user_labels: BTreeMap<String, String>,
}

impl AlertPolicySpec {
    /// Build the policy once the metric type and channel are known.
    pub fn from_config(
        config: &BqwatchConfig,
        metric_type: impl Into<String>,
        channel: ResourceHandle,
    ) -> Self {
        Self {
            display_name: config.policy_name.clone(),
            metric_type: metric_type.into(),
            threshold: config.threshold_bytes,
            window_seconds: config.window_seconds,
            notification_channels: vec![channel],
            user_labels: config.labels.clone(),
        }
    }

    pub fn alignment_period(&self) -> String {
        format!("{}s", self.window_seconds)
    }

    fn window_label(&self) -> String {
        match self.window_seconds {
            s if s % 3600 == 0 => format!("{}h", s / 3600),
            s => format!("{}m", s / 60),
        }
    }

    /// The single threshold condition.
    pub fn condition(&self) -> serde_json::Value {
        json!({
            "displayName": format!(
                "Billed bytes above {} per {}",
                self.threshold,
                self.window_label()
            ),
            "conditionThreshold": {
                "filter": format!(
                    r#"metric.type="{}" AND resource.type="bigquery_project""#,
                    self.metric_type
                ),
                "aggregations": [{
                    "alignmentPeriod": self.alignment_period(),
                    "perSeriesAligner": "ALIGN_SUM",
                    "crossSeriesReducer": "REDUCE_SUM"
                }],
                "comparison": "COMPARISON_GT",
                "thresholdValue": self.threshold.as_f64(),
                "duration": "0s",
                "trigger": { "count": 1 }
            }
        })
    }

    /// `AlertPolicy` resource document.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "displayName": self.display_name,
            "documentation": {
                "content": format!(
                    "BigQuery billed more than {} within {}. Check the top offenders chart on the cost dashboard.",
                    self.threshold,
                    self.window_label()
                ),
                "mimeType": "text/markdown"
            },
            "userLabels": self.user_labels,
            "combiner": "OR",
            "conditions": [self.condition()],
            "notificationChannels": self.notification_channels,
            "enabled": true
        })
    }
}
