//! Log-based metric extracting billed bytes from BigQuery audit logs.

use serde::Serialize;
use serde_json::json;

use crate::BqwatchConfig;

/// Audit-log field carrying the billed bytes of a completed query job.
pub const BILLED_BYTES_FIELD: &str =
    "protoPayload.metadata.jobChange.job.jobStats.queryStats.totalBilledBytes";

/// Audit-log field identifying who ran the job.
pub const REQUESTER_FIELD: &str = "protoPayload.authenticationInfo.principalEmail";

/// Metric label holding the requester identity.
pub const USER_LABEL: &str = "user";

/// Logging filter selecting completed BigQuery jobs that billed any bytes.
pub fn completed_jobs_filter() -> String {
    [
        r#"resource.type="bigquery_project""#.to_string(),
        r#"log_id("cloudaudit.googleapis.com/data_access")"#.to_string(),
        r#"protoPayload.metadata.jobChange.after="DONE""#.to_string(),
        format!("{BILLED_BYTES_FIELD}>0"),
    ]
    .join(" AND ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    pub name: String,
    pub description: String,
    pub filter: String,
}

impl MetricSpec {
    pub fn from_config(config: &BqwatchConfig) -> Self {
        Self {
            name: config.metric_name.clone(),
            description: "Bytes billed per completed BigQuery query job, labelled by requester"
                .to_string(),
            filter: completed_jobs_filter(),
        }
    }

    /// Fully-qualified type used by monitoring filters.
    pub fn metric_type(&self) -> String {
        format!("logging.googleapis.com/user/{}", self.name)
    }

    /// `LogMetric` resource document.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "description": self.description,
            "filter": self.filter,
            "metricDescriptor": {
                "metricKind": "DELTA",
                "valueType": "DISTRIBUTION",
                "unit": "By",
                "displayName": "BigQuery billed bytes",
                "labels": [{
                    "key": USER_LABEL,
                    "valueType": "STRING",
                    "description": "Principal that ran the query job"
                }]
            },
            "valueExtractor": format!("EXTRACT({BILLED_BYTES_FIELD})"),
            "labelExtractors": {
                USER_LABEL: format!("EXTRACT({REQUESTER_FIELD})")
            },
            "bucketOptions": {
                "exponentialBuckets": {
                    "numFiniteBuckets": 64,
                    "growthFactor": 2,
                    "scale": 1
                }
            }
        })
    }
}
