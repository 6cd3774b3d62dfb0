//! Dashboard layout.
//!
//! The layout is a static Cloud Monitoring dashboard document. Four
//! placeholders are substituted in every string value before submission:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `${METRIC_TYPE}` | `logging.googleapis.com/user/<metric_name>` |
//! | `${PROJECT_ID}` | the target project |
//! | `${THRESHOLD_BYTES}` | the alert threshold; a string that is exactly this placeholder becomes a number |
//! | `${WINDOW_SECONDS}` | the alert window in seconds, e.g. in `"${WINDOW_SECONDS}s"` |
//!
//! `displayName` is always set from the config since it is the dashboard's
//! identity. Nothing else in the document is touched.

use serde::Serialize;
use serde_json::Value;
use std::fs;

use crate::{BqwatchConfig, ConfigError};

/// Layout shipped with bqwatch.
pub const BUNDLED_LAYOUT: &str = include_str!("../../../../dashboards/bigquery_cost.json");

const METRIC_TYPE: &str = "${METRIC_TYPE}";
const PROJECT_ID: &str = "${PROJECT_ID}";
const THRESHOLD_BYTES: &str = "${THRESHOLD_BYTES}";
const WINDOW_SECONDS: &str = "${WINDOW_SECONDS}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSpec {
    pub display_name: String,
    pub layout: Value,
}

impl DashboardSpec {
    pub fn from_config(config: &BqwatchConfig) -> Result<Self, ConfigError> {
        let raw = match &config.dashboard.layout_file {
            Some(path) => fs::read_to_string(path)?,
            None => BUNDLED_LAYOUT.to_string(),
        };
        Self::from_layout(config, &raw)
    }

    pub fn from_layout(config: &BqwatchConfig, raw: &str) -> Result<Self, ConfigError> {
        let mut layout: Value = serde_json::from_str(raw)?;
        let Value::Object(fields) = &mut layout else {
            return Err(ConfigError::Invalid(
                "dashboard layout must be a JSON object".into(),
            ));
        };
        fields.insert(
            "displayName".to_string(),
            Value::String(config.dashboard.display_name.clone()),
        );

        let substitutions = Substitutions {
            metric_type: config.metric_type(),
            project_id: config.project()?.to_string(),
            threshold: config.threshold_bytes.as_u64(),
            window_seconds: config.window_seconds,
        };
        substitutions.apply(&mut layout);

        Ok(Self {
            display_name: config.dashboard.display_name.clone(),
            layout,
        })
    }

    /// `Dashboard` resource document.
    pub fn to_payload(&self) -> Value {
        self.layout.clone()
    }

    /// Widget titles, in layout order.
    pub fn widget_titles(&self) -> Vec<&str> {
        self.layout
            .pointer("/mosaicLayout/tiles")
            .and_then(Value::as_array)
            .map(|tiles| {
                tiles
                    .iter()
                    .filter_map(|t| t.pointer("/widget/title").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct Substitutions {
    metric_type: String,
    project_id: String,
    threshold: u64,
    window_seconds: u64,
}

impl Substitutions {
    fn apply(&self, value: &mut Value) {
        if value.as_str() == Some(THRESHOLD_BYTES) {
            *value = Value::from(self.threshold);
            return;
        }
        match value {
            Value::String(s) => {
                if s.contains("${") {
                    *s = s
                        .replace(METRIC_TYPE, &self.metric_type)
                        .replace(PROJECT_ID, &self.project_id)
                        .replace(THRESHOLD_BYTES, &self.threshold.to_string())
                        .replace(WINDOW_SECONDS, &self.window_seconds.to_string());
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.apply(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.apply(v)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BqwatchConfig {
        BqwatchConfig {
            project_id: Some("acme-analytics".into()),
            ..Default::default()
        }
    }

    #[test]
    fn bundled_layout_has_four_widgets() {
        let spec = DashboardSpec::from_config(&config()).unwrap();
        assert_eq!(spec.widget_titles().len(), 4);

        let payload = spec.to_payload();
        let tiles = payload["mosaicLayout"]["tiles"].as_array().unwrap();
        assert!(tiles[0]["widget"].get("scorecard").is_some());
        assert!(tiles[1]["widget"].get("xyChart").is_some());
        assert!(tiles[2]["widget"].get("xyChart").is_some());
        assert!(tiles[3]["widget"].get("logsPanel").is_some());
    }

    #[test]
    fn placeholders_are_substituted() {
        let spec = DashboardSpec::from_config(&config()).unwrap();
        let text = spec.to_payload().to_string();
        assert!(!text.contains(METRIC_TYPE));
        assert!(!text.contains(PROJECT_ID));
        assert!(!text.contains(THRESHOLD_BYTES));
        assert!(!text.contains(WINDOW_SECONDS));
        assert!(text.contains("logging.googleapis.com/user/bq_billed_bytes_rt"));
        assert!(text.contains("projects/acme-analytics"));
        // Legend templates use the same `${...}` syntax and must survive.
        assert!(text.contains("${metric.labels.user}"));

        let threshold = &spec.to_payload()["mosaicLayout"]["tiles"][0]["widget"]["scorecard"]
            ["thresholds"][0]["value"];
        assert_eq!(threshold.as_u64(), Some(1_000_000_000_000));
    }

    #[test]
    fn aggregation_windows_follow_alert_window() {
        let config = BqwatchConfig {
            window_seconds: 1800,
            ..config()
        };
        let payload = DashboardSpec::from_config(&config).unwrap().to_payload();
        let tiles = &payload["mosaicLayout"]["tiles"];

        let scorecard = &tiles[0]["widget"]["scorecard"]["timeSeriesQuery"]["timeSeriesFilter"];
        assert_eq!(scorecard["aggregation"]["alignmentPeriod"], "1800s");

        let series = &tiles[1]["widget"]["xyChart"]["dataSets"];
        let per_minute = &series[0]["timeSeriesQuery"]["timeSeriesFilter"]["aggregation"];
        let baseline = &series[1]["timeSeriesQuery"]["timeSeriesFilter"]["aggregation"];
        assert_eq!(per_minute["alignmentPeriod"], "60s");
        assert_eq!(baseline["alignmentPeriod"], "1800s");

        let offenders = &tiles[2]["widget"]["xyChart"]["dataSets"][0]["timeSeriesQuery"]
            ["timeSeriesFilter"]["aggregation"];
        assert_eq!(offenders["alignmentPeriod"], "1800s");
    }

    #[test]
    fn display_name_comes_from_config() {
        let mut config = config();
        config.dashboard.display_name = "Spend".into();
        let spec = DashboardSpec::from_layout(&config, r#"{"displayName": "other"}"#).unwrap();
        assert_eq!(spec.display_name, "Spend");
        assert_eq!(spec.to_payload()["displayName"], "Spend");
    }

    #[test]
    fn non_object_layout_is_rejected() {
        assert!(matches!(
            DashboardSpec::from_layout(&config(), "[]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DashboardSpec::from_layout(&config(), "{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn layout_file_overrides_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        fs::write(&path, r#"{"gridLayout": {"widgets": []}}"#).unwrap();

        let mut config = config();
        config.dashboard.layout_file = Some(path);
        let spec = DashboardSpec::from_config(&config).unwrap();
        assert!(spec.to_payload().get("gridLayout").is_some());
        assert!(spec.widget_titles().is_empty());
    }
}
