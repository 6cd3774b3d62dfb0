//! Dashboard configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the monitoring dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Display name the dashboard is published under.
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Custom layout document. When unset the bundled layout is used.
    ///
    /// Relative paths are resolved against the directory of the config file.
    #[serde(default)]
    pub layout_file: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            layout_file: None,
        }
    }
}

fn default_display_name() -> String {
    "BigQuery Cost (Real-time)".to_string()
}
