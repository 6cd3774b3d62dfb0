//! `bqwatch init` command implementation.
//!
//! Writes a commented starter config. The notification address is left as
//! the placeholder so that `deploy` refuses to run until it is edited.

use anyhow::{Context, Result};
use bqwatch_core::config::PLACEHOLDER_EMAIL;
use std::fs;
use std::path::Path;

fn starter_config() -> String {
    format!(
        r#"# bqwatch configuration

# GCP project to deploy into. Falls back to `gcloud config get-value project`.
# project_id: my-project

# Log-based metric id (letters, digits and _-./).
metric_name: bq_billed_bytes_rt

# Alerting policy display name.
policy_name: BigQuery Billed Bytes (Real-time)

# Who gets notified. Deploy refuses to run until this is changed.
notification_email: {PLACEHOLDER_EMAIL}

# Alert when billed bytes in one window exceed this. Accepts B, KB, MB, GB, TB, PB.
threshold_bytes: 1TB

# Aggregation window in seconds. A multiple of 60, at most one day.
window_seconds: 3600

channel_display_name: Email

dashboard:
  display_name: BigQuery Cost (Real-time)
  # Custom layout; ${{METRIC_TYPE}}, ${{PROJECT_ID}}, ${{THRESHOLD_BYTES}} and
  # ${{WINDOW_SECONDS}} are substituted.
  # layout_file: dashboards/custom.json

# Extra user labels on the alerting policy.
labels:
  team: data-platform
"#
    )
}

pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, starter_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("📝 Wrote {}", path.display());
    println!("   Set notification_email, then run `bqwatch check`.");
    Ok(())
}
