//! `gcloud` argument vectors for each resource kind.
//!
//! Commands are split into their subcommand path and flags; the client
//! appends `--project`, `--format=json` and `--quiet` to every call.

use bqwatch_core::{ReconciliationSpec, ResourceDescriptor, ResourceKind};
use std::path::Path;

/// Subcommand group for each kind. Policies and channels are only
/// available on the alpha/beta tracks.
pub fn group(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Metric => &["logging", "metrics"],
        ResourceKind::NotificationChannel => &["beta", "monitoring", "channels"],
        ResourceKind::AlertPolicy => &["alpha", "monitoring", "policies"],
        ResourceKind::Dashboard => &["monitoring", "dashboards"],
    }
}

/// Quote a value for a gcloud `--filter` expression.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Filter matching the resource's identity.
///
/// Channels are matched on type and address only, so a channel registered
/// under another display name is still found.
pub fn identity_filter(descriptor: &ResourceDescriptor, spec: &ReconciliationSpec) -> String {
    match (descriptor.kind, spec) {
        (ResourceKind::NotificationChannel, ReconciliationSpec::Channel(channel)) => format!(
            "type=\"email\" AND labels.email_address={}",
            quote(&channel.email)
        ),
        (ResourceKind::Metric, _) => format!("name={}", quote(&descriptor.name)),
        _ => format!("displayName={}", quote(&descriptor.name)),
    }
}

fn with_group(kind: ResourceKind, verb: &str) -> Vec<String> {
    group(kind)
        .iter()
        .copied()
        .chain(std::iter::once(verb))
        .map(String::from)
        .collect()
}

pub fn list(descriptor: &ResourceDescriptor, spec: &ReconciliationSpec) -> Vec<String> {
    let mut args = with_group(descriptor.kind, "list");
    args.push(format!("--filter={}", identity_filter(descriptor, spec)));
    args
}

pub fn create(descriptor: &ResourceDescriptor, payload: &Path) -> Vec<String> {
    let mut args = with_group(descriptor.kind, "create");
    let file = payload.display();
    match descriptor.kind {
        ResourceKind::Metric => {
            args.push(descriptor.name.clone());
            args.push(format!("--config-from-file={file}"));
        }
        ResourceKind::NotificationChannel => {
            args.push(format!("--channel-content-from-file={file}"));
        }
        ResourceKind::AlertPolicy => {
            args.push(format!("--policy-from-file={file}"));
        }
        ResourceKind::Dashboard => {
            args.push(format!("--config-from-file={file}"));
        }
    }
    args
}

/// Replace an existing dashboard. The payload must carry the current etag.
pub fn update_dashboard(resource_name: &str, payload: &Path) -> Vec<String> {
    let mut args = with_group(ResourceKind::Dashboard, "update");
    args.push(resource_name.to_string());
    args.push(format!("--config-from-file={}", payload.display()));
    args
}

/// Flags appended to every resource call.
pub fn common(project: &str) -> [String; 3] {
    [
        format!("--project={project}"),
        "--format=json".to_string(),
        "--quiet".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqwatch_core::{BqwatchConfig, ChannelSpec, MetricSpec};

    fn config() -> BqwatchConfig {
        BqwatchConfig {
            project_id: Some("acme".into()),
            notification_email: "oncall@acme.example".into(),
            ..Default::default()
        }
    }

    #[test]
    fn metric_is_listed_by_name() {
        let d = ResourceDescriptor::new(ResourceKind::Metric, "bq_billed_bytes_rt", "acme").unwrap();
        let spec = MetricSpec::from_config(&config()).into();
        assert_eq!(
            list(&d, &spec),
            vec!["logging", "metrics", "list", r#"--filter=name="bq_billed_bytes_rt""#]
        );
    }

    #[test]
    fn channel_is_listed_by_address() {
        let d = ResourceDescriptor::new(ResourceKind::NotificationChannel, "Email", "acme").unwrap();
        let spec = ChannelSpec::from_config(&config()).into();
        assert_eq!(
            list(&d, &spec).last().unwrap(),
            r#"--filter=type="email" AND labels.email_address="oncall@acme.example""#
        );
    }

    #[test]
    fn display_names_are_quoted() {
        assert_eq!(quote(r#"BQ "cost""#), r#""BQ \"cost\"""#);
        assert_eq!(quote(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn create_uses_kind_specific_file_flag() {
        let file = Path::new("/tmp/payload.json");
        let metric = ResourceDescriptor::new(ResourceKind::Metric, "m", "acme").unwrap();
        let policy = ResourceDescriptor::new(ResourceKind::AlertPolicy, "p", "acme").unwrap();

        assert_eq!(
            create(&metric, file),
            vec![
                "logging",
                "metrics",
                "create",
                "m",
                "--config-from-file=/tmp/payload.json"
            ]
        );
        assert_eq!(
            create(&policy, file),
            vec![
                "alpha",
                "monitoring",
                "policies",
                "create",
                "--policy-from-file=/tmp/payload.json"
            ]
        );
    }
}
