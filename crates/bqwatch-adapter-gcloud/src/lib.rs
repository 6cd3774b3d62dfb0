//! `gcloud`-backed [`MonitoringClient`].
//!
//! Every call shells out to the Cloud SDK using whatever account and
//! project the caller is authenticated as. Payloads are written to a
//! temporary JSON file for the lifetime of the call. A non-zero exit is
//! returned as [`ClientError::CommandFailed`]; retries are left to gcloud.

use async_trait::async_trait;
use bqwatch_core::{ReconciliationSpec, ResourceDescriptor, ResourceHandle, ResourceKind};
use bqwatch_runtime::{ClientError, ClientOp, MonitoringClient};
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

pub mod args;
pub mod runner;

pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

use runner::display_command;

pub const DEFAULT_PROGRAM: &str = "gcloud";

pub struct GcloudClient<R: CommandRunner = ProcessRunner> {
    runner: R,
    program: String,
}

impl GcloudClient<ProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner)
    }
}

impl Default for GcloudClient<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> GcloudClient<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Use a different executable, e.g. a pinned SDK install.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run gcloud and return stdout, failing on a non-zero exit.
    async fn exec(&self, argv: &[String]) -> Result<String, ClientError> {
        let output = self.runner.run(&self.program, argv).await?;
        if !output.success {
            return Err(ClientError::CommandFailed {
                command: display_command(&self.program, argv),
                status: output
                    .code
                    .map(|c| format!("exit code {c}"))
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn exec_json(
        &self,
        descriptor: &ResourceDescriptor,
        mut argv: Vec<String>,
    ) -> Result<Value, ClientError> {
        argv.extend(args::common(&descriptor.project));
        let stdout = self.exec(&argv).await?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| ClientError::UnexpectedOutput {
            command: display_command(&self.program, &argv),
            message: format!("invalid JSON: {e}"),
        })
    }

    /// Fail with [`ClientError::NotInstalled`] unless gcloud runs.
    pub async fn ensure_installed(&self) -> Result<(), ClientError> {
        let version = self.exec(&["--version".to_string()]).await.map_err(|e| match e {
            ClientError::CommandFailed { .. } => ClientError::NotInstalled {
                program: self.program.clone(),
            },
            other => other,
        })?;
        tracing::debug!(
            version = version.lines().next().unwrap_or_default(),
            "Found gcloud"
        );
        Ok(())
    }

    /// The project gcloud is configured for, if any.
    pub async fn active_project(&self) -> Result<Option<String>, ClientError> {
        let stdout = self
            .exec(&[
                "config".to_string(),
                "get-value".to_string(),
                "project".to_string(),
            ])
            .await?;
        let project = stdout.trim();
        if project.is_empty() || project == "(unset)" {
            Ok(None)
        } else {
            Ok(Some(project.to_string()))
        }
    }

    /// `name`s of every listed resource matching the descriptor, sorted.
    async fn list_names(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<Vec<(String, Value)>, ClientError> {
        let listed = self.exec_json(descriptor, args::list(descriptor, spec)).await?;
        let items = match listed {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => {
                return Err(ClientError::UnexpectedOutput {
                    command: format!("{} list", args::group(descriptor.kind).join(" ")),
                    message: format!("expected a JSON array, got {other}"),
                });
            }
        };

        let mut named: Vec<(String, Value)> = items
            .into_iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?.to_string();
                Some((name, item))
            })
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(named)
    }

    async fn submit(
        &self,
        descriptor: &ResourceDescriptor,
        payload: &Value,
        build: impl FnOnce(&std::path::Path) -> Vec<String>,
    ) -> Result<Value, ClientError> {
        let file = write_payload(payload)?;
        self.exec_json(descriptor, build(file.path())).await
    }
}

fn write_payload(payload: &Value) -> Result<NamedTempFile, ClientError> {
    let mut file = tempfile::Builder::new()
        .prefix("bqwatch-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| ClientError::Payload(e.to_string()))?;
    serde_json::to_writer_pretty(&mut file, payload)
        .map_err(|e| ClientError::Payload(e.to_string()))?;
    file.flush().map_err(|e| ClientError::Payload(e.to_string()))?;
    Ok(file)
}

/// Log metrics are listed and echoed by short id; qualify it.
fn metric_handle(descriptor: &ResourceDescriptor) -> ResourceHandle {
    ResourceHandle::new(format!(
        "projects/{}/metrics/{}",
        descriptor.project, descriptor.name
    ))
}

fn created_handle(
    descriptor: &ResourceDescriptor,
    output: &Value,
) -> Result<ResourceHandle, ClientError> {
    if descriptor.kind == ResourceKind::Metric {
        return Ok(metric_handle(descriptor));
    }
    output
        .get("name")
        .and_then(Value::as_str)
        .map(ResourceHandle::new)
        .ok_or_else(|| ClientError::UnexpectedOutput {
            command: format!("{} create", args::group(descriptor.kind).join(" ")),
            message: "response has no resource name".to_string(),
        })
}

#[async_trait]
impl<R: CommandRunner> MonitoringClient for GcloudClient<R> {
    async fn find(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<Option<ResourceHandle>, ClientError> {
        let named = self.list_names(descriptor, spec).await?;
        if named.len() > 1 {
            tracing::warn!(
                kind = %descriptor.kind,
                name = %descriptor.name,
                matches = named.len(),
                "Several existing resources match, using the first"
            );
        }
        if descriptor.kind == ResourceKind::Metric {
            return Ok(named.first().map(|_| metric_handle(descriptor)));
        }
        Ok(named.into_iter().next().map(|(name, _)| ResourceHandle::new(name)))
    }

    async fn create(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError> {
        let output = self
            .submit(descriptor, &spec.to_payload(), |path| args::create(descriptor, path))
            .await?;
        created_handle(descriptor, &output)
    }

    /// Dashboards are upserted by display name: an existing one is replaced
    /// in place using its current etag, otherwise a new one is created.
    async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError> {
        if descriptor.kind != ResourceKind::Dashboard {
            return Err(ClientError::Unsupported {
                kind: descriptor.kind,
                op: ClientOp::Update,
            });
        }

        let mut payload = spec.to_payload();
        let existing = self.list_names(descriptor, spec).await?.into_iter().next();

        let Some((name, current)) = existing else {
            tracing::debug!(name = %descriptor.name, "No dashboard yet, creating");
            return self.create(descriptor, spec).await;
        };

        if let (Some(etag), Value::Object(fields)) = (current.get("etag"), &mut payload) {
            fields.insert("etag".to_string(), etag.clone());
        }
        self.submit(descriptor, &payload, |path| args::update_dashboard(&name, path))
            .await?;
        Ok(ResourceHandle::new(name))
    }
}
