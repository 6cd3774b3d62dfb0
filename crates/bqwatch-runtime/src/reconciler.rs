use bqwatch_core::{
    ConfigError, ReconciliationSpec, ResourceDescriptor, ResourceHandle, ResourceKind, WriteMode,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::client::{ClientError, ClientOp, MonitoringClient};

/// What a reconcile did to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    /// Already present; left untouched.
    Skipped,
    Overwritten,
    WouldCreate,
    WouldOverwrite,
}

impl ReconcileAction {
    pub fn is_write(self) -> bool {
        matches!(self, ReconcileAction::Created | ReconcileAction::Overwritten)
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Skipped => "exists",
            ReconcileAction::Overwritten => "overwritten",
            ReconcileAction::WouldCreate => "would create",
            ReconcileAction::WouldOverwrite => "would overwrite",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub descriptor: ResourceDescriptor,
    pub action: ReconcileAction,
    pub handle: ResourceHandle,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{spec} spec cannot reconcile {descriptor}")]
    KindMismatch {
        descriptor: ResourceDescriptor,
        spec: ResourceKind,
    },

    #[error("failed to {op} {descriptor}")]
    Client {
        descriptor: ResourceDescriptor,
        op: ClientOp,
        #[source]
        source: ClientError,
    },

    #[error("{kind} requires {requires}, which did not reconcile")]
    UnmetDependency {
        kind: ResourceKind,
        requires: ResourceKind,
    },

    #[error("failed to build {kind} spec")]
    Spec {
        kind: ResourceKind,
        #[source]
        source: ConfigError,
    },
}

impl ReconcileError {
    /// The resource kind the failure belongs to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReconcileError::KindMismatch { descriptor, .. } => descriptor.kind,
            ReconcileError::Client { descriptor, .. } => descriptor.kind,
            ReconcileError::UnmetDependency { kind, .. } => *kind,
            ReconcileError::Spec { kind, .. } => *kind,
        }
    }
}

/// Brings one resource at a time to its declared state.
///
/// Create-or-skip kinds are looked up first and only created when absent;
/// an existing resource is never modified, even if it drifted. Overwrite
/// kinds skip the lookup and are always written.
pub struct Reconciler<C: MonitoringClient> {
    client: C,
    dry_run: bool,
}

impl<C: MonitoringClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            dry_run: false,
        }
    }

    /// In dry-run mode lookups still run but nothing is written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn reconcile(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if spec.kind() != descriptor.kind {
            return Err(ReconcileError::KindMismatch {
                descriptor: descriptor.clone(),
                spec: spec.kind(),
            });
        }

        let client_err = |op: ClientOp| {
            move |source: ClientError| ReconcileError::Client {
                descriptor: descriptor.clone(),
                op,
                source,
            }
        };

        let (action, handle) = match descriptor.kind.write_mode() {
            WriteMode::CreateOrSkip => {
                let existing = self
                    .client
                    .find(descriptor, spec)
                    .await
                    .map_err(client_err(ClientOp::Find))?;

                match existing {
                    Some(handle) => {
                        tracing::info!(
                            kind = %descriptor.kind,
                            name = %descriptor.name,
                            handle = %handle,
                            "Already exists, leaving untouched"
                        );
                        (ReconcileAction::Skipped, handle)
                    }
                    None if self.dry_run => {
                        (ReconcileAction::WouldCreate, ResourceHandle::pending(descriptor))
                    }
                    None => {
                        let handle = self
                            .client
                            .create(descriptor, spec)
                            .await
                            .map_err(client_err(ClientOp::Create))?;
                        (ReconcileAction::Created, handle)
                    }
                }
            }
            WriteMode::Overwrite if self.dry_run => (
                ReconcileAction::WouldOverwrite,
                ResourceHandle::pending(descriptor),
            ),
            WriteMode::Overwrite => {
                let handle = self
                    .client
                    .update(descriptor, spec)
                    .await
                    .map_err(client_err(ClientOp::Update))?;
                (ReconcileAction::Overwritten, handle)
            }
        };

        if action != ReconcileAction::Skipped {
            tracing::info!(
                kind = %descriptor.kind,
                name = %descriptor.name,
                handle = %handle,
                action = %action,
                "Reconciled"
            );
        }

        Ok(ReconcileOutcome {
            descriptor: descriptor.clone(),
            action,
            handle,
        })
    }
}
