use async_trait::async_trait;
use bqwatch_core::{ReconciliationSpec, ResourceDescriptor, ResourceHandle, ResourceKind};
use std::fmt;
use thiserror::Error;

/// Operations a backend exposes per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    Find,
    Create,
    Update,
}

impl fmt::Display for ClientOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClientOp::Find => "find",
            ClientOp::Create => "create",
            ClientOp::Update => "update",
        })
    }
}

/// Errors raised by a monitoring backend.
///
/// No attempt is made to tell transient from permanent failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("`{program}` is not installed or not on PATH")]
    NotInstalled { program: String },

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {message}")]
    UnexpectedOutput { command: String, message: String },

    #[error("failed to prepare payload: {0}")]
    Payload(String),

    #[error("{op} is not supported for {kind}")]
    Unsupported { kind: ResourceKind, op: ClientOp },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Capability to query and mutate monitoring resources.
///
/// `find` returns `None` when no resource matches the descriptor. Channels
/// are matched on their contact address as well as kind.
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    /// Look up an existing resource matching `descriptor`.
    async fn find(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<Option<ResourceHandle>, ClientError>;

    /// Create the resource. Called only after `find` returned `None`.
    async fn create(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError>;

    /// Write the resource unconditionally, replacing any existing one with
    /// the same identity.
    async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError>;
}
