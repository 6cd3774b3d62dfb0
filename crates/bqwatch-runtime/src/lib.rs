//! # bqwatch-runtime
//!
//! Brings Cloud Monitoring resources to their declared state:
//!
//! - [`client::MonitoringClient`] is the capability boundary to the cloud.
//!   Adapters implement it; [`memory::InMemoryClient`] is the test double.
//! - [`reconciler::Reconciler`] applies create-or-skip (metric, channel,
//!   policy) or overwrite (dashboard) to a single resource.
//! - [`pipeline::Pipeline`] runs the four reconciliations in dependency order
//!   and collects a [`report::DeploymentReport`].

pub mod client;
pub mod memory;
pub mod pipeline;
pub mod reconciler;
pub mod report;

pub use client::{ClientError, ClientOp, MonitoringClient};
pub use memory::InMemoryClient;
pub use pipeline::{FailurePolicy, Pipeline};
pub use reconciler::{ReconcileAction, ReconcileError, ReconcileOutcome, Reconciler};
pub use report::{DeploymentReport, StepReport, StepStatus};
