//! Outcome of one deployment run.

use bqwatch_core::{ResourceHandle, ResourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::reconciler::{ReconcileAction, ReconcileOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Done {
        action: ReconcileAction,
        handle: ResourceHandle,
    },
    Failed {
        error: String,
    },
    /// Not attempted because a step it depends on did not reconcile.
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepReport {
    pub fn done(outcome: &ReconcileOutcome) -> Self {
        Self {
            kind: outcome.descriptor.kind,
            name: outcome.descriptor.name.clone(),
            status: StepStatus::Done {
                action: outcome.action,
                handle: outcome.handle.clone(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self.status, StepStatus::Done { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub project: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepReport>,
    /// A failed dashboard step does not fail the run.
    pub tolerate_dashboard_failure: bool,
}

impl DeploymentReport {
    pub fn new(project: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project: project.into(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            tolerate_dashboard_failure: false,
        }
    }

    pub fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn step(&self, kind: ResourceKind) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn handle(&self, kind: ResourceKind) -> Option<&ResourceHandle> {
        match &self.step(kind)?.status {
            StepStatus::Done { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub fn action(&self, kind: ResourceKind) -> Option<ReconcileAction> {
        match &self.step(kind)?.status {
            StepStatus::Done { action, .. } => Some(*action),
            _ => None,
        }
    }

    /// Steps that failed or could not run, minus a tolerated dashboard failure.
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| {
            s.is_failure() && !(self.tolerate_dashboard_failure && s.kind == ResourceKind::Dashboard)
        })
    }

    /// All four steps ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
            && ResourceKind::ALL.iter().all(|k| self.step(*k).is_some())
    }

    pub fn count(&self, action: ReconcileAction) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Done { action: a, .. } if a == action))
            .count()
    }

    /// One line per step, for terminal output.
    pub fn summary_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| match &s.status {
                StepStatus::Done { action, handle } => {
                    format!("{:<22} {:<16} {} ({})", s.kind.as_str(), action.to_string(), s.name, handle)
                }
                StepStatus::Failed { error } => {
                    format!("{:<22} {:<16} {}: {}", s.kind.as_str(), "FAILED", s.name, error)
                }
                StepStatus::Skipped { reason } => {
                    format!("{:<22} {:<16} {}: {}", s.kind.as_str(), "not attempted", s.name, reason)
                }
            })
            .collect()
    }
}
