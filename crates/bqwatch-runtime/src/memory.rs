//! In-memory monitoring backend.
//!
//! Behaves like Cloud Monitoring for the purposes of reconciliation: handles
//! are assigned on create, dashboards are upserted by display name and
//! channels are matched by email address. Failures can be injected per
//! `(kind, op)`. Every call is recorded for assertions.

use async_trait::async_trait;
use bqwatch_core::spec::channel::EMAIL_LABEL;
use bqwatch_core::{ReconciliationSpec, ResourceDescriptor, ResourceHandle, ResourceKind};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{ClientError, ClientOp, MonitoringClient};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource {
    pub handle: ResourceHandle,
    pub payload: Value,
    /// Number of writes, including the initial create.
    pub writes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: ClientOp,
    pub kind: ResourceKind,
    pub name: String,
}

type Key = (ResourceKind, String, String);

#[derive(Default)]
struct MemoryState {
    resources: BTreeMap<Key, StoredResource>,
    next_id: u64,
    calls: Vec<Call>,
    failures: HashMap<(ResourceKind, ClientOp), String>,
}

impl MemoryState {
    fn handle_for(&mut self, descriptor: &ResourceDescriptor) -> ResourceHandle {
        self.next_id += 1;
        let collection = match descriptor.kind {
            ResourceKind::Metric => {
                return ResourceHandle::new(format!(
                    "projects/{}/metrics/{}",
                    descriptor.project, descriptor.name
                ));
            }
            ResourceKind::NotificationChannel => "notificationChannels",
            ResourceKind::AlertPolicy => "alertPolicies",
            ResourceKind::Dashboard => "dashboards",
        };
        ResourceHandle::new(format!(
            "projects/{}/{}/{}",
            descriptor.project, collection, self.next_id
        ))
    }
}

/// Cloneable handle onto shared in-memory state.
#[derive(Clone, Default)]
pub struct InMemoryClient {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a pre-existing resource, as if created out of band.
    pub fn seed(&self, descriptor: &ResourceDescriptor, payload: Value) -> ResourceHandle {
        let mut state = self.state();
        let handle = state.handle_for(descriptor);
        state.resources.insert(
            entry_key(descriptor, &handle),
            StoredResource {
                handle: handle.clone(),
                payload,
                writes: 1,
            },
        );
        handle
    }

    /// Make every subsequent `op` on `kind` fail with `message`.
    pub fn fail_on(&self, kind: ResourceKind, op: ClientOp, message: impl Into<String>) {
        self.state().failures.insert((kind, op), message.into());
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Look up by name, or by handle for notification channels.
    pub fn get(&self, kind: ResourceKind, project: &str, name: &str) -> Option<StoredResource> {
        self.state()
            .resources
            .get(&(kind, project.to_string(), name.to_string()))
            .cloned()
    }

    pub fn resources(&self, kind: ResourceKind) -> Vec<StoredResource> {
        self.state()
            .resources
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources(kind).len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn calls_for(&self, op: ClientOp) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    fn record(
        &self,
        op: ClientOp,
        descriptor: &ResourceDescriptor,
    ) -> Result<MutexGuard<'_, MemoryState>, ClientError> {
        let mut state = self.state();
        state.calls.push(Call {
            op,
            kind: descriptor.kind,
            name: descriptor.name.clone(),
        });
        if let Some(message) = state.failures.get(&(descriptor.kind, op)) {
            return Err(ClientError::Backend(message.clone()));
        }
        Ok(state)
    }
}

fn name_key(descriptor: &ResourceDescriptor) -> Key {
    (
        descriptor.kind,
        descriptor.project.clone(),
        descriptor.name.clone(),
    )
}

/// Where a written resource is stored. Channel display names are not unique,
/// so channels are keyed by handle and every create adds an entry.
fn entry_key(descriptor: &ResourceDescriptor, handle: &ResourceHandle) -> Key {
    match descriptor.kind {
        ResourceKind::NotificationChannel => (
            descriptor.kind,
            descriptor.project.clone(),
            handle.as_str().to_string(),
        ),
        _ => name_key(descriptor),
    }
}

fn channel_email(payload: &Value) -> Option<&str> {
    payload.get("labels")?.get(EMAIL_LABEL)?.as_str()
}

#[async_trait]
impl MonitoringClient for InMemoryClient {
    async fn find(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<Option<ResourceHandle>, ClientError> {
        let state = self.record(ClientOp::Find, descriptor)?;

        if let ReconciliationSpec::Channel(channel) = spec {
            // Any email channel with the same address counts, whatever its
            // display name. Lowest handle wins when there are several.
            let mut matches: Vec<&ResourceHandle> = state
                .resources
                .iter()
                .filter(|((kind, project, _), r)| {
                    *kind == ResourceKind::NotificationChannel
                        && *project == descriptor.project
                        && channel_email(&r.payload) == Some(channel.email.as_str())
                })
                .map(|(_, r)| &r.handle)
                .collect();
            matches.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            return Ok(matches.first().map(|h| (*h).clone()));
        }

        Ok(state.resources.get(&name_key(descriptor)).map(|r| r.handle.clone()))
    }

    async fn create(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError> {
        let mut state = self.record(ClientOp::Create, descriptor)?;
        let handle = state.handle_for(descriptor);
        state.resources.insert(
            entry_key(descriptor, &handle),
            StoredResource {
                handle: handle.clone(),
                payload: spec.to_payload(),
                writes: 1,
            },
        );
        Ok(handle)
    }

    async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ReconciliationSpec,
    ) -> Result<ResourceHandle, ClientError> {
        let mut state = self.record(ClientOp::Update, descriptor)?;
        if let Some(existing) = state.resources.get_mut(&name_key(descriptor)) {
            existing.payload = spec.to_payload();
            existing.writes += 1;
            return Ok(existing.handle.clone());
        }
        let handle = state.handle_for(descriptor);
        state.resources.insert(
            entry_key(descriptor, &handle),
            StoredResource {
                handle: handle.clone(),
                payload: spec.to_payload(),
                writes: 1,
            },
        );
        Ok(handle)
    }
}
