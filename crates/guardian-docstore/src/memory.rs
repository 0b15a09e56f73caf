use std::sync::Mutex;

use async_trait::async_trait;
use guardian_core::{Event, GuardianResult, Limits, Request, Rule, Structure, StructureSubtype};

use crate::error::DocStoreError;
use crate::{DocStore, ServiceDoc};

/// An in-process double for [`DocStore`], used by scheduler tests that
/// want real fan-out/retry behavior without a live or mocked server.
///
/// Holds plain domain documents, no `_id`/`_rev` bookkeeping: a single
/// mutex per collection is enough to stand in for the facade's conflict
/// handling, since there's no concurrent writer to actually conflict with.
#[derive(Debug, Default)]
pub struct InMemoryDocStore {
    structures: Mutex<Vec<Structure>>,
    rules: Mutex<Vec<Rule>>,
    limits: Mutex<Vec<Limits>>,
    events: Mutex<Vec<Event>>,
    requests: Mutex<Vec<Request>>,
    services: Mutex<Vec<ServiceDoc>>,
}

impl InMemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structures(structures: Vec<Structure>) -> Self {
        Self {
            structures: Mutex::new(structures),
            ..Self::default()
        }
    }

    pub fn seed_rules(&self, rules: Vec<Rule>) {
        *self.rules.lock().unwrap() = rules;
    }

    pub fn seed_limits(&self, limits: Vec<Limits>) {
        *self.limits.lock().unwrap() = limits;
    }

    pub fn seed_service(&self, service: ServiceDoc) {
        self.services.lock().unwrap().push(service);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocStore for InMemoryDocStore {
    async fn get_structures(&self, subtype: Option<StructureSubtype>) -> GuardianResult<Vec<Structure>> {
        let structures = self.structures.lock().unwrap();
        Ok(match subtype {
            Some(subtype) => structures.iter().filter(|s| s.subtype == subtype).cloned().collect(),
            None => structures.clone(),
        })
    }

    async fn get_rules(&self) -> GuardianResult<Vec<Rule>> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn get_limits(&self, structure_name: &str) -> GuardianResult<Option<Limits>> {
        Ok(self.limits.lock().unwrap().iter().find(|l| l.name == structure_name).cloned())
    }

    async fn update_limit(&self, limits: &Limits) -> GuardianResult<()> {
        let mut stored = self.limits.lock().unwrap();
        match stored.iter_mut().find(|l| l.name == limits.name) {
            Some(existing) => *existing = limits.clone(),
            None => stored.push(limits.clone()),
        }
        Ok(())
    }

    async fn add_events(&self, events: &[Event]) -> GuardianResult<()> {
        self.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }

    async fn get_events(&self, structure_name: &str) -> GuardianResult<Vec<Event>> {
        Ok(self.events.lock().unwrap().iter().filter(|e| e.structure == structure_name).cloned().collect())
    }

    async fn delete_events(&self, events: &[Event]) -> GuardianResult<()> {
        let mut stored = self.events.lock().unwrap();
        for event in events {
            if let Some(pos) = stored.iter().position(|e| e == event) {
                stored.remove(pos);
            }
        }
        Ok(())
    }

    async fn delete_num_events_by_structure(&self, structure_name: &str, event_name: &str, n: u32) -> GuardianResult<()> {
        let mut stored = self.events.lock().unwrap();
        let mut remaining = n;
        stored.retain(|e| {
            if remaining > 0 && e.structure == structure_name && e.name == event_name {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        Ok(())
    }

    async fn add_requests(&self, requests: &[Request]) -> GuardianResult<()> {
        self.requests.lock().unwrap().extend_from_slice(requests);
        Ok(())
    }

    async fn get_service(&self, name: &str) -> GuardianResult<ServiceDoc> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| DocStoreError::NotFound(format!("service '{name}'")).into())
    }

    async fn heartbeat(&self, name: &str, at: &str) -> GuardianResult<()> {
        let mut services = self.services.lock().unwrap();
        match services.iter_mut().find(|s| s.name == name) {
            Some(service) => {
                service.heartbeat = at.to_string();
                Ok(())
            }
            None => Err(DocStoreError::NotFound(format!("service '{name}'")).into()),
        }
    }
}
