//! The Guardian's DocStore facade (component C1).
//!
//! CRUD over six logical collections (`structures`, `services`, `limits`,
//! `rules`, `events`, `requests`) fronting a CouchDB-like JSON REST store,
//! with optimistic-concurrency retry hidden behind the facade: callers
//! pass whole domain documents in and out and never see a `_rev` token.

mod error;
mod http;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod wire;

pub use error::DocStoreError;
pub use http::HttpDocStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryDocStore;

use async_trait::async_trait;
use guardian_core::{Event, GuardianResult, Limits, Request, Rule, Structure, StructureSubtype};

/// The six logical collection names, used verbatim as REST path segments.
pub mod collections {
    pub const STRUCTURES: &str = "structures";
    pub const SERVICES: &str = "services";
    pub const LIMITS: &str = "limits";
    pub const RULES: &str = "rules";
    pub const EVENTS: &str = "events";
    pub const REQUESTS: &str = "requests";
}

/// A Guardian service's own document, keyed by name in the `services`
/// collection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServiceDoc {
    pub name: String,
    pub heartbeat: String,
    pub config: serde_json::Value,
}

/// The six-collection CRUD surface described by §4.1/§6.
///
/// An `async fn` in a trait object-unsafe context is fine here: the
/// scheduler is generic over `D: DocStore`, never boxes this behind a
/// `dyn`, so no trait-object workaround is needed beyond `async_trait`
/// providing a stable desugaring across both implementors.
#[async_trait]
pub trait DocStore: Send + Sync {
    async fn get_structures(&self, subtype: Option<StructureSubtype>) -> GuardianResult<Vec<Structure>>;
    async fn get_rules(&self) -> GuardianResult<Vec<Rule>>;
    /// `None` if the structure has no companion limits document yet.
    async fn get_limits(&self, structure_name: &str) -> GuardianResult<Option<Limits>>;
    async fn update_limit(&self, limits: &Limits) -> GuardianResult<()>;
    async fn add_events(&self, events: &[Event]) -> GuardianResult<()>;
    async fn get_events(&self, structure_name: &str) -> GuardianResult<Vec<Event>>;
    async fn delete_events(&self, events: &[Event]) -> GuardianResult<()>;
    async fn delete_num_events_by_structure(&self, structure_name: &str, event_name: &str, n: u32) -> GuardianResult<()>;
    async fn add_requests(&self, requests: &[Request]) -> GuardianResult<()>;
    async fn get_service(&self, name: &str) -> GuardianResult<ServiceDoc>;
    async fn heartbeat(&self, name: &str, at: &str) -> GuardianResult<()>;
}
