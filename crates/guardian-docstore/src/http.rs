use async_trait::async_trait;
use guardian_backoff::{AttemptBudget, FixedInterval};
use guardian_core::{Event, GuardianResult, Limits, Request, Rule, Structure, StructureSubtype};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::collections;
use crate::error::DocStoreError;
use crate::wire::{equality_selector, AllDocsResponse, FindResponse, StoredDoc};
use crate::{DocStore, ServiceDoc};

/// A DocStore facade over a CouchDB-like JSON REST server.
///
/// Every write goes through [`HttpDocStore::resilient_post`], which owns
/// the optimistic-concurrency retry (409 -> refetch+rebase) and
/// missing-collection retry (404 -> fixed 2s backoff), both capped at the
/// same 5-attempt budget per §4.1.
#[derive(Debug, Clone)]
pub struct HttpDocStore {
    base_url: String,
    http: Client,
}

impl HttpDocStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    pub async fn database_exists(&self, collection: &str) -> GuardianResult<bool> {
        let resp = self.http.head(self.collection_url(collection)).send().await.map_err(DocStoreError::from)?;
        Ok(resp.status() == StatusCode::OK)
    }

    pub async fn create_database(&self, collection: &str) -> GuardianResult<()> {
        let resp = self.http.put(self.collection_url(collection)).send().await.map_err(DocStoreError::from)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DocStoreError::Transport(format!("PUT {collection} -> {}", resp.status())).into())
        }
    }

    pub async fn drop_database(&self, collection: &str) -> GuardianResult<()> {
        let resp = self.http.delete(self.collection_url(collection)).send().await.map_err(DocStoreError::from)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DocStoreError::Transport(format!("DELETE {collection} -> {}", resp.status())).into())
        }
    }

    async fn find<T: DeserializeOwned>(&self, collection: &str, selector: Value) -> GuardianResult<Vec<StoredDoc<T>>> {
        let resp = self
            .http
            .post(format!("{}/_find", self.collection_url(collection)))
            .json(&crate::wire::FindQuery { selector })
            .send()
            .await
            .map_err(DocStoreError::from)?;
        if !resp.status().is_success() {
            return Err(DocStoreError::Transport(format!("_find {collection} -> {}", resp.status())).into());
        }
        let body: FindResponse<T> = resp.json().await.map_err(DocStoreError::from)?;
        Ok(body.docs)
    }

    async fn get_all<T: DeserializeOwned>(&self, collection: &str) -> GuardianResult<Vec<StoredDoc<T>>> {
        let resp = self
            .http
            .get(format!("{}/_all_docs", self.collection_url(collection)))
            .send()
            .await
            .map_err(DocStoreError::from)?;
        if !resp.status().is_success() {
            return Err(DocStoreError::Transport(format!("_all_docs {collection} -> {}", resp.status())).into());
        }
        let rows: AllDocsResponse = resp.json().await.map_err(DocStoreError::from)?;

        let mut docs = Vec::with_capacity(rows.rows.len());
        for row in rows.rows {
            let doc_resp = self.http.get(self.doc_url(collection, &row.id)).send().await.map_err(DocStoreError::from)?;
            if !doc_resp.status().is_success() {
                return Err(DocStoreError::Transport(format!("GET {collection}/{} -> {}", row.id, doc_resp.status())).into());
            }
            docs.push(doc_resp.json().await.map_err(DocStoreError::from)?);
        }
        Ok(docs)
    }

    async fn add_doc<T: Serialize + Send + Sync>(&self, collection: &str, doc: &T) -> GuardianResult<()> {
        let resp = self
            .http
            .post(self.collection_url(collection))
            .json(&StoredDoc::fresh(doc))
            .send()
            .await
            .map_err(DocStoreError::from)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DocStoreError::Transport(format!("POST {collection} -> {}", resp.status())).into())
        }
    }

    async fn delete_doc(&self, collection: &str, id: &str, rev: &str) -> GuardianResult<()> {
        let resp = self
            .http
            .delete(format!("{}?rev={}", self.doc_url(collection, id), rev))
            .send()
            .await
            .map_err(DocStoreError::from)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(DocStoreError::Transport(format!("DELETE {collection}/{id} -> {}", resp.status())).into())
        }
    }

    /// Posts `doc` (rebased onto `stored.rev` if present), retrying per
    /// §4.1: on 409 refetch-by-`id_selector` and rebase; on 404 sleep a
    /// fixed 2s and retry. Both share the same 5-attempt budget.
    async fn resilient_post<T: Serialize + Send + Sync + Clone>(
        &self,
        collection: &str,
        mut stored: StoredDoc<T>,
        id_selector: Value,
    ) -> GuardianResult<()> {
        let mut budget = AttemptBudget::docstore_default();
        let interval = FixedInterval::default();

        loop {
            let resp = self
                .http
                .post(self.collection_url(collection))
                .json(&stored)
                .send()
                .await
                .map_err(DocStoreError::from)?;

            match resp.status() {
                s if s.is_success() => return Ok(()),
                StatusCode::CONFLICT => {
                    if !budget.try_consume() {
                        return Err(DocStoreError::ConflictExhausted.into());
                    }
                    let matches: Vec<StoredDoc<T>> = self.find(collection, id_selector.clone()).await?;
                    let Some(current) = matches.into_iter().next() else {
                        return Err(DocStoreError::NotFound(format!("{collection} document to rebase onto")).into());
                    };
                    stored.id = current.id;
                    stored.rev = current.rev;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(collection, attempts = budget.attempts_used(), "rebasing after docstore conflict");
                }
                StatusCode::NOT_FOUND => {
                    if !budget.try_consume() {
                        return Err(DocStoreError::Transport(format!("{collection} missing after retries")).into());
                    }
                    interval.wait().await;
                }
                other => return Err(DocStoreError::Transport(format!("POST {collection} -> {other}")).into()),
            }
        }
    }
}

#[async_trait]
impl DocStore for HttpDocStore {
    async fn get_structures(&self, subtype: Option<StructureSubtype>) -> GuardianResult<Vec<Structure>> {
        let docs: Vec<StoredDoc<Structure>> = match subtype {
            Some(subtype) => {
                let subtype_str = match subtype {
                    StructureSubtype::Container => "container",
                    StructureSubtype::Application => "application",
                };
                self.find(collections::STRUCTURES, equality_selector(&[("subtype", Value::String(subtype_str.to_string()))]))
                    .await?
            }
            None => self.get_all(collections::STRUCTURES).await?,
        };
        Ok(docs.into_iter().map(|d| d.doc).collect())
    }

    async fn get_rules(&self) -> GuardianResult<Vec<Rule>> {
        let docs: Vec<StoredDoc<Rule>> = self.get_all(collections::RULES).await?;
        Ok(docs.into_iter().map(|d| d.doc).collect())
    }

    async fn get_limits(&self, structure_name: &str) -> GuardianResult<Option<Limits>> {
        let docs: Vec<StoredDoc<Limits>> = self
            .find(collections::LIMITS, equality_selector(&[("name", Value::String(structure_name.to_string()))]))
            .await?;
        Ok(docs.into_iter().next().map(|d| d.doc))
    }

    async fn update_limit(&self, limits: &Limits) -> GuardianResult<()> {
        let selector = equality_selector(&[("name", Value::String(limits.name.clone()))]);
        self.resilient_post(collections::LIMITS, StoredDoc::fresh(limits.clone()), selector).await
    }

    async fn add_events(&self, events: &[Event]) -> GuardianResult<()> {
        for event in events {
            self.add_doc(collections::EVENTS, event).await?;
        }
        Ok(())
    }

    async fn get_events(&self, structure_name: &str) -> GuardianResult<Vec<Event>> {
        let docs: Vec<StoredDoc<Event>> = self
            .find(collections::EVENTS, equality_selector(&[("structure", Value::String(structure_name.to_string()))]))
            .await?;
        Ok(docs.into_iter().map(|d| d.doc).collect())
    }

    async fn delete_events(&self, events: &[Event]) -> GuardianResult<()> {
        for event in events {
            let selector = equality_selector(&[
                ("structure", Value::String(event.structure.clone())),
                ("name", Value::String(event.name.clone())),
                ("timestamp", serde_json::json!(event.timestamp)),
            ]);
            let matches: Vec<StoredDoc<Event>> = self.find(collections::EVENTS, selector).await?;
            if let Some(found) = matches.into_iter().next() {
                if let (Some(id), Some(rev)) = (found.id, found.rev) {
                    self.delete_doc(collections::EVENTS, &id, &rev).await?;
                }
            }
        }
        Ok(())
    }

    async fn delete_num_events_by_structure(&self, structure_name: &str, event_name: &str, n: u32) -> GuardianResult<()> {
        let docs: Vec<StoredDoc<Event>> = self.get_all(collections::EVENTS).await?;
        let mut deleted = 0u32;
        for doc in docs {
            if deleted >= n {
                break;
            }
            if doc.doc.structure == structure_name && doc.doc.name == event_name {
                if let (Some(id), Some(rev)) = (doc.id, doc.rev) {
                    self.delete_doc(collections::EVENTS, &id, &rev).await?;
                    deleted += 1;
                }
            }
        }
        Ok(())
    }

    async fn add_requests(&self, requests: &[Request]) -> GuardianResult<()> {
        for request in requests {
            self.add_doc(collections::REQUESTS, request).await?;
        }
        Ok(())
    }

    async fn get_service(&self, name: &str) -> GuardianResult<ServiceDoc> {
        let docs: Vec<StoredDoc<ServiceDoc>> = self
            .find(collections::SERVICES, equality_selector(&[("name", Value::String(name.to_string()))]))
            .await?;
        docs.into_iter()
            .next()
            .map(|d| d.doc)
            .ok_or_else(|| DocStoreError::NotFound(format!("service '{name}'")).into())
    }

    async fn heartbeat(&self, name: &str, at: &str) -> GuardianResult<()> {
        let service = self.get_service(name).await?;
        let updated = ServiceDoc {
            heartbeat: at.to_string(),
            ..service
        };
        let selector = equality_selector(&[("name", Value::String(name.to_string()))]);
        self.resilient_post(collections::SERVICES, StoredDoc::fresh(updated), selector).await
    }
}
