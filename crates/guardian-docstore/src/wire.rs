use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// A document as stored in the backing CouchDB-like server: the domain
/// fields flattened alongside the opaque `_id`/`_rev` version tokens the
/// facade rebases on and never exposes to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDoc<T> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub doc: T,
}

impl<T> StoredDoc<T> {
    pub fn fresh(doc: T) -> Self {
        StoredDoc {
            id: None,
            rev: None,
            doc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindQuery {
    pub selector: Value,
}

#[derive(Debug, Deserialize)]
pub struct FindResponse<T> {
    pub docs: Vec<StoredDoc<T>>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

/// Matches by equality against every field in `selector`. Mirrors the
/// source's `find_documents_by_matches`, kept here rather than per-caller
/// since only the facade ever constructs a CouchDB selector.
pub fn equality_selector(fields: &[(&str, Value)]) -> Value {
    let mut selector = serde_json::Map::new();
    for (key, value) in fields {
        selector.insert((*key).to_string(), value.clone());
    }
    Value::Object(selector)
}

pub fn parse_docs<T: DeserializeOwned>(body: &str) -> Result<Vec<StoredDoc<T>>, serde_json::Error> {
    let response: FindResponse<T> = serde_json::from_str(body)?;
    Ok(response.docs)
}
