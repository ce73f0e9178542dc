//! Null-tolerant view over raw cluster responses.

use crate::document::{Indexable, SourceMap};
use crate::error::{Result, SearchError};
use crate::facet::{decode_facets, FacetResult};
use crate::transport::TransportResponse;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Raw outcome of one request.
///
/// Every accessor is total: a failed call is represented by an empty JSON object, so
/// reading hits, totals or facets from it yields empty values instead of errors.
#[derive(Debug, Clone)]
pub struct RawResult {
    json: Value,
    status: Option<u16>,
    succeeded: bool,
}

impl RawResult {
    /// Wrap a response received from the cluster.
    pub fn from_response(response: TransportResponse) -> Self {
        let succeeded = (200..300).contains(&response.status);
        let json = match response.body {
            Value::Null => Value::Object(Map::new()),
            body => body,
        };
        Self {
            json,
            status: Some(response.status),
            succeeded,
        }
    }

    /// A call that produced no response at all.
    pub fn failed() -> Self {
        Self {
            json: Value::Object(Map::new()),
            status: None,
            succeeded: false,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether the cluster answered with a success status.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Total number of matching documents (`hits.total`), 0 when absent.
    ///
    /// Accepts both the plain number and the `{"value": n}` object form.
    pub fn total_hits(&self) -> i64 {
        match self.json.pointer("/hits/total") {
            Some(Value::Number(n)) => whole(n),
            Some(Value::Object(total)) => match total.get("value") {
                Some(Value::Number(n)) => whole(n),
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Hits of a search response, empty when absent.
    ///
    /// Entries that are not JSON objects are skipped.
    pub fn hits(&self) -> Vec<Hit> {
        let Some(hits) = self.json.pointer("/hits/hits").and_then(Value::as_array) else {
            return Vec::new();
        };

        hits.iter()
            .filter_map(|line| match line {
                Value::Object(line) => Some(Hit::from_json(line)),
                other => {
                    warn!(hit = %other, "Skipping malformed hit");
                    None
                }
            })
            .collect()
    }

    /// Decoded facets of a search response, empty when absent.
    pub fn facets(&self) -> Vec<FacetResult> {
        decode_facets(self.json.get("facets"))
    }

    /// Error message reported by the cluster, empty when there is none.
    pub fn error_message(&self) -> String {
        match self.json.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(error @ Value::Object(_)) => error
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
            _ => String::new(),
        }
    }

    /// Response body as a JSON string, empty when no response was received.
    pub fn json_string(&self) -> String {
        if self.status.is_none() {
            return String::new();
        }
        self.json.to_string()
    }

    /// Underlying JSON document.
    pub fn json(&self) -> &Value {
        &self.json
    }

    /// Top-level `_id`, as returned by get and index calls.
    pub fn id(&self) -> Option<String> {
        self.json
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Whether a get call found its document.
    pub fn found(&self) -> bool {
        self.json
            .get("found")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Treat the whole response as one hit, as get calls return it.
    pub fn as_hit(&self) -> Option<Hit> {
        if !self.succeeded {
            return None;
        }
        self.json.as_object().map(Hit::from_json)
    }
}

/// One search match, prior to hydration.
pub struct Hit {
    index: String,
    doc_type: String,
    id: String,
    score: f32,
    source: Option<SourceMap>,
    hydrated: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Hit {
    /// Read a hit line. Missing metadata degrades to empty strings and a score of 1.0.
    pub fn from_json(line: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            line.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            index: text("_index"),
            doc_type: text("_type"),
            id: text("_id"),
            score: line
                .get("_score")
                .and_then(|s| s.as_f64().or_else(|| s.as_str()?.trim().parse().ok()))
                .map_or(1.0, |s| s as f32),
            source: line.get("_source").and_then(Value::as_object).cloned(),
            hydrated: Mutex::new(HashMap::new()),
        }
    }

    /// Index the hit was found in.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Mapping type of the hit.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Persisted identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Relevance score.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Stored source, absent when fields were suppressed.
    pub fn source(&self) -> Option<&SourceMap> {
        self.source.as_ref()
    }

    /// Convert the hit into a `T`, reusing the previous conversion for the same type.
    ///
    /// The source goes through [`Indexable::from_index`] (an empty map when the hit has
    /// no source) and the hit's id is then written into the document, replacing any id
    /// carried by the source.
    pub fn hydrate<T: Indexable>(&self) -> Result<Arc<T>> {
        let mut hydrated = self.hydrated.lock();

        if let Some(doc) = hydrated.get(&TypeId::of::<T>())
            && let Ok(doc) = Arc::clone(doc).downcast::<T>()
        {
            return Ok(doc);
        }

        let doc = Arc::new(self.convert::<T>()?);
        hydrated.insert(TypeId::of::<T>(), doc.clone());
        Ok(doc)
    }

    /// Consume the hit and return an owned `T`.
    ///
    /// Takes the memoized document when nothing else shares it, and converts again
    /// otherwise.
    pub fn into_document<T: Indexable>(self) -> Result<T> {
        let memo = self.hydrated.lock().remove(&TypeId::of::<T>());
        if let Some(doc) = memo
            && let Ok(doc) = doc.downcast::<T>()
            && let Ok(doc) = Arc::try_unwrap(doc)
        {
            return Ok(doc);
        }
        self.convert()
    }

    fn convert<T: Indexable>(&self) -> Result<T> {
        let empty = SourceMap::new();
        let source = self.source.as_ref().unwrap_or(&empty);

        let mut doc = T::from_index(source).map_err(|e| SearchError::Hydration {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        doc.set_id(&self.id);
        Ok(doc)
    }
}

/// Integral part of a JSON number, so `2.0` counts as 2.
fn whole(n: &serde_json::Number) -> i64 {
    n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)
}

impl fmt::Debug for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hit")
            .field("index", &self.index)
            .field("doc_type", &self.doc_type)
            .field("id", &self.id)
            .field("score", &self.score)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{from_source, to_source};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        #[serde(default)]
        id: Option<String>,
        title: String,
    }

    impl Indexable for Article {
        const DOC_TYPE: &'static str = "article";

        fn from_index(source: &SourceMap) -> Result<Self> {
            from_source(source)
        }

        fn to_index(&self) -> Result<SourceMap> {
            to_source(self)
        }

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: &str) {
            self.id = Some(id.to_string());
        }
    }

    fn response(body: Value) -> RawResult {
        RawResult::from_response(TransportResponse::new(200, body))
    }

    #[test]
    fn test_failed_result_degrades() {
        let result = RawResult::failed();
        assert_eq!(result.total_hits(), 0);
        assert!(result.hits().is_empty());
        assert!(result.facets().is_empty());
        assert!(!result.succeeded());
        assert_eq!(result.error_message(), "");
        assert_eq!(result.json_string(), "");
        assert_eq!(result.id(), None);
        assert!(result.as_hit().is_none());
    }

    #[test]
    fn test_total_hits_forms() {
        assert_eq!(response(json!({ "hits": { "total": 12 } })).total_hits(), 12);
        assert_eq!(
            response(json!({ "hits": { "total": { "value": 7, "relation": "eq" } } })).total_hits(),
            7
        );
        assert_eq!(response(json!({ "hits": { "total": "many" } })).total_hits(), 0);
        assert_eq!(response(json!({ "hits": { "total": 2.0 } })).total_hits(), 2);
        assert_eq!(response(json!({ "hits": { "total": { "value": 9.0 } } })).total_hits(), 9);
        assert_eq!(response(json!({ "took": 3 })).total_hits(), 0);
    }

    #[test]
    fn test_hits_skip_malformed_lines() {
        let result = response(json!({
            "hits": { "total": 2, "hits": [
                { "_index": "i", "_type": "t", "_id": "1", "_score": 2.5, "_source": { "title": "a" } },
                "garbage"
            ] }
        }));
        let hits = result.hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index(), "i");
        assert_eq!(hits[0].doc_type(), "t");
        assert_eq!(hits[0].id(), "1");
        assert_eq!(hits[0].score(), 2.5);
    }

    #[test]
    fn test_hit_score_defaults() {
        let unscored = json!({ "_id": "1", "_score": null });
        let hit = Hit::from_json(unscored.as_object().unwrap());
        assert_eq!(hit.score(), 1.0);
        assert!(hit.source().is_none());

        let missing = json!({ "_id": "2" });
        assert_eq!(Hit::from_json(missing.as_object().unwrap()).score(), 1.0);

        let textual = json!({ "_id": "3", "_score": "1.5" });
        assert_eq!(Hit::from_json(textual.as_object().unwrap()).score(), 1.5);

        let garbled = json!({ "_id": "4", "_score": "high" });
        assert_eq!(Hit::from_json(garbled.as_object().unwrap()).score(), 1.0);
    }

    #[test]
    fn test_error_message_forms() {
        let plain = RawResult::from_response(TransportResponse::new(
            400,
            json!({ "error": "SearchPhaseExecutionException[boom]" }),
        ));
        assert!(!plain.succeeded());
        assert_eq!(plain.error_message(), "SearchPhaseExecutionException[boom]");

        let nested = RawResult::from_response(TransportResponse::new(
            404,
            json!({ "error": { "type": "index_not_found_exception", "reason": "no such index" } }),
        ));
        assert_eq!(nested.error_message(), "no such index");
        assert_eq!(nested.status(), Some(404));
    }

    #[test]
    fn test_null_body_is_empty_object() {
        let result = RawResult::from_response(TransportResponse::new(200, Value::Null));
        assert!(result.succeeded());
        assert_eq!(result.json_string(), "{}");
    }

    #[test]
    fn test_hydrate_injects_hit_id() {
        let line = json!({ "_id": "42", "_source": { "id": "stale", "title": "Hello" } });
        let hit = Hit::from_json(line.as_object().unwrap());
        let article = hit.hydrate::<Article>().unwrap();
        assert_eq!(article.title, "Hello");
        assert_eq!(article.id.as_deref(), Some("42"));
    }

    #[test]
    fn test_hydrate_round_trips_serialized_document() {
        let original = Article {
            id: Some("own".to_string()),
            title: "x".to_string(),
        };
        let line = json!({ "_id": "persisted", "_source": original.to_index().unwrap() });
        let hit = Hit::from_json(line.as_object().unwrap());

        let hydrated = hit.hydrate::<Article>().unwrap();
        assert_eq!(
            *hydrated,
            Article {
                id: Some("persisted".to_string()),
                ..original
            }
        );
    }

    #[test]
    fn test_hydrate_is_memoized() {
        let line = json!({ "_id": "1", "_source": { "title": "Hello" } });
        let hit = Hit::from_json(line.as_object().unwrap());
        let first = hit.hydrate::<Article>().unwrap();
        let second = hit.hydrate::<Article>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_hydrate_failure_propagates() {
        let line = json!({ "_id": "9", "_source": { "title": 12 } });
        let hit = Hit::from_json(line.as_object().unwrap());
        match hit.hydrate::<Article>() {
            Err(SearchError::Hydration { id, .. }) => assert_eq!(id, "9"),
            other => panic!("expected hydration error, got {:?}", other),
        }
    }

    #[test]
    fn test_into_document_reuses_memo() {
        let line = json!({ "_id": "5", "_source": { "title": "Owned" } });
        let hit = Hit::from_json(line.as_object().unwrap());
        let shared = hit.hydrate::<Article>().unwrap();
        let owned: Article = hit.into_document().unwrap();
        assert_eq!(&owned, shared.as_ref());
    }

    #[test]
    fn test_as_hit_from_get_response() {
        let result = response(json!({
            "_index": "blog", "_type": "article", "_id": "3", "_version": 1, "found": true,
            "_source": { "title": "Fetched" }
        }));
        assert!(result.found());
        assert_eq!(result.id().as_deref(), Some("3"));
        let article: Article = result.as_hit().unwrap().into_document().unwrap();
        assert_eq!(article.title, "Fetched");
        assert_eq!(article.id.as_deref(), Some("3"));
    }
}
