//! Integration tests for the search workflows, against an in-memory transport.

use async_trait::async_trait;
use parking_lot::Mutex;
use quarry_search::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    #[serde(skip)]
    id: Option<String>,
    name: String,
}

impl Product {
    fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

impl Indexable for Product {
    const DOC_TYPE: &'static str = "product";

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

/// Answers every request with the same response and records what it was sent.
struct CannedTransport {
    response: Option<TransportResponse>,
    seen: Mutex<Vec<Request>>,
}

impl CannedTransport {
    fn replying(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            response: Some(TransportResponse::new(status, body)),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            response: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> Request {
        self.seen
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn count(&self) -> usize {
        self.seen.lock().len()
    }

    fn answer(&self, request: &Request) -> Result<TransportResponse> {
        self.seen.lock().push(request.clone());
        self.response
            .clone()
            .ok_or_else(|| SearchError::Transport("connection refused".to_string()))
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn send(&self, request: &Request) -> Result<TransportResponse> {
        tokio::task::yield_now().await;
        self.answer(request)
    }

    fn send_blocking(&self, request: &Request) -> Result<TransportResponse> {
        self.answer(request)
    }
}

fn client_for(transport: &Arc<CannedTransport>) -> SearchClient {
    SearchClient::with_shared_transport(transport.clone(), SearchConfig::default())
}

fn two_hits() -> Value {
    json!({
        "took": 3,
        "hits": {
            "total": 2,
            "hits": [
                { "_index": "i", "_type": "t", "_id": "1", "_score": 2.0, "_source": { "name": "a" } },
                { "_index": "i", "_type": "t", "_id": "2", "_score": 1.0, "_source": { "name": "b" } }
            ]
        }
    })
}

fn path() -> RoutingPath {
    RoutingPath::new("i", "t")
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_fetch_end_to_end() {
    let transport = CannedTransport::replying(200, two_hits());
    let client = client_for(&transport);

    let results = IndexQuery::<Product>::new()
        .size(10)
        .from(0)
        .fetch(&client, &path())
        .unwrap();

    assert_eq!(results.page().page_current, 1);
    assert_eq!(results.page().page_nb, 1);
    assert_eq!(results.total_count(), 2);

    let documents = results.into_documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].id.as_deref(), Some("1"));
    assert_eq!(documents[0].name, "a");
    assert_eq!(documents[1].id.as_deref(), Some("2"));
    assert_eq!(documents[1].name, "b");
}

#[tokio::test]
async fn test_sync_and_async_agree() {
    let transport = CannedTransport::replying(200, two_hits());
    let client = client_for(&transport);
    let query = IndexQuery::<Product>::new().from(0).size(10);

    let blocking = tokio::task::spawn_blocking({
        let client = client.clone();
        let query = query.clone();
        move || query.fetch(&client, &path())
    })
    .await
    .unwrap()
    .unwrap();

    let pending = query.fetch_async(&client, &path());
    drop(query);
    let spawned = tokio::spawn(pending).await.unwrap().unwrap();

    assert_eq!(blocking.page(), spawned.page());
    assert_eq!(blocking.documents(), spawned.documents());
    assert_eq!(blocking.facets(), spawned.facets());
    assert_eq!(transport.count(), 2);
}

#[test]
fn test_request_on_the_wire() {
    let transport = CannedTransport::replying(200, json!({ "hits": { "total": 0, "hits": [] } }));
    let client = client_for(&transport);

    IndexQuery::<Product>::new()
        .set_query(Query::from(
            BoolQuery::new()
                .must(Query::matching("name", "lamp"))
                .filter(Query::term("in_stock", true)),
        ))
        .set_filter(Query::term("brand", "acme"))
        .add_facet(FacetRequest::terms("colors", "color").size(5))
        .unwrap()
        .add_sort("price", SortOrder::Desc)
        .unwrap()
        .size(20)
        .fetch(&client, &RoutingPath::new("shop", "product"))
        .unwrap();

    let request = transport.last();
    assert_eq!(request.method(), HttpMethod::Post);
    assert_eq!(request.path(), "/shop/product/_search");
    assert_eq!(
        request.query_params(),
        vec![("search_type", "query_then_fetch".to_string())]
    );

    let body: Value = serde_json::from_str(&request.body().unwrap().unwrap()).unwrap();
    assert_eq!(
        body,
        json!({
            "query": { "bool": {
                "must": [{ "match": { "name": "lamp" } }],
                "filter": [{ "term": { "in_stock": true } }]
            } },
            "post_filter": { "term": { "brand": "acme" } },
            "facets": { "colors": { "terms": { "field": "color", "size": 5 } } },
            "sort": [{ "price": { "order": "desc" } }],
            "size": 20
        })
    );
    assert!(body.get("from").is_none());
}

#[test]
fn test_explicit_filter_replaces_stored_one() {
    let transport = CannedTransport::replying(200, two_hits());
    let client = client_for(&transport);

    IndexQuery::<Product>::new()
        .set_filter(Query::term("brand", "stored"))
        .fetch_with_filter(&client, &path(), &Query::term("brand", "given"))
        .unwrap();

    let Request::Search(search) = transport.last() else {
        panic!("expected a search request");
    };
    assert_eq!(
        search.to_value().unwrap()["post_filter"],
        json!({ "term": { "brand": "given" } })
    );
}

#[test]
fn test_raw_query_is_sent_verbatim() {
    let transport = CannedTransport::replying(200, two_hits());
    let client = client_for(&transport);

    IndexQuery::<Product>::new()
        .set_query(Query::term("name", "ignored"))
        .set_raw_query(r#"{"query_string":{"query":"name:a*"}}"#)
        .unwrap()
        .fetch(&client, &path())
        .unwrap();

    let body = transport.last().body().unwrap().unwrap();
    assert_eq!(body, r#"{"query":{"query_string":{"query":"name:a*"}}}"#);
}

#[test]
fn test_transport_failure_gives_empty_results() {
    let transport = CannedTransport::unreachable();
    let client = client_for(&transport);

    let results = IndexQuery::<Product>::new()
        .add_facet(FacetRequest::terms("colors", "color"))
        .unwrap()
        .fetch(&client, &path())
        .unwrap();

    assert!(!results.succeeded());
    assert_eq!(results.total_count(), 0);
    assert!(results.is_empty());
    assert!(results.facets().is_empty());
    assert_eq!(results.page().page_nb, 1);
}

#[tokio::test]
async fn test_async_transport_failure_gives_empty_results() {
    let transport = CannedTransport::unreachable();
    let client = client_for(&transport);

    let results = IndexQuery::<Product>::new()
        .fetch_async(&client, &path())
        .await
        .unwrap();

    assert!(!results.succeeded());
    assert!(results.is_empty());
}

#[test]
fn test_hydration_failure_reaches_caller() {
    let transport = CannedTransport::replying(
        200,
        json!({ "hits": { "total": 1, "hits": [{ "_id": "7", "_source": { "name": ["not", "text"] } }] } }),
    );
    let client = client_for(&transport);

    let err = IndexQuery::<Product>::new()
        .fetch(&client, &path())
        .unwrap_err();

    match err {
        SearchError::Hydration { id, .. } => assert_eq!(id, "7"),
        other => panic!("expected hydration error, got {:?}", other),
    }
}

#[test]
fn test_facets_are_decoded_and_unknown_dropped() {
    let transport = CannedTransport::replying(
        200,
        json!({
            "hits": { "total": 0, "hits": [] },
            "facets": {
                "colors": {
                    "_type": "terms", "missing": 0, "total": 5, "other": 0,
                    "terms": [{ "term": "red", "count": 3 }, { "term": "blue", "count": 2 }]
                },
                "mystery": { "_type": "sparkle", "value": 1 }
            }
        }),
    );
    let client = client_for(&transport);

    let results = IndexQuery::<Product>::new()
        .fetch(&client, &path())
        .unwrap();

    assert_eq!(results.facets().len(), 1);
    let colors = results.facet("colors").and_then(FacetResult::as_terms).unwrap();
    assert_eq!(colors.terms[0].term_text(), "red");
    assert_eq!(colors.terms[0].count, 3);
    assert!(results.facet("mystery").is_none());
}

#[test]
fn test_pagination_from_offset() {
    let transport = CannedTransport::replying(200, json!({ "hits": { "total": 21, "hits": [] } }));
    let client = client_for(&transport);

    let results = IndexQuery::<Product>::new()
        .from(25)
        .size(10)
        .fetch(&client, &path())
        .unwrap();

    assert_eq!(results.page().page_current, 3);
    assert_eq!(results.page().page_nb, 3);
    assert_eq!(results.page().page_size, 10);
}

// =============================================================================
// Document Tests
// =============================================================================

#[test]
fn test_finder_by_id() {
    let transport = CannedTransport::replying(
        200,
        json!({ "_index": "quarry", "_type": "product", "_id": "p-1", "found": true, "_source": { "name": "lamp" } }),
    );
    let client = client_for(&transport);
    let finder = client.finder::<Product>();

    assert_eq!(finder.path(), &RoutingPath::new(DEFAULT_INDEX, "product"));

    let product = finder.by_id("p-1").unwrap().unwrap();
    assert_eq!(product.id.as_deref(), Some("p-1"));
    assert_eq!(product.name, "lamp");

    let request = transport.last();
    assert_eq!(request.method(), HttpMethod::Get);
    assert_eq!(request.path(), "/quarry/product/p-1");
}

#[tokio::test]
async fn test_finder_by_id_async_missing() {
    let transport = CannedTransport::replying(
        404,
        json!({ "_index": "quarry", "_type": "product", "_id": "nope", "found": false }),
    );
    let client = client_for(&transport);

    let product = client.finder::<Product>().by_id_async("nope").await.unwrap();
    assert!(product.is_none());
}

#[test]
fn test_finder_search_uses_mapping() {
    let transport = CannedTransport::replying(200, two_hits());
    let config = SearchConfig::default().with_mapping("product", RoutingPath::new("catalog", "item"));
    let client = SearchClient::with_shared_transport(transport.clone(), config);
    let finder = client.finder::<Product>();

    let all = finder.all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(transport.last().path(), "/catalog/item/_search");

    let query = finder.query().size(1);
    let filtered = finder
        .search(&query, Some(&Query::term("name", "a")))
        .unwrap();
    assert_eq!(filtered.page().page_size, 1);
    assert_eq!(filtered.page().page_nb, 2);
}

#[tokio::test]
async fn test_finder_search_async() {
    let transport = CannedTransport::replying(200, two_hits());
    let client = client_for(&transport);
    let finder = client.finder::<Product>();

    let results = finder.search_async(&finder.query(), None).await.unwrap();
    assert_eq!(results.total_count(), 2);
}

#[test]
fn test_index_with_and_without_id() {
    let transport = CannedTransport::replying(
        201,
        json!({ "_index": "quarry", "_type": "product", "_id": "generated", "created": true }),
    );
    let client = client_for(&transport);
    let target = RoutingPath::new("quarry", "product");

    let result = client.index(&target, &Product::named("desk")).unwrap();
    assert!(result.succeeded());
    assert_eq!(result.id().as_deref(), Some("generated"));

    let request = transport.last();
    assert_eq!(request.method(), HttpMethod::Post);
    assert_eq!(request.path(), "/quarry/product");
    assert_eq!(request.body().unwrap().as_deref(), Some(r#"{"name":"desk"}"#));

    let mut chair = Product::named("chair");
    chair.set_id("c-9");
    client.index(&target, &chair).unwrap();

    let request = transport.last();
    assert_eq!(request.method(), HttpMethod::Put);
    assert_eq!(request.path(), "/quarry/product/c-9");
}

#[tokio::test]
async fn test_delete_async() {
    let transport = CannedTransport::replying(200, json!({ "found": true, "_id": "c-9" }));
    let client = client_for(&transport);

    let result = client
        .delete_async(&RoutingPath::new("quarry", "product"), "c-9")
        .await
        .unwrap();

    assert!(result.succeeded());
    let request = transport.last();
    assert_eq!(request.method(), HttpMethod::Delete);
    assert_eq!(request.path(), "/quarry/product/c-9");
    assert!(request.body().unwrap().is_none());
}
