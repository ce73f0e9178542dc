//! Transport-ready requests.
//!
//! A [`SearchRequest`] is produced once from an [`crate::IndexQuery`] and never changes
//! afterwards. [`Request`] adds the document-level calls and renders each variant into
//! method, path, query parameters and body.

use crate::document::{RoutingPath, SourceMap};
use crate::error::Result;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::Value;
use std::fmt;

/// Characters left untouched in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'*');

/// How the cluster spreads a search over its shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    /// Score with shard-local term frequencies.
    #[default]
    QueryThenFetch,
    /// Gather global term frequencies first for more accurate scoring.
    DfsQueryThenFetch,
}

impl SearchType {
    /// Query parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::QueryThenFetch => "query_then_fetch",
            SearchType::DfsQueryThenFetch => "dfs_query_then_fetch",
        }
    }
}

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Query section of a search body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum QueryBody {
    Tree(Value),
    Raw(Box<RawValue>),
}

/// Named facets, serialized as one object in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct FacetBlock(pub(crate) Vec<(String, Value)>);

impl FacetBlock {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FacetBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, body) in &self.0 {
            map.serialize_entry(name, body)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchBody {
    pub(crate) query: QueryBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) post_filter: Option<Value>,
    #[serde(skip_serializing_if = "FacetBlock::is_empty")]
    pub(crate) facets: FacetBlock,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) sort: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) from: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) size: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) explain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fields: Option<Vec<String>>,
}

/// A fully assembled search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    indices: Vec<String>,
    types: Vec<String>,
    search_type: SearchType,
    body: SearchBody,
}

impl SearchRequest {
    pub(crate) fn new(path: Option<&RoutingPath>, search_type: SearchType, body: SearchBody) -> Self {
        let (indices, types) = match path {
            Some(path) => (
                vec![path.index().to_string()],
                vec![path.doc_type().to_string()],
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            indices,
            types,
            search_type,
            body,
        }
    }

    /// Target indices, empty for a cluster-wide search.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Target mapping types.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Search type.
    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// Requested offset.
    pub fn from(&self) -> Option<u32> {
        self.body.from
    }

    /// Requested page size.
    pub fn size(&self) -> Option<u32> {
        self.body.size
    }

    /// Whether per-hit score explanations were requested.
    pub fn explain(&self) -> bool {
        self.body.explain
    }

    /// Query section alone, as sent.
    pub fn query_json(&self) -> String {
        serde_json::to_string(&self.body.query).unwrap_or_default()
    }

    /// Request body as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }

    /// Request body as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.body)?)
    }
}

/// A call the transport can send.
#[derive(Debug, Clone)]
pub enum Request {
    /// Search.
    Search(SearchRequest),
    /// Fetch one document by id.
    Get {
        /// Document location.
        path: RoutingPath,
        /// Document id.
        id: String,
    },
    /// Store a document, with a server-assigned id when `id` is `None`.
    Index {
        /// Document location.
        path: RoutingPath,
        /// Document id.
        id: Option<String>,
        /// Stored source.
        source: SourceMap,
    },
    /// Remove one document.
    Delete {
        /// Document location.
        path: RoutingPath,
        /// Document id.
        id: String,
    },
}

impl Request {
    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        match self {
            Request::Search(_) => HttpMethod::Post,
            Request::Get { .. } => HttpMethod::Get,
            Request::Index { id: Some(_), .. } => HttpMethod::Put,
            Request::Index { id: None, .. } => HttpMethod::Post,
            Request::Delete { .. } => HttpMethod::Delete,
        }
    }

    /// URL path, with every segment percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Request::Search(search) => {
                let mut path = String::new();
                if !search.indices.is_empty() {
                    path.push('/');
                    path.push_str(&join_segments(&search.indices));
                    if !search.types.is_empty() {
                        path.push('/');
                        path.push_str(&join_segments(&search.types));
                    }
                }
                path.push_str("/_search");
                path
            }
            Request::Get { path, id } | Request::Delete { path, id } => {
                document_path(path, Some(id))
            }
            Request::Index { path, id, .. } => document_path(path, id.as_deref()),
        }
    }

    /// Query string parameters.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Request::Search(search) => {
                vec![("search_type", search.search_type.as_str().to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// JSON body, if the call carries one.
    pub fn body(&self) -> Result<Option<String>> {
        match self {
            Request::Search(search) => search.to_json().map(Some),
            Request::Index { source, .. } => Ok(Some(serde_json::to_string(source)?)),
            Request::Get { .. } | Request::Delete { .. } => Ok(None),
        }
    }
}

impl From<SearchRequest> for Request {
    fn from(search: SearchRequest) -> Self {
        Request::Search(search)
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn join_segments(names: &[String]) -> String {
    names
        .iter()
        .map(|name| encode(name))
        .collect::<Vec<_>>()
        .join(",")
}

fn document_path(path: &RoutingPath, id: Option<&str>) -> String {
    let mut rendered = format!("/{}/{}", encode(path.index()), encode(path.doc_type()));
    if let Some(id) = id {
        rendered.push('/');
        rendered.push_str(&encode(id));
    }
    rendered
}
