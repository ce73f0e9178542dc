//! Typed query construction and result materialization for Elasticsearch-style clusters.
//!
//! This crate provides:
//! - A fluent query specification with structured or raw queries, post-filters,
//!   facets, sorting, paging, explain and field suppression
//! - Blocking and async execution over a pluggable [`Transport`]
//! - Null-tolerant raw responses, typed facets and page metadata
//! - Hydration of hits into caller-defined [`Indexable`] documents
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry_search::prelude::*;
//! use quarry_search::{from_source, to_source, SourceMap};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Article {
//!     #[serde(skip)]
//!     id: Option<String>,
//!     title: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Indexable for Article {
//!     const DOC_TYPE: &'static str = "article";
//!
//!     fn from_index(source: &SourceMap) -> Result<Self> {
//!         from_source(source)
//!     }
//!
//!     fn to_index(&self) -> Result<SourceMap> {
//!         to_source(self)
//!     }
//!
//!     fn id(&self) -> Option<&str> {
//!         self.id.as_deref()
//!     }
//!
//!     fn set_id(&mut self, id: &str) {
//!         self.id = Some(id.to_string());
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let client = SearchClient::connect(SearchConfig::from_env())?;
//!     let articles = client.finder::<Article>();
//!
//!     let query = articles
//!         .query()
//!         .set_query(Query::matching("title", "rust"))
//!         .add_facet(FacetRequest::terms("tags", "tags").size(10))?
//!         .add_sort("title", SortOrder::Asc)?
//!         .size(10);
//!
//!     let results = articles.search(&query, None)?;
//!     println!(
//!         "page {}/{} of {} articles",
//!         results.page().page_current,
//!         results.page().page_nb,
//!         results.total_count()
//!     );
//!
//!     if let Some(tags) = results.facet("tags").and_then(|f| f.as_terms()) {
//!         for entry in &tags.terms {
//!             println!("{}: {}", entry.term_text(), entry.count);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod config;
mod document;
mod error;
mod facet;
mod finder;
mod opensearch;
mod pagination;
mod query;
mod request;
mod response;
mod search;
mod sort;
mod transport;

pub use client::SearchClient;
pub use config::{SearchConfig, DEFAULT_INDEX, DEFAULT_URL};
pub use document::{from_source, to_source, Indexable, RoutingPath, SourceMap};
pub use error::{Result, SearchError};
pub use facet::{
    decode_facets, is_supported, CountFacet, DateHistogramEntry, DateHistogramFacet, FacetKind,
    FacetRequest, FacetResult, FacetSpec, GeoDistanceFacet, HistogramEntry, HistogramFacet,
    RangeBucket, RangeEntry, RangeFacet, StatisticalFacet, TermEntry, TermStatsEntry, TermsFacet,
    TermsStatsFacet,
};
pub use finder::Finder;
pub use pagination::{page_count, PageInfo, DEFAULT_PAGE_SIZE};
pub use query::{BoolQuery, MatchQuery, Query, RangeQuery};
pub use request::{HttpMethod, Request, SearchRequest, SearchType};
pub use response::{Hit, RawResult};
pub use search::{IndexQuery, ResultSet};
pub use self::opensearch::OpenSearchTransport;
pub use sort::{SortOrder, SortSpec};
pub use transport::{Transport, TransportResponse};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        FacetRequest, Finder, IndexQuery, Indexable, Query, Result, ResultSet, SearchClient,
        SearchConfig, SearchError, SortOrder,
    };
}
