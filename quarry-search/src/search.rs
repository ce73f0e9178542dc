//! Typed query specification and result sets.

use crate::{
    client::SearchClient,
    config::SearchConfig,
    document::{Indexable, RoutingPath},
    error::{Result, SearchError},
    facet::{FacetRequest, FacetResult},
    pagination::PageInfo,
    query::Query,
    request::{FacetBlock, QueryBody, Request, SearchBody, SearchRequest, SearchType},
    response::{Hit, RawResult},
    sort::{SortOrder, SortSpec},
};
use serde_json::value::RawValue;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use tracing::debug;

/// Search specification for documents of type `T`.
///
/// Configure it with the chained setters, then run it with [`IndexQuery::fetch`] or
/// [`IndexQuery::fetch_async`]. Setters that can reject their argument return a
/// [`Result`].
///
/// # Example
///
/// ```rust,no_run
/// # use quarry_search::prelude::*;
/// # use quarry_search::{from_source, to_source, RoutingPath, SourceMap};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize, Deserialize)]
/// # struct Article {
/// #     #[serde(skip)]
/// #     id: Option<String>,
/// #     title: String,
/// # }
/// # impl Indexable for Article {
/// #     const DOC_TYPE: &'static str = "article";
/// #     fn from_index(source: &SourceMap) -> Result<Self> { from_source(source) }
/// #     fn to_index(&self) -> Result<SourceMap> { to_source(self) }
/// #     fn id(&self) -> Option<&str> { self.id.as_deref() }
/// #     fn set_id(&mut self, id: &str) { self.id = Some(id.to_string()); }
/// # }
/// # fn main() -> Result<()> {
/// # let client = SearchClient::connect(SearchConfig::new("http://localhost:9200"))?;
/// # let path = RoutingPath::new("blog", "article");
/// let results = IndexQuery::<Article>::new()
///     .set_query(Query::matching("title", "rust"))
///     .add_sort("published_at", SortOrder::Desc)?
///     .add_facet(FacetRequest::terms("tags", "tags").size(10))?
///     .from(20)
///     .size(10)
///     .fetch(&client, &path)?;
/// # let _ = results;
/// # Ok(())
/// # }
/// ```
pub struct IndexQuery<T> {
    query: Query,
    raw_query: Option<Box<RawValue>>,
    filter: Option<Query>,
    facets: Vec<FacetRequest>,
    sorts: Vec<SortSpec>,
    from: Option<u32>,
    size: Option<u32>,
    explain: bool,
    suppress_fields: bool,
    search_type: SearchType,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for IndexQuery<T> {
    fn default() -> Self {
        Self {
            query: Query::default(),
            raw_query: None,
            filter: None,
            facets: Vec::new(),
            sorts: Vec::new(),
            from: None,
            size: None,
            explain: false,
            suppress_fields: false,
            search_type: SearchType::default(),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for IndexQuery<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            raw_query: self.raw_query.clone(),
            filter: self.filter.clone(),
            facets: self.facets.clone(),
            sorts: self.sorts.clone(),
            from: self.from,
            size: self.size,
            explain: self.explain,
            suppress_fields: self.suppress_fields,
            search_type: self.search_type,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for IndexQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexQuery")
            .field("query", &self.query)
            .field("raw_query", &self.raw_query)
            .field("filter", &self.filter)
            .field("facets", &self.facets)
            .field("sorts", &self.sorts)
            .field("from", &self.from)
            .field("size", &self.size)
            .field("explain", &self.explain)
            .field("suppress_fields", &self.suppress_fields)
            .field("search_type", &self.search_type)
            .finish()
    }
}

impl<T> IndexQuery<T> {
    /// Create a match-all query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structured query.
    pub fn set_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Set a raw JSON query that replaces the structured one.
    ///
    /// Blank text clears a previous raw query. Anything else must be valid JSON.
    pub fn set_raw_query(mut self, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let text = text.trim();

        self.raw_query = if text.is_empty() {
            None
        } else {
            let raw = RawValue::from_string(text.to_string())
                .map_err(|e| SearchError::validation(format!("raw query is not valid JSON: {}", e)))?;
            Some(raw)
        };
        Ok(self)
    }

    /// Set the post-filter.
    pub fn set_filter(mut self, filter: Query) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Append a facet.
    pub fn add_facet(mut self, facet: FacetRequest) -> Result<Self> {
        facet.validate()?;
        self.facets.push(facet);
        Ok(self)
    }

    /// Append a field sort. The field name must not be blank.
    pub fn add_sort(self, field: impl Into<String>, order: SortOrder) -> Result<Self> {
        Ok(self.add_sort_spec(SortSpec::field(field, order)?))
    }

    /// Append a prepared sort clause.
    pub fn add_sort_spec(mut self, sort: SortSpec) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Set the offset of the first hit.
    pub fn from(mut self, from: u32) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the page size.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Request score explanations.
    pub fn set_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Return only hit metadata, without stored sources.
    pub fn set_suppress_fields(mut self, suppress: bool) -> Self {
        self.suppress_fields = suppress;
        self
    }

    /// Set the search type.
    pub fn set_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Current offset.
    pub fn get_from(&self) -> Option<u32> {
        self.from
    }

    /// Current page size.
    pub fn get_size(&self) -> Option<u32> {
        self.size
    }

    /// Assemble the wire request.
    ///
    /// Without a path the search targets the whole cluster. A `filter` passed here
    /// replaces the stored one.
    pub fn build_request(
        &self,
        path: Option<&RoutingPath>,
        filter: Option<&Query>,
        config: &SearchConfig,
    ) -> SearchRequest {
        let query = match &self.raw_query {
            Some(raw) => QueryBody::Raw(raw.clone()),
            None => QueryBody::Tree(self.query.to_json()),
        };

        let body = SearchBody {
            query,
            post_filter: filter.or(self.filter.as_ref()).map(Query::to_json),
            facets: FacetBlock(
                self.facets
                    .iter()
                    .map(|facet| (facet.name().to_string(), facet.to_json()))
                    .collect(),
            ),
            sort: self.sorts.iter().map(SortSpec::to_json).collect(),
            from: self.from,
            size: self.size,
            explain: self.explain,
            fields: self.suppress_fields.then(Vec::new),
        };

        let request = SearchRequest::new(path, self.search_type, body);

        if config.show_request {
            debug!(
                target_path = %path.map(ToString::to_string).unwrap_or_default(),
                query = %request.query_json(),
                "Search request built"
            );
        }

        request
    }
}

impl<T: Indexable> IndexQuery<T> {
    /// Run the search, blocking until the results are materialized.
    pub fn fetch(&self, client: &SearchClient, path: &RoutingPath) -> Result<ResultSet<T>> {
        self.fetch_filtered(client, path, None)
    }

    /// Run the search with a post-filter that replaces the stored one.
    pub fn fetch_with_filter(
        &self,
        client: &SearchClient,
        path: &RoutingPath,
        filter: &Query,
    ) -> Result<ResultSet<T>> {
        self.fetch_filtered(client, path, Some(filter))
    }

    /// Run the search asynchronously.
    ///
    /// The request is built before this returns, so the query can be changed or
    /// dropped while the future is pending.
    pub fn fetch_async(
        &self,
        client: &SearchClient,
        path: &RoutingPath,
    ) -> impl Future<Output = Result<ResultSet<T>>> + Send + use<T> {
        self.fetch_async_filtered(client, path, None)
    }

    /// Run the search asynchronously with a post-filter that replaces the stored one.
    pub fn fetch_async_with_filter(
        &self,
        client: &SearchClient,
        path: &RoutingPath,
        filter: &Query,
    ) -> impl Future<Output = Result<ResultSet<T>>> + Send + use<T> {
        self.fetch_async_filtered(client, path, Some(filter))
    }

    pub(crate) fn fetch_filtered(
        &self,
        client: &SearchClient,
        path: &RoutingPath,
        filter: Option<&Query>,
    ) -> Result<ResultSet<T>> {
        let request = Request::from(self.build_request(Some(path), filter, client.config()));
        ResultSet::from_raw(client.execute(&request), self.from, self.size)
    }

    pub(crate) fn fetch_async_filtered(
        &self,
        client: &SearchClient,
        path: &RoutingPath,
        filter: Option<&Query>,
    ) -> impl Future<Output = Result<ResultSet<T>>> + Send + use<T> {
        let request = Request::from(self.build_request(Some(path), filter, client.config()));
        let client = client.clone();
        let (from, size) = (self.from, self.size);

        async move {
            let raw = client.execute_async(&request).await;
            ResultSet::from_raw(raw, from, size)
        }
    }
}

/// Materialized outcome of a search.
#[derive(Debug, Clone)]
pub struct ResultSet<T> {
    page: PageInfo,
    documents: Vec<T>,
    facets: Vec<FacetResult>,
    succeeded: bool,
}

impl<T: Indexable> ResultSet<T> {
    /// Decode a raw search response.
    ///
    /// `from` and `size` are the values the search was sent with. Hydration failures
    /// are returned as errors; everything else degrades to empty values.
    pub fn from_raw(raw: RawResult, from: Option<u32>, size: Option<u32>) -> Result<Self> {
        let page = PageInfo::compute(from, size, raw.total_hits());
        let hits = raw.hits();
        let ids: Vec<String> = hits.iter().map(|hit| hit.id().to_string()).collect();

        let documents = hits
            .into_iter()
            .map(Hit::into_document::<T>)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            total = page.total_count,
            returned = documents.len(),
            ids = ?ids,
            "Search results materialized"
        );

        Ok(Self {
            page,
            documents,
            facets: raw.facets(),
            succeeded: raw.succeeded(),
        })
    }
}

impl<T> ResultSet<T> {
    /// Paging metadata.
    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    /// Total matching documents.
    pub fn total_count(&self) -> i64 {
        self.page.total_count
    }

    /// Documents of this page, in hit order.
    pub fn documents(&self) -> &[T] {
        &self.documents
    }

    /// Take the documents.
    pub fn into_documents(self) -> Vec<T> {
        self.documents
    }

    /// Decoded facets, in response order.
    pub fn facets(&self) -> &[FacetResult] {
        &self.facets
    }

    /// Facet by name.
    pub fn facet(&self, name: &str) -> Option<&FacetResult> {
        self.facets.iter().find(|facet| facet.name() == name)
    }

    /// Whether the cluster answered successfully. An empty set with `false` here means
    /// the call failed rather than matched nothing.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Number of documents on this page.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether this page holds no document.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<T> IntoIterator for ResultSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}
