//! Typed entry point bound to one document type.

use crate::{
    client::SearchClient,
    document::{Indexable, RoutingPath},
    error::Result,
    query::Query,
    search::{IndexQuery, ResultSet},
};
use std::marker::PhantomData;

/// Lookups and searches for documents of type `T` at a fixed routing path.
pub struct Finder<T> {
    client: SearchClient,
    path: RoutingPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Finder<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Indexable> Finder<T> {
    /// Bind to the path configured for `T`.
    pub fn new(client: SearchClient) -> Self {
        let path = client.config().path_for::<T>();
        Self::with_path(client, path)
    }

    /// Bind to an explicit path.
    pub fn with_path(client: SearchClient, path: RoutingPath) -> Self {
        Self {
            client,
            path,
            _marker: PhantomData,
        }
    }

    /// Routing path in use.
    pub fn path(&self) -> &RoutingPath {
        &self.path
    }

    /// Start a new query for `T`.
    pub fn query(&self) -> IndexQuery<T> {
        IndexQuery::new()
    }

    /// Fetch one document by id.
    pub fn by_id(&self, id: &str) -> Result<Option<T>> {
        self.client.get(&self.path, id)
    }

    /// Fetch one document by id asynchronously.
    pub async fn by_id_async(&self, id: &str) -> Result<Option<T>> {
        self.client.get_async(&self.path, id).await
    }

    /// First page of all documents, with the cluster's default page size.
    pub fn all(&self) -> Result<ResultSet<T>> {
        self.search(&self.query(), None)
    }

    /// Run a query, optionally replacing its post-filter.
    pub fn search(&self, query: &IndexQuery<T>, filter: Option<&Query>) -> Result<ResultSet<T>> {
        query.fetch_filtered(&self.client, &self.path, filter)
    }

    /// Run a query asynchronously, optionally replacing its post-filter.
    pub async fn search_async(
        &self,
        query: &IndexQuery<T>,
        filter: Option<&Query>,
    ) -> Result<ResultSet<T>> {
        query
            .fetch_async_filtered(&self.client, &self.path, filter)
            .await
    }
}
