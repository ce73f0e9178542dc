//! Structured query tree.
//!
//! The same tree is used for the scoring query and for post-filters.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A node of the query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Match all documents.
    MatchAll,
    /// Full-text match on one field.
    Match(MatchQuery),
    /// Exact value on one field.
    Term {
        /// Field name.
        field: String,
        /// Value to match.
        value: Value,
    },
    /// Any of several exact values on one field.
    Terms {
        /// Field name.
        field: String,
        /// Values to match.
        values: Vec<Value>,
    },
    /// Numeric or date range.
    Range(RangeQuery),
    /// Boolean combination.
    Bool(BoolQuery),
    /// Lucene query string.
    QueryString {
        /// Query string.
        query: String,
        /// Default field.
        default_field: Option<String>,
    },
    /// Prefix on one field.
    Prefix {
        /// Field name.
        field: String,
        /// Prefix value.
        value: String,
    },
    /// Documents having a value for a field.
    Exists {
        /// Field name.
        field: String,
    },
    /// Documents with the given ids.
    Ids(Vec<String>),
    /// Raw JSON, passed through untouched.
    Raw(Value),
}

impl Default for Query {
    fn default() -> Self {
        Query::MatchAll
    }
}

impl Query {
    /// Match all documents.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Full-text match query.
    pub fn matching(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Match(MatchQuery::new(field, text))
    }

    /// Exact term query.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Multi-value term query.
    pub fn terms<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Lucene query string.
    pub fn query_string(query: impl Into<String>) -> Self {
        Query::QueryString {
            query: query.into(),
            default_field: None,
        }
    }

    /// Prefix query.
    pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Prefix {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Exists query.
    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    /// Ids query.
    pub fn ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Query::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Convert query to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Match(m) => m.to_json(),
            Query::Term { field, value } => json!({ "term": { field: value } }),
            Query::Terms { field, values } => json!({ "terms": { field: values } }),
            Query::Range(r) => r.to_json(),
            Query::Bool(b) => b.to_json(),
            Query::QueryString {
                query,
                default_field,
            } => {
                let mut qs = json!({ "query": query });
                if let Some(df) = default_field {
                    qs["default_field"] = json!(df);
                }
                json!({ "query_string": qs })
            }
            Query::Prefix { field, value } => json!({ "prefix": { field: value } }),
            Query::Exists { field } => json!({ "exists": { "field": field } }),
            Query::Ids(ids) => json!({ "ids": { "values": ids } }),
            Query::Raw(v) => v.clone(),
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<BoolQuery> for Query {
    fn from(query: BoolQuery) -> Self {
        Query::Bool(query)
    }
}

impl From<RangeQuery> for Query {
    fn from(query: RangeQuery) -> Self {
        Query::Range(query)
    }
}

impl From<MatchQuery> for Query {
    fn from(query: MatchQuery) -> Self {
        Query::Match(query)
    }
}

/// Match query for full-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    field: String,
    text: String,
    operator: Option<String>,
    fuzziness: Option<String>,
}

impl MatchQuery {
    /// Create a new match query.
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            operator: None,
            fuzziness: None,
        }
    }

    /// Set the operator (`and` / `or`).
    pub fn operator(mut self, op: impl Into<String>) -> Self {
        self.operator = Some(op.into());
        self
    }

    /// Set fuzziness.
    pub fn fuzziness(mut self, fuzz: impl Into<String>) -> Self {
        self.fuzziness = Some(fuzz.into());
        self
    }

    fn to_json(&self) -> Value {
        if self.operator.is_none() && self.fuzziness.is_none() {
            return json!({ "match": { &self.field: self.text } });
        }

        let mut body = json!({ "query": self.text });
        if let Some(op) = &self.operator {
            body["operator"] = json!(op);
        }
        if let Some(fuzz) = &self.fuzziness {
            body["fuzziness"] = json!(fuzz);
        }
        json!({ "match": { &self.field: body } })
    }
}

/// Range query for numeric/date ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    field: String,
    bounds: Map<String, Value>,
}

impl RangeQuery {
    /// Create an unbounded range on a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            bounds: Map::new(),
        }
    }

    fn bound(mut self, key: &str, value: Value) -> Self {
        self.bounds.insert(key.to_string(), value);
        self
    }

    /// Greater than.
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.bound("gt", value.into())
    }

    /// Greater than or equal.
    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.bound("gte", value.into())
    }

    /// Less than.
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.bound("lt", value.into())
    }

    /// Less than or equal.
    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.bound("lte", value.into())
    }

    /// Date format for date fields.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.bound("format", Value::String(format.into()))
    }

    fn to_json(&self) -> Value {
        json!({ "range": { &self.field: self.bounds } })
    }
}

/// Bool query for combining queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    must: Vec<Query>,
    should: Vec<Query>,
    must_not: Vec<Query>,
    filter: Vec<Query>,
    minimum_should_match: Option<u32>,
}

impl BoolQuery {
    /// Create an empty bool query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a must clause.
    pub fn must(mut self, query: impl Into<Query>) -> Self {
        self.must.push(query.into());
        self
    }

    /// Add a should clause.
    pub fn should(mut self, query: impl Into<Query>) -> Self {
        self.should.push(query.into());
        self
    }

    /// Add a must_not clause.
    pub fn must_not(mut self, query: impl Into<Query>) -> Self {
        self.must_not.push(query.into());
        self
    }

    /// Add a non-scoring filter clause.
    pub fn filter(mut self, query: impl Into<Query>) -> Self {
        self.filter.push(query.into());
        self
    }

    /// Set minimum should match.
    pub fn minimum_should_match(mut self, min: u32) -> Self {
        self.minimum_should_match = Some(min);
        self
    }

    /// Whether no clause was added.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
            ("filter", &self.filter),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(Query::to_json).collect()),
                );
            }
        }
        if let Some(min) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(min));
        }
        json!({ "bool": body })
    }
}
