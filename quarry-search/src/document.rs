//! Document contract and routing.

use crate::error::{Result, SearchError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key/value form of a document source, as stored in the index.
pub type SourceMap = Map<String, Value>;

/// Trait for documents that can be indexed and searched.
///
/// Hydration never reaches into the document directly: the search engine hands the
/// stored source to [`Indexable::from_index`] and then injects the persisted id through
/// [`Indexable::set_id`].
///
/// # Example
///
/// ```rust
/// use quarry_search::{from_source, to_source, Indexable, Result, SourceMap};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Product {
///     #[serde(skip)]
///     id: Option<String>,
///     name: String,
///     price: f64,
/// }
///
/// impl Indexable for Product {
///     const DOC_TYPE: &'static str = "product";
///
///     fn from_index(source: &SourceMap) -> Result<Self> {
///         from_source(source)
///     }
///
///     fn to_index(&self) -> Result<SourceMap> {
///         to_source(self)
///     }
///
///     fn id(&self) -> Option<&str> {
///         self.id.as_deref()
///     }
///
///     fn set_id(&mut self, id: &str) {
///         self.id = Some(id.to_string());
///     }
/// }
/// ```
pub trait Indexable: Sized + Send + Sync + 'static {
    /// Logical type name, used when no explicit routing is configured.
    const DOC_TYPE: &'static str;

    /// Build a document from its stored source.
    fn from_index(source: &SourceMap) -> Result<Self>;

    /// Serialize the document into its stored source.
    fn to_index(&self) -> Result<SourceMap>;

    /// Persisted identifier, if the document has one.
    fn id(&self) -> Option<&str>;

    /// Overwrite the persisted identifier.
    fn set_id(&mut self, id: &str);
}

/// Deserialize a source map with serde.
pub fn from_source<T: DeserializeOwned>(source: &SourceMap) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(source.clone()))?)
}

/// Serialize a value into a source map with serde.
///
/// Fails when the value does not serialize to a JSON object.
pub fn to_source<T: Serialize>(value: &T) -> Result<SourceMap> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SearchError::validation(format!(
            "document must serialize to an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Where a document type physically lives: an index and a mapping type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingPath {
    index: String,
    doc_type: String,
}

impl RoutingPath {
    /// Create a routing path.
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
        }
    }

    /// Index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Mapping type name.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Same type, different index.
    pub fn with_index(&self, index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: self.doc_type.clone(),
        }
    }
}

impl fmt::Display for RoutingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.doc_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tag {
        label: String,
    }

    #[test]
    fn test_source_helpers() {
        let tag = Tag {
            label: "rust".to_string(),
        };
        let source = to_source(&tag).unwrap();
        assert_eq!(source.get("label"), Some(&json!("rust")));

        let back: Tag = from_source(&source).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn test_to_source_rejects_scalars() {
        let err = to_source(&42).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_routing_path() {
        let path = RoutingPath::new("catalog", "product");
        assert_eq!(path.index(), "catalog");
        assert_eq!(path.doc_type(), "product");
        assert_eq!(path.to_string(), "catalog/product");

        let moved = path.with_index("archive");
        assert_eq!(moved, RoutingPath::new("archive", "product"));
    }
}
