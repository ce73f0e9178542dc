//! Sort clauses.

use crate::error::{Result, SearchError};
use serde_json::{json, Value};

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Wire name of the order.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One sort clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SortSpec {
    /// Sort on a document field.
    Field {
        /// Field name.
        field: String,
        /// Sort order.
        order: SortOrder,
        /// Placement of documents without a value (`_first`, `_last`).
        missing: Option<String>,
    },
    /// Sort on relevance.
    Score(SortOrder),
    /// Raw sort clause, passed through untouched.
    Raw(Value),
}

impl SortSpec {
    /// Sort on a field. The field name must not be blank.
    pub fn field(field: impl Into<String>, order: SortOrder) -> Result<Self> {
        let field = field.into();
        if field.trim().is_empty() {
            return Err(SearchError::validation("sort field cannot be empty"));
        }
        Ok(SortSpec::Field {
            field,
            order,
            missing: None,
        })
    }

    /// Sort on relevance.
    pub fn score(order: SortOrder) -> Self {
        SortSpec::Score(order)
    }

    /// Set where documents missing the field go. Ignored for non-field sorts.
    pub fn missing(mut self, placement: impl Into<String>) -> Self {
        if let SortSpec::Field { missing, .. } = &mut self {
            *missing = Some(placement.into());
        }
        self
    }

    /// Convert to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            SortSpec::Field {
                field,
                order,
                missing,
            } => {
                let mut clause = json!({ "order": order.as_str() });
                if let Some(m) = missing {
                    clause["missing"] = json!(m);
                }
                json!({ field: clause })
            }
            SortSpec::Score(order) => json!({ "_score": { "order": order.as_str() } }),
            SortSpec::Raw(v) => v.clone(),
        }
    }
}
