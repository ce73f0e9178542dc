//! Facets: request definitions and decoding of facet results.
//!
//! Decoding goes through a closed registry keyed by the lower-cased `_type`
//! discriminator of each facet block. Entries that cannot be decoded are logged and
//! dropped; they never fail the surrounding search.

use crate::error::{Result, SearchError};
use crate::query::Query;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::error;

// ============================================================================
// Requests
// ============================================================================

/// A named facet to compute alongside the search.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetRequest {
    name: String,
    spec: FacetSpec,
    facet_filter: Option<Query>,
    global: bool,
}

/// Facet kinds that can be requested.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetSpec {
    /// Most frequent terms of a field.
    Terms {
        /// Field to count terms on.
        field: String,
        /// Maximum number of terms.
        size: Option<u32>,
    },
    /// Count, min, max, mean... of a numeric field.
    Statistical {
        /// Numeric field.
        field: String,
    },
    /// Statistics of one field grouped by the terms of another.
    TermsStats {
        /// Field providing the terms.
        key_field: String,
        /// Numeric field providing the values.
        value_field: String,
        /// Maximum number of terms.
        size: Option<u32>,
    },
    /// Fixed-interval buckets over a numeric field.
    Histogram {
        /// Numeric field.
        field: String,
        /// Bucket width.
        interval: f64,
    },
    /// Calendar buckets over a date field.
    DateHistogram {
        /// Date field.
        field: String,
        /// Interval (`day`, `week`, `1h`...).
        interval: String,
    },
    /// Counts per explicit range.
    Range {
        /// Numeric field.
        field: String,
        /// Ranges to count.
        ranges: Vec<RangeBucket>,
    },
    /// Count of documents matching a query.
    Query(Query),
    /// Count of documents matching a filter.
    Filter(Query),
    /// Counts per distance range from an origin.
    GeoDistance {
        /// Geo point field.
        field: String,
        /// Origin latitude.
        lat: f64,
        /// Origin longitude.
        lon: f64,
        /// Distance ranges.
        ranges: Vec<RangeBucket>,
        /// Distance unit (`km`, `mi`...).
        unit: Option<String>,
    },
}

impl FacetSpec {
    /// Wire name of the facet kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            FacetSpec::Terms { .. } => "terms",
            FacetSpec::Statistical { .. } => "statistical",
            FacetSpec::TermsStats { .. } => "terms_stats",
            FacetSpec::Histogram { .. } => "histogram",
            FacetSpec::DateHistogram { .. } => "date_histogram",
            FacetSpec::Range { .. } => "range",
            FacetSpec::Query(_) => "query",
            FacetSpec::Filter(_) => "filter",
            FacetSpec::GeoDistance { .. } => "geo_distance",
        }
    }

    fn fields(&self) -> Vec<&str> {
        match self {
            FacetSpec::Terms { field, .. }
            | FacetSpec::Statistical { field }
            | FacetSpec::Histogram { field, .. }
            | FacetSpec::DateHistogram { field, .. }
            | FacetSpec::Range { field, .. }
            | FacetSpec::GeoDistance { field, .. } => vec![field.as_str()],
            FacetSpec::TermsStats {
                key_field,
                value_field,
                ..
            } => vec![key_field.as_str(), value_field.as_str()],
            FacetSpec::Query(_) | FacetSpec::Filter(_) => Vec::new(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FacetSpec::Terms { field, size } => {
                let mut body = json!({ "field": field });
                if let Some(s) = size {
                    body["size"] = json!(s);
                }
                body
            }
            FacetSpec::Statistical { field } => json!({ "field": field }),
            FacetSpec::TermsStats {
                key_field,
                value_field,
                size,
            } => {
                let mut body = json!({ "key_field": key_field, "value_field": value_field });
                if let Some(s) = size {
                    body["size"] = json!(s);
                }
                body
            }
            FacetSpec::Histogram { field, interval } => {
                json!({ "field": field, "interval": interval })
            }
            FacetSpec::DateHistogram { field, interval } => {
                json!({ "field": field, "interval": interval })
            }
            FacetSpec::Range { field, ranges } => json!({
                "field": field,
                "ranges": ranges.iter().map(RangeBucket::to_json).collect::<Vec<_>>()
            }),
            FacetSpec::Query(q) | FacetSpec::Filter(q) => q.to_json(),
            FacetSpec::GeoDistance {
                field,
                lat,
                lon,
                ranges,
                unit,
            } => {
                let mut body = json!({
                    field: { "lat": lat, "lon": lon },
                    "ranges": ranges.iter().map(RangeBucket::to_json).collect::<Vec<_>>()
                });
                if let Some(u) = unit {
                    body["unit"] = json!(u);
                }
                body
            }
        }
    }
}

impl FacetRequest {
    fn with_spec(name: impl Into<String>, spec: FacetSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            facet_filter: None,
            global: false,
        }
    }

    /// Terms facet.
    pub fn terms(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::with_spec(
            name,
            FacetSpec::Terms {
                field: field.into(),
                size: None,
            },
        )
    }

    /// Statistical facet.
    pub fn statistical(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::with_spec(
            name,
            FacetSpec::Statistical {
                field: field.into(),
            },
        )
    }

    /// Terms-stats facet.
    pub fn terms_stats(
        name: impl Into<String>,
        key_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self::with_spec(
            name,
            FacetSpec::TermsStats {
                key_field: key_field.into(),
                value_field: value_field.into(),
                size: None,
            },
        )
    }

    /// Histogram facet.
    pub fn histogram(name: impl Into<String>, field: impl Into<String>, interval: f64) -> Self {
        Self::with_spec(
            name,
            FacetSpec::Histogram {
                field: field.into(),
                interval,
            },
        )
    }

    /// Date histogram facet.
    pub fn date_histogram(
        name: impl Into<String>,
        field: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self::with_spec(
            name,
            FacetSpec::DateHistogram {
                field: field.into(),
                interval: interval.into(),
            },
        )
    }

    /// Range facet.
    pub fn range(
        name: impl Into<String>,
        field: impl Into<String>,
        ranges: Vec<RangeBucket>,
    ) -> Self {
        Self::with_spec(
            name,
            FacetSpec::Range {
                field: field.into(),
                ranges,
            },
        )
    }

    /// Query facet.
    pub fn query(name: impl Into<String>, query: Query) -> Self {
        Self::with_spec(name, FacetSpec::Query(query))
    }

    /// Filter facet.
    pub fn filter(name: impl Into<String>, filter: Query) -> Self {
        Self::with_spec(name, FacetSpec::Filter(filter))
    }

    /// Geo distance facet.
    pub fn geo_distance(
        name: impl Into<String>,
        field: impl Into<String>,
        origin: (f64, f64),
        ranges: Vec<RangeBucket>,
    ) -> Self {
        Self::with_spec(
            name,
            FacetSpec::GeoDistance {
                field: field.into(),
                lat: origin.0,
                lon: origin.1,
                ranges,
                unit: None,
            },
        )
    }

    /// Limit the number of terms (terms and terms-stats facets only).
    pub fn size(mut self, n: u32) -> Self {
        match &mut self.spec {
            FacetSpec::Terms { size, .. } | FacetSpec::TermsStats { size, .. } => *size = Some(n),
            _ => {}
        }
        self
    }

    /// Distance unit (geo distance facets only).
    pub fn unit(mut self, value: impl Into<String>) -> Self {
        if let FacetSpec::GeoDistance { unit, .. } = &mut self.spec {
            *unit = Some(value.into());
        }
        self
    }

    /// Restrict the documents this facet is computed on.
    pub fn facet_filter(mut self, filter: Query) -> Self {
        self.facet_filter = Some(filter);
        self
    }

    /// Compute over all documents, ignoring the main query.
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Facet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested facet kind.
    pub fn spec(&self) -> &FacetSpec {
        &self.spec
    }

    /// Reject facets that cannot produce a meaningful request.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SearchError::validation("facet name cannot be empty"));
        }
        if self.spec.fields().iter().any(|f| f.trim().is_empty()) {
            return Err(SearchError::validation(format!(
                "facet '{}' has an empty field",
                self.name
            )));
        }
        Ok(())
    }

    /// Request body of the facet, without its name.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.spec.type_name().to_string(), self.spec.to_json());
        if let Some(filter) = &self.facet_filter {
            body.insert("facet_filter".to_string(), filter.to_json());
        }
        if self.global {
            body.insert("global".to_string(), Value::Bool(true));
        }
        Value::Object(body)
    }
}

/// Range bucket definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBucket {
    /// From value (inclusive).
    pub from: Option<f64>,
    /// To value (exclusive).
    pub to: Option<f64>,
}

impl RangeBucket {
    /// Create an unbounded range bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket between two values.
    pub fn between(from: f64, to: f64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Set the lower bound.
    pub fn from(mut self, value: f64) -> Self {
        self.from = Some(value);
        self
    }

    /// Set the upper bound.
    pub fn to(mut self, value: f64) -> Self {
        self.to = Some(value);
        self
    }

    fn to_json(&self) -> Value {
        let mut bucket = Map::new();
        if let Some(f) = self.from {
            bucket.insert("from".to_string(), json!(f));
        }
        if let Some(t) = self.to {
            bucket.insert("to".to_string(), json!(t));
        }
        Value::Object(bucket)
    }
}

// ============================================================================
// Results
// ============================================================================

/// One decoded facet of a search response.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetResult {
    name: String,
    kind: FacetKind,
    raw: Value,
}

impl FacetResult {
    /// Facet name, as given in the request.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed payload.
    pub fn kind(&self) -> &FacetKind {
        &self.kind
    }

    /// Raw JSON block the facet was decoded from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Discriminator of the facet.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Terms payload, if this is a terms facet.
    pub fn as_terms(&self) -> Option<&TermsFacet> {
        match &self.kind {
            FacetKind::Terms(t) => Some(t),
            _ => None,
        }
    }

    /// Statistical payload, if this is a statistical facet.
    pub fn as_statistical(&self) -> Option<&StatisticalFacet> {
        match &self.kind {
            FacetKind::Statistical(s) => Some(s),
            _ => None,
        }
    }

    /// Matching document count for query and filter facets.
    pub fn count(&self) -> Option<u64> {
        match &self.kind {
            FacetKind::Query(c) | FacetKind::Filter(c) => Some(c.count),
            _ => None,
        }
    }
}

/// Typed facet payloads, one per supported facet type.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    /// `query` facet.
    Query(CountFacet),
    /// `statistical` facet.
    Statistical(StatisticalFacet),
    /// `terms_stats` facet.
    TermsStats(TermsStatsFacet),
    /// `date_histogram` facet.
    DateHistogram(DateHistogramFacet),
    /// `geo_distance` facet.
    GeoDistance(GeoDistanceFacet),
    /// `filter` facet.
    Filter(CountFacet),
    /// `terms` facet.
    Terms(TermsFacet),
    /// `range` facet.
    Range(RangeFacet),
    /// `histogram` facet.
    Histogram(HistogramFacet),
}

impl FacetKind {
    /// Discriminator of the facet.
    pub fn type_name(&self) -> &'static str {
        match self {
            FacetKind::Query(_) => "query",
            FacetKind::Statistical(_) => "statistical",
            FacetKind::TermsStats(_) => "terms_stats",
            FacetKind::DateHistogram(_) => "date_histogram",
            FacetKind::GeoDistance(_) => "geo_distance",
            FacetKind::Filter(_) => "filter",
            FacetKind::Terms(_) => "terms",
            FacetKind::Range(_) => "range",
            FacetKind::Histogram(_) => "histogram",
        }
    }
}

/// Payload of query and filter facets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountFacet {
    /// Matching documents.
    pub count: u64,
}

/// Payload of a statistical facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatisticalFacet {
    /// Number of values.
    pub count: u64,
    /// Sum of values.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    /// Smallest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: Option<f64>,
    /// Largest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: Option<f64>,
    /// Mean value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mean: Option<f64>,
    /// Sum of squares.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sum_of_squares: Option<f64>,
    /// Variance.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub variance: Option<f64>,
    /// Standard deviation.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub std_deviation: Option<f64>,
}

/// Payload of a terms facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermsFacet {
    /// Documents without a value.
    #[serde(default)]
    pub missing: u64,
    /// Total term occurrences.
    #[serde(default)]
    pub total: u64,
    /// Occurrences not covered by the returned terms.
    #[serde(default)]
    pub other: u64,
    /// Returned terms, most frequent first.
    pub terms: Vec<TermEntry>,
}

/// One term of a terms facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermEntry {
    /// Term value (string or number).
    pub term: Value,
    /// Occurrences.
    pub count: u64,
}

impl TermEntry {
    /// Term rendered as text.
    pub fn term_text(&self) -> String {
        match &self.term {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Payload of a terms-stats facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermsStatsFacet {
    /// Documents without a key value.
    #[serde(default)]
    pub missing: u64,
    /// Statistics per term.
    pub terms: Vec<TermStatsEntry>,
}

/// Statistics of one term.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermStatsEntry {
    /// Term value.
    pub term: Value,
    /// Documents with the term.
    pub count: u64,
    /// Values counted.
    #[serde(default)]
    pub total_count: u64,
    /// Smallest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: Option<f64>,
    /// Largest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: Option<f64>,
    /// Sum of values.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    /// Mean value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mean: Option<f64>,
}

/// Payload of a histogram facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistogramFacet {
    /// Buckets in key order.
    pub entries: Vec<HistogramEntry>,
}

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistogramEntry {
    /// Bucket key.
    pub key: f64,
    /// Documents in the bucket.
    pub count: u64,
}

/// Payload of a date histogram facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DateHistogramFacet {
    /// Buckets in time order.
    pub entries: Vec<DateHistogramEntry>,
}

/// One date histogram bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DateHistogramEntry {
    /// Bucket start, epoch milliseconds.
    pub time: i64,
    /// Documents in the bucket.
    pub count: u64,
}

/// Payload of a range facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangeFacet {
    /// One entry per requested range.
    pub ranges: Vec<RangeEntry>,
}

/// Payload of a geo distance facet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoDistanceFacet {
    /// One entry per requested distance range.
    pub ranges: Vec<RangeEntry>,
}

/// Counts and statistics of one range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangeEntry {
    /// Lower bound.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub from: Option<f64>,
    /// Upper bound.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub to: Option<f64>,
    /// Documents in the range.
    pub count: u64,
    /// Values counted.
    #[serde(default)]
    pub total_count: u64,
    /// Smallest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: Option<f64>,
    /// Largest value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: Option<f64>,
    /// Sum of values.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    /// Mean value.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mean: Option<f64>,
}

/// Numbers the cluster could not express (`"Infinity"`, `null`) become `None`.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_f64()))
}

type FacetDecoder = fn(&Value) -> serde_json::Result<FacetKind>;

fn payload<P: DeserializeOwned>(raw: &Value) -> serde_json::Result<P> {
    P::deserialize(raw)
}

/// Discriminator to decoder, built once and only read afterwards.
static FACET_DECODERS: Lazy<HashMap<&'static str, FacetDecoder>> = Lazy::new(|| {
    let mut decoders: HashMap<&'static str, FacetDecoder> = HashMap::new();
    decoders.insert("query", |raw| payload(raw).map(FacetKind::Query));
    decoders.insert("statistical", |raw| payload(raw).map(FacetKind::Statistical));
    decoders.insert("terms_stats", |raw| payload(raw).map(FacetKind::TermsStats));
    decoders.insert("date_histogram", |raw| payload(raw).map(FacetKind::DateHistogram));
    decoders.insert("geo_distance", |raw| payload(raw).map(FacetKind::GeoDistance));
    decoders.insert("filter", |raw| payload(raw).map(FacetKind::Filter));
    decoders.insert("terms", |raw| payload(raw).map(FacetKind::Terms));
    decoders.insert("range", |raw| payload(raw).map(FacetKind::Range));
    decoders.insert("histogram", |raw| payload(raw).map(FacetKind::Histogram));
    decoders
});

/// Whether a facet discriminator is known to the decoder.
pub fn is_supported(type_name: &str) -> bool {
    FACET_DECODERS.contains_key(type_name.to_lowercase().as_str())
}

/// Decode the `facets` block of a search response.
///
/// A missing block yields an empty list. Entries with a missing or unknown `_type`, or
/// whose payload does not fit the facet type, are logged and skipped.
pub fn decode_facets(block: Option<&Value>) -> Vec<FacetResult> {
    let entries = match block {
        Some(Value::Object(entries)) => entries,
        Some(Value::Null) | None => return Vec::new(),
        Some(_) => {
            error!("Facets block is not an object, ignoring it");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|(name, raw)| decode_entry(name, raw))
        .collect()
}

fn decode_entry(name: &str, raw: &Value) -> Option<FacetResult> {
    let Some(type_name) = raw.get("_type").and_then(Value::as_str) else {
        error!(facet = name, "Facet has no _type discriminator, dropping it");
        return None;
    };

    let type_name = type_name.to_lowercase();
    let Some(decoder) = FACET_DECODERS.get(type_name.as_str()) else {
        error!(facet = name, facet_type = %type_name, "Unknown facet type, dropping it");
        return None;
    };

    match decoder(raw) {
        Ok(kind) => Some(FacetResult {
            name: name.to_string(),
            kind,
            raw: raw.clone(),
        }),
        Err(e) => {
            error!(facet = name, facet_type = %type_name, error = %e, "Cannot decode facet, dropping it");
            None
        }
    }
}
