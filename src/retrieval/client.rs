use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{Condition, Filter, ScoredPoint, SearchPointsBuilder};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::embedder::QueryEmbedder;
use super::error::{RetrievalError, RetrievalResult};
use super::fields::{extract_raw_fields, payload_id};
use super::model::{CandidateDocument, Filters, Metadata};

/// Vector search boundary of the pipeline.
///
/// Implementations return at most `top_k` candidates ordered by similarity
/// descending and hold no per-request state, so the same inputs against the
/// same backend state give the same output.
pub trait Retriever: Send + Sync {
    fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &Filters,
    ) -> impl Future<Output = RetrievalResult<Vec<CandidateDocument>>> + Send;
}

/// Retriever backed by a Qdrant collection.
#[derive(Clone)]
pub struct QdrantRetriever {
    client: Qdrant,
    url: String,
    collection: String,
    embedder: Arc<dyn QueryEmbedder>,
}

impl std::fmt::Debug for QdrantRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantRetriever")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .finish()
    }
}

impl QdrantRetriever {
    /// Creates a retriever for `collection` at `url`.
    pub fn new(
        url: &str,
        collection: &str,
        embedder: Arc<dyn QueryEmbedder>,
    ) -> RetrievalResult<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RetrievalError::Unreachable {
                backend: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            embedder,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embeds `query` and searches the collection.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &Filters,
    ) -> RetrievalResult<Vec<CandidateDocument>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;

        let mut search = SearchPointsBuilder::new(&self.collection, vector, top_k as u64)
            .with_payload(true);
        if let Some(filter) = build_filter(filters)? {
            search = search.filter(filter);
        }

        let response =
            self.client
                .search_points(search)
                .await
                .map_err(|e| RetrievalError::Unreachable {
                    backend: self.url.clone(),
                    message: e.to_string(),
                })?;

        let candidates: Vec<CandidateDocument> = response
            .result
            .into_iter()
            .take(top_k)
            .map(candidate_from_point)
            .collect();

        debug!(
            collection = %self.collection,
            hits = candidates.len(),
            "Qdrant search complete"
        );

        Ok(candidates)
    }
}

impl Retriever for QdrantRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &Filters,
    ) -> RetrievalResult<Vec<CandidateDocument>> {
        self.search(query, top_k, filters).await
    }
}

/// Converts equality filters into `must` match conditions.
pub fn build_filter(filters: &Filters) -> RetrievalResult<Option<Filter>> {
    if filters.is_empty() {
        return Ok(None);
    }

    let conditions = filters
        .iter()
        .map(|(field, value)| match_condition(field, value))
        .collect::<RetrievalResult<Vec<_>>>()?;

    Ok(Some(Filter::must(conditions)))
}

fn match_condition(field: &str, value: &JsonValue) -> RetrievalResult<Condition> {
    let invalid = |reason: &str| RetrievalError::InvalidFilter {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    match value {
        JsonValue::String(s) => Ok(Condition::matches(field, s.clone())),
        JsonValue::Bool(b) => Ok(Condition::matches(field, *b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(|i| Condition::matches(field, i))
            .ok_or_else(|| invalid("only integer numbers can be matched")),
        JsonValue::Array(items) if items.is_empty() => Err(invalid("empty list")),
        JsonValue::Array(items) => {
            if let Some(strings) = items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
            {
                Ok(Condition::matches(field, strings))
            } else if let Some(ints) = items
                .iter()
                .map(JsonValue::as_i64)
                .collect::<Option<Vec<i64>>>()
            {
                Ok(Condition::matches(field, ints))
            } else {
                Err(invalid("lists must hold only strings or only integers"))
            }
        }
        JsonValue::Null => Err(invalid("null cannot be matched")),
        JsonValue::Object(_) => Err(invalid("objects cannot be matched")),
    }
}

fn candidate_from_point(point: ScoredPoint) -> CandidateDocument {
    let metadata = payload_to_metadata(point.payload);

    let id = payload_id(&metadata).unwrap_or_else(|| {
        match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => n.to_string(),
            Some(PointIdOptions::Uuid(u)) => u,
            // Left empty; the normalizer drops it as malformed.
            None => String::new(),
        }
    });

    CandidateDocument {
        raw_fields: extract_raw_fields(&metadata, Some(f64::from(point.score))),
        id,
        embedding: None,
        metadata,
    }
}

fn payload_to_metadata(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Metadata {
    payload
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect()
}

fn to_json(value: qdrant_client::qdrant::Value) -> JsonValue {
    match value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(b),
        Some(Kind::IntegerValue(i)) => JsonValue::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(s)) => JsonValue::String(s),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(to_json).collect())
        }
        Some(Kind::StructValue(s)) => JsonValue::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect(),
        ),
    }
}
