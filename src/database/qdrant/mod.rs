#[cfg(test)]
mod tests;

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct, PointsIdsList,
    ScrollPointsBuilder, SetPayloadPointsBuilder, UpsertPointsBuilder, VectorParams,
    VectorParamsMap, VectorsConfig, point_id::PointIdOptions, vectors_config,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info, warn};

use crate::config::{DistanceKind, QdrantConfig};
use crate::{IndexerError, Result};

/// Declared shape of the target collection: one named vector with a fixed
/// dimensionality and distance metric. Immutable once data is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub vector_name: String,
    pub dimension: usize,
    pub distance: DistanceKind,
}

/// Result of a collection schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// Collection exists with a compatible schema.
    Ready,
    /// Collection was created with the requested schema.
    Created,
    /// Collection exists with an incompatible schema. Requires an explicit
    /// destructive recreate; never fixed implicitly.
    Incompatible(String),
}

/// Store-neutral embedding record: deterministic point id, one named
/// vector, and a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub vector_name: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Vector collection operations needed by the ingestion pipeline.
///
/// The orchestrator only depends on this capability, so tests can run it
/// against an in-memory fake.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Cheap connectivity probe; fails fast when the store is unreachable.
    async fn healthy(&self) -> Result<()>;

    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<CollectionOutcome>;

    /// Drops and recreates the collection. Destructive; callers must gate
    /// this behind an explicit confirmation.
    async fn recreate_collection(&self, spec: &CollectionSpec) -> Result<()>;

    /// Upserts points, overwriting any existing points with the same ids.
    /// Returns the number of points submitted.
    async fn upsert(&self, points: Vec<PointRecord>) -> Result<u64>;

    /// Ids of all points currently flagged active for the given document.
    async fn active_point_ids(&self, doc_id: &str) -> Result<Vec<String>>;

    /// Flags points inactive instead of deleting them, preserving
    /// point-in-time queries downstream.
    async fn tombstone(&self, ids: Vec<String>, archived_at: &str) -> Result<()>;
}

/// Qdrant-backed implementation over the gRPC client.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    upsert_batch: usize,
}

impl QdrantStore {
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| IndexerError::StoreUnavailable(format!("client build: {e}")))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            upsert_batch: config.upsert_batch.max(1),
        })
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn healthy(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<CollectionOutcome> {
        info!(
            "Ensuring collection '{}' with vector '{}' size={} distance={:?}",
            spec.name, spec.vector_name, spec.dimension, spec.distance
        );

        let exists = self
            .client
            .collection_exists(&spec.name)
            .await
            .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&spec.name).vectors_config(named_vectors_config(spec)),
                )
                .await
                .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

            info!("Collection '{}' created", spec.name);
            return Ok(CollectionOutcome::Created);
        }

        let collection_info = self
            .client
            .collection_info(&spec.name)
            .await
            .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

        let declared = collection_info
            .result
            .and_then(|info| info.config)
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config);

        let outcome = schema_outcome(spec, declared.as_ref());
        if let CollectionOutcome::Incompatible(reason) = &outcome {
            warn!("Collection '{}' schema mismatch: {}", spec.name, reason);
        } else {
            debug!("Collection '{}' schema is compatible", spec.name);
        }
        Ok(outcome)
    }

    async fn recreate_collection(&self, spec: &CollectionSpec) -> Result<()> {
        warn!(
            "Recreating collection '{}' (destroys all stored points)",
            spec.name
        );

        // Best-effort delete keeps this idempotent when the collection is
        // already gone.
        let _ = self.client.delete_collection(&spec.name).await;

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&spec.name).vectors_config(named_vectors_config(spec)),
            )
            .await
            .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

        info!("Collection '{}' recreated", spec.name);
        Ok(())
    }

    async fn upsert(&self, points: Vec<PointRecord>) -> Result<u64> {
        if points.is_empty() {
            debug!("No points provided for upsert");
            return Ok(0);
        }

        let total = points.len() as u64;
        info!(
            "Upserting {} points into collection '{}'",
            total, self.collection
        );

        let mut converted = Vec::with_capacity(points.len());
        for record in points {
            converted.push(point_from_record(record)?);
        }

        for batch in converted.chunks(self.upsert_batch) {
            self.client
                .upsert_points(
                    UpsertPointsBuilder::new(&self.collection, batch.to_vec()).wait(true),
                )
                .await
                .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;
        }

        Ok(total)
    }

    async fn active_point_ids(&self, doc_id: &str) -> Result<Vec<String>> {
        let filter = Filter::must([
            Condition::matches("doc_id", doc_id.to_string()),
            Condition::matches("is_active", true),
        ]);

        let mut ids = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection)
                .filter(filter.clone())
                .limit(256)
                .with_payload(false)
                .with_vectors(false);
            if let Some(next) = offset.take() {
                builder = builder.offset(next);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

            ids.extend(
                response
                    .result
                    .into_iter()
                    .filter_map(|point| point.id.map(point_id_string)),
            );

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!("Found {} active points for doc_id={}", ids.len(), doc_id);
        Ok(ids)
    }

    async fn tombstone(&self, ids: Vec<String>, archived_at: &str) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        info!(
            "Tombstoning {} points in collection '{}'",
            ids.len(),
            self.collection
        );

        let payload: Payload = serde_json::json!({
            "is_active": false,
            "archived_at": archived_at,
        })
        .try_into()
        .map_err(|e| IndexerError::Database(format!("tombstone payload: {e}")))?;

        let selector = PointsIdsList {
            ids: ids.into_iter().map(PointId::from).collect(),
        };

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(&self.collection, payload)
                    .points_selector(selector)
                    .wait(true),
            )
            .await
            .map_err(|e| IndexerError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }
}

/// Compares a declared vectors config against the expected spec.
///
/// Unnamed-vector collections, a missing vector name, or a differing
/// dimensionality/distance all refuse with a reason; there is no silent
/// migration path between vector-naming modes.
fn schema_outcome(
    spec: &CollectionSpec,
    declared: Option<&VectorsConfig>,
) -> CollectionOutcome {
    let Some(config) = declared.and_then(|v| v.config.as_ref()) else {
        return CollectionOutcome::Incompatible(
            "collection exists but its vector configuration could not be read".to_string(),
        );
    };

    match config {
        vectors_config::Config::Params(params) => CollectionOutcome::Incompatible(format!(
            "collection uses a single unnamed vector (size={}); named vector '{}' is required",
            params.size, spec.vector_name
        )),
        vectors_config::Config::ParamsMap(map) => {
            let Some(params) = map.map.get(&spec.vector_name) else {
                let known: Vec<&str> = map.map.keys().map(String::as_str).collect();
                return CollectionOutcome::Incompatible(format!(
                    "named vector '{}' not found; collection has {:?}",
                    spec.vector_name, known
                ));
            };
            if params.size != spec.dimension as u64 {
                return CollectionOutcome::Incompatible(format!(
                    "named vector '{}' has size {}, expected {}",
                    spec.vector_name, params.size, spec.dimension
                ));
            }
            let expected = qdrant_distance(spec.distance) as i32;
            if params.distance != expected {
                return CollectionOutcome::Incompatible(format!(
                    "named vector '{}' has distance {}, expected {:?}",
                    spec.vector_name, params.distance, spec.distance
                ));
            }
            CollectionOutcome::Ready
        }
    }
}

fn named_vectors_config(spec: &CollectionSpec) -> VectorsConfig {
    let mut map = HashMap::new();
    map.insert(
        spec.vector_name.clone(),
        VectorParams {
            size: spec.dimension as u64,
            distance: qdrant_distance(spec.distance) as i32,
            ..Default::default()
        },
    );

    VectorsConfig {
        config: Some(vectors_config::Config::ParamsMap(VectorParamsMap { map })),
    }
}

fn qdrant_distance(kind: DistanceKind) -> Distance {
    match kind {
        DistanceKind::Cosine => Distance::Cosine,
        DistanceKind::Dot => Distance::Dot,
        DistanceKind::Euclid => Distance::Euclid,
    }
}

fn point_from_record(record: PointRecord) -> Result<PointStruct> {
    let payload: Payload = record
        .payload
        .try_into()
        .map_err(|e| IndexerError::Database(format!("payload convert: {e}")))?;

    let vectors: HashMap<String, Vec<f32>> =
        HashMap::from([(record.vector_name, record.vector)]);

    Ok(PointStruct::new(record.id, vectors, payload))
}

fn point_id_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}
