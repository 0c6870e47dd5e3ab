use crate::domain::error::{Error, Result};
use crate::domain::ports::vector_store::{VectorSearchHit, VectorStoreProvider};
use crate::domain::types::{FieldFilter, VectorFilters, VectorRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use uuid::Uuid;

struct Collection {
    dimension: usize,
    records: DashMap<Uuid, VectorRecord>,
}

/// Brute-force in-memory vector store: the default backend, and the one integration tests run
/// against. O(n) search is fine at the scale this crate is tested and demoed at; a network-backed
/// provider behind the same trait is what a production deployment swaps in.
#[derive(Default)]
pub struct InMemoryVectorStoreProvider {
    collections: DashMap<String, Collection>,
}

impl InMemoryVectorStoreProvider {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches_filters(payload: &crate::domain::types::VectorPayload, filters: &VectorFilters) -> bool {
    if filters.is_empty() {
        return true;
    }
    let value = match serde_json::to_value(payload) {
        Ok(v) => v,
        Err(_) => return false,
    };

    filters.iter().all(|(field, filter)| {
        let field_value = value.get(field);
        match (filter, field_value) {
            (FieldFilter::Eq(expected), Some(actual)) => actual == expected,
            (FieldFilter::In { values }, Some(actual)) => values.contains(actual),
            (FieldFilter::Gte { value: bound }, Some(actual)) => compare_json(actual, bound) != Some(Ordering::Less),
            (FieldFilter::Lte { value: bound }, Some(actual)) => compare_json(actual, bound) != Some(Ordering::Greater),
            _ => false,
        }
    })
}

fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStoreProvider {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let entry = self.collections.entry(collection.to_string()).or_insert_with(|| Collection {
            dimension,
            records: DashMap::new(),
        });
        if entry.dimension != dimension {
            return Err(Error::data_integrity(format!(
                "collection {collection} has dimension {}, not {dimension}",
                entry.dimension
            )));
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        for record in &records {
            if let Some(first) = records.first() {
                if record.vector.len() != first.vector.len() {
                    return Err(Error::data_integrity("upsert batch has mixed vector dimensions"));
                }
            }
        }
        if let Some(dim) = records.first().map(|r| r.vector.len()) {
            self.ensure_collection(collection, dim).await?;
        }
        let entry = self
            .collections
            .get(collection)
            .ok_or_else(|| Error::not_found(format!("collection {collection}")))?;
        for record in records {
            entry.records.insert(record.id, record);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorSearchHit>> {
        let Some(entry) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorSearchHit> = entry
            .records
            .iter()
            .filter(|r| matches_filters(&r.payload, filters))
            .map(|r| VectorSearchHit {
                id: r.id,
                score: cosine_similarity(query_vector, &r.vector),
                payload: r.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()> {
        if let Some(entry) = self.collections.get(collection) {
            for id in ids {
                entry.records.remove(id);
            }
        }
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections.remove(collection);
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::VectorPayload;

    fn payload(chunk_index: u32) -> VectorPayload {
        VectorPayload {
            document_id: Uuid::new_v4(),
            kb_id: Uuid::new_v4(),
            chunk_index,
            content: "hi".to_string(),
            file_name: "a.txt".to_string(),
            file_type: "txt".to_string(),
            start_char: 0,
            end_char: 2,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let store = InMemoryVectorStoreProvider::new();
        store.ensure_collection("c", 2).await.unwrap();
        store
            .upsert(
                "c",
                vec![
                    VectorRecord { id: Uuid::new_v4(), vector: vec![1.0, 0.0], payload: payload(0) },
                    VectorRecord { id: Uuid::new_v4(), vector: vec![0.0, 1.0], payload: payload(1) },
                ],
            )
            .await
            .unwrap();

        let hits = store.search("c", &[1.0, 0.0], 10, &Default::default()).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn mismatched_dimension_is_rejected() {
        let store = InMemoryVectorStoreProvider::new();
        store.ensure_collection("c", 2).await.unwrap();
        let err = store.ensure_collection("c", 3).await.unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
    }
}
