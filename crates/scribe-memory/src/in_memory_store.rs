use std::collections::HashMap;
use std::sync::RwLock;

use crate::vector_store::{
    BoxFuture, RetrievedPoint, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

struct InMemoryCollection {
    dimension: u64,
    points: HashMap<String, StoredPoint>,
}

impl InMemoryCollection {
    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        let actual = vector.len() as u64;
        if actual == self.dimension {
            Ok(())
        } else {
            Err(VectorStoreError::Dimension {
                expected: self.dimension,
                actual,
            })
        }
    }
}

/// Volatile vector store. Contents are lost when the process exits.
///
/// Scores are cosine similarity. Equal scores are ordered by ascending id.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            let col = cols
                .entry(collection)
                .or_insert_with(|| InMemoryCollection {
                    dimension: vector_size,
                    points: HashMap::new(),
                });
            if col.dimension != vector_size {
                return Err(VectorStoreError::Dimension {
                    expected: col.dimension,
                    actual: vector_size,
                });
            }
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols.contains_key(&collection))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            cols.remove(&collection);
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection))?;
            for p in &points {
                col.check_dimension(&p.vector)?;
            }
            for p in points {
                col.points.insert(
                    p.id,
                    StoredPoint {
                        vector: p.vector,
                        payload: p.payload,
                    },
                );
            }
            Ok(())
        })
    }

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'_, Result<Option<RetrievedPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        let id = id.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Retrieve(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection))?;
            Ok(col.points.get(&id).map(|sp| RetrievedPoint {
                id,
                vector: Some(sp.vector.clone()),
                payload: sp.payload.clone(),
            }))
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection))?;
            col.check_dimension(&vector)?;

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|(id, sp)| ScoredVectorPoint {
                    id: id.clone(),
                    score: cosine_similarity(&vector, &sp.vector),
                    payload: sp.payload.clone(),
                })
                .collect();

            scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn delete_by_ids(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            let col = cols
                .get_mut(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection))?;
            for id in &ids {
                col.points.remove(id);
            }
            Ok(())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            let col = cols
                .get(&collection)
                .ok_or(VectorStoreError::CollectionNotFound(collection))?;
            Ok(col.points.len() as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(id: &str, vector: Vec<f32>, name: &str) -> VectorPoint {
        VectorPoint {
            id: id.into(),
            vector,
            payload: HashMap::from([("name".into(), serde_json::json!(name))]),
        }
    }

    async fn seeded() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 3).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "alpha"),
                    point("b", vec![0.0, 1.0, 0.0], "beta"),
                    point("c", vec![0.7, 0.7, 0.0], "gamma"),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = InMemoryVectorStore::new();
        assert!(!store.collection_exists("docs").await.unwrap());
        store.ensure_collection("docs", 3).await.unwrap();
        store.ensure_collection("docs", 3).await.unwrap();
        assert!(store.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn ensure_collection_rejects_other_dimension() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 3).await.unwrap();
        let err = store.ensure_collection("docs", 4).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::Dimension {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let store = seeded().await;
        let err = store
            .upsert("docs", vec![point("d", vec![1.0, 0.0], "delta")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::Dimension { .. }));
        assert_eq!(store.count("docs").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_fails() {
        let store = InMemoryVectorStore::new();
        let err = store
            .upsert("nope", vec![point("a", vec![1.0], "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let store = seeded().await;
        store
            .upsert("docs", vec![point("a", vec![0.0, 0.0, 1.0], "replaced")])
            .await
            .unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 3);
        let got = store.get("docs", "a").await.unwrap().unwrap();
        assert_eq!(got.payload["name"], "replaced");
        assert_eq!(got.vector, Some(vec![0.0, 0.0, 1.0]));
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let store = seeded().await;
        let results = store
            .search("docs", vec![1.0, 0.0, 0.0], 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "c");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn search_ties_break_by_id() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("t", 2).await.unwrap();
        store
            .upsert(
                "t",
                vec![
                    point("z", vec![1.0, 0.0], "z"),
                    point("m", vec![1.0, 0.0], "m"),
                ],
            )
            .await
            .unwrap();
        let results = store.search("t", vec![1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].id, "m");
        assert_eq!(results[1].id, "z");
    }

    #[tokio::test]
    async fn search_missing_collection_errors() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", vec![1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_from_search_and_get() {
        let store = seeded().await;
        store.delete_by_ids("docs", vec!["a".into()]).await.unwrap();
        assert!(store.get("docs", "a").await.unwrap().is_none());
        let results = store
            .search("docs", vec![1.0, 0.0, 0.0], 10)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.id != "a"));
    }

    #[tokio::test]
    async fn delete_collection_removes_everything() {
        let store = seeded().await;
        store.delete_collection("docs").await.unwrap();
        assert!(!store.collection_exists("docs").await.unwrap());
        assert!(store.count("docs").await.is_err());
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn search_never_exceeds_limit_and_scores_descend(
            vectors in proptest::collection::vec(proptest::collection::vec(-1.0f32..1.0, 4), 0..20),
            query in proptest::collection::vec(-1.0f32..1.0, 4),
            limit in 0u64..25,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.ensure_collection("p", 4).await.unwrap();
                let points = vectors
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| VectorPoint { id: format!("{i:03}"), vector: v, payload: HashMap::new() })
                    .collect();
                store.upsert("p", points).await.unwrap();
                store.search("p", query, limit).await.unwrap()
            });
            prop_assert!(results.len() as u64 <= limit);
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
