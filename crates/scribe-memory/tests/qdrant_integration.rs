//! Runs against a throwaway Qdrant container. Needs a local Docker daemon:
//! `cargo test -p scribe-memory -- --ignored`.

use std::collections::HashMap;

use scribe_memory::{QdrantOps, VectorPoint, VectorStore};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);
const COLLECTION: &str = "test_chunks";

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup() -> (QdrantOps, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let port = container.get_host_port_ipv4(6334).await.unwrap();
    let ops = QdrantOps::new(&format!("http://127.0.0.1:{port}")).unwrap();
    (ops, container)
}

fn point(vector: Vec<f32>, name: &str) -> VectorPoint {
    VectorPoint {
        id: uuid::Uuid::new_v4().to_string(),
        vector,
        payload: HashMap::from([
            ("element_name".to_owned(), serde_json::json!(name)),
            ("tags".to_owned(), serde_json::json!(["class", name])),
        ]),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_collection_is_idempotent() {
    let (qdrant, _container) = setup().await;

    qdrant.ensure_collection(COLLECTION, 4).await.unwrap();
    qdrant.ensure_collection(COLLECTION, 4).await.unwrap();
    assert!(qdrant.collection_exists(COLLECTION).await.unwrap());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn upsert_search_delete() {
    let (qdrant, _container) = setup().await;
    qdrant.ensure_collection(COLLECTION, 4).await.unwrap();

    let foo = point(vec![1.0, 0.0, 0.0, 0.0], "Foo");
    let bar = point(vec![0.0, 1.0, 0.0, 0.0], "Bar");
    qdrant
        .upsert(COLLECTION, vec![foo.clone(), bar.clone()])
        .await
        .unwrap();
    assert_eq!(qdrant.count(COLLECTION).await.unwrap(), 2);

    let hits = qdrant
        .search(COLLECTION, vec![0.9, 0.1, 0.0, 0.0], 5)
        .await
        .unwrap();
    assert_eq!(hits[0].id, foo.id);
    assert_eq!(hits[0].payload["element_name"], "Foo");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    let fetched = qdrant.get(COLLECTION, &bar.id).await.unwrap().unwrap();
    assert_eq!(fetched.payload["tags"], serde_json::json!(["class", "Bar"]));

    qdrant
        .delete_by_ids(COLLECTION, vec![foo.id.clone()])
        .await
        .unwrap();
    assert!(qdrant.get(COLLECTION, &foo.id).await.unwrap().is_none());
    let hits = qdrant
        .search(COLLECTION, vec![1.0, 0.0, 0.0, 0.0], 5)
        .await
        .unwrap();
    assert!(hits.iter().all(|h| h.id != foo.id));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_collection_removes_it() {
    let (qdrant, _container) = setup().await;
    qdrant.ensure_collection(COLLECTION, 4).await.unwrap();
    qdrant.delete_collection(COLLECTION).await.unwrap();
    assert!(!qdrant.collection_exists(COLLECTION).await.unwrap());
}
