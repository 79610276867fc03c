use super::*;
use crate::index::{CatalogIndex, IndexMetadata, VectorIndex};
use crate::test_support::{FAKE_MODEL, FakeEmbedder, FakeIndex, field, loader_with, neighbors};

fn three_fields() -> Vec<CatalogField> {
    vec![
        field("sales", "orders", "customer_id"),
        field("sales", "orders", "order_total"),
        field("hr", "employees", "hire_date"),
    ]
}

#[tokio::test]
async fn ranks_hits_in_index_order() {
    let (loader, fake) = loader_with(three_fields(), 3, &[(0.2, 2), (0.5, 0), (1.5, 1)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), loader);

    let hits = orchestrator
        .search("who was hired", 25)
        .await
        .expect("search should succeed");

    assert_eq!(fake.last_k(), Some(25));
    assert_eq!(hits.len(), 3);

    let ranks: Vec<_> = hits.iter().map(|h| h.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    let names: Vec<_> = hits.iter().map(|h| h.metadata.field_name.as_str()).collect();
    assert_eq!(names, vec!["hire_date", "customer_id", "order_total"]);

    assert_eq!(hits[0].text, three_fields()[2].embedding_text());
}

#[tokio::test]
async fn similarity_is_inverse_of_distance() {
    let (loader, _) = loader_with(three_fields(), 3, &[(0.0, 0), (0.2, 1), (0.2, 2)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), loader);

    let hits = orchestrator
        .search("customer", 3)
        .await
        .expect("search should succeed");

    for hit in &hits {
        assert_eq!(hit.similarity_score, 1.0 / (1.0 + hit.distance));
    }
    assert_eq!(hits[0].similarity_score, 1.0);
    assert!(hits[0].similarity_score > hits[1].similarity_score);
    assert_eq!(hits[1].similarity_score, hits[2].similarity_score);
}

#[tokio::test]
async fn ties_keep_index_order() {
    let (loader, _) = loader_with(three_fields(), 3, &[(0.3, 1), (0.3, 0), (0.3, 2)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), loader);

    let hits = orchestrator
        .search("anything", 3)
        .await
        .expect("search should succeed");

    let names: Vec<_> = hits.iter().map(|h| h.metadata.field_name.as_str()).collect();
    assert_eq!(names, vec!["order_total", "customer_id", "hire_date"]);
}

#[tokio::test]
async fn returns_at_most_top_k() {
    let (loader, fake) = loader_with(three_fields(), 3, &[(0.1, 0), (0.2, 1), (0.3, 2)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), loader);

    let hits = orchestrator
        .search("customer", 2)
        .await
        .expect("search should succeed");

    assert_eq!(hits.len(), 2);
    assert_eq!(fake.last_k(), Some(2));
}

#[tokio::test]
async fn empty_query_never_reaches_collaborators() {
    let (loader, fake) = loader_with(three_fields(), 3, &[(0.1, 0)]);
    let embedder = Arc::new(FakeEmbedder::new(3));
    let orchestrator = SearchOrchestrator::new(Arc::clone(&embedder) as Arc<dyn Embedder>, loader);

    for query in ["", "   ", "\n\t"] {
        let result = orchestrator.search(query, 5).await;
        assert!(matches!(result, Err(WingmanError::InvalidQuery(_))));
    }

    assert_eq!(embedder.calls(), 0);
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn query_is_trimmed_before_encoding() {
    let (loader, _) = loader_with(three_fields(), 3, &[(0.1, 0)]);
    let embedder = FakeEmbedder::new(3).with_vector("customer", vec![1.0, 2.0, 3.0]);
    let embedder = Arc::new(embedder);
    let orchestrator = SearchOrchestrator::new(Arc::clone(&embedder) as Arc<dyn Embedder>, loader);

    orchestrator
        .search("  customer  ", 1)
        .await
        .expect("search should succeed");

    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn dimension_mismatch_is_reported() {
    let (loader, fake) = loader_with(three_fields(), 3, &[(0.1, 0)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(5)), loader);

    let result = orchestrator.search("customer", 5).await;

    assert!(matches!(
        result,
        Err(WingmanError::DimensionMismatch {
            expected: 3,
            actual: 5
        })
    ));
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn model_mismatch_is_reported() {
    let (loader, _) = loader_with(three_fields(), 3, &[(0.1, 0)]);
    let embedder = FakeEmbedder::new(3).with_model("another-model");
    let orchestrator = SearchOrchestrator::new(Arc::new(embedder), loader);

    let result = orchestrator.search("customer", 5).await;

    assert!(matches!(result, Err(WingmanError::ModelMismatch { .. })));
}

#[tokio::test]
async fn missing_bundle_is_unavailable() {
    let temp_dir = tempfile::TempDir::new().expect("should create temp dir");
    let loader = IndexLoader::new(
        temp_dir.path().join("index.lance"),
        temp_dir.path().join("metadata.json"),
    );
    let orchestrator =
        SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), Arc::new(loader));

    let result = orchestrator.search("customer", 5).await;

    assert!(matches!(result, Err(WingmanError::IndexUnavailable(_))));
}

#[tokio::test]
async fn out_of_range_position_is_unavailable() {
    let fields = three_fields();
    let fake: Arc<dyn VectorIndex> = Arc::new(FakeIndex::new(3, 3, neighbors(&[(0.1, 7)])));
    let index = CatalogIndex::new(fake, IndexMetadata::new(FAKE_MODEL, 3, fields))
        .expect("index should be consistent");
    let orchestrator = SearchOrchestrator::new(
        Arc::new(FakeEmbedder::new(3)),
        Arc::new(IndexLoader::preloaded(index)),
    );

    let result = orchestrator.search("customer", 5).await;

    assert!(matches!(result, Err(WingmanError::IndexUnavailable(_))));
}

#[tokio::test]
async fn zero_top_k_returns_nothing() {
    let (loader, fake) = loader_with(three_fields(), 3, &[(0.1, 0)]);
    let orchestrator = SearchOrchestrator::new(Arc::new(FakeEmbedder::new(3)), loader);

    let hits = orchestrator
        .search("customer", 0)
        .await
        .expect("search should succeed");

    assert!(hits.is_empty());
    assert_eq!(fake.calls(), 0);
}

#[test]
fn similarity_score_examples() {
    assert_eq!(similarity_score(0.0), 1.0);
    assert!((similarity_score(0.2) - 0.833_333).abs() < 1e-5);
    assert!(similarity_score(10.0) < similarity_score(1.0));
}
