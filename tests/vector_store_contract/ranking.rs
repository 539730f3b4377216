//! Ranking properties over random collections

use crate::harness::*;
use proptest::prelude::*;
use strata_vdb::{Document, SearchOptions, VectorStore};

fn vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, 3)
        .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn search_respects_top_k_threshold_and_order(
        vectors in prop::collection::vec(vector(), 1..24),
        query in vector(),
        top_k in 1usize..10,
        threshold in -1.0f64..1.0,
    ) {
        let store = memory_store();
        let docs: Vec<Document> = (0..vectors.len())
            .map(|i| Document::new(format!("doc {}", i)).with_doc_id(format!("{:03}", i)))
            .collect();
        store.create(&docs, &vectors).unwrap();

        let results = store
            .search_by_vector(&query, &SearchOptions::new(top_k).with_score_threshold(threshold))
            .unwrap();

        prop_assert!(results.len() <= top_k);
        let scores = scores(&results);
        prop_assert!(scores.iter().all(|s| *s > threshold));
        prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn re_adding_ids_keeps_one_entry_each(
        vectors in prop::collection::vec(vector(), 1..12),
        repeats in 1usize..4,
    ) {
        let store = memory_store();
        let docs: Vec<Document> = (0..vectors.len())
            .map(|i| Document::new(format!("doc {}", i)).with_doc_id(format!("id-{}", i)))
            .collect();
        for _ in 0..repeats {
            store.create(&docs, &vectors).unwrap();
        }
        prop_assert_eq!(store.engine().len(COLLECTION), vectors.len());
    }
}
