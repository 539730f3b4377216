//! Contract against the embedded engine

use crate::harness::*;
use strata_vdb::{Document, MetadataFilter, SearchOptions, VectorStore, VectorType};

fn seeded() -> strata_vdb::MemoryVector {
    let store = memory_store();
    store
        .create(
            &[
                doc("1", "alpha centauri", "doc-42"),
                doc("2", "beta pictoris", "doc-42"),
                doc("3", "gamma draconis", "doc-7"),
            ],
            &[vec![1.0, 0.0], vec![0.8, 0.6], vec![0.0, 1.0]],
        )
        .unwrap();
    store
}

#[test]
fn reports_its_type_and_collection() {
    let store = memory_store();
    assert_eq!(store.vector_type(), VectorType::Memory);
    assert_eq!(store.collection_name(), COLLECTION);
}

#[test]
fn created_ids_exist() {
    let store = memory_store();
    let ids = store
        .create(
            &[doc("given", "x", "d"), Document::new("generated")],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "given");
    assert_ne!(ids[1], "given");
    for id in &ids {
        assert!(store.text_exists(id).unwrap(), "{} should exist", id);
    }
    assert!(!store.text_exists("never-added").unwrap());
}

#[test]
fn re_adding_an_id_replaces_content() {
    let store = memory_store();
    store.create(&[doc("same", "old", "d")], &[vec![1.0, 0.0]]).unwrap();
    store.add_texts(&[doc("same", "new", "d")], &[vec![1.0, 0.0]]).unwrap();

    assert_eq!(store.engine().len(COLLECTION), 1);
    let hits = store
        .search_by_vector(&[1.0, 0.0], &SearchOptions::default())
        .unwrap();
    assert_eq!(texts(&hits), vec!["new"]);
}

#[test]
fn create_with_no_documents_is_noop() {
    let store = memory_store();
    assert!(store.create(&[], &[]).unwrap().is_empty());
    assert!(!store.engine().has_collection(COLLECTION));
}

#[test]
fn misaligned_batch_is_rejected() {
    let store = memory_store();
    let err = store
        .create(&[Document::new("a"), Document::new("b")], &[vec![1.0]])
        .unwrap_err();
    assert!(err.is_validation_error());
    assert!(!store.engine().has_collection(COLLECTION));
}

#[test]
fn deleting_nothing_or_absent_ids_changes_nothing() {
    let store = seeded();
    store.delete_by_ids(&[]).unwrap();
    store
        .delete_by_ids(&["missing".to_string(), "also-missing".to_string()])
        .unwrap();
    store.delete_by_metadata_field("document_id", "doc-0").unwrap();
    assert_eq!(store.engine().len(COLLECTION), 3);
}

#[test]
fn delete_by_ids_removes_only_those() {
    let store = seeded();
    store.delete_by_ids(&["1".to_string()]).unwrap();
    assert!(!store.text_exists("1").unwrap());
    assert!(store.text_exists("2").unwrap());
    assert!(store.text_exists("3").unwrap());
}

#[test]
fn delete_by_metadata_field_removes_only_matches() {
    let store = seeded();
    store.delete_by_metadata_field("document_id", "doc-42").unwrap();

    assert!(!store.text_exists("1").unwrap());
    assert!(!store.text_exists("2").unwrap());
    assert!(store.text_exists("3").unwrap());
}

#[test]
fn threshold_scenario() {
    let store = memory_store();
    store
        .create(
            &[doc("a", "a", "d"), doc("b", "b", "d")],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();

    let results = store
        .search_by_vector(&[0.9, 0.1], &SearchOptions::new(2).with_score_threshold(0.5))
        .unwrap();

    assert_eq!(texts(&results), vec!["a"]);
    let score = results[0].score().unwrap();
    assert!(score > 0.9 && score <= 1.0, "score {}", score);
}

#[test]
fn search_is_bounded_thresholded_and_ordered() {
    let store = seeded();
    for (top_k, threshold) in [(1, 0.0), (2, 0.0), (3, 0.5), (10, 0.0), (3, 0.99)] {
        let results = store
            .search_by_vector(
                &[0.7, 0.7],
                &SearchOptions::new(top_k).with_score_threshold(threshold),
            )
            .unwrap();
        assert_ranked(&results, top_k, threshold);
    }
}

#[test]
fn threshold_is_strict() {
    let store = seeded();
    let exact = store
        .search_by_vector(&[1.0, 0.0], &SearchOptions::new(1))
        .unwrap()[0]
        .score()
        .unwrap();
    let results = store
        .search_by_vector(&[1.0, 0.0], &SearchOptions::new(3).with_score_threshold(exact))
        .unwrap();
    assert!(results.iter().all(|d| d.score().unwrap() > exact));
}

#[test]
fn document_ids_filter_restricts_hits() {
    let store = seeded();
    let results = store
        .search_by_vector(
            &[1.0, 0.0],
            &SearchOptions::new(3).with_document_ids(["doc-7"]),
        )
        .unwrap();
    assert_eq!(texts(&results), vec!["gamma draconis"]);
}

#[test]
fn metadata_filter_restricts_hits() {
    let store = seeded();
    let filter = MetadataFilter::new().ne("document_id", "doc-7");
    let results = store
        .search_by_vector(&[0.0, 1.0], &SearchOptions::new(3).with_filter(filter))
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|d| d.document_id() == Some("doc-42")));
}

#[test]
fn full_text_finds_matching_content() {
    let store = seeded();
    let results = store
        .search_by_full_text("pictoris", &SearchOptions::default())
        .unwrap();
    assert_eq!(texts(&results), vec!["beta pictoris"]);
    assert_ranked(&results, 4, 0.0);

    let none = store
        .search_by_full_text("andromeda", &SearchOptions::default())
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn delete_drops_collection_and_allows_recreate() {
    let store = seeded();
    store.delete().unwrap();
    assert!(!store.text_exists("1").unwrap());
    assert!(store
        .search_by_vector(&[1.0, 0.0], &SearchOptions::default())
        .unwrap()
        .is_empty());

    store.create(&[doc("n", "new", "d")], &[vec![1.0, 0.0]]).unwrap();
    assert!(store.text_exists("n").unwrap());
    assert_eq!(store.engine().create_calls(), 2);
}
