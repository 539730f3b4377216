//! Contract against a scripted Chroma server

use crate::harness::*;
use serde_json::json;
use strata_vdb::backends::Method;
use strata_vdb::{Document, SearchOptions, VdbError, VectorStore, VectorType};

/// Script: collection `c-9` exists
fn existing(t: &strata_vdb::backends::testing::RecordingTransport) {
    t.respond(
        Method::Get,
        &chroma_path(&format!("/{}", COLLECTION)),
        200,
        json!({"id": "c-9", "name": COLLECTION}),
    );
}

fn query_response(t: &strata_vdb::backends::testing::RecordingTransport, body: serde_json::Value) {
    t.respond(Method::Post, &chroma_path("/c-9/query"), 200, body);
}

#[test]
fn reports_its_type() {
    let (store, _) = chroma_store();
    assert_eq!(store.vector_type(), VectorType::Chroma);
    assert_eq!(store.collection_name(), COLLECTION);
}

#[test]
fn threshold_scenario() {
    let (store, t) = chroma_store();
    existing(&t);
    query_response(
        &t,
        json!({
            "ids": [["a", "b"]],
            "documents": [["a", "b"]],
            "metadatas": [[{"doc_id": "a"}, {"doc_id": "b"}]],
            "distances": [[0.1, 1.4]],
        }),
    );

    let results = store
        .search_by_vector(&[0.9, 0.1], &SearchOptions::new(2).with_score_threshold(0.5))
        .unwrap();

    assert_eq!(texts(&results), vec!["a"]);
    assert!((results[0].score().unwrap() - 0.9).abs() < 1e-9);

    let sent = t.last_body(Method::Post, &chroma_path("/c-9/query")).unwrap();
    assert_eq!(sent["n_results"], 2);
    assert!(sent.get("where").is_none());
}

#[test]
fn results_are_reordered_by_score() {
    let (store, t) = chroma_store();
    existing(&t);
    query_response(
        &t,
        json!({
            "ids": [["x", "y", "z"]],
            "documents": [["far", "near", "mid"]],
            "metadatas": [[null, null, null]],
            "distances": [[0.6, 0.05, 0.3]],
        }),
    );

    let results = store
        .search_by_vector(&[1.0], &SearchOptions::new(3))
        .unwrap();
    assert_eq!(texts(&results), vec!["near", "mid", "far"]);
    assert_ranked(&results, 3, 0.0);
}

#[test]
fn document_ids_filter_becomes_where_clause() {
    let (store, t) = chroma_store();
    existing(&t);
    query_response(
        &t,
        json!({"ids": [[]], "documents": [[]], "metadatas": [[]], "distances": [[]]}),
    );

    let results = store
        .search_by_vector(
            &[1.0],
            &SearchOptions::new(4).with_document_ids(["doc-1", "doc-2"]),
        )
        .unwrap();
    assert!(results.is_empty());

    let sent = t.last_body(Method::Post, &chroma_path("/c-9/query")).unwrap();
    assert_eq!(
        sent["where"],
        json!({"document_id": {"$in": ["doc-1", "doc-2"]}})
    );
}

#[test]
fn malformed_response_is_empty() {
    let (store, t) = chroma_store();
    existing(&t);
    query_response(&t, json!({"ids": [["a"]], "distances": "oops"}));

    let results = store
        .search_by_vector(&[1.0], &SearchOptions::default())
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn search_on_missing_collection_is_empty_without_creating() {
    let (store, t) = chroma_store();
    let results = store
        .search_by_vector(&[1.0], &SearchOptions::default())
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(t.count(Method::Post, CHROMA_COLLECTIONS), 0);
}

#[test]
fn full_text_is_empty_and_sends_nothing() {
    let (store, t) = chroma_store();
    let results = store
        .search_by_full_text("anything", &SearchOptions::default())
        .unwrap();
    assert!(results.is_empty());
    assert!(t.requests().is_empty());
}

#[test]
fn text_exists_checks_returned_ids() {
    let (store, t) = chroma_store();
    existing(&t);
    t.respond(Method::Post, &chroma_path("/c-9/get"), 200, json!({"ids": ["present"]}))
        .respond(Method::Post, &chroma_path("/c-9/get"), 200, json!({"ids": []}));

    assert!(store.text_exists("present").unwrap());
    assert!(!store.text_exists("absent").unwrap());
}

#[test]
fn text_exists_on_missing_collection_is_false() {
    let (store, _) = chroma_store();
    assert!(!store.text_exists("anything").unwrap());
}

#[test]
fn empty_delete_sends_nothing() {
    let (store, t) = chroma_store();
    store.delete_by_ids(&[]).unwrap();
    assert!(t.requests().is_empty());
}

#[test]
fn delete_by_metadata_field_sends_equality() {
    let (store, t) = chroma_store();
    existing(&t);
    t.respond(Method::Post, &chroma_path("/c-9/delete"), 200, json!(null));

    store.delete_by_metadata_field("document_id", "doc-42").unwrap();
    assert_eq!(
        t.last_body(Method::Post, &chroma_path("/c-9/delete")).unwrap(),
        json!({"where": {"document_id": {"$eq": "doc-42"}}})
    );
}

#[test]
fn deletes_on_missing_collection_succeed() {
    let (store, t) = chroma_store();
    store.delete_by_ids(&["gone".to_string()]).unwrap();
    store.delete_by_metadata_field("document_id", "x").unwrap();
    store.delete().unwrap();
    assert_eq!(t.count(Method::Post, &chroma_path("/c-9/delete")), 0);
}

#[test]
fn unreachable_server_is_surfaced() {
    let (store, t) = chroma_store();
    t.fail(Method::Post, CHROMA_COLLECTIONS, "connection refused");

    let err = store
        .create(&[Document::new("a")], &[vec![1.0]])
        .unwrap_err();
    assert!(matches!(err, VdbError::BackendUnavailable { .. }));
    assert_eq!(t.count(Method::Post, CHROMA_COLLECTIONS), 1, "no retry");
}

#[test]
fn rejected_request_is_surfaced() {
    let (store, t) = chroma_store();
    t.respond(Method::Post, CHROMA_COLLECTIONS, 200, json!({"id": "c-9"}));
    t.respond(
        Method::Post,
        &chroma_path("/c-9/upsert"),
        422,
        json!({"error": "bad dimension"}),
    );

    let err = store
        .create(&[Document::new("a")], &[vec![1.0]])
        .unwrap_err();
    assert!(matches!(err, VdbError::BackendRejected { status: 422, .. }));
}
