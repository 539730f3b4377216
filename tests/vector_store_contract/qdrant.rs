//! Contract against a scripted Qdrant server

use crate::harness::*;
use serde_json::json;
use strata_vdb::backends::qdrant::point_id;
use strata_vdb::backends::Method;
use strata_vdb::{MetadataFilter, SearchOptions, VectorStore, VectorType};

fn hit(text: &str, score: f64) -> serde_json::Value {
    json!({
        "id": point_id(text),
        "score": score,
        "payload": {"page_content": text, "metadata": {"doc_id": text}},
    })
}

#[test]
fn reports_its_type() {
    let (store, _) = qdrant_store();
    assert_eq!(store.vector_type(), VectorType::Qdrant);
}

#[test]
fn create_provisions_collection_and_indexes_once() {
    let (store, t) = qdrant_store();
    t.respond(Method::Put, &qdrant_path(""), 200, json!({"result": true}));
    t.respond(Method::Put, &qdrant_path("/index?wait=true"), 200, json!({"result": {}}));
    t.respond(Method::Put, &qdrant_path("/points?wait=true"), 200, json!({"result": {}}));

    let ids = store
        .create(
            &[doc("a", "alpha", "doc-1"), doc("b", "beta", "doc-2")],
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        )
        .unwrap();
    assert_eq!(ids, vec!["a", "b"]);
    store
        .add_texts(&[doc("c", "gamma", "doc-3")], &[vec![0.0, 0.0, 1.0]])
        .unwrap();

    assert_eq!(t.count(Method::Put, &qdrant_path("")), 1);
    let created = t.last_body(Method::Put, &qdrant_path("")).unwrap();
    assert_eq!(created["vectors"], json!({"size": 3, "distance": "Cosine"}));

    let indexed: Vec<String> = t
        .requests_to(Method::Put, &qdrant_path("/index?wait=true"))
        .into_iter()
        .filter_map(|r| r.body?["field_name"].as_str().map(str::to_string))
        .collect();
    assert!(indexed.contains(&"metadata.document_id".to_string()));
    assert!(indexed.contains(&"page_content".to_string()));

    let upsert = t.last_body(Method::Put, &qdrant_path("/points?wait=true")).unwrap();
    assert_eq!(upsert["points"][0]["payload"]["page_content"], "gamma");
    assert_eq!(upsert["points"][0]["payload"]["metadata"]["document_id"], "doc-3");
    assert_eq!(upsert["points"][0]["id"], json!(point_id("c")));
}

#[test]
fn threshold_applied_client_side() {
    let (store, t) = qdrant_store();
    t.respond(
        Method::Post,
        &qdrant_path("/points/search"),
        200,
        json!({"result": [hit("a", 0.9), hit("b", 0.5), hit("c", 0.2)]}),
    );

    let results = store
        .search_by_vector(&[0.9, 0.1], &SearchOptions::new(3).with_score_threshold(0.5))
        .unwrap();
    assert_eq!(texts(&results), vec!["a"]);
    assert_ranked(&results, 3, 0.5);

    let sent = t.last_body(Method::Post, &qdrant_path("/points/search")).unwrap();
    assert_eq!(sent["limit"], 3);
}

#[test]
fn filters_become_payload_conditions() {
    let (store, t) = qdrant_store();
    t.respond(Method::Post, &qdrant_path("/points/search"), 200, json!({"result": []}));

    let options = SearchOptions::new(4)
        .with_document_ids(["doc-1"])
        .with_filter(MetadataFilter::new().ne("lang", "de"));
    store.search_by_vector(&[1.0], &options).unwrap();

    let sent = t.last_body(Method::Post, &qdrant_path("/points/search")).unwrap();
    let rendered = sent["filter"].to_string();
    assert!(rendered.contains("metadata.document_id"), "{}", rendered);
    assert!(rendered.contains("must_not"), "{}", rendered);
    assert!(rendered.contains("metadata.lang"), "{}", rendered);
}

#[test]
fn missing_collection_reads_are_empty() {
    let (store, _) = qdrant_store();
    assert!(store
        .search_by_vector(&[1.0], &SearchOptions::default())
        .unwrap()
        .is_empty());
    assert!(store
        .search_by_full_text("x", &SearchOptions::default())
        .unwrap()
        .is_empty());
    assert!(!store.text_exists("a").unwrap());
    store.delete_by_ids(&["a".to_string()]).unwrap();
    store.delete_by_metadata_field("document_id", "doc-42").unwrap();
    store.delete().unwrap();
}

#[test]
fn malformed_search_is_empty() {
    let (store, t) = qdrant_store();
    t.respond(
        Method::Post,
        &qdrant_path("/points/search"),
        200,
        json!({"result": [{"id": 1, "score": "high"}]}),
    );
    assert!(store
        .search_by_vector(&[1.0], &SearchOptions::default())
        .unwrap()
        .is_empty());
}

#[test]
fn full_text_uses_text_match() {
    let (store, t) = qdrant_store();
    t.respond(
        Method::Post,
        &qdrant_path("/points/scroll"),
        200,
        json!({"result": {"points": [
            {"id": point_id("a"), "payload": {"page_content": "rust book", "metadata": {}}},
        ]}}),
    );

    let results = store
        .search_by_full_text("rust", &SearchOptions::default())
        .unwrap();
    assert_eq!(texts(&results), vec!["rust book"]);

    let sent = t.last_body(Method::Post, &qdrant_path("/points/scroll")).unwrap();
    assert_eq!(
        sent["filter"]["must"][0],
        json!({"key": "page_content", "match": {"text": "rust"}})
    );
}

#[test]
fn delete_by_metadata_field_matches_payload_key() {
    let (store, t) = qdrant_store();
    t.respond(
        Method::Post,
        &qdrant_path("/points/delete?wait=true"),
        200,
        json!({"result": {}}),
    );

    store.delete_by_metadata_field("document_id", "doc-42").unwrap();
    assert_eq!(
        t.last_body(Method::Post, &qdrant_path("/points/delete?wait=true")).unwrap(),
        json!({"filter": {"must": [{"key": "metadata.document_id", "match": {"value": "doc-42"}}]}})
    );
}

#[test]
fn non_uuid_ids_map_to_stable_point_ids() {
    let (store, t) = qdrant_store();
    t.respond(
        Method::Post,
        &qdrant_path("/points"),
        200,
        json!({"result": [{"id": point_id("chunk-7")}]}),
    );

    assert!(store.text_exists("chunk-7").unwrap());
    let sent = t.last_body(Method::Post, &qdrant_path("/points")).unwrap();
    assert_eq!(sent["ids"], json!([point_id("chunk-7")]));
    assert_eq!(point_id("chunk-7"), point_id("chunk-7"));

    let uuid = "6f1c2b7e-22aa-4c1e-9d0b-1b2c3d4e5f60";
    assert_eq!(point_id(uuid), uuid);
}

#[test]
fn empty_batch_sends_nothing() {
    let (store, t) = qdrant_store();
    assert!(store.create(&[], &[]).unwrap().is_empty());
    assert!(store.add_texts(&[], &[]).unwrap().is_empty());
    store.delete_by_ids(&[]).unwrap();
    assert!(t.requests().is_empty());
}
