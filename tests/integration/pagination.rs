//! Multi-page queries against the in-memory backend.

use gcdkit::{Query, RunQueryRequest};
use serde_json::json;

use crate::common::*;

fn store_with(kind: &str, count: i64, page_size: usize) -> FakeDatastore {
    FakeDatastore::new(page_size, usize::MAX)
        .with_entities((1..=count).map(|id| entity(kind, id)))
}

#[tokio::test]
async fn test_query_fetches_every_page() {
    let c = connector(store_with("Foo", 25, 10).with_entities([entity("Bar", 1)]));
    let entities = c
        .get_entities(RunQueryRequest::new(Query::kind("Foo")))
        .await
        .unwrap();

    assert_eq!(entities.len(), 25);
    assert!(entities.iter().all(|e| e.key.kind() == "Foo"));
    assert_eq!(c.transport().requests_for("runQuery").len(), 3);
}

#[tokio::test]
async fn test_results_follow_page_order() {
    let store = store_with("Foo", 7, 3);
    let expected: Vec<String> = {
        let mut all: Vec<_> = (1..=7).map(|id| key("Foo", id)).collect();
        all.sort_by(|a, b| a.ks().unwrap().cmp(b.ks().unwrap()));
        all.iter().map(|k| k.ks().unwrap().to_string()).collect()
    };
    let c = connector(store);
    let keys = c
        .get_keys(RunQueryRequest::new(Query::kind("Foo")))
        .await
        .unwrap();
    let got: Vec<String> = keys.iter().map(|k| k.ks().unwrap().to_string()).collect();
    assert_eq!(got, expected);

    let requests = c.transport().requests_for("runQuery");
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1]["query"]["startCursor"], json!("3"));
    assert_eq!(requests[2]["query"]["startCursor"], json!("6"));
}

#[tokio::test]
async fn test_limit_spans_pages() {
    let c = connector(store_with("Foo", 25, 10));
    let (entities, cursor) = c
        .get_entities_by_kind("Foo", None, Some(15), None)
        .await
        .unwrap();
    assert_eq!(entities.len(), 15);
    assert_eq!(cursor.as_deref(), Some("15"));

    let requests = c.transport().requests_for("runQuery");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["query"]["limit"], json!(15));
    assert_eq!(requests[1]["query"]["limit"], json!(5));
}

#[tokio::test]
async fn test_offset_applies_to_first_page_only() {
    let c = connector(store_with("Foo", 25, 10));
    let (entities, _) = c
        .get_entities_by_kind("Foo", Some(4), None, None)
        .await
        .unwrap();
    assert_eq!(entities.len(), 21);

    let requests = c.transport().requests_for("runQuery");
    assert_eq!(requests[0]["query"]["offset"], json!(4));
    assert!(requests[1..]
        .iter()
        .all(|r| r["query"].get("offset").is_none()));
}

#[tokio::test]
async fn test_cursor_resumes_where_previous_call_stopped() {
    let c = connector(store_with("Foo", 12, 5));
    let (first, cursor) = c
        .get_entities_by_kind("Foo", None, Some(8), None)
        .await
        .unwrap();
    let (rest, end) = c
        .get_entities_by_kind("Foo", None, None, cursor.as_deref())
        .await
        .unwrap();

    assert_eq!(first.len(), 8);
    assert_eq!(rest.len(), 4);
    assert_eq!(end.as_deref(), Some("12"));
    for e in &rest {
        assert!(!first.iter().any(|f| f.key == e.key));
    }
}

#[tokio::test]
async fn test_single_entity_and_key() {
    let c = connector(store_with("Foo", 3, 10));
    let entity = c
        .get_entity(RunQueryRequest::new(Query::kind("Foo")))
        .await
        .unwrap();
    assert!(entity.is_some());

    let none = c
        .get_key(RunQueryRequest::new(Query::kind("Missing")))
        .await
        .unwrap();
    assert!(none.is_none());
}
