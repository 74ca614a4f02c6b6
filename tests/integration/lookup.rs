//! Key lookups with deferred-key retry.

use gcdkit::{Entity, Key, MAX_LOOKUP_ATTEMPTS};

use crate::common::*;

fn keys(ids: std::ops::RangeInclusive<i64>) -> Vec<Key> {
    ids.map(|id| key("Foo", id)).collect()
}

#[tokio::test]
async fn test_deferred_keys_resolved_across_calls() {
    let store = FakeDatastore::new(10, 2).with_entities((1..=5).map(|id| entity("Foo", id)));
    let c = connector(store);

    let found = c
        .get_entities_by_keys(&keys(1..=5), None, None, false)
        .await
        .unwrap();
    assert_eq!(found.len(), 5);
    assert_eq!(c.transport().requests_for("lookup").len(), 3);
}

#[tokio::test]
async fn test_backend_that_always_defers() {
    let store = FakeDatastore::new(10, 0).with_entities([entity("Foo", 1)]);
    let c = connector(store);

    let found = c
        .get_entities_by_keys(&keys(1..=1), None, None, false)
        .await
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(
        c.transport().requests_for("lookup").len(),
        MAX_LOOKUP_ATTEMPTS
    );
}

#[tokio::test]
async fn test_missing_and_deferred_slots() {
    let store = FakeDatastore::new(10, 2).with_entities([entity("Foo", 1)]);
    let c = connector(store);

    let mut missing: Vec<Entity> = Vec::new();
    let mut deferred: Vec<Key> = Vec::new();
    let found = c
        .get_entities_by_keys(
            &keys(1..=4),
            Some(&mut missing),
            Some(&mut deferred),
            false,
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key, key("Foo", 2));
    assert_eq!(deferred, keys(3..=4));
    assert_eq!(c.transport().requests_for("lookup").len(), 1);
}

#[tokio::test]
async fn test_get_entity_by_key() {
    let store = FakeDatastore::new(10, 10).with_entities([entity("Foo", 1)]);
    let c = connector(store);

    let hit = c
        .get_entity_by_key(&key("Foo", 1), None, None, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit, entity("Foo", 1));

    let miss = c
        .get_entity_by_key(&key("Foo", 2), None, None, false)
        .await
        .unwrap();
    assert!(miss.is_none());
}
