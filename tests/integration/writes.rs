//! Commits through the connector.

use gcdkit::{Entity, Key, Path, PathElement, ProtocolError};

use crate::common::*;

fn incomplete(kind: &str) -> Entity {
    let path = Path::new(vec![PathElement::unallocated(kind)]).unwrap();
    let mut entity = Entity::new(Key::new(PROJECT, None, path));
    entity.set_property("title", "draft");
    entity
}

#[tokio::test]
async fn test_insert_allocates_ids_then_reads_back() {
    let c = connector(FakeDatastore::new(10, 10));
    let mut entities = vec![incomplete("Note"), incomplete("Note")];

    let flags = c.insert_entities(&mut entities).await.unwrap();
    assert_eq!(flags, vec![true, true]);
    assert!(entities.iter().all(|e| e.key.is_complete()));
    assert_ne!(entities[0].key, entities[1].key);

    let read = c
        .get_entity_by_key(&entities[0].key, None, None, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, entities[0]);
}

#[tokio::test]
async fn test_upsert_update_delete() {
    let c = connector(FakeDatastore::new(10, 10));

    let mut e = entity("Foo", 1);
    assert!(c.upsert_entity(&mut e).await.unwrap());
    e.set_property("n", 100_i64);
    assert!(c.update_entity(&mut e).await.unwrap());

    let read = c
        .get_entity_by_key(&key("Foo", 1), None, None, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.get("n"), Some(&gcdkit::Value::Integer(100)));

    assert!(c.delete_key(&key("Foo", 1)).await.unwrap());
    assert_eq!(c.transport().len(), 0);
}

#[tokio::test]
async fn test_insert_existing_fails() {
    let c = connector(FakeDatastore::new(10, 10).with_entities([entity("Foo", 1)]));
    let mut e = entity("Foo", 1);
    let err = c.insert_entity(&mut e).await.unwrap_err();
    assert!(matches!(
        err.as_protocol(),
        Some(ProtocolError::RequestFailed { status: 400, message }) if message == "entity already exists"
    ));
}

#[tokio::test]
async fn test_update_missing_fails() {
    let c = connector(FakeDatastore::new(10, 10));
    let mut entities = vec![entity("Foo", 1)];
    let err = c.update_entities(&mut entities).await.unwrap_err();
    assert!(matches!(
        err.as_protocol(),
        Some(ProtocolError::RequestFailed { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_delete_many() {
    let store = FakeDatastore::new(10, 10).with_entities((1..=3).map(|id| entity("Foo", id)));
    let c = connector(store);
    let flags = c
        .delete_keys(&[key("Foo", 1), key("Foo", 2)])
        .await
        .unwrap();
    assert_eq!(flags, vec![true, true]);
    assert_eq!(c.transport().len(), 1);

    let body = &c.transport().requests_for("commit")[0];
    assert_eq!(body["mode"], "NON_TRANSACTIONAL");
}
