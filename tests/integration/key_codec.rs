//! Key codec end to end: bytes, key strings and the structured form.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use gcdkit::{DecodeError, Identifier, IdentifierPolicy, Key, KeyError, Path, PathElement};
use serde_json::json;

#[test]
fn test_example_key_layout() {
    let key = Key::from_pairs("p", [("Foo", 42)]).unwrap();
    let ks = key.ks().unwrap();
    let bytes = URL_SAFE_NO_PAD.decode(ks).unwrap();

    assert_eq!(bytes[0], 106);
    assert_eq!(bytes[1], 3);
    assert_eq!(&bytes[2..5], b"s~p");
    assert_eq!(bytes[5], 114);
    assert_eq!(bytes, key.encode().unwrap().as_bytes());
}

#[test]
fn test_key_string_has_no_padding_or_unsafe_chars() {
    for id in [1_i64, 42, 12345678, i64::MAX, -1] {
        let key = Key::from_pairs("my-project-id", [("Foo", id)]).unwrap();
        let ks = key.ks().unwrap();
        assert!(!ks.contains('='));
        assert!(!ks.contains('+'));
        assert!(!ks.contains('/'));
        assert_eq!(Key::from_ks(ks).unwrap(), key);
    }
}

#[test]
fn test_namespaced_ancestor_key_roundtrip() {
    let path = Path::new(vec![
        PathElement::new("Parent", "root"),
        PathElement::new("Child", 7),
        PathElement::new("Leaf", "ü-name"),
    ])
    .unwrap();
    let key = Key::new("proj", Some("tenant".to_string()), path);
    let decoded: Key = key.ks().unwrap().parse().unwrap();

    assert_eq!(decoded, key);
    assert_eq!(decoded.namespace_id(), Some("tenant"));
    assert_eq!(
        decoded.get_path(),
        vec![
            ("Parent", &Identifier::Name("root".into())),
            ("Child", &Identifier::Id(7)),
            ("Leaf", &Identifier::Name("ü-name".into())),
        ]
    );
}

#[test]
fn test_parent_chain() {
    let key = Key::from_pairs("p", [("A", 1), ("B", 2), ("C", 3)]).unwrap();
    let parent = key.get_parent().unwrap();
    let grandparent = parent.get_parent().unwrap();
    assert_eq!(parent, Key::from_pairs("p", [("A", 1), ("B", 2)]).unwrap());
    assert_eq!(grandparent, Key::from_pairs("p", [("A", 1)]).unwrap());
    assert!(matches!(grandparent.get_parent(), Err(KeyError::NoParent)));
}

#[test]
fn test_truncated_key_never_decodes_to_original() {
    let key = Key::new(
        "proj",
        Some("ns".into()),
        Path::from_pairs([("A", Identifier::Id(300)), ("B", Identifier::from("x"))]).unwrap(),
    );
    let bytes = key.encode().unwrap().into_bytes();
    assert!(Key::decode(&bytes[..bytes.len() - 1]).is_err());

    // Dropping the whole namespace field leaves a valid key; no prefix may
    // ever reproduce the original.
    for len in 0..bytes.len() {
        if let Ok(decoded) = Key::decode(&bytes[..len]) {
            assert_ne!(decoded, key, "prefix of {} bytes", len);
            assert_eq!(decoded.namespace_id(), None);
        }
    }
}

#[test]
fn test_structured_and_string_forms_agree() {
    let key = Key::from_json(&json!({
        "partitionId": {"projectId": "p", "namespaceId": "ns"},
        "path": [{"kind": "Foo", "id": "42"}, {"kind": "Bar", "name": "x"}]
    }))
    .unwrap();
    let from_ks = Key::from_ks(key.ks().unwrap()).unwrap();
    assert_eq!(from_ks.to_json(), key.to_json());
}

#[test]
fn test_identifier_policy_decision_point() {
    let value = json!({
        "partitionId": {"projectId": "p"},
        "path": [{"kind": "Foo"}]
    });
    let key = Key::from_json_with(&value, IdentifierPolicy::Unallocated).unwrap();
    assert!(!key.is_complete());
    assert!(matches!(
        Key::from_json_with(&value, IdentifierPolicy::Reject),
        Err(KeyError::MissingIdentifier { .. })
    ));

    // An unallocated element encodes, but its bytes do not decode back.
    let bytes = key.encode().unwrap().into_bytes();
    assert_eq!(Key::decode(&bytes), Err(DecodeError::IncompletePathElement));
}
