//! Entities: a key plus named property values

use std::collections::BTreeMap;

use serde_json::{json, Map, Value as JsonValue};

use crate::error::ValueError;
use crate::key::Key;
use crate::value::Value;

/// A stored record
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity key; replaced when the server allocates an id on insert
    pub key: Key,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Create an entity with no properties
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Parse the REST form `{"key": {...}, "properties": {...}}`
    pub fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        let key = value.get("key").ok_or(ValueError::MissingField("key"))?;
        let key = Key::from_json(key)?;

        let mut properties = BTreeMap::new();
        if let Some(props) = value.get("properties").and_then(JsonValue::as_object) {
            for (name, v) in props {
                properties.insert(name.clone(), Value::from_json(v)?);
            }
        }
        Ok(Self { key, properties })
    }

    /// REST form for insert, upsert or update mutations
    pub fn to_json(&self) -> JsonValue {
        let properties: Map<String, JsonValue> = self
            .properties
            .iter()
            .map(|(name, v)| (name.clone(), v.to_json()))
            .collect();
        json!({"key": self.key.to_json(), "properties": properties})
    }

    /// Property value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a new or existing property
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Remove a property, returning its previous value
    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    /// All properties, ordered by name
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Plain JSON object of the properties.
    ///
    /// With `key_as`, the entity's key string is added under that name.
    pub fn serializable(&self, key_as: Option<&str>) -> JsonValue {
        let mut data: Map<String, JsonValue> = self
            .properties
            .iter()
            .map(|(name, v)| (name.clone(), v.to_plain_json()))
            .collect();
        if let Some(field) = key_as {
            if let Ok(ks) = self.key.ks() {
                data.insert(field.to_string(), json!(ks));
            }
        }
        JsonValue::Object(data)
    }
}
