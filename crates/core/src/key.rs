//! Entity keys
//!
//! A [`Key`] is a project id, an optional namespace and a [`Path`]. It has
//! three interchangeable forms:
//!
//! - the binary reference encoding ([`Key::encode`] / [`Key::decode`]),
//! - the URL-safe key string, which is that encoding as unpadded base64url
//!   ([`Key::ks`] / [`Key::from_ks`]),
//! - the REST structured form ([`Key::to_json`] / [`Key::from_json`]).
//!
//! ## Binary layout
//!
//! ```text
//! 106 <"s~" + project_id>   project, with the legacy "s~" prefix
//! 114 <len> <path body>     see `path`
//! 162 <namespace_id>        only when a namespace is set
//! ```
//!
//! Keys are immutable once built. The key string is computed on first use
//! and cached in a single-assignment cell, so a shared key may be read from
//! many threads.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use once_cell::sync::OnceCell;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

use crate::buffer::{ByteBuffer, ByteCursor};
use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult, KeyError};
use crate::path::{path_from_decoder, tag, Identifier, Path, PathElement};

/// Project id field tag
const TAG_PROJECT: i32 = 106;
/// Namespace id field tag
const TAG_NAMESPACE: i32 = 162;
/// Prefix carried by the project id inside the binary form
pub const PROJECT_PREFIX: &str = "s~";

/// How [`Key::from_json_with`] treats a path element with neither `id` nor `name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Accept it as [`Identifier::Unallocated`]
    #[default]
    Unallocated,
    /// Fail with [`KeyError::MissingIdentifier`]
    Reject,
}

/// Datastore entity key
pub struct Key {
    project_id: String,
    namespace_id: Option<String>,
    path: Path,
    ks: OnceCell<String>,
}

impl Key {
    /// Build a key. An empty namespace is the same as no namespace.
    pub fn new(project_id: impl Into<String>, namespace_id: Option<String>, path: Path) -> Self {
        Self {
            project_id: project_id.into(),
            namespace_id: namespace_id.filter(|ns| !ns.is_empty()),
            path,
            ks: OnceCell::new(),
        }
    }

    /// Build a key in the default namespace from `(kind, identifier)` pairs
    ///
    /// ```
    /// use gcdkit_core::Key;
    ///
    /// let key = Key::from_pairs("my-project", [("Foo", 42)]).unwrap();
    /// assert_eq!(key.kind(), "Foo");
    /// ```
    pub fn from_pairs<K, I>(
        project_id: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, I)>,
    ) -> Result<Self, KeyError>
    where
        K: Into<String>,
        I: Into<Identifier>,
    {
        Ok(Self::new(project_id, None, Path::from_pairs(pairs)?))
    }

    /// Same key in another namespace
    pub fn with_namespace(&self, namespace_id: Option<String>) -> Self {
        Self::new(self.project_id.clone(), namespace_id, self.path.clone())
    }

    /// Project id, without the binary prefix
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Namespace id, `None` for the default namespace
    pub fn namespace_id(&self) -> Option<&str> {
        self.namespace_id.as_deref()
    }

    /// Full ancestry path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind of the last path element
    pub fn kind(&self) -> &str {
        self.path.last().kind()
    }

    /// Identifier of the last path element
    pub fn id(&self) -> &Identifier {
        self.path.last().identifier()
    }

    /// `(kind, identifier)` pairs, root first
    pub fn get_path(&self) -> Vec<(&str, &Identifier)> {
        self.path.as_pairs()
    }

    /// True if every path element carries an id or a name
    pub fn is_complete(&self) -> bool {
        self.path
            .elements()
            .iter()
            .all(|pe| pe.identifier().is_allocated())
    }

    /// Key of the parent entity.
    ///
    /// Keeps the project id but not the namespace. Fails with
    /// [`KeyError::NoParent`] for a root key.
    pub fn get_parent(&self) -> Result<Key, KeyError> {
        let parent = self.path.parent().ok_or(KeyError::NoParent)?;
        Ok(Key::new(self.project_id.clone(), None, parent))
    }

    // ========================================================================
    // Binary form
    // ========================================================================

    /// Encode into the binary reference format
    pub fn encode(&self) -> EncodeResult<ByteBuffer> {
        let mut buffer = ByteBuffer::new();
        buffer.add_var_int32(i64::from(TAG_PROJECT))?;
        buffer.add_prefixed_string(&format!("{}{}", PROJECT_PREFIX, self.project_id))?;
        self.path.encode(&mut buffer)?;
        if let Some(ns) = &self.namespace_id {
            buffer.add_var_int32(i64::from(TAG_NAMESPACE))?;
            buffer.add_prefixed_string(ns)?;
        }
        Ok(buffer)
    }

    /// Decode the binary reference format
    pub fn decode(bytes: &[u8]) -> DecodeResult<Key> {
        let mut cursor = ByteCursor::new(bytes);
        let mut project_id = None;
        let mut namespace_id = None;
        let mut path = None;

        while cursor.has_remaining() {
            match cursor.get_var_int32()? {
                TAG_PROJECT => {
                    project_id = Some(strip_project_prefix(cursor.get_prefixed_string()?)?);
                }
                tag::PATH => {
                    let len = cursor.get_var_int32()?;
                    let len = usize::try_from(len).map_err(|_| {
                        DecodeError::corrupted(format!("negative path length {}", len))
                    })?;
                    cursor.set_end(Some(len))?;
                    path = Some(path_from_decoder(&mut cursor)?);
                    cursor.set_end(None)?;
                }
                TAG_NAMESPACE => namespace_id = Some(cursor.get_prefixed_string()?),
                tag::RESERVED => return Err(DecodeError::corrupted("reserved tag in key")),
                other => {
                    return Err(DecodeError::corrupted(format!(
                        "unexpected tag {} in key",
                        other
                    )))
                }
            }
        }

        let path = path.ok_or(DecodeError::MissingPath)?;
        let project_id =
            project_id.ok_or_else(|| DecodeError::corrupted("key has no project id"))?;
        Ok(Key::new(project_id, namespace_id, path))
    }

    // ========================================================================
    // Key string
    // ========================================================================

    /// URL-safe key string, computed once and cached
    pub fn ks(&self) -> EncodeResult<&str> {
        self.ks
            .get_or_try_init(|| {
                let buffer = self.encode()?;
                Ok::<_, EncodeError>(URL_SAFE_NO_PAD.encode(buffer.as_bytes()))
            })
            .map(String::as_str)
    }

    /// Parse a URL-safe key string
    pub fn from_ks(ks: &str) -> Result<Key, KeyError> {
        let bytes = decode_key_string(ks)?;
        Ok(Key::decode(&bytes)?)
    }

    // ========================================================================
    // Structured form
    // ========================================================================

    /// REST structured form
    ///
    /// Numeric ids are written as decimal strings; unallocated elements carry
    /// only their kind.
    pub fn to_json(&self) -> JsonValue {
        let mut partition = Map::new();
        partition.insert("projectId".into(), json!(self.project_id));
        if let Some(ns) = &self.namespace_id {
            partition.insert("namespaceId".into(), json!(ns));
        }
        let path: Vec<JsonValue> = self
            .path
            .elements()
            .iter()
            .map(|pe| match pe.identifier() {
                Identifier::Id(id) => json!({"kind": pe.kind(), "id": id.to_string()}),
                Identifier::Name(name) => json!({"kind": pe.kind(), "name": name}),
                Identifier::Unallocated => json!({"kind": pe.kind()}),
            })
            .collect();
        json!({"partitionId": partition, "path": path})
    }

    /// Parse the REST structured form, accepting id-less elements as unallocated
    pub fn from_json(value: &JsonValue) -> Result<Key, KeyError> {
        Self::from_json_with(value, IdentifierPolicy::default())
    }

    /// Parse the REST structured form with an explicit policy for id-less elements
    ///
    /// An `id` field wins over a `name` field. `id` may be a decimal string or
    /// a JSON integer.
    pub fn from_json_with(value: &JsonValue, policy: IdentifierPolicy) -> Result<Key, KeyError> {
        let partition = value
            .get("partitionId")
            .ok_or(KeyError::MissingField("partitionId"))?;
        let project_id = partition
            .get("projectId")
            .and_then(JsonValue::as_str)
            .ok_or(KeyError::MissingField("partitionId.projectId"))?;
        let namespace_id = partition
            .get("namespaceId")
            .and_then(JsonValue::as_str)
            .map(str::to_owned);

        let pairs = value
            .get("path")
            .and_then(JsonValue::as_array)
            .ok_or(KeyError::MissingField("path"))?;
        let elements = pairs
            .iter()
            .map(|pair| element_from_json(pair, policy))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Key::new(project_id, namespace_id, Path::new(elements)?))
    }
}

fn element_from_json(pair: &JsonValue, policy: IdentifierPolicy) -> Result<PathElement, KeyError> {
    let kind = pair
        .get("kind")
        .and_then(JsonValue::as_str)
        .ok_or(KeyError::MissingField("path.kind"))?;

    if let Some(id) = pair.get("id") {
        let id = match id {
            JsonValue::String(s) => s.parse::<i64>().map_err(|_| KeyError::InvalidId(s.clone())),
            JsonValue::Number(n) => n.as_i64().ok_or_else(|| KeyError::InvalidId(n.to_string())),
            other => Err(KeyError::InvalidId(other.to_string())),
        }?;
        return Ok(PathElement::new(kind, id));
    }

    if let Some(name) = pair.get("name").and_then(JsonValue::as_str) {
        return Ok(PathElement::new(kind, name));
    }

    match policy {
        IdentifierPolicy::Unallocated => Ok(PathElement::unallocated(kind)),
        IdentifierPolicy::Reject => Err(KeyError::MissingIdentifier {
            kind: kind.to_string(),
        }),
    }
}

/// Drop the two-character partition prefix ("s~", "e~", ...) from a stored project
fn strip_project_prefix(raw: String) -> DecodeResult<String> {
    match raw.get(PROJECT_PREFIX.len()..) {
        Some(project_id) => Ok(project_id.to_string()),
        None => Err(DecodeError::corrupted(format!(
            "project {:?} is missing its partition prefix",
            raw
        ))),
    }
}

/// Undo the URL-safe substitution, re-pad and base64-decode a key string.
fn decode_key_string(ks: &str) -> DecodeResult<Vec<u8>> {
    let mut standard: String = ks
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }
    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))
}

impl Clone for Key {
    fn clone(&self) -> Self {
        Self {
            project_id: self.project_id.clone(),
            namespace_id: self.namespace_id.clone(),
            path: self.path.clone(),
            ks: self.ks.clone(),
        }
    }
}

/// Two keys are equal when their key strings are equal, which is exactly
/// when project, namespace and the full path agree.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.project_id == other.project_id
            && self.namespace_id == other.namespace_id
            && self.path == other.path
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.project_id.hash(state);
        self.namespace_id.hash(state);
        self.path.hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("project_id", &self.project_id)
            .field("namespace_id", &self.namespace_id)
            .field("path", &format_args!("{}", self.path))
            .finish()
    }
}

/// Displays the key string. A key too large to encode shows its path instead.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ks() {
            Ok(ks) => f.write_str(ks),
            Err(_) => write!(f, "{}", self.path),
        }
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_ks(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Key::from_json(&value).map_err(de::Error::custom)
    }
}
