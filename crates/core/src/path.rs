//! Entity key paths
//!
//! A [`Path`] is the root-to-leaf chain of `(kind, identifier)` pairs that
//! locates an entity. Each [`PathElement`] is framed by start and end markers
//! inside the path's embedded message:
//!
//! ```text
//! 114 <len> ( 11  18 <kind>  24 <id> | 34 <name>  12 )*
//! ```

use std::fmt;

use crate::buffer::{ByteBuffer, ByteCursor};
use crate::error::{DecodeError, DecodeResult, EncodeResult, KeyError};
use crate::varint;

/// Wire tags for the path message and its elements
pub(crate) mod tag {
    /// Reserved, always an error
    pub const RESERVED: i32 = 0;
    /// Path embedded message
    pub const PATH: i32 = 114;
    /// Path element start marker
    pub const ELEMENT_START: i32 = 11;
    /// Path element end marker
    pub const ELEMENT_END: i32 = 12;
    /// Element kind
    pub const KIND: i32 = 18;
    /// Element numeric id
    pub const ID: i32 = 24;
    /// Element string name
    pub const NAME: i32 = 34;
}

/// Identifier of a path element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    /// Numeric id
    Id(i64),
    /// String name
    Name(String),
    /// Not yet allocated; the server assigns an id on insert
    Unallocated,
}

impl Identifier {
    /// True unless the identifier is [`Identifier::Unallocated`]
    pub fn is_allocated(&self) -> bool {
        !matches!(self, Identifier::Unallocated)
    }

    /// Numeric id, if this is one
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Identifier::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// String name, if this is one
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Identifier::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Id(id)
    }
}

impl From<i32> for Identifier {
    fn from(id: i32) -> Self {
        Identifier::Id(i64::from(id))
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Name(name) => write!(f, "{:?}", name),
            Identifier::Unallocated => write!(f, "?"),
        }
    }
}

/// One `(kind, identifier)` segment of a key path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    kind: String,
    identifier: Identifier,
}

impl PathElement {
    /// Create an element
    pub fn new(kind: impl Into<String>, identifier: impl Into<Identifier>) -> Self {
        Self {
            kind: kind.into(),
            identifier: identifier.into(),
        }
    }

    /// Create an element whose id the server has not allocated yet
    pub fn unallocated(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identifier: Identifier::Unallocated,
        }
    }

    /// Entity kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Entity identifier
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Write the kind and identifier fields (not the start/end markers).
    ///
    /// An unallocated element writes its kind only.
    pub fn encode(&self, buffer: &mut ByteBuffer) -> EncodeResult<()> {
        buffer.add_var_int32(i64::from(tag::KIND))?;
        buffer.add_prefixed_string(&self.kind)?;
        match &self.identifier {
            Identifier::Id(id) => {
                buffer.add_var_int32(i64::from(tag::ID))?;
                buffer.add_var_int64(*id);
            }
            Identifier::Name(name) => {
                buffer.add_var_int32(i64::from(tag::NAME))?;
                buffer.add_prefixed_string(name)?;
            }
            Identifier::Unallocated => {}
        }
        Ok(())
    }

    /// Exact number of bytes [`PathElement::encode`] writes, computed without encoding
    pub fn byte_size(&self) -> usize {
        // One tag byte each for the kind and the identifier.
        let mut n = size_str(&self.kind) + 1;
        match &self.identifier {
            Identifier::Id(id) => n += 1 + varint::encoded_len(*id),
            Identifier::Name(name) => n += 1 + size_str(name),
            Identifier::Unallocated => {}
        }
        n
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {})", self.kind, self.identifier)
    }
}

fn size_str(s: &str) -> usize {
    varint::encoded_len(s.len() as i64) + s.len()
}

/// Read one element's fields up to and including its end marker.
pub fn path_element_from_decoder(cursor: &mut ByteCursor<'_>) -> DecodeResult<PathElement> {
    let mut kind = None;
    let mut identifier = None;

    loop {
        match cursor.get_var_int32()? {
            tag::ELEMENT_END => break,
            tag::KIND => kind = Some(cursor.get_prefixed_string()?),
            tag::ID => identifier = Some(Identifier::Id(cursor.get_var_int64()?)),
            tag::NAME => identifier = Some(Identifier::Name(cursor.get_prefixed_string()?)),
            tag::RESERVED => return Err(DecodeError::corrupted("reserved tag in path element")),
            other => {
                return Err(DecodeError::corrupted(format!(
                    "unexpected tag {} in path element",
                    other
                )))
            }
        }
    }

    match (kind, identifier) {
        (Some(kind), Some(identifier)) => Ok(PathElement { kind, identifier }),
        _ => Err(DecodeError::IncompletePathElement),
    }
}

/// Non-empty, ordered chain of path elements, root first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Build a path, rejecting an empty element list
    pub fn new(elements: Vec<PathElement>) -> Result<Self, KeyError> {
        if elements.is_empty() {
            return Err(KeyError::EmptyPath);
        }
        Ok(Self { elements })
    }

    /// Build a path from `(kind, identifier)` pairs
    pub fn from_pairs<K, I>(pairs: impl IntoIterator<Item = (K, I)>) -> Result<Self, KeyError>
    where
        K: Into<String>,
        I: Into<Identifier>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(kind, id)| PathElement::new(kind, id))
                .collect(),
        )
    }

    /// Elements, root first
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Number of elements (always at least one)
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the path has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The entity's own element
    pub fn last(&self) -> &PathElement {
        // Construction guarantees at least one element.
        &self.elements[self.elements.len() - 1]
    }

    /// Path without its last element, or `None` for a root path
    pub fn parent(&self) -> Option<Path> {
        if self.elements.len() < 2 {
            return None;
        }
        Some(Path {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// `(kind, identifier)` pairs, root first
    pub fn as_pairs(&self) -> Vec<(&str, &Identifier)> {
        self.elements
            .iter()
            .map(|pe| (pe.kind(), pe.identifier()))
            .collect()
    }

    /// Size of the embedded message body: every element plus its two markers
    pub fn byte_size(&self) -> usize {
        self.elements.iter().map(|pe| 2 + pe.byte_size()).sum()
    }

    /// Write the path tag, the body length and every framed element.
    pub fn encode(&self, buffer: &mut ByteBuffer) -> EncodeResult<()> {
        buffer.add_var_int32(i64::from(tag::PATH))?;
        buffer.add_var_int32(self.byte_size() as i64)?;
        for element in &self.elements {
            buffer.add_var_int32(i64::from(tag::ELEMENT_START))?;
            element.encode(buffer)?;
            buffer.add_var_int32(i64::from(tag::ELEMENT_END))?;
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, pe) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", pe)?;
        }
        write!(f, ")")
    }
}

/// Read path elements until the cursor's current scope is exhausted.
///
/// The caller scopes the cursor to the path body with [`ByteCursor::set_end`].
pub fn path_from_decoder(cursor: &mut ByteCursor<'_>) -> DecodeResult<Path> {
    let mut elements = Vec::new();
    while cursor.has_remaining() {
        match cursor.get_var_int32()? {
            tag::ELEMENT_START => elements.push(path_element_from_decoder(cursor)?),
            tag::RESERVED => return Err(DecodeError::corrupted("reserved tag in path")),
            other => {
                return Err(DecodeError::corrupted(format!(
                    "unexpected tag {} in path",
                    other
                )))
            }
        }
    }
    if elements.is_empty() {
        return Err(DecodeError::corrupted("path has no elements"));
    }
    Ok(Path { elements })
}
