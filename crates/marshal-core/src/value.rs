//! The intermediate value model every traversal produces and every codec consumes.
//!
//! A [`Value`] is a tagged tree: scalars at the leaves, [`MapNode`] and
//! [`SeqNode`] as the only compound variants. Compound nodes own their
//! children outright, so `clone()` is a deep clone and a tree handed out by
//! the engine never aliases anything the engine keeps.
//!
//! Equality is structural. Floats compare by bit pattern so that `Value` can
//! implement `Eq` and `Hash` and serve as a map key; `Int(1)` and `UInt(1)` are
//! different values.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::native::NativeArray;

/// A node of the intermediate tree. Defaults to `Null`.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Signed integer family (`i8` through `i64`).
    Int(i64),
    /// Unsigned integer family (`u8` through `u64`).
    UInt(u64),
    /// Floating family (`f32` and `f64`). An `f32` is widened, so it keeps
    /// its binary value rather than its shortest decimal text.
    Float(f64),
    Char(char),
    String(String),
    Map(MapNode),
    Seq(SeqNode),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Map and sequence nodes are compound; everything else is a literal.
    pub fn is_compound(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Seq(_))
    }

    /// Short human-readable name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Map(_) => "map",
            Value::Seq(_) => "sequence",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut MapNode> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqNode> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_seq_mut(&mut self) -> Option<&mut SeqNode> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::UInt(u) => u.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Char(c) => c.hash(state),
            Value::String(s) => s.hash(state),
            // Map equality ignores entry order, so only the length is hashed.
            Value::Map(map) => map.len().hash(state),
            Value::Seq(seq) => seq.len().hash(state),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::String(s) => serializer.serialize_str(s),
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Seq(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for item in seq.iter() {
                    out.serialize_element(item.as_ref())?;
                }
                out.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (Value::String(key), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Value::Bool(v),
    i8 => |v| Value::Int(i64::from(v)),
    i16 => |v| Value::Int(i64::from(v)),
    i32 => |v| Value::Int(i64::from(v)),
    i64 => |v| Value::Int(v),
    u8 => |v| Value::UInt(u64::from(v)),
    u16 => |v| Value::UInt(u64::from(v)),
    u32 => |v| Value::UInt(u64::from(v)),
    u64 => |v| Value::UInt(v),
    f32 => |v| Value::Float(f64::from(v)),
    f64 => |v| Value::Float(v),
    char => |v| Value::Char(v),
    String => |v| Value::String(v),
    &str => |v| Value::String(v.to_owned()),
    MapNode => |v| Value::Map(v),
    SeqNode => |v| Value::Seq(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Map-node
// ============================================================================

/// Mapping from unique keys to values, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapNode {
    entries: IndexMap<Value, Value>,
}

impl MapNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, returning the previous value under an equal key.
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Lookup by a string key, the common case for struct fields.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Value::String(key.to_owned()))
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Remove an entry, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, Value, Value> {
        self.entries.values()
    }
}

impl<'m> IntoIterator for &'m MapNode {
    type Item = (&'m Value, &'m Value);
    type IntoIter = indexmap::map::Iter<'m, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for MapNode {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

// ============================================================================
// Sequence-node
// ============================================================================

/// Ordered, index-addressable sequence of values.
///
/// The backing store is either a boxed `Vec<Value>` or a [`NativeArray`] that
/// keeps a primitive vector as-is. Both behave identically through this API:
/// reads from a native backing produce owned scalar values on demand, and any
/// mutation first converts the backing to the boxed form.
#[derive(Debug, Clone)]
pub struct SeqNode {
    repr: SeqRepr,
}

#[derive(Debug, Clone)]
enum SeqRepr {
    Boxed(Vec<Value>),
    Native(NativeArray),
}

impl SeqNode {
    pub fn new() -> Self {
        Self {
            repr: SeqRepr::Boxed(Vec::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            repr: SeqRepr::Boxed(Vec::with_capacity(capacity)),
        }
    }

    /// Wrap a primitive array without boxing its elements.
    pub fn from_native(native: NativeArray) -> Self {
        Self {
            repr: SeqRepr::Native(native),
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            SeqRepr::Boxed(items) => items.len(),
            SeqRepr::Native(native) => native.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Cow<'_, Value>> {
        match &self.repr {
            SeqRepr::Boxed(items) => items.get(index).map(Cow::Borrowed),
            SeqRepr::Native(native) => native.get(index).map(Cow::Owned),
        }
    }

    pub fn iter(&self) -> SeqIter<'_> {
        SeqIter {
            seq: self,
            index: 0,
        }
    }

    /// The primitive backing, when this sequence has one.
    pub fn native(&self) -> Option<&NativeArray> {
        match &self.repr {
            SeqRepr::Native(native) => Some(native),
            SeqRepr::Boxed(_) => None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.native().is_some()
    }

    /// The boxed elements, when this sequence is not natively backed.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match &self.repr {
            SeqRepr::Boxed(items) => Some(items),
            SeqRepr::Native(_) => None,
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.boxed_mut().push(value.into());
    }

    /// Replace the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let slot = self.boxed_mut().get_mut(index)?;
        Some(std::mem::replace(slot, value.into()))
    }

    pub fn into_values(self) -> Vec<Value> {
        match self.repr {
            SeqRepr::Boxed(items) => items,
            SeqRepr::Native(native) => native.to_values(),
        }
    }

    fn boxed_mut(&mut self) -> &mut Vec<Value> {
        if let SeqRepr::Native(native) = &self.repr {
            self.repr = SeqRepr::Boxed(native.to_values());
        }
        match &mut self.repr {
            SeqRepr::Boxed(items) => items,
            SeqRepr::Native(_) => unreachable!("native backing was converted above"),
        }
    }
}

impl Default for SeqNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SeqNode {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for SeqNode {}

impl From<Vec<Value>> for SeqNode {
    fn from(items: Vec<Value>) -> Self {
        Self {
            repr: SeqRepr::Boxed(items),
        }
    }
}

impl From<NativeArray> for SeqNode {
    fn from(native: NativeArray) -> Self {
        Self::from_native(native)
    }
}

impl<V: Into<Value>> FromIterator<V> for SeqNode {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl<'s> IntoIterator for &'s SeqNode {
    type Item = Cow<'s, Value>;
    type IntoIter = SeqIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`SeqNode`]. Boxed elements are borrowed; native elements
/// are materialized one at a time.
pub struct SeqIter<'s> {
    seq: &'s SeqNode,
    index: usize,
}

impl<'s> Iterator for SeqIter<'s> {
    type Item = Cow<'s, Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.seq.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.seq.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SeqIter<'_> {}
