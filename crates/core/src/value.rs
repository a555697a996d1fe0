//! Value type definitions for Quiver.
//!
//! This module defines the `Value` enum which represents anything a query can
//! read, compute or return.

use crate::coerce;
use crate::map::FieldMap;
use crate::observable::{Collection, ObjectId, Record};
use crate::types::ValueKind;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// A runtime value.
///
/// `Array` and `Object` are plain, immutable containers (the values produced
/// by array and object literals). `Record` and `Collection` are observable:
/// they have a stable identity and report their mutations.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Null value, also the empty sentinel of path resolution
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Number (double precision, like every number in the query language)
    Number(f64),
    /// UTF-8 string
    String(Rc<str>),
    /// Plain array
    Array(Rc<[Value]>),
    /// Plain object
    Object(Rc<FieldMap>),
    /// Observable record
    Record(Record),
    /// Observable collection
    Collection(Collection),
}

impl Value {
    /// Creates a string value.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// Creates a plain array value.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        Value::Array(Rc::from(items))
    }

    /// Creates a plain object value.
    pub fn object<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(Rc::new(FieldMap::from_pairs(pairs)))
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Record(_) => ValueKind::Record,
            Value::Collection(_) => ValueKind::Collection,
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean if this is a Bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number if this is a Number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the record if this is a Record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the collection if this is a Collection.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the identity of an observable value.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Value::Record(r) => Some(r.id()),
            Value::Collection(c) => Some(c.id()),
            _ => None,
        }
    }

    /// Reads `self[key]`.
    ///
    /// Records and objects are read by string key; arrays and collections by
    /// integer index or `"length"`; strings support `"length"` and indexes,
    /// both counted in chars. Everything else yields `Null`.
    pub fn get_key(&self, key: &Value) -> Value {
        match self {
            Value::Record(record) => record.get(&coerce::to_string(key)),
            Value::Object(map) => map
                .get(&coerce::to_string(key))
                .cloned()
                .unwrap_or(Value::Null),
            Value::Array(items) => match index_of(key) {
                Some(idx) => items.get(idx).cloned().unwrap_or(Value::Null),
                None if is_length_key(key) => Value::from(items.len()),
                None => Value::Null,
            },
            Value::Collection(items) => match index_of(key) {
                Some(idx) => items.get(idx).unwrap_or(Value::Null),
                None if is_length_key(key) => Value::from(items.len()),
                None => Value::Null,
            },
            Value::String(s) => match index_of(key) {
                Some(idx) => s
                    .chars()
                    .nth(idx)
                    .map(|c| {
                        let mut buf = [0u8; 4];
                        Value::string(c.encode_utf8(&mut buf))
                    })
                    .unwrap_or(Value::Null),
                None if is_length_key(key) => Value::from(s.chars().count()),
                None => Value::Null,
            },
            _ => Value::Null,
        }
    }

    /// Returns true if `key` names a field of this record or object.
    pub fn has_key(&self, key: &Value) -> bool {
        match self {
            Value::Record(record) => record.has_field(&coerce::to_string(key)),
            Value::Object(map) => map.contains_key(&coerce::to_string(key)),
            _ => false,
        }
    }
}

fn index_of(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && libm::trunc(*n) == *n && *n < usize::MAX as f64 => {
            Some(*n as usize)
        }
        Value::String(s) => s.parse::<usize>().ok(),
        _ => None,
    }
}

fn is_length_key(key: &Value) -> bool {
    key.as_str() == Some("length")
}

/// Structural equality: plain containers compare by content, observable
/// values by identity, and NaN equals NaN. Query semantics use
/// `coerce::loose_eq` / `coerce::strict_eq` instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.id() == b.id(),
            (Value::Collection(a), Value::Collection(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Rc::from(v))
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<Collection> for Value {
    fn from(v: Collection) -> Self {
        Value::Collection(v)
    }
}

impl From<FieldMap> for Value {
    fn from(v: FieldMap) -> Self {
        Value::Object(Rc::new(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(Rc::from(v))
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
