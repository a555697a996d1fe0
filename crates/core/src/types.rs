//! Value kind definitions.
//!
//! This module defines the kinds a runtime `Value` can take.

/// The kind of a runtime value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Null (also the empty sentinel of path resolution)
    Null,
    /// Boolean
    Bool,
    /// IEEE-754 double
    Number,
    /// UTF-8 string
    String,
    /// Plain, immutable array
    Array,
    /// Plain, immutable object
    Object,
    /// Observable record
    Record,
    /// Observable collection
    Collection,
}

impl ValueKind {
    /// Returns the lowercase name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Record => "record",
            ValueKind::Collection => "collection",
        }
    }

    /// Returns whether values of this kind hold other values.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ValueKind::Array | ValueKind::Object | ValueKind::Record | ValueKind::Collection
        )
    }

    /// Returns whether values of this kind carry an identity and emit changes.
    pub fn is_observable(&self) -> bool {
        matches!(self, ValueKind::Record | ValueKind::Collection)
    }
}
