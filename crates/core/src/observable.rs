//! Observable records and collections.
//!
//! A `Record` has a fixed set of fields; writing one publishes a
//! `(record, Field(key), new, old)` event. A `Collection` is an ordered list
//! of values whose mutators publish `(collection, Content, len, null)` and,
//! when the length changed, `(collection, Length, new_len, old_len)`.
//!
//! Both report through a weakly held `ChangeSink`. A value created without a
//! sink (or whose sink has gone away) mutates silently.

use crate::coerce;
use crate::error::{Error, Result};
use crate::map::FieldMap;
use crate::value::Value;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::cmp::Ordering;
use core::fmt;

/// Identity of an observable value.
pub type ObjectId = u64;

/// What changed on a target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// A record field.
    Field(Rc<str>),
    /// The contents of a collection.
    Content,
    /// The length of a collection.
    Length,
}

impl EventKey {
    /// Creates a field key.
    pub fn field(name: impl AsRef<str>) -> Self {
        EventKey::Field(Rc::from(name.as_ref()))
    }

    /// Returns the field name for field keys.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            EventKey::Field(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Field(name) => write!(f, "{}", name),
            EventKey::Content => write!(f, ".content"),
            EventKey::Length => write!(f, ".length"),
        }
    }
}

/// A single change notification.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub target: ObjectId,
    pub key: EventKey,
    pub new: Value,
    pub old: Value,
}

impl ChangeEvent {
    /// Creates a new change event.
    pub fn new(target: ObjectId, key: EventKey, new: Value, old: Value) -> Self {
        Self {
            target,
            key,
            new,
            old,
        }
    }
}

/// Receiver of change events.
///
/// Implementations may dispatch listeners synchronously from `publish`, so
/// callers must not hold any borrow of the mutated value while publishing.
pub trait ChangeSink {
    /// Publishes one event.
    fn publish(&self, event: ChangeEvent) -> Result<()>;

    /// Publishes several events as one batch.
    fn publish_all(&self, events: Vec<ChangeEvent>) -> Result<()> {
        for event in events {
            self.publish(event)?;
        }
        Ok(())
    }
}

fn emit(sink: &Option<Weak<dyn ChangeSink>>, events: Vec<ChangeEvent>) -> Result<()> {
    match sink.as_ref().and_then(Weak::upgrade) {
        Some(sink) => sink.publish_all(events),
        None => Ok(()),
    }
}

struct RecordInner {
    id: ObjectId,
    fields: RefCell<FieldMap>,
    sink: Option<Weak<dyn ChangeSink>>,
}

/// An observable record with a fixed set of fields.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Creates a record that publishes its changes to `sink`.
    pub fn new(id: ObjectId, fields: FieldMap, sink: Weak<dyn ChangeSink>) -> Self {
        Self::build(id, fields, Some(sink))
    }

    /// Creates a record that publishes nothing.
    pub fn detached(id: ObjectId, fields: FieldMap) -> Self {
        Self::build(id, fields, None)
    }

    fn build(id: ObjectId, fields: FieldMap, sink: Option<Weak<dyn ChangeSink>>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                id,
                fields: RefCell::new(fields),
                sink,
            }),
        }
    }

    /// Returns the record's identity.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Reads a field; undeclared fields read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .fields
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Returns true if the record declares `key`.
    pub fn has_field(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    /// Returns the declared field names in sorted order.
    pub fn field_names(&self) -> Vec<String> {
        self.inner
            .fields
            .borrow()
            .keys()
            .map(String::from)
            .collect()
    }

    /// Returns a copy of the current field values.
    pub fn snapshot(&self) -> FieldMap {
        self.inner.fields.borrow().clone()
    }

    /// Writes a declared field and publishes the change.
    ///
    /// Writing a value strictly equal to the current one does nothing.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let old = {
            let mut fields = self.inner.fields.borrow_mut();
            let slot = fields.get_mut(key).ok_or_else(|| Error::unknown_field(key))?;
            if coerce::strict_eq(slot, &value) {
                return Ok(());
            }
            core::mem::replace(slot, value.clone())
        };
        emit(
            &self.inner.sink,
            vec![ChangeEvent::new(self.id(), EventKey::field(key), value, old)],
        )
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(#{})", self.id())
    }
}

struct CollectionInner {
    id: ObjectId,
    items: RefCell<Vec<Value>>,
    sink: Option<Weak<dyn ChangeSink>>,
    retained: RefCell<Option<Rc<dyn Any>>>,
}

/// An observable, ordered collection of values.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

/// A handle that does not keep its collection alive.
#[derive(Clone)]
pub struct WeakCollection {
    inner: Weak<CollectionInner>,
}

impl WeakCollection {
    /// Returns the collection if it is still alive.
    pub fn upgrade(&self) -> Option<Collection> {
        self.inner.upgrade().map(|inner| Collection { inner })
    }
}

impl Collection {
    /// Creates a collection that publishes its changes to `sink`.
    pub fn new(id: ObjectId, items: Vec<Value>, sink: Weak<dyn ChangeSink>) -> Self {
        Self::build(id, items, Some(sink))
    }

    /// Creates a collection that publishes nothing.
    pub fn detached(id: ObjectId, items: Vec<Value>) -> Self {
        Self::build(id, items, None)
    }

    fn build(id: ObjectId, items: Vec<Value>, sink: Option<Weak<dyn ChangeSink>>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                id,
                items: RefCell::new(items),
                sink,
                retained: RefCell::new(None),
            }),
        }
    }

    /// Returns the collection's identity.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Returns a handle that does not keep the collection alive.
    pub fn downgrade(&self) -> WeakCollection {
        WeakCollection {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Returns the item at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Returns the first item.
    pub fn first(&self) -> Option<Value> {
        self.get(0)
    }

    /// Returns a copy of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    /// Returns true if an observable item with identity `id` is a member.
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.inner
            .items
            .borrow()
            .iter()
            .any(|item| item.object_id() == Some(id))
    }

    /// Ties the lifetime of `state` to this collection.
    ///
    /// Any previously retained state is released.
    pub fn retain(&self, state: Rc<dyn Any>) {
        let previous = self.inner.retained.borrow_mut().replace(state);
        drop(previous);
    }

    /// Applies `mutate` to the items, then publishes content and length events.
    ///
    /// Values removed by `mutate` are dropped only after the borrow ends.
    fn mutate<T>(&self, mutate: impl FnOnce(&mut Vec<Value>) -> Result<T>) -> Result<T> {
        let (result, old_len, new_len) = {
            let mut items = self.inner.items.borrow_mut();
            let old_len = items.len();
            let result = mutate(&mut items)?;
            (result, old_len, items.len())
        };
        self.publish_change(old_len, new_len)?;
        Ok(result)
    }

    fn publish_change(&self, old_len: usize, new_len: usize) -> Result<()> {
        let mut events = vec![ChangeEvent::new(
            self.id(),
            EventKey::Content,
            Value::from(new_len),
            Value::Null,
        )];
        if new_len != old_len {
            events.push(ChangeEvent::new(
                self.id(),
                EventKey::Length,
                Value::from(new_len),
                Value::from(old_len),
            ));
        }
        emit(&self.inner.sink, events)
    }

    /// Appends an item.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.mutate(|items| {
            items.push(value);
            Ok(())
        })
    }

    /// Prepends an item.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.mutate(|items| {
            items.insert(0, value);
            Ok(())
        })
    }

    /// Inserts an item at `index` (`index <= len`).
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.mutate(|items| {
            if index > items.len() {
                return Err(Error::invalid_operation("insert index out of bounds"));
            }
            items.insert(index, value);
            Ok(())
        })
    }

    /// Removes and returns the last item.
    pub fn pop(&self) -> Result<Option<Value>> {
        self.mutate(|items| Ok(items.pop()))
    }

    /// Removes and returns the first item.
    pub fn shift(&self) -> Result<Option<Value>> {
        self.mutate(|items| {
            if items.is_empty() {
                Ok(None)
            } else {
                Ok(Some(items.remove(0)))
            }
        })
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&self, index: usize) -> Result<Value> {
        self.mutate(|items| {
            if index >= items.len() {
                return Err(Error::invalid_operation("remove index out of bounds"));
            }
            Ok(items.remove(index))
        })
    }

    /// Reverses the items in place.
    pub fn reverse(&self) -> Result<()> {
        self.mutate(|items| {
            items.reverse();
            Ok(())
        })
    }

    /// Sorts the items with `compare`.
    ///
    /// `compare` runs without any borrow of the collection held.
    pub fn sort_by<F>(&self, compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut sorted = self.to_vec();
        sorted.sort_by(compare);
        self.replace_all(sorted)
    }

    /// Writes the item at `index`, padding with `Null` past the end.
    pub fn set_item(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let replaced = self.mutate(|items| {
            if index < items.len() {
                Ok(Some(core::mem::replace(&mut items[index], value)))
            } else {
                items.resize(index, Value::Null);
                items.push(value);
                Ok(None)
            }
        })?;
        drop(replaced);
        Ok(())
    }

    /// Replaces every item.
    pub fn replace_all(&self, items: Vec<Value>) -> Result<()> {
        let previous = self.mutate(|current| Ok(core::mem::replace(current, items)))?;
        drop(previous);
        Ok(())
    }

    /// Reads `key` from the first item when it is a record or object.
    pub fn attr(&self, key: &str) -> Value {
        match self.first() {
            Some(Value::Record(record)) => record.get(key),
            Some(Value::Object(map)) => map.get(key).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Writes `key` on every member record that declares it.
    ///
    /// Members that are not records, or lack the field, are skipped.
    pub fn set_attr(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        for item in self.to_vec() {
            if let Value::Record(record) = item {
                if record.has_field(key) {
                    record.set(key, value.clone())?;
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collection(#{})", self.id())
    }
}
