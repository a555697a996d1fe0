//! Listening to a collection.

use crate::engine::Engine;
use quiver_core::{ChangeEvent, Collection, EventKey, ObjectId};
use quiver_reactive::Listener;
use std::rc::Rc;

/// What to listen for on a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionEvent {
    /// Any change to the collection's items
    Content,
    /// A change in the number of items
    Length,
    /// A field change on a record currently in the collection
    Field(String),
}

/// A registration made by [`Engine::on`].
pub struct ListenerHandle {
    target: Option<ObjectId>,
    key: EventKey,
    listener: Listener,
}

impl ListenerHandle {
    pub fn key(&self) -> &EventKey {
        &self.key
    }
}

impl Engine {
    /// Calls `callback` for every matching change to `collection`.
    ///
    /// Field listeners fire only for records that are members at the time of
    /// the change. The registration holds the collection weakly.
    pub fn on<F>(&self, collection: &Collection, event: CollectionEvent, callback: F) -> ListenerHandle
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        let (target, key, listener): (Option<ObjectId>, EventKey, Listener) = match event {
            CollectionEvent::Content => (Some(collection.id()), EventKey::Content, Rc::new(callback)),
            CollectionEvent::Length => (Some(collection.id()), EventKey::Length, Rc::new(callback)),
            CollectionEvent::Field(name) => {
                let members = collection.downgrade();
                let filtered = move |event: &ChangeEvent| {
                    let is_member = members
                        .upgrade()
                        .is_some_and(|members| members.contains_object(event.target));
                    if is_member {
                        callback(event);
                    }
                };
                (None, EventKey::field(name), Rc::new(filtered))
            }
        };
        self.bus().subscribe(target, Some(key.clone()), listener.clone());
        ListenerHandle {
            target,
            key,
            listener,
        }
    }

    /// Removes a registration made by [`on`](Self::on).
    ///
    /// Returns false if it was already removed.
    pub fn off(&self, handle: &ListenerHandle) -> bool {
        self.bus()
            .unsubscribe(handle.target, Some(handle.key.clone()), &handle.listener)
    }
}
