//! Change bus: listener routing, event coalescing and batched dispatch.
//!
//! Publishing an event while the bus is idle starts a dispatch. Each cycle
//! takes a snapshot of the pending queue, invokes the matching listeners for
//! every event, then flushes the invalidation scheduler. Events published
//! during a cycle (by listeners or recompute jobs) form the next batch.
//! The number of cycles per dispatch is capped.

use crate::listener::{Listener, ListenerRegistry};
use crate::scheduler::Scheduler;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::mem;
use hashbrown::HashMap;
use quiver_core::{coerce, ChangeEvent, ChangeSink, Error, EventKey, ObjectId, Result};

/// Default ceiling on notification cycles per dispatch.
pub const DEFAULT_MAX_NOTIFY_CYCLES: usize = 128;

/// Events since the last dispatch, coalesced per `(target, key)`.
#[derive(Default)]
struct PendingQueue {
    slots: Vec<Option<ChangeEvent>>,
    index: HashMap<(ObjectId, EventKey), usize>,
}

impl PendingQueue {
    /// Queues `event`, merging it into a pending event on the same pair.
    ///
    /// Returns whatever was superseded so the caller can drop it later.
    fn enqueue(&mut self, mut event: ChangeEvent) -> [Option<ChangeEvent>; 2] {
        let pair = (event.target, event.key.clone());
        let Some(&idx) = self.index.get(&pair) else {
            self.index.insert(pair, self.slots.len());
            self.slots.push(Some(event));
            return [None, None];
        };
        match self.slots.get_mut(idx) {
            Some(slot) => {
                let reverted = slot
                    .as_ref()
                    .is_some_and(|pending| coerce::strict_eq(&event.new, &pending.old));
                if reverted {
                    self.index.remove(&pair);
                    [slot.take(), Some(event)]
                } else {
                    if let Some(pending) = slot.as_mut() {
                        mem::swap(&mut pending.new, &mut event.new);
                    }
                    [Some(event), None]
                }
            }
            None => [Some(event), None],
        }
    }

    fn take(&mut self) -> Vec<ChangeEvent> {
        self.index.clear();
        mem::take(&mut self.slots).into_iter().flatten().collect()
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Routes change events to listeners and drives the invalidation scheduler.
///
/// The bus also hands out `ObjectId`s for the observable values it serves.
pub struct ChangeBus {
    listeners: RefCell<ListenerRegistry>,
    queue: RefCell<PendingQueue>,
    scheduler: Scheduler,
    /// Set while dispatching or inside `batch`
    dispatching: Cell<bool>,
    max_notify_cycles: usize,
    next_id: Cell<ObjectId>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTIFY_CYCLES)
    }
}

impl ChangeBus {
    /// Creates a bus allowing at most `max_notify_cycles` cycles per dispatch.
    pub fn new(max_notify_cycles: usize) -> Self {
        Self {
            listeners: RefCell::new(ListenerRegistry::new()),
            queue: RefCell::new(PendingQueue::default()),
            scheduler: Scheduler::new(),
            dispatching: Cell::new(false),
            max_notify_cycles,
            next_id: Cell::new(1),
        }
    }

    /// Returns a weak sink handle for records and collections.
    pub fn sink(self: &Rc<Self>) -> Weak<dyn ChangeSink> {
        let weak: Weak<ChangeBus> = Rc::downgrade(self);
        weak
    }

    /// Allocates a fresh object identity.
    pub fn next_object_id(&self) -> ObjectId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Returns the invalidation scheduler flushed after every cycle.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the cycle ceiling.
    pub fn max_notify_cycles(&self) -> usize {
        self.max_notify_cycles
    }

    /// Returns true while a dispatch or batch is open.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Returns the number of queued events.
    pub fn pending_len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Registers a listener; `None` is a wildcard on either side.
    ///
    /// Returns false if it was already registered on this pair.
    pub fn subscribe(&self, target: Option<ObjectId>, key: Option<EventKey>, listener: Listener) -> bool {
        self.listeners.borrow_mut().add(target, key, listener)
    }

    /// Removes a listener. Unknown listeners are ignored.
    pub fn unsubscribe(
        &self,
        target: Option<ObjectId>,
        key: Option<EventKey>,
        listener: &Listener,
    ) -> bool {
        let removed = self.listeners.borrow_mut().remove(target, key, listener);
        removed.is_some()
    }

    /// Returns true if an event on `(target, key)` would reach a listener.
    pub fn has_listeners(&self, target: ObjectId, key: &EventKey) -> bool {
        self.listeners.borrow().has_listeners(target, key)
    }

    /// Returns the total number of listener registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Queues an event and dispatches if the bus is idle.
    ///
    /// Events whose new value strictly equals the old one, or that no
    /// listener would receive, are dropped.
    pub fn publish(&self, event: ChangeEvent) -> Result<()> {
        self.enqueue(event);
        self.dispatch_if_idle()
    }

    /// Queues several events and dispatches them together.
    pub fn publish_all(&self, events: Vec<ChangeEvent>) -> Result<()> {
        for event in events {
            self.enqueue(event);
        }
        self.dispatch_if_idle()
    }

    /// Runs `f` with dispatch held, then dispatches everything it published
    /// as one batch.
    ///
    /// Changes to the same `(target, key)` inside `f` coalesce; a value set
    /// back to its original notifies nobody. Nested batches join the outer one.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        if self.dispatching.get() {
            return Ok(f());
        }
        let value = {
            let _held = DispatchGuard::hold(&self.dispatching);
            f()
        };
        self.dispatch_if_idle()?;
        Ok(value)
    }

    fn enqueue(&self, event: ChangeEvent) {
        if coerce::strict_eq(&event.new, &event.old)
            || !self.listeners.borrow().has_listeners(event.target, &event.key)
        {
            return;
        }
        let superseded = self.queue.borrow_mut().enqueue(event);
        drop(superseded);
    }

    fn dispatch_if_idle(&self) -> Result<()> {
        if self.dispatching.get() || self.queue.borrow().is_empty() {
            return Ok(());
        }
        let result = {
            let _held = DispatchGuard::hold(&self.dispatching);
            self.run_cycles()
        };
        if result.is_err() {
            let dropped = self.queue.borrow_mut().take();
            drop(dropped);
            self.scheduler.clear();
        }
        result
    }

    fn run_cycles(&self) -> Result<()> {
        let mut cycles = 0;
        while !self.queue.borrow().is_empty() {
            if cycles == self.max_notify_cycles {
                tracing::warn!(
                    limit = self.max_notify_cycles,
                    pending = self.pending_len(),
                    "too many notification cycles, dropping pending changes"
                );
                return Err(Error::cycle_overrun(self.max_notify_cycles));
            }
            cycles += 1;

            let batch = self.queue.borrow_mut().take();
            tracing::trace!(cycle = cycles, events = batch.len(), "dispatching batch");
            for event in &batch {
                let callbacks = self.listeners.borrow().matching(event.target, &event.key);
                for callback in callbacks {
                    callback(event);
                }
            }
            drop(batch);

            self.scheduler.flush()?;
        }
        Ok(())
    }
}

/// Keeps the bus in dispatching mode until dropped, unwinding included.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn hold(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ChangeSink for ChangeBus {
    fn publish(&self, event: ChangeEvent) -> Result<()> {
        ChangeBus::publish(self, event)
    }

    fn publish_all(&self, events: Vec<ChangeEvent>) -> Result<()> {
        ChangeBus::publish_all(self, events)
    }
}
