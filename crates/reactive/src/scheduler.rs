//! Invalidation scheduler.
//!
//! Listeners do not recompute results directly; they mark the result set
//! dirty with a recompute job. The bus flushes the scheduler after each
//! batch, so a result set is recomputed at most once per notification cycle.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::mem;
use hashbrown::HashSet;
use quiver_core::{ObjectId, Result};

/// A recompute job.
pub type Job = Rc<dyn Fn() -> Result<()>>;

/// Insertion-ordered set of dirty ids with their jobs.
#[derive(Default)]
struct DirtySet {
    order: VecDeque<(ObjectId, Job)>,
    ids: HashSet<ObjectId>,
}

impl DirtySet {
    fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    fn insert(&mut self, id: ObjectId, job: Job) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back((id, job));
        true
    }

    fn pop(&mut self) -> Option<(ObjectId, Job)> {
        let entry = self.order.pop_front()?;
        self.ids.remove(&entry.0);
        Some(entry)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Batches recompute jobs keyed by result-set identity.
#[derive(Default)]
pub struct Scheduler {
    /// Marked since the last flush started
    invalidated: RefCell<DirtySet>,
    /// Still waiting in the running flush
    pending: RefCell<DirtySet>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `job` for `id`.
    ///
    /// Returns false (and drops `job`) if `id` already has a job waiting,
    /// either for the next flush or in the running one.
    pub fn mark_dirty(&self, id: ObjectId, job: Job) -> bool {
        if self.pending.borrow().contains(id) {
            return false;
        }
        let added = self.invalidated.borrow_mut().insert(id, job);
        if added {
            tracing::trace!(id, "result set invalidated");
        }
        added
    }

    /// Returns true if `id` has a job waiting.
    pub fn is_dirty(&self, id: ObjectId) -> bool {
        self.invalidated.borrow().contains(id) || self.pending.borrow().contains(id)
    }

    /// Returns the number of jobs marked for the next flush.
    pub fn dirty_count(&self) -> usize {
        self.invalidated.borrow().len()
    }

    /// Runs every job marked so far, in marking order.
    ///
    /// Jobs marked while flushing wait for the next flush. The first failing
    /// job aborts the flush; the jobs after it are discarded.
    pub fn flush(&self) -> Result<()> {
        let marked = mem::take(&mut *self.invalidated.borrow_mut());
        let previous = mem::replace(&mut *self.pending.borrow_mut(), marked);
        drop(previous);

        loop {
            let next = self.pending.borrow_mut().pop();
            let Some((_, job)) = next else {
                return Ok(());
            };
            if let Err(err) = job() {
                let discarded = mem::take(&mut *self.pending.borrow_mut());
                drop(discarded);
                return Err(err);
            }
        }
    }

    /// Drops every waiting job.
    pub fn clear(&self) {
        let invalidated = mem::take(&mut *self.invalidated.borrow_mut());
        let pending = mem::take(&mut *self.pending.borrow_mut());
        drop((invalidated, pending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use quiver_core::Error;

    fn recording_job(log: &Rc<RefCell<Vec<ObjectId>>>, id: ObjectId) -> Job {
        let log = log.clone();
        Rc::new(move || {
            log.borrow_mut().push(id);
            Ok(())
        })
    }

    #[test]
    fn test_flush_runs_in_marking_order() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.mark_dirty(3, recording_job(&log, 3));
        scheduler.mark_dirty(1, recording_job(&log, 1));
        scheduler.mark_dirty(2, recording_job(&log, 2));
        assert_eq!(scheduler.dirty_count(), 3);

        scheduler.flush().unwrap();
        assert_eq!(*log.borrow(), [3, 1, 2]);
        assert_eq!(scheduler.dirty_count(), 0);
    }

    #[test]
    fn test_mark_dirty_keeps_first_job() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        assert!(scheduler.mark_dirty(1, recording_job(&log, 10)));
        assert!(!scheduler.mark_dirty(1, recording_job(&log, 20)));

        scheduler.flush().unwrap();
        assert_eq!(*log.borrow(), [10]);
    }

    #[test]
    fn test_mark_during_flush() {
        let scheduler = Rc::new(Scheduler::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        // Job 1 marks 2, still waiting in this flush, and 3.
        let job: Job = {
            let scheduler = Rc::downgrade(&scheduler);
            let log = log.clone();
            let log2 = log.clone();
            Rc::new(move || {
                log.borrow_mut().push(1);
                if let Some(scheduler) = scheduler.upgrade() {
                    scheduler.mark_dirty(2, recording_job(&log2, 99));
                    scheduler.mark_dirty(3, recording_job(&log2, 3));
                }
                Ok(())
            })
        };
        scheduler.mark_dirty(1, job);
        scheduler.mark_dirty(2, recording_job(&log, 2));

        scheduler.flush().unwrap();
        assert_eq!(*log.borrow(), [1, 2]);
        assert!(scheduler.is_dirty(3));

        scheduler.flush().unwrap();
        assert_eq!(*log.borrow(), [1, 2, 3]);
    }

    #[test]
    fn test_error_aborts_flush() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.mark_dirty(1, Rc::new(|| -> Result<()> { Err(Error::invalid_operation("boom")) }));
        scheduler.mark_dirty(2, recording_job(&log, 2));

        assert!(scheduler.flush().is_err());
        assert!(!scheduler.is_dirty(2));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_clear() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler.mark_dirty(1, recording_job(&log, 1));
        scheduler.clear();
        scheduler.flush().unwrap();
        assert!(log.borrow().is_empty());
    }
}
