//! Job Queue
//!
//! A ready-made scheduler hook that coalesces notifications. Effects created
//! with [`JobQueue::scheduler`] are queued instead of re-run when a
//! dependency changes; queuing an effect that is already pending is a no-op.
//! The host decides when to [`flush`](JobQueue::flush), for example once per
//! frame or at the end of an event handler.
//!
//! Effects that keep re-queuing each other are cut off: within one flush a
//! job runs at most `1 + max_reentrancy` times (see
//! [`RuntimeConfig`](crate::RuntimeConfig)), after which it is dropped with a
//! warning.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use weft_core::reactive::{Effect, EffectOptions, JobQueue, Ref};
//!
//! let queue = JobQueue::new();
//! let count = Ref::new(0);
//! let runs = Rc::new(Cell::new(0));
//!
//! let _effect = Effect::with_options(
//!     {
//!         let (count, runs) = (count.clone(), runs.clone());
//!         move || {
//!             count.get();
//!             runs.set(runs.get() + 1);
//!         }
//!     },
//!     EffectOptions::new().scheduler(queue.scheduler()),
//! );
//!
//! count.set(1);
//! count.set(2);
//! assert_eq!(queue.len(), 1);
//!
//! queue.flush();
//! assert_eq!(runs.get(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::effect::Effect;
use super::runtime::Runtime;
use super::subscriber::SubscriberId;

type Job = Box<dyn Fn()>;

/// Pending effects, deduplicated by ID, run in first-queued order.
#[derive(Clone, Default)]
pub struct JobQueue {
    jobs: Rc<RefCell<IndexMap<SubscriberId, Job>>>,
    flushing: Rc<Cell<bool>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `effect` unless it is already pending.
    ///
    /// The queue holds the effect weakly; an effect dropped before the flush
    /// is skipped.
    pub fn enqueue<T: 'static>(&self, effect: &Effect<T>) {
        let weak = effect.downgrade();
        self.jobs
            .borrow_mut()
            .entry(effect.id())
            .or_insert_with(|| {
                Box::new(move || {
                    if let Some(effect) = weak.upgrade() {
                        if let Err(err) = effect.run() {
                            warn!(%err, "queued run refused");
                        }
                    }
                })
            });
    }

    /// A scheduler hook that queues on this queue.
    pub fn scheduler<T: 'static>(&self) -> impl Fn(&Effect<T>) + 'static {
        let queue = self.clone();
        move |effect: &Effect<T>| queue.enqueue(effect)
    }

    /// Run pending jobs until the queue is empty.
    ///
    /// Jobs queued while flushing run in the same flush. A flush started from
    /// inside a job returns immediately. Returns the number of jobs run.
    pub fn flush(&self) -> usize {
        if self.flushing.replace(true) {
            return 0;
        }
        let _flushing = FlushGuard(&self.flushing);

        let limit = Runtime::config().max_reentrancy;
        let mut runs: HashMap<SubscriberId, usize> = HashMap::new();
        let mut ran = 0;
        loop {
            let next = self.jobs.borrow_mut().shift_remove_index(0);
            let Some((id, job)) = next else {
                break;
            };
            let count = runs.entry(id).or_insert(0);
            if *count > limit {
                warn!(%id, limit, "job re-queued too often in one flush, dropped");
                continue;
            }
            *count += 1;
            job();
            ran += 1;
        }

        if ran > 0 {
            debug!(ran, "flushed job queue");
        }
        ran
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }

    /// Check whether `id` is pending.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.jobs.borrow().contains_key(&id)
    }
}

/// Clears the flushing flag, also when a job panics.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.jobs.borrow().keys().collect::<Vec<_>>())
            .field("flushing", &self.flushing.get())
            .finish()
    }
}
