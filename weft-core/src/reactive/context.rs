//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a tracked read happens,
//! the computation on top of the stack is credited with it.
//!
//! # Implementation
//!
//! We use a thread-local stack of running computations. Entering a context
//! pushes the computation and returns a guard; dropping the guard pops it.
//! Because the pop happens in `Drop`, it also happens when the computation's
//! body panics, so a failing computation cannot leave a stale entry behind
//! for unrelated computations to inherit.
//!
//! Nested contexts (an effect that runs another effect, a computed read
//! inside an effect) resolve fully before the outer one resumes, and reads
//! made by the inner computation are credited only to it.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Rc<dyn Subscriber>>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
    /// Stack height before this context was pushed.
    depth: usize,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// The context is exited when the returned guard is dropped.
    pub(crate) fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let subscriber_id = subscriber.id();
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(subscriber);
            stack.len() - 1
        });

        Self {
            subscriber_id,
            depth,
        }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.id()))
    }

    /// The computation that receives credit for reads right now.
    pub(crate) fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// How many times `id` is on the stack.
    pub fn depth_of(id: SubscriberId) -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().iter().filter(|entry| entry.id() == id).count())
    }

    /// Number of running computations, outermost included.
    pub fn stack_depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // Guards may outlive the thread-local during thread teardown.
        let popped = CONTEXT_STACK
            .try_with(|stack| {
                let mut stack = stack.borrow_mut();
                // Truncate rather than pop so the previous top is restored
                // exactly even if an inner guard was leaked.
                if stack.len() > self.depth {
                    stack.split_off(self.depth)
                } else {
                    Vec::new()
                }
            })
            .unwrap_or_default();

        if let Some(entry) = popped.first() {
            debug_assert_eq!(
                entry.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {}, got {}",
                self.subscriber_id,
                entry.id()
            );
        }
        // `popped` may hold the last handle to a computation; it drops here,
        // outside the stack borrow.
    }
}
