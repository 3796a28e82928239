//! Marshalling of engine callbacks onto the coordinator's owner context.
//!
//! Engine completion can arrive on the compositor's signalling thread. Before it
//! touches coordinator state it goes through a [`Dispatcher`], which decides
//! where the follow-up runs.

use std::collections::VecDeque;

use parking_lot::Mutex;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs tasks immediately on the calling thread. Coordinator state is guarded
/// by its own lock, so this is sound from any thread; use [`OwnerQueue`] when all
/// state changes must happen on the owner thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Queues tasks until the owner thread drains them with [`OwnerQueue::run_pending`].
#[derive(Default)]
pub struct OwnerQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl OwnerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run queued tasks on the calling (owner) thread, including tasks queued
    /// by the tasks themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        // Pop one at a time so a task can dispatch more work without deadlocking.
        loop {
            let next = self.tasks.lock().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Dispatcher for OwnerQueue {
    fn dispatch(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for OwnerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn owner_queue_defers_until_drained() {
        let queue = Arc::new(OwnerQueue::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let remote = {
            let queue = queue.clone();
            let hits = hits.clone();
            std::thread::spawn(move || {
                queue.dispatch(Box::new(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }));
            })
        };
        remote.join().expect("dispatch thread");

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_may_enqueue_more_work() {
        let queue = Arc::new(OwnerQueue::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let (q, h) = (queue.clone(), hits.clone());
        queue.dispatch(Box::new(move || {
            let h2 = h.clone();
            q.dispatch(Box::new(move || {
                h2.fetch_add(1, Ordering::SeqCst);
            }));
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        InlineDispatcher.dispatch(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
