//! Concurrent FIFO with an async blocking pop

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// FIFO queue safe to push from browser callbacks while the engine pops
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
    closed: AtomicBool,
    total_pushed: AtomicUsize,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            closed: AtomicBool::new(false),
            total_pushed: AtomicUsize::new(0),
        }
    }
}

impl<T> WorkQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new item and count it towards the lifetime total
    pub fn push(&self, item: T) {
        self.total_pushed.fetch_add(1, Ordering::SeqCst);
        self.enqueue(item);
    }

    /// Append a new item only while the lifetime total is below `limit`
    ///
    /// The slot is reserved atomically, so concurrent pushers never overshoot.
    pub fn push_bounded(&self, item: T, limit: Option<usize>) -> bool {
        let Some(limit) = limit else {
            self.push(item);
            return true;
        };

        let reserved = self
            .total_pushed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                (total < limit).then_some(total + 1)
            })
            .is_ok();

        if reserved {
            self.enqueue(item);
        }
        reserved
    }

    /// Put an item back at the tail without touching the lifetime total
    pub fn requeue(&self, item: T) {
        self.enqueue(item);
    }

    fn enqueue(&self, item: T) {
        self.items.lock().push_back(item);
        self.available.notify_one();
    }

    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Wait for the next item
    ///
    /// Returns `None` only once the queue has been closed and is empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Stop blocking poppers; remaining items can still be popped
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.available.notify_waiters();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop every pending item, returning how many were discarded
    pub fn flush(&self) -> usize {
        let mut items = self.items.lock();
        let count = items.len();
        items.clear();
        count
    }

    /// Empty the queue, zero the counter and reopen it
    pub fn reset(&self) {
        self.items.lock().clear();
        self.total_pushed.store(0, Ordering::SeqCst);
        self.closed.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    #[must_use]
    pub fn total_pushed(&self) -> usize {
        self.total_pushed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(WorkQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(7_u32);

        let popped = tokio::time::timeout(Duration::from_secs(1), popper)
            .await
            .expect("pop should wake")
            .expect("task should not panic");
        assert_eq!(popped, Some(7));
    }

    #[tokio::test]
    async fn close_releases_waiters() {
        let queue: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let popped = tokio::time::timeout(Duration::from_secs(1), popper)
            .await
            .expect("close should wake")
            .expect("task should not panic");
        assert_eq!(popped, None);
    }

    #[test]
    fn bounded_push_stops_at_limit() {
        let queue = WorkQueue::new();
        assert!(queue.push_bounded(1, Some(2)));
        assert!(queue.push_bounded(2, Some(2)));
        assert!(!queue.push_bounded(3, Some(2)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.total_pushed(), 2);

        queue.requeue(4);
        assert_eq!(queue.total_pushed(), 2);
        assert_eq!(queue.len(), 3);
    }
}
