use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Bounded queue that drops the oldest entry to make room for a new one
/// rather than blocking the producer or rejecting the push. Used between
/// the stream client and the worker pool so a slow store never backs up
/// the TCP read loop.
pub struct IngestQueue<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
}

impl<T> IngestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        IngestQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Push an item, returning the item that was dropped to make room for
    /// it if the queue was already at capacity.
    pub fn push(&self, item: T) -> Option<T> {
        let dropped = {
            let mut guard = self.inner.lock().unwrap();
            let dropped = if guard.len() >= self.capacity {
                guard.pop_front()
            } else {
                None
            };
            guard.push_back(item);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Wait for and remove the oldest item.
    pub async fn pop(&self) -> T {
        loop {
            {
                let mut guard = self.inner.lock().unwrap();
                if let Some(item) = guard.pop_front() {
                    return item;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of capacity currently occupied, in `[0.0, 1.0]`.
    pub fn load_factor(&self) -> f64 {
        self.depth() as f64 / self.capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn push_under_capacity_drops_nothing() {
        let q = IngestQueue::new(2);
        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.depth(), 2);
    }

    #[test]
    fn push_over_capacity_drops_oldest() {
        let q = IngestQueue::new(2);
        q.push(1);
        q.push(2);
        let dropped = q.push(3);
        assert_eq!(dropped, Some(1));
        assert_eq!(q.depth(), 2);
    }

    #[tokio::test]
    async fn pop_returns_items_in_fifo_order() {
        let q = IngestQueue::new(10);
        q.push(1);
        q.push(2);
        assert_eq!(q.pop().await, 1);
        assert_eq!(q.pop().await, 2);
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let q = Arc::new(IngestQueue::new(10));
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.pop().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.push(42);
        let got = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, 42);
    }

    #[test]
    fn load_factor_reflects_depth() {
        let q = IngestQueue::new(4);
        q.push(1);
        assert_eq!(q.load_factor(), 0.25);
    }
}
