use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use tokio::sync::watch;

/// Latest-value channels keyed by topic. Subscribers always see the newest
/// snapshot; intermediate ones may be skipped.
pub struct Topics<K, V> {
    senders: Mutex<HashMap<K, watch::Sender<V>>>,
}

impl<K, V> Default for Topics<K, V> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Topics<K, V> {
    /// Subscribes to `key`, seeding the topic with `current` when nobody
    /// watched it yet.
    pub fn subscribe(&self, key: K, current: V) -> watch::Receiver<V> {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        match senders.get(&key) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = watch::channel(current);
                senders.insert(key, sender);
                receiver
            }
        }
    }

    pub fn is_watched(&self, key: &K) -> bool {
        let senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders
            .get(key)
            .map(|s| s.receiver_count() > 0)
            .unwrap_or(false)
    }

    /// Pushes `value` to the subscribers of `key`; topics without
    /// subscribers are dropped.
    pub fn publish(&self, key: &K, value: V) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = senders.get(key) {
            if sender.receiver_count() == 0 {
                senders.remove(key);
            } else {
                sender.send_replace(value);
            }
        }
    }

    /// Ends the topic. Pending `changed()` calls return an error.
    pub fn close(&self, key: &K) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let topics = Topics::<u8, u32>::default();
        let mut rx = topics.subscribe(1, 10);
        assert_eq!(*rx.borrow(), 10);

        topics.publish(&1, 11);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 11);

        // A second subscriber joins the existing topic.
        let late = topics.subscribe(1, 0);
        assert_eq!(*late.borrow(), 11);
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let topics = Topics::<u8, u32>::default();
        let mut rx = topics.subscribe(1, 0);
        topics.close(&1);
        assert!(rx.changed().await.is_err());
        assert!(!topics.is_watched(&1));
    }

    #[test]
    fn test_unwatched_topics_are_dropped() {
        let topics = Topics::<u8, u32>::default();
        drop(topics.subscribe(1, 0));
        topics.publish(&1, 5);
        assert!(!topics.is_watched(&1));
    }
}
