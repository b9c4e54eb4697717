//! Notification bus delivering final results to registered listeners.
//!
//! Listeners are invoked synchronously, in registration order, by the
//! thread that detects a task's completion. Delivery is serialized: a
//! result reaches every listener before the next result is processed.
//! Contract on subscribers: callbacks must be quick and must never block
//! on spooler operations, since they run under the registry lock.

use std::sync::Mutex;

use sluice_types::SpoolerResult;
use tokio::sync::mpsc;

type Listener = Box<dyn Fn(&SpoolerResult) + Send + Sync>;

/// Registry of result listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked for every emitted result.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SpoolerResult) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .push(Box::new(listener));
    }

    /// Register a channel listener and return its receiving end.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<SpoolerResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(move |result| {
            // Receiver may have been dropped; emission must not fail.
            let _ = tx.send(result.clone());
        });
        rx
    }

    /// Deliver a result to all listeners, serialized against other calls.
    pub fn notify(&self, result: &SpoolerResult) {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener(result);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().expect("listener lock poisoned").len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use sluice_types::{code, ContentHash};

    use super::*;

    fn result(rc: i32) -> SpoolerResult {
        SpoolerResult {
            return_code: rc,
            local_path: PathBuf::from("/data/f"),
            content_hash: ContentHash::NULL,
            file_chunks: Vec::new(),
        }
    }

    #[test]
    fn test_all_listeners_receive_each_result() {
        let registry = ListenerRegistry::new();
        let seen_a = Arc::new(AtomicUsize::new(0));
        let seen_b = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&seen_a);
        registry.subscribe(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let b = Arc::clone(&seen_b);
        registry.subscribe(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&result(code::OK));
        registry.notify(&result(code::UPLOAD_FAILURE));

        assert_eq!(seen_a.load(Ordering::SeqCst), 2);
        assert_eq!(seen_b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = ListenerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.subscribe(move |_| order.lock().unwrap().push(tag));
        }

        registry.notify(&result(code::OK));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_channel_listener() {
        let registry = ListenerRegistry::new();
        let mut rx = registry.subscribe_channel();

        registry.notify(&result(code::OK));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.return_code, code::OK);
    }

    #[test]
    fn test_dropped_channel_receiver_is_harmless() {
        let registry = ListenerRegistry::new();
        let rx = registry.subscribe_channel();
        drop(rx);
        registry.notify(&result(code::OK));
    }
}
