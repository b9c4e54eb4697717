//! An [`UploadStore`] wrapper that injects failures and random latency.
//!
//! `FaultStore` wraps any `Arc<dyn UploadStore>`; selected puts (by
//! global sequence number) fail with an injected error, and every put
//! may be delayed by a seeded random duration. Used to exercise the
//! aggregation state machine under out-of-order and partially failing
//! sub-uploads.
//!
//! # Example
//!
//! ```ignore
//! let flaky = FaultStore::new(inner)
//!     .fail_puts(&[2])          // third put fails
//!     .put_latency(1, 10)       // 1–10 ms per put
//!     .seed(42);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::StoreError;
use crate::traits::UploadStore;

/// Fault- and latency-injecting wrapper around another driver.
pub struct FaultStore {
    inner: Arc<dyn UploadStore>,
    fail_puts: HashSet<u64>,
    put_latency_ms: (u64, u64),
    put_counter: AtomicU64,
    rng: Mutex<StdRng>,
}

impl FaultStore {
    /// Wrap an existing store as a pass-through (no faults, no latency).
    pub fn new(inner: Arc<dyn UploadStore>) -> Self {
        Self {
            inner,
            fail_puts: HashSet::new(),
            put_latency_ms: (0, 0),
            put_counter: AtomicU64::new(0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Fail the puts with the given 0-based sequence numbers.
    pub fn fail_puts(mut self, indices: &[u64]) -> Self {
        self.fail_puts = indices.iter().copied().collect();
        self
    }

    /// Set the per-put latency range in milliseconds (uniform random).
    pub fn put_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.put_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the RNG seed for deterministic behaviour.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Number of puts attempted so far (including failed ones).
    pub fn put_count(&self) -> u64 {
        self.put_counter.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let (min, max) = self.put_latency_ms;
        if max == 0 {
            return;
        }

        let ms = if min == max {
            min
        } else {
            self.rng.lock().expect("rng lock poisoned").random_range(min..=max)
        };

        if ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait::async_trait]
impl UploadStore for FaultStore {
    fn name(&self) -> &'static str {
        "fault"
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.inner.init().await
    }

    async fn put(&self, object: &str, data: Bytes) -> Result<(), StoreError> {
        let index = self.put_counter.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.fail_puts.contains(&index) {
            return Err(StoreError::Injected { index });
        }
        self.inner.put(object, data).await
    }

    async fn get(&self, object: &str) -> Result<Option<Bytes>, StoreError> {
        self.inner.get(object).await
    }

    async fn contains(&self, object: &str) -> Result<bool, StoreError> {
        self.inner.contains(object).await
    }

    async fn teardown(&self) -> Result<(), StoreError> {
        self.inner.teardown().await
    }
}
