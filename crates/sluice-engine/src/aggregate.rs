//! Per-request upload aggregation.
//!
//! Every `process`/`upload` request registers an [`OutstandingTask`]
//! here. A request may fan out into many physical sub-uploads (chunks
//! plus the bulk object); the table counts their completions and hands
//! back the final [`SpoolerResult`] exactly once, to exactly one
//! caller: the one whose completion was the last outstanding
//! sub-upload. Sub-uploads may
//! complete in any order on any number of tasks; the increment, the
//! compare against the expected count, and the removal of the task all
//! happen under one lock, so two racing "last" completions cannot both
//! observe an empty remainder.
//!
//! Lifecycle per task: [`begin`](TaskTable::begin) (processing) →
//! [`arm`](TaskTable::arm) (N sub-uploads dispatched) →
//! [`complete`](TaskTable::complete) × N → task destroyed. A processing
//! failure short-circuits via [`fail`](TaskTable::fail).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sluice_types::{code, ContentHash, FileChunk, SpoolerResult};
use tokio::sync::watch;
use tracing::trace;

/// Identifier of an outstanding request.
pub type TaskId = u64;

/// Bookkeeping for one logical file request.
///
/// Owned exclusively by the [`TaskTable`]; destroyed after the final
/// result is built, never re-entered.
struct OutstandingTask {
    local_path: PathBuf,
    /// Dispatched sub-upload count; `None` while still processing.
    expected: Option<u32>,
    completed: u32,
    /// First recorded sub-upload failure; later failures are counted
    /// but do not overwrite the reported code.
    first_error: i32,
    content_hash: ContentHash,
    chunks: Vec<FileChunk>,
}

impl OutstandingTask {
    fn into_result(self, return_code: i32) -> SpoolerResult {
        SpoolerResult {
            return_code,
            local_path: self.local_path,
            // A failed request must never expose a digest.
            content_hash: if return_code == code::OK {
                self.content_hash
            } else {
                ContentHash::NULL
            },
            file_chunks: self.chunks,
        }
    }
}

/// Table of in-flight requests with atomic last-completion detection.
pub struct TaskTable {
    tasks: Mutex<HashMap<TaskId, OutstandingTask>>,
    next_id: Mutex<TaskId>,
    in_flight_tx: watch::Sender<usize>,
    in_flight_rx: watch::Receiver<usize>,
}

impl TaskTable {
    /// Create an empty table.
    pub fn new() -> Self {
        let (in_flight_tx, in_flight_rx) = watch::channel(0);
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            in_flight_tx,
            in_flight_rx,
        }
    }

    /// Register a new request; it counts as in-flight from this moment.
    pub fn begin(&self, local_path: &Path) -> TaskId {
        let id = {
            let mut next = self.next_id.lock().expect("task lock poisoned");
            let id = *next;
            *next += 1;
            id
        };

        self.tasks.lock().expect("task lock poisoned").insert(
            id,
            OutstandingTask {
                local_path: local_path.to_path_buf(),
                expected: None,
                completed: 0,
                first_error: code::OK,
                content_hash: ContentHash::NULL,
                chunks: Vec::new(),
            },
        );
        self.in_flight_tx.send_modify(|n| *n += 1);
        trace!(task = id, path = %local_path.display(), "task registered");
        id
    }

    /// Abort a task whose processing failed; no sub-uploads were
    /// dispatched. Destroys the task and returns its failed result.
    pub fn fail(&self, id: TaskId, return_code: i32) -> SpoolerResult {
        debug_assert_ne!(return_code, code::OK);
        let task = self
            .tasks
            .lock()
            .expect("task lock poisoned")
            .remove(&id)
            .expect("unknown task failed");
        task.into_result(return_code)
    }

    /// Record the dispatched sub-upload count and processing metadata.
    ///
    /// Returns the final (successful) result immediately when `expected`
    /// is zero: every object was already known to the backend, or the
    /// degenerate input required no upload at all.
    pub fn arm(
        &self,
        id: TaskId,
        expected: u32,
        content_hash: ContentHash,
        chunks: Vec<FileChunk>,
    ) -> Option<SpoolerResult> {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        let task = tasks.get_mut(&id).expect("unknown task armed");
        assert!(task.expected.is_none(), "task {id} armed twice");

        task.expected = Some(expected);
        task.content_hash = content_hash;
        task.chunks = chunks;
        trace!(task = id, expected, "task armed for upload");

        if expected == 0 {
            let task = tasks.remove(&id).expect("task vanished");
            return Some(task.into_result(code::OK));
        }
        None
    }

    /// Record one sub-upload completion.
    ///
    /// Returns the final result only when this was the last
    /// outstanding sub-upload of the task; the task is destroyed in the
    /// same critical section.
    pub fn complete(&self, id: TaskId, status: i32) -> Option<SpoolerResult> {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        let task = tasks.get_mut(&id).expect("completion for unknown task");
        let expected = task.expected.expect("completion before task was armed");

        assert!(
            task.completed < expected,
            "task {id}: completion count exceeds expected {expected}"
        );

        task.completed += 1;
        if status != code::OK && task.first_error == code::OK {
            task.first_error = status;
        }

        if task.completed < expected {
            return None;
        }

        let task = tasks.remove(&id).expect("task vanished");
        let return_code = task.first_error;
        Some(task.into_result(return_code))
    }

    /// Release one in-flight slot after the final result was delivered.
    ///
    /// Called exactly once per task, by whoever received the final result
    /// from [`fail`](Self::fail), [`arm`](Self::arm), or
    /// [`complete`](Self::complete), after notifying listeners. Keeping
    /// the decrement out of those methods guarantees that waiters woken
    /// by [`wait_idle`](Self::wait_idle) observe every result as already
    /// delivered.
    pub fn settle(&self) {
        self.in_flight_tx.send_modify(|n| *n -= 1);
    }

    /// Number of requests currently in flight.
    pub fn outstanding(&self) -> usize {
        *self.in_flight_rx.borrow()
    }

    /// Wait until no requests are in flight.
    ///
    /// Contract: callers must not register new work concurrently, or the
    /// wait may never end.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight_rx.clone();
        loop {
            if *rx.borrow_and_update() == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
