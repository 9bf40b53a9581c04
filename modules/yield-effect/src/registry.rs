//! Active-task registry: the in-flight tasks of one scheduler.
//!
//! Populated on start, drained on settlement, empty at idle. Each entry owns
//! the sender that settles its task handle, so removing the entry decides
//! who gets to settle it: the driver on completion, or `terminate` first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EffectError, EffectResult};
use crate::task::{Settle, TaskHandle, TaskId, TaskState};

struct Entry {
    name: String,
    state: TaskState,
    settle: Settle,
}

#[derive(Default)]
struct Inner {
    last_id: u64,
    entries: HashMap<TaskId, Entry>,
}

/// Point-in-time view of one active task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    #[serde(serialize_with = "serialize_state")]
    pub state: TaskState,
}

fn serialize_state<S: serde::Serializer>(state: &TaskState, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(state)
}

/// Registry of in-flight tasks, shared by clones of one scheduler.
#[derive(Clone, Default)]
pub struct ActiveTasks {
    inner: Arc<Mutex<Inner>>,
}

impl ActiveTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id and insert a `Created` entry. Must happen before the
    /// task is first resumed.
    pub(crate) fn register(&self, name: &str) -> TaskHandle {
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = TaskId(inner.last_id);
        let (handle, settle) = TaskHandle::pending(id, name);
        inner.entries.insert(
            id,
            Entry {
                name: name.to_string(),
                state: TaskState::Created,
                settle,
            },
        );
        handle
    }

    /// Record a state transition. Returns false once the entry is gone.
    pub(crate) fn set_state(&self, id: TaskId, state: TaskState) -> bool {
        match self.lock().entries.get_mut(&id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Remove the entry and settle its handle. Returns false if the task was
    /// already removed (terminated), in which case the outcome is dropped.
    pub(crate) fn settle(&self, id: TaskId, result: EffectResult<Value>) -> bool {
        let Some(entry) = self.lock().entries.remove(&id) else {
            debug!(task = %id, "settlement dropped, task no longer registered");
            return false;
        };
        // The receiver is gone only if every handle was dropped.
        let _ = entry.settle.send(result);
        true
    }

    /// Advisory early termination: drop the entry and settle its handle with
    /// `Terminated`. The task itself keeps running.
    pub(crate) fn terminate(&self, id: TaskId) -> bool {
        let Some(entry) = self.lock().entries.remove(&id) else {
            return false;
        };
        let _ = entry.settle.send(Err(EffectError::Terminated(id)));
        true
    }

    /// Settlement guard for a task's driver. See [`SettleGuard`].
    pub(crate) fn guard(&self, id: TaskId) -> SettleGuard {
        SettleGuard {
            tasks: self.clone(),
            id,
            settled: false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.lock().entries.contains_key(&id)
    }

    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.lock().entries.get(&id).map(|entry| entry.state.clone())
    }

    /// All active tasks, ordered by id.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        let mut tasks: Vec<TaskSnapshot> = self
            .lock()
            .entries
            .iter()
            .map(|(id, entry)| TaskSnapshot {
                id: *id,
                name: entry.name.clone(),
                state: entry.state.clone(),
            })
            .collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }
}

/// Owned by whatever drives a task. Settles the task with the driver's
/// outcome, or with `Abandoned` if the driver is dropped first (a panic in
/// the coroutine or a processor, or runtime shutdown).
pub(crate) struct SettleGuard {
    tasks: ActiveTasks,
    id: TaskId,
    settled: bool,
}

impl SettleGuard {
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn settle(mut self, result: EffectResult<Value>) -> bool {
        self.settled = true;
        self.tasks.settle(self.id, result)
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if self.tasks.settle(self.id, Err(EffectError::Abandoned(self.id))) {
            warn!(task = %self.id, "Task abandoned by its driver");
        }
    }
}
