//! Task handles, identifiers and lifecycle states.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::effect::{EffectKind, TERMINATE_TAG};
use crate::error::{EffectError, EffectResult};

/// Identifier of a started task. Unique for the lifetime of the registry
/// that allocated it; allocation starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle of a driven coroutine.
///
/// `Created → Running → (Suspended ⇄ Running)* → Done | Failed`.
/// Only the non-terminal states are ever stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Suspended(EffectKind),
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Suspended(kind) => write!(f, "suspended on {}", kind.tag()),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

pub(crate) type Settle = oneshot::Sender<EffectResult<Value>>;

type SharedResult = Shared<BoxFuture<'static, EffectResult<Value>>>;

/// Externally visible handle to started work.
///
/// Cheap to clone; every clone observes the same single settlement. Used as
/// the argument to `join`.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    name: Arc<str>,
    result: SharedResult,
}

impl TaskHandle {
    /// Create a pending handle plus the sender that settles it.
    pub(crate) fn pending(id: TaskId, name: &str) -> (Self, Settle) {
        let (tx, rx) = oneshot::channel();
        let result = rx
            .map(move |settled| settled.unwrap_or(Err(EffectError::Abandoned(id))))
            .boxed()
            .shared();
        let handle = Self {
            id,
            name: Arc::from(name),
            result,
        };
        (handle, tx)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the task to settle. Resolves immediately if it already has.
    pub async fn result(&self) -> EffectResult<Value> {
        self.result.clone().await
    }

    /// The settled outcome, if the task has settled.
    pub fn try_result(&self) -> Option<EffectResult<Value>> {
        self.result.clone().now_or_never()
    }

    pub fn is_settled(&self) -> bool {
        self.try_result().is_some()
    }

    /// The early-termination token for this task.
    pub fn termination_token(&self) -> TerminationToken {
        TerminationToken { id: self.id }
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.result.ptr_eq(&other.result)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl Serialize for TaskHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TaskHandle", 1)?;
        state.serialize_field("id", &self.id)?;
        state.end()
    }
}

/// Explicit early-termination signal for a started task.
///
/// Distinct from every effect kind. Feeding it back through the host
/// adapter (or to `Scheduler::terminate`) drops the task from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationToken {
    pub id: TaskId,
}

impl TerminationToken {
    /// Wire form: `{"kind": "TERMINATE", "payload": {"id": n}}`.
    pub fn to_wire(&self) -> Value {
        json!({ "kind": TERMINATE_TAG, "payload": { "id": self.id } })
    }
}

impl Serialize for TerminationToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}
