//! Effect descriptors and the functions that build them.
//!
//! Descriptors are plain data: building one never performs the effect. A
//! coroutine yields them and the scheduler routes each to its processor.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::coroutine::{Coroutine, Output};
use crate::error::{EffectError, EffectResult};
use crate::task::TaskHandle;

pub const PUT_TAG: &str = "PUT";
pub const CALL_TAG: &str = "CALL";
pub const FORK_TAG: &str = "FORK";
pub const JOIN_TAG: &str = "JOIN";
/// Reserved for the early-termination signal; never a processable effect.
pub const TERMINATE_TAG: &str = "TERMINATE";

const RESERVED_TAGS: [&str; 5] = [PUT_TAG, CALL_TAG, FORK_TAG, JOIN_TAG, TERMINATE_TAG];

// ---------------------------------------------------------------------------
// EffectKind
// ---------------------------------------------------------------------------

/// The kind of an effect: one of the four built-ins, or a caller-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Put,
    Call,
    Fork,
    Join,
    Custom(String),
}

impl EffectKind {
    /// Resolve a wire tag. Built-in tags map to their variant.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            PUT_TAG => Self::Put,
            CALL_TAG => Self::Call,
            FORK_TAG => Self::Fork,
            JOIN_TAG => Self::Join,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Put => PUT_TAG,
            Self::Call => CALL_TAG,
            Self::Fork => FORK_TAG,
            Self::Join => JOIN_TAG,
            Self::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

type FunctionBody = dyn Fn(Vec<Value>) -> BoxFuture<'static, EffectResult<Value>> + Send + Sync;
type CoroutineBody = dyn Fn(Vec<Value>) -> Box<dyn Coroutine> + Send + Sync;

#[derive(Clone)]
enum TargetBody {
    Function(Arc<FunctionBody>),
    Coroutine(Arc<CoroutineBody>),
}

/// A named callable that `call` and `fork` invoke.
///
/// Either an ordinary function (ready or pending result) or a function that
/// produces a coroutine for the scheduler to drive.
#[derive(Clone)]
pub struct Target {
    name: Arc<str>,
    body: TargetBody,
}

/// What invoking a target produced.
pub(crate) enum Invoked {
    Pending(BoxFuture<'static, EffectResult<Value>>),
    Coroutine(Box<dyn Coroutine>),
}

impl Target {
    /// An ordinary function whose result is known as soon as it returns.
    pub fn function<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> EffectResult<Value> + Send + Sync + 'static,
    {
        let body = move |args: Vec<Value>| future::ready(f(args)).boxed();
        Self {
            name: Arc::from(name.into()),
            body: TargetBody::Function(Arc::new(body)),
        }
    }

    /// An ordinary function returning a pending computation.
    pub fn future<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EffectResult<Value>> + Send + 'static,
    {
        let body = move |args: Vec<Value>| f(args).boxed();
        Self {
            name: Arc::from(name.into()),
            body: TargetBody::Function(Arc::new(body)),
        }
    }

    /// A coroutine-producing function.
    pub fn coroutine<F, C>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> C + Send + Sync + 'static,
        C: Coroutine + 'static,
    {
        let body = move |args: Vec<Value>| Box::new(f(args)) as Box<dyn Coroutine>;
        Self {
            name: Arc::from(name.into()),
            body: TargetBody::Coroutine(Arc::new(body)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_coroutine(&self) -> bool {
        matches!(self.body, TargetBody::Coroutine(_))
    }

    /// Invoke synchronously. A function's own failure surfaces through the
    /// returned future, so it reaches the coroutine like any other failure.
    pub(crate) fn invoke(&self, args: Vec<Value>) -> Invoked {
        match &self.body {
            TargetBody::Function(f) => Invoked::Pending(f(args)),
            TargetBody::Coroutine(f) => Invoked::Coroutine(f(args)),
        }
    }

    fn same_body(&self, other: &Self) -> bool {
        match (&self.body, &other.body) {
            (TargetBody::Function(a), TargetBody::Function(b)) => Arc::ptr_eq(a, b),
            (TargetBody::Coroutine(a), TargetBody::Coroutine(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_body(other)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = if self.is_coroutine() { "coroutine" } else { "function" };
        write!(f, "Target({} {})", shape, self.name)
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// A description of a side effect. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Put { event: Value },
    Call { target: Target, args: Vec<Value> },
    Fork { target: Target, args: Vec<Value> },
    Join { task: TaskHandle },
    Custom { kind: String, payload: Value },
}

impl Effect {
    /// A caller-defined effect, routed to a processor registered for `kind`.
    pub fn custom(kind: impl Into<String>, payload: Value) -> EffectResult<Self> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(EffectError::invalid("custom effect kind must not be empty"));
        }
        if RESERVED_TAGS.contains(&kind.as_str()) {
            return Err(EffectError::invalid(format!(
                "`{kind}` is a reserved effect kind"
            )));
        }
        if !payload.is_object() {
            return Err(EffectError::invalid(format!(
                "custom effect payload must be an object, but received {payload}"
            )));
        }
        Ok(Self::Custom { kind, payload })
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Put { .. } => EffectKind::Put,
            Self::Call { .. } => EffectKind::Call,
            Self::Fork { .. } => EffectKind::Fork,
            Self::Join { .. } => EffectKind::Join,
            Self::Custom { kind, .. } => EffectKind::Custom(kind.clone()),
        }
    }

    /// The payload in wire form. Targets appear by name, tasks by id.
    pub fn payload(&self) -> Value {
        match self {
            Self::Put { event } => json!({ "event": event }),
            Self::Call { target, args } | Self::Fork { target, args } => {
                json!({ "target": target.name(), "args": args })
            }
            Self::Join { task } => json!({ "task": task }),
            Self::Custom { payload, .. } => payload.clone(),
        }
    }

    /// Wire form: `{"kind": <tag>, "payload": {...}}`.
    pub fn to_wire(&self) -> Value {
        json!({ "kind": self.kind().tag(), "payload": self.payload() })
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Creators
// ---------------------------------------------------------------------------

/// Dispatch `event` through the host sink. The event must be a JSON object.
pub fn put(event: Value) -> EffectResult<Effect> {
    if !event.is_object() {
        return Err(EffectError::invalid(format!(
            "put only supports dispatching plain objects, but received {event}"
        )));
    }
    Ok(Effect::Put { event })
}

/// Invoke `target` and wait for its outcome.
pub fn call(target: Target, args: Vec<Value>) -> Effect {
    Effect::Call { target, args }
}

/// Invoke `target` without waiting; resolves with a task handle.
pub fn fork(target: Target, args: Vec<Value>) -> Effect {
    Effect::Fork { target, args }
}

/// Wait for previously forked work. `task` must carry a task handle.
pub fn join(task: impl Into<Output>) -> EffectResult<Effect> {
    match task.into() {
        Output::Task(task) => Ok(Effect::Join { task }),
        Output::Value(other) => Err(EffectError::invalid(format!(
            "join expects a task handle, but received {other}"
        ))),
    }
}
