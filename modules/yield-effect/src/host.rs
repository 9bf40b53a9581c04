//! Host boundary: intercepts coroutine work items, forwards everything else.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::coroutine::Coroutine;
use crate::dispatch::Dispatch;
use crate::effect::EffectKind;
use crate::processor::Processor;
use crate::scheduler::Scheduler;
use crate::task::{TaskHandle, TerminationToken};

/// Anything a host might dispatch.
pub enum WorkItem {
    /// A plain event. Forwarded unchanged.
    Event(Value),
    /// A coroutine to start.
    Coroutine(Box<dyn Coroutine>),
    /// Early-termination signal for a previously started coroutine.
    Terminate(TerminationToken),
}

impl WorkItem {
    pub fn coroutine(coroutine: impl Coroutine + 'static) -> Self {
        Self::Coroutine(Box::new(coroutine))
    }
}

impl From<Value> for WorkItem {
    fn from(event: Value) -> Self {
        Self::Event(event)
    }
}

impl From<TerminationToken> for WorkItem {
    fn from(token: TerminationToken) -> Self {
        Self::Terminate(token)
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::Coroutine(_) => f.write_str("Coroutine(..)"),
            Self::Terminate(token) => f.debug_tuple("Terminate").field(token).finish(),
        }
    }
}

/// What the caller gets back from [`HostAdapter::handle`].
#[derive(Debug)]
pub enum Dispatched {
    /// The next stage's return value.
    Forwarded(Value),
    /// The coroutine was started instead of forwarded.
    Started {
        task: TaskHandle,
        terminate: TerminationToken,
    },
}

impl Dispatched {
    pub fn task(&self) -> Option<&TaskHandle> {
        match self {
            Self::Started { task, .. } => Some(task),
            Self::Forwarded(_) => None,
        }
    }

    pub fn into_task(self) -> Option<TaskHandle> {
        match self {
            Self::Started { task, .. } => Some(task),
            Self::Forwarded(_) => None,
        }
    }
}

/// Middleware-style interception point in front of the host's next stage.
///
/// The next stage doubles as the dispatch sink for `put` effects.
#[derive(Clone)]
pub struct HostAdapter {
    next: Arc<dyn Dispatch>,
    scheduler: Scheduler,
}

impl HostAdapter {
    /// Built-ins plus `processors`; caller entries win on collision.
    pub fn new(
        next: Arc<dyn Dispatch>,
        processors: impl IntoIterator<Item = (EffectKind, Arc<dyn Processor>)>,
    ) -> Self {
        Self::with_config(next, processors, SchedulerConfig::default())
    }

    pub fn with_config(
        next: Arc<dyn Dispatch>,
        processors: impl IntoIterator<Item = (EffectKind, Arc<dyn Processor>)>,
        config: SchedulerConfig,
    ) -> Self {
        let scheduler = Scheduler::builder(next.clone())
            .processors(processors)
            .config(config)
            .build();
        Self { next, scheduler }
    }

    /// Wrap an existing scheduler. `next` receives forwarded items only.
    pub fn with_scheduler(next: Arc<dyn Dispatch>, scheduler: Scheduler) -> Self {
        Self { next, scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn handle(&self, item: impl Into<WorkItem>) -> Dispatched {
        match item.into() {
            WorkItem::Event(event) => Dispatched::Forwarded(self.next.dispatch(event)),
            WorkItem::Coroutine(coroutine) => {
                let task = self.scheduler.start_boxed("coroutine", coroutine);
                debug!(task = %task.id(), "Started coroutine at host boundary");
                Dispatched::Started {
                    terminate: task.termination_token(),
                    task,
                }
            }
            WorkItem::Terminate(token) => {
                self.scheduler.terminate(token.id);
                Dispatched::Forwarded(self.next.dispatch(token.to_wire()))
            }
        }
    }
}
