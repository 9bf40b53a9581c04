//! The coroutine scheduler.
//!
//! Resume → inspect the step → route the effect → resume with its outcome,
//! until the coroutine returns or fails. Nested coroutines (`call`) are
//! driven in the caller's task; forked work gets its own tokio task.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::SchedulerConfig;
use crate::coroutine::{Coroutine, Output, Resume, Step, Yielded};
use crate::dispatch::Dispatch;
use crate::effect::EffectKind;
use crate::error::{EffectError, EffectResult};
use crate::processor::{EffectContext, Processor, ProcessorRegistry};
use crate::registry::{ActiveTasks, SettleGuard};
use crate::task::{TaskHandle, TaskId, TaskState};

struct Inner {
    config: SchedulerConfig,
    processors: ProcessorRegistry,
    dispatch: Arc<dyn Dispatch>,
    tasks: ActiveTasks,
}

/// Drives coroutines to completion.
///
/// Cheap to clone; clones share the processor table, the dispatch sink and
/// the active-task registry. Independent schedulers share nothing.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

/// Builds a [`Scheduler`]. Caller processors override built-ins.
pub struct SchedulerBuilder {
    dispatch: Arc<dyn Dispatch>,
    processors: ProcessorRegistry,
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    pub fn processor(mut self, kind: EffectKind, processor: impl Processor + 'static) -> Self {
        self.processors.insert(kind, Arc::new(processor));
        self
    }

    pub fn processors(
        mut self,
        overrides: impl IntoIterator<Item = (EffectKind, Arc<dyn Processor>)>,
    ) -> Self {
        self.processors.extend(overrides);
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            inner: Arc::new(Inner {
                config: self.config,
                processors: self.processors,
                dispatch: self.dispatch,
                tasks: ActiveTasks::new(),
            }),
        }
    }
}

impl Scheduler {
    /// A scheduler with the built-in processors and default config.
    pub fn new(dispatch: Arc<dyn Dispatch>) -> Self {
        Self::builder(dispatch).build()
    }

    pub fn builder(dispatch: Arc<dyn Dispatch>) -> SchedulerBuilder {
        SchedulerBuilder {
            dispatch,
            processors: ProcessorRegistry::builtin(),
            config: SchedulerConfig::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.inner.processors
    }

    pub fn active_tasks(&self) -> &ActiveTasks {
        &self.inner.tasks
    }

    /// Start a coroutine on its own task and return its handle right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, coroutine: impl Coroutine + 'static) -> TaskHandle {
        self.start_boxed("coroutine", Box::new(coroutine))
    }

    /// Like [`start`](Self::start), with a name for logs and snapshots.
    pub fn start_boxed(&self, name: &str, coroutine: Box<dyn Coroutine>) -> TaskHandle {
        let handle = self.inner.tasks.register(name);
        let id = handle.id();
        let span = self.task_span(id, name);
        let guard = self.inner.tasks.guard(id);
        let this = self.clone();
        tokio::spawn(async move { this.drive(guard, coroutine).await }.instrument(span));
        handle
    }

    /// Register a coroutine and drive it in the caller's task, resolving
    /// with its outcome.
    pub fn run(&self, name: &str, coroutine: Box<dyn Coroutine>) -> BoxFuture<'static, EffectResult<Value>> {
        let handle = self.inner.tasks.register(name);
        let id = handle.id();
        let span = self.task_span(id, name);
        let guard = self.inner.tasks.guard(id);
        let this = self.clone();
        async move {
            this.drive(guard, coroutine).await;
            handle.result().await
        }
        .instrument(span)
        .boxed()
    }

    /// Register plain async work as a task. Used for forked functions.
    pub fn spawn_future(
        &self,
        name: &str,
        work: BoxFuture<'static, EffectResult<Value>>,
    ) -> TaskHandle {
        let handle = self.inner.tasks.register(name);
        let id = handle.id();
        self.inner.tasks.set_state(id, TaskState::Running);
        let span = self.task_span(id, name);
        let guard = self.inner.tasks.guard(id);
        tokio::spawn(
            async move {
                let outcome = work.await;
                log_settlement(id, &outcome);
                guard.settle(outcome);
            }
            .instrument(span),
        );
        handle
    }

    /// Advisory early termination. Drops the task from the registry and
    /// settles its handle with [`EffectError::Terminated`]; the work itself
    /// is not aborted. Returns false if the task was not active.
    pub fn terminate(&self, id: TaskId) -> bool {
        let removed = self.inner.tasks.terminate(id);
        if removed {
            info!(task = %id, "Task terminated");
        }
        removed
    }

    fn context(&self) -> EffectContext {
        EffectContext::new(self.inner.dispatch.clone(), self.clone())
    }

    fn task_span(&self, id: TaskId, name: &str) -> tracing::Span {
        info_span!("task", scheduler = %self.inner.config.name, task = %id, task_name = name)
    }

    /// Drive `coroutine` until it settles, then settle its registry entry.
    /// Dropping this future before then settles the task as abandoned.
    async fn drive(&self, guard: SettleGuard, mut coroutine: Box<dyn Coroutine>) {
        let id = guard.id();
        let tasks = &self.inner.tasks;
        let limit = self.inner.config.pass_through_limit;
        let mut input: Resume = Ok(Output::Value(Value::Null));
        let mut pass_throughs = 0usize;

        debug!("Task started");

        let outcome = loop {
            tasks.set_state(id, TaskState::Running);
            let effect = match coroutine.resume(input) {
                Step::Done(result) => break result,
                Step::Yield(Yielded::Value(output)) => {
                    pass_throughs += 1;
                    if let Some(limit) = limit.filter(|limit| pass_throughs > *limit) {
                        break Err(EffectError::failure(format!(
                            "exceeded {limit} consecutive pass-through yields"
                        )));
                    }
                    input = Ok(output);
                    continue;
                }
                Step::Yield(Yielded::Effect(effect)) => effect,
            };
            pass_throughs = 0;

            let kind = effect.kind();
            let Some(processor) = self.inner.processors.get(&kind) else {
                break Err(EffectError::UnknownEffectKind(kind.tag().to_string()));
            };

            debug!(kind = %kind, "Routing effect");
            tasks.set_state(id, TaskState::Suspended(kind.clone()));
            input = processor.process(effect, self.context()).await;

            if let Err(err) = &input {
                debug!(kind = %kind, error = %err, "Effect failed, delivering into coroutine");
            }
        };

        log_settlement(id, &outcome);
        guard.settle(outcome);
    }
}

fn log_settlement(id: TaskId, outcome: &EffectResult<Value>) {
    match outcome {
        Ok(_) => debug!(task = %id, "Task done"),
        Err(err) => warn!(task = %id, error = %err, "Task failed"),
    }
}
