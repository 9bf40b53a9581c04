//! Coroutines: resumable computations that yield effect descriptors.
//!
//! The contract is an explicit state machine: [`Coroutine::resume`] takes the
//! outcome of the previously yielded effect (a value, or an error to raise at
//! the suspension point) and runs until the next [`Step`].
//!
//! [`from_fn`] adapts an `async` block into a coroutine. The block receives a
//! [`Co`] yield handle; every `co.perform(effect).await` is a suspension
//! point, and its `Err` arm is where a delivered failure can be caught. The
//! block must only await futures produced by its `Co`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt};
use futures::task::noop_waker_ref;
use serde::Serialize;
use serde_json::Value;

use crate::effect::{self, Effect, Target};
use crate::error::{EffectError, EffectResult};
use crate::task::TaskHandle;

/// What an effect resolves with and what a coroutine is resumed with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Value(Value),
    Task(TaskHandle),
}

impl Output {
    pub fn into_value(self) -> EffectResult<Value> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Task(task) => Err(EffectError::invalid(format!(
                "expected a value, but received a handle to {}",
                task.id()
            ))),
        }
    }

    pub fn into_task(self) -> EffectResult<TaskHandle> {
        match self {
            Self::Task(task) => Ok(task),
            Self::Value(value) => Err(EffectError::invalid(format!(
                "expected a task handle, but received {value}"
            ))),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Task(_) => None,
        }
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<TaskHandle> for Output {
    fn from(task: TaskHandle) -> Self {
        Self::Task(task)
    }
}

impl From<&TaskHandle> for Output {
    fn from(task: &TaskHandle) -> Self {
        Self::Task(task.clone())
    }
}

/// Input to a resume: the previous effect's outcome.
pub type Resume = EffectResult<Output>;

/// Something a coroutine yielded.
#[derive(Debug, Clone, PartialEq)]
pub enum Yielded {
    /// Routed to a processor.
    Effect(Effect),
    /// Not an effect: echoed straight back as the next input.
    Value(Output),
}

impl From<Effect> for Yielded {
    fn from(effect: Effect) -> Self {
        Self::Effect(effect)
    }
}

/// Result of advancing a coroutine once.
#[derive(Debug)]
pub enum Step {
    Yield(Yielded),
    Done(EffectResult<Value>),
}

/// A resumable computation driven by the scheduler.
///
/// The first resume receives `Ok(Value::Null)`. An `Err` input is raised at
/// the suspension point. Never resumed concurrently.
pub trait Coroutine: Send {
    fn resume(&mut self, input: Resume) -> Step;
}

impl<C: Coroutine + ?Sized> Coroutine for Box<C> {
    fn resume(&mut self, input: Resume) -> Step {
        (**self).resume(input)
    }
}

// ---------------------------------------------------------------------------
// Async-block adapter
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Exchange {
    yielded: Option<Yielded>,
    input: Option<Resume>,
}

fn lock(exchange: &Mutex<Exchange>) -> MutexGuard<'_, Exchange> {
    exchange.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Yield handle passed to an [`from_fn`] body.
#[derive(Clone)]
pub struct Co {
    exchange: Arc<Mutex<Exchange>>,
}

impl Co {
    /// Yield an effect and wait for its outcome.
    pub fn perform(&self, effect: Effect) -> Suspend {
        self.suspend(Yielded::Effect(effect))
    }

    /// Yield a non-effect value. The scheduler hands it straight back.
    pub fn pass(&self, output: impl Into<Output>) -> Suspend {
        self.suspend(Yielded::Value(output.into()))
    }

    pub async fn put(&self, event: Value) -> EffectResult<Value> {
        let effect = effect::put(event)?;
        self.perform(effect).await?.into_value()
    }

    pub async fn call(&self, target: Target, args: Vec<Value>) -> EffectResult<Value> {
        self.perform(effect::call(target, args)).await?.into_value()
    }

    pub async fn fork(&self, target: Target, args: Vec<Value>) -> EffectResult<TaskHandle> {
        self.perform(effect::fork(target, args)).await?.into_task()
    }

    pub async fn join(&self, task: &TaskHandle) -> EffectResult<Value> {
        let effect = effect::join(task)?;
        self.perform(effect).await?.into_value()
    }

    fn suspend(&self, yielded: Yielded) -> Suspend {
        Suspend {
            exchange: self.exchange.clone(),
            yielded: Some(yielded),
        }
    }
}

/// A single suspension point. Pending until the scheduler supplies input.
#[must_use = "a yielded effect does nothing unless awaited"]
pub struct Suspend {
    exchange: Arc<Mutex<Exchange>>,
    yielded: Option<Yielded>,
}

impl Unpin for Suspend {}

impl Future for Suspend {
    type Output = Resume;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Resume> {
        let this = self.get_mut();
        let mut exchange = lock(&this.exchange);
        if let Some(yielded) = this.yielded.take() {
            // One suspension point at a time: a second concurrent yield is
            // rejected instead of replacing the pending one.
            if exchange.yielded.is_some() {
                return Poll::Ready(Err(EffectError::failure(
                    "coroutine yielded twice without resuming",
                )));
            }
            exchange.yielded = Some(yielded);
            exchange.input = None;
            return Poll::Pending;
        }
        match exchange.input.take() {
            Some(input) => Poll::Ready(input),
            None => Poll::Pending,
        }
    }
}

/// Coroutine backed by an `async` block. Built by [`from_fn`].
pub struct FnCoroutine {
    exchange: Arc<Mutex<Exchange>>,
    body: Option<BoxFuture<'static, EffectResult<Value>>>,
    started: bool,
}

/// Turn an `async` block over a [`Co`] into a coroutine.
pub fn from_fn<F, Fut>(f: F) -> FnCoroutine
where
    F: FnOnce(Co) -> Fut,
    Fut: Future<Output = EffectResult<Value>> + Send + 'static,
{
    let exchange = Arc::new(Mutex::new(Exchange::default()));
    let co = Co {
        exchange: exchange.clone(),
    };
    FnCoroutine {
        exchange,
        body: Some(f(co).boxed()),
        started: false,
    }
}

impl Coroutine for FnCoroutine {
    fn resume(&mut self, input: Resume) -> Step {
        let Some(body) = self.body.as_mut() else {
            return Step::Done(Err(EffectError::failure(
                "coroutine resumed after it completed",
            )));
        };

        {
            let mut exchange = lock(&self.exchange);
            exchange.yielded = None;
            // The first input has no suspension point to land on.
            if self.started {
                exchange.input = Some(input);
            }
        }
        self.started = true;

        let mut cx = Context::from_waker(noop_waker_ref());
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.body = None;
                Step::Done(result)
            }
            Poll::Pending => match lock(&self.exchange).yielded.take() {
                Some(yielded) => Step::Yield(yielded),
                None => {
                    self.body = None;
                    Step::Done(Err(EffectError::failure(
                        "coroutine body awaited a future outside its yield handle",
                    )))
                }
            },
        }
    }
}
