//! The processor seam: one processor per effect kind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::coroutine::Output;
use crate::dispatch::Dispatch;
use crate::effect::{Effect, EffectKind};
use crate::error::EffectResult;
use crate::processors::{CallProcessor, ForkProcessor, JoinProcessor, PutProcessor};
use crate::scheduler::Scheduler;

/// What a processor gets to work with besides the effect itself.
#[derive(Clone)]
pub struct EffectContext {
    dispatch: Arc<dyn Dispatch>,
    scheduler: Scheduler,
}

impl EffectContext {
    pub(crate) fn new(dispatch: Arc<dyn Dispatch>, scheduler: Scheduler) -> Self {
        Self {
            dispatch,
            scheduler,
        }
    }

    /// Hand an event to the host sink.
    pub fn dispatch(&self, event: Value) -> Value {
        self.dispatch.dispatch(event)
    }

    /// Entry point for starting or driving nested coroutines.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

/// Turns one kind of effect descriptor into an eventual outcome.
///
/// A failure is delivered into the yielding coroutine at its suspension
/// point.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, effect: Effect, cx: EffectContext) -> EffectResult<Output>;
}

/// Processor backed by an async closure. Built by [`processor_fn`].
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap an async closure as a processor.
pub fn processor_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(Effect, EffectContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EffectResult<Output>> + Send + 'static,
{
    FnProcessor { f }
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(Effect, EffectContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EffectResult<Output>> + Send + 'static,
{
    async fn process(&self, effect: Effect, cx: EffectContext) -> EffectResult<Output> {
        (self.f)(effect, cx).await
    }
}

// ---------------------------------------------------------------------------
// ProcessorRegistry
// ---------------------------------------------------------------------------

/// Kind → processor table. Seeded with the four built-ins; caller entries
/// replace them on collision.
#[derive(Clone)]
pub struct ProcessorRegistry {
    put: Arc<dyn Processor>,
    call: Arc<dyn Processor>,
    fork: Arc<dyn Processor>,
    join: Arc<dyn Processor>,
    custom: HashMap<String, Arc<dyn Processor>>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProcessorRegistry {
    pub fn builtin() -> Self {
        Self {
            put: Arc::new(PutProcessor),
            call: Arc::new(CallProcessor),
            fork: Arc::new(ForkProcessor),
            join: Arc::new(JoinProcessor),
            custom: HashMap::new(),
        }
    }

    /// Register `processor` for `kind`, replacing whatever was there.
    pub fn insert(&mut self, kind: EffectKind, processor: Arc<dyn Processor>) {
        match kind {
            EffectKind::Put => self.put = processor,
            EffectKind::Call => self.call = processor,
            EffectKind::Fork => self.fork = processor,
            EffectKind::Join => self.join = processor,
            EffectKind::Custom(tag) => {
                self.custom.insert(tag, processor);
            }
        }
    }

    pub fn with(mut self, kind: EffectKind, processor: impl Processor + 'static) -> Self {
        self.insert(kind, Arc::new(processor));
        self
    }

    /// Merge caller-supplied entries over this table.
    pub fn extend(&mut self, overrides: impl IntoIterator<Item = (EffectKind, Arc<dyn Processor>)>) {
        for (kind, processor) in overrides {
            self.insert(kind, processor);
        }
    }

    pub fn get(&self, kind: &EffectKind) -> Option<Arc<dyn Processor>> {
        match kind {
            EffectKind::Put => Some(self.put.clone()),
            EffectKind::Call => Some(self.call.clone()),
            EffectKind::Fork => Some(self.fork.clone()),
            EffectKind::Join => Some(self.join.clone()),
            EffectKind::Custom(tag) => self.custom.get(tag).cloned(),
        }
    }

    pub fn contains(&self, kind: &EffectKind) -> bool {
        self.get(kind).is_some()
    }

    /// Every kind with a processor, built-ins first, custom tags sorted.
    pub fn kinds(&self) -> Vec<EffectKind> {
        let mut custom: Vec<&String> = self.custom.keys().collect();
        custom.sort();
        [EffectKind::Put, EffectKind::Call, EffectKind::Fork, EffectKind::Join]
            .into_iter()
            .chain(custom.into_iter().map(|tag| EffectKind::Custom(tag.clone())))
            .collect()
    }
}
