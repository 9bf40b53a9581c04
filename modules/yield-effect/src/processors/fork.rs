use async_trait::async_trait;

use super::mismatched;
use crate::coroutine::Output;
use crate::effect::{Effect, EffectKind, Invoked};
use crate::error::EffectResult;
use crate::processor::{EffectContext, Processor};

/// Starts the target without waiting and resolves with its task handle.
/// Function targets are invoked immediately; their outcome settles the
/// handle whenever it arrives.
pub struct ForkProcessor;

#[async_trait]
impl Processor for ForkProcessor {
    async fn process(&self, effect: Effect, cx: EffectContext) -> EffectResult<Output> {
        let (target, args) = match effect {
            Effect::Fork { target, args } => (target, args),
            other => return Err(mismatched(EffectKind::Fork, &other)),
        };
        let scheduler = cx.scheduler();
        let task = match target.invoke(args) {
            Invoked::Pending(pending) => scheduler.spawn_future(target.name(), pending),
            Invoked::Coroutine(coroutine) => scheduler.start_boxed(target.name(), coroutine),
        };
        Ok(Output::Task(task))
    }
}
