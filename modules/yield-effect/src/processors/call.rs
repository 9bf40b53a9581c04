use async_trait::async_trait;

use super::mismatched;
use crate::coroutine::Output;
use crate::effect::{Effect, EffectKind, Invoked};
use crate::error::EffectResult;
use crate::processor::{EffectContext, Processor};

/// Invokes the target and waits for its outcome. Coroutine targets are
/// driven to completion in place.
pub struct CallProcessor;

#[async_trait]
impl Processor for CallProcessor {
    async fn process(&self, effect: Effect, cx: EffectContext) -> EffectResult<Output> {
        let (target, args) = match effect {
            Effect::Call { target, args } => (target, args),
            other => return Err(mismatched(EffectKind::Call, &other)),
        };
        let value = match target.invoke(args) {
            Invoked::Pending(pending) => pending.await?,
            Invoked::Coroutine(coroutine) => {
                cx.scheduler().run(target.name(), coroutine).await?
            }
        };
        Ok(Output::Value(value))
    }
}
