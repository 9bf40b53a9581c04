use async_trait::async_trait;

use super::mismatched;
use crate::coroutine::Output;
use crate::effect::{Effect, EffectKind};
use crate::error::EffectResult;
use crate::processor::{EffectContext, Processor};

/// Settles exactly as the joined task settles. Leaves the registry alone.
pub struct JoinProcessor;

#[async_trait]
impl Processor for JoinProcessor {
    async fn process(&self, effect: Effect, _cx: EffectContext) -> EffectResult<Output> {
        let task = match effect {
            Effect::Join { task } => task,
            other => return Err(mismatched(EffectKind::Join, &other)),
        };
        task.result().await.map(Output::Value)
    }
}
