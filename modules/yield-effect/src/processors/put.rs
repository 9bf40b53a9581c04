use async_trait::async_trait;

use super::mismatched;
use crate::coroutine::Output;
use crate::effect::{Effect, EffectKind};
use crate::error::EffectResult;
use crate::processor::{EffectContext, Processor};

/// Dispatches the event on a later turn of the runtime, never inside the
/// resume cycle that yielded it.
pub struct PutProcessor;

#[async_trait]
impl Processor for PutProcessor {
    async fn process(&self, effect: Effect, cx: EffectContext) -> EffectResult<Output> {
        let event = match effect {
            Effect::Put { event } => event,
            other => return Err(mismatched(EffectKind::Put, &other)),
        };
        tokio::task::yield_now().await;
        Ok(Output::Value(cx.dispatch(event)))
    }
}
